//! Desktop backend built on winit.
//!
//! winit owns the event loop, so polling pumps it with `run_return` and stops
//! at `MainEventsCleared`, which hands control back to the caller once every
//! pending OS event has been dispatched.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use glam::DVec2;
use log::{debug, info, trace, warn};
use winit::dpi::LogicalSize;
use winit::event::{
    DeviceEvent, ElementState, Event, KeyboardInput, MouseButton as WinitMouseButton,
    MouseScrollDelta, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{CursorGrabMode, Fullscreen, Icon, Window, WindowBuilder};

use super::{host_name, Callbacks, Dispatcher, Platform, WindowConfig};
use crate::error::{PlatformError, PlatformResult};
use crate::input::{desktop::KEYS, ButtonAction, Key, MouseButton, MouseMode};

/// Trackpads report scroll in pixels; the callback contract is in lines.
const PIXELS_PER_LINE: f64 = 16.0;

pub struct DesktopBackend {
    event_loop: Option<EventLoop<()>>,
    state: DesktopState,
    clipboard: Option<arboard::Clipboard>,
    started: Instant,
}

struct DesktopState {
    dispatcher: Dispatcher,
    window: Option<OpenWindow>,
}

struct OpenWindow {
    window: Window,
    config: WindowConfig,
    visible: bool,
    focused: bool,
}

impl DesktopBackend {
    pub fn new() -> Self {
        Self {
            event_loop: None,
            state: DesktopState {
                dispatcher: Dispatcher::new(),
                window: None,
            },
            clipboard: None,
            started: Instant::now(),
        }
    }

    fn clipboard(&mut self) -> PlatformResult<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new().map_err(clipboard_error)?);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| PlatformError::Clipboard("clipboard unavailable".into()))
    }

    fn read_clipboard(&mut self) -> PlatformResult<Option<String>> {
        clipboard_contents(self.clipboard()?.get_text())
    }

    fn write_clipboard(&mut self, text: &str) -> PlatformResult<()> {
        self.clipboard()?
            .set_text(text.to_owned())
            .map_err(clipboard_error)
    }
}

impl Default for DesktopBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for DesktopBackend {
    fn name(&self) -> &'static str {
        host_name()
    }

    fn init(&mut self) -> PlatformResult<()> {
        info!("desktop platform initialized on {}", host_name());
        Ok(())
    }

    fn destroy(&mut self) {
        self.state.dispatcher.callbacks_mut().clear();
        self.state.window = None;
        self.clipboard = None;
        // The event loop stays: winit refuses to create a second one per process.
    }

    fn poll_events(&mut self) {
        if self.state.window.is_none() {
            return;
        }
        let Some(event_loop) = self.event_loop.as_mut() else {
            return;
        };
        let state = &mut self.state;
        event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Poll;
            match event {
                Event::MainEventsCleared => control_flow.set_exit(),
                event => state.handle_event(event),
            }
        });
    }

    fn update_callbacks(&mut self, update: Box<dyn FnOnce(&mut Callbacks) + '_>) {
        update(self.state.dispatcher.callbacks_mut());
    }

    fn open_window(&mut self, config: &WindowConfig) -> PlatformResult<()> {
        if self.state.window.is_some() {
            return Ok(());
        }
        let event_loop = match self.event_loop.take() {
            Some(event_loop) => event_loop,
            None => create_event_loop()?,
        };
        let window = build_window(&event_loop, config);
        self.event_loop = Some(event_loop);
        let window = window?;

        let size = window.inner_size().to_logical::<u32>(window.scale_factor());
        info!(
            "opened window {}x{} \"{}\" (msaa {}, vsync {})",
            size.width, size.height, config.title, config.msaa, config.vsync
        );
        self.state.window = Some(OpenWindow {
            window,
            config: config.clone(),
            visible: true,
            focused: true,
        });
        let mode = self.state.dispatcher.input().mouse_mode();
        self.state.apply_mouse_mode(mode);
        Ok(())
    }

    fn window_config(&self) -> Option<&WindowConfig> {
        self.state.window.as_ref().map(|open| &open.config)
    }

    fn window_is_open(&self) -> bool {
        self.state.window.is_some()
    }

    fn window_is_visible(&self) -> bool {
        self.state.window.as_ref().is_some_and(|open| open.visible)
    }

    fn window_is_focused(&self) -> bool {
        self.state.window.as_ref().is_some_and(|open| open.focused)
    }

    fn window_size(&self) -> (u32, u32) {
        self.state.window.as_ref().map_or((0, 0), |open| {
            let size = open
                .window
                .inner_size()
                .to_logical::<u32>(open.window.scale_factor());
            (size.width, size.height)
        })
    }

    fn window_framebuffer_size(&self) -> (u32, u32) {
        self.state.window.as_ref().map_or((0, 0), |open| {
            let size = open.window.inner_size();
            (size.width, size.height)
        })
    }

    fn window_pixel_density(&self) -> f32 {
        self.state
            .window
            .as_ref()
            .map_or(0.0, |open| open.window.scale_factor() as f32)
    }

    fn mouse_position(&self) -> DVec2 {
        self.state.dispatcher.input().mouse_position()
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.state.dispatcher.set_mouse_mode(mode);
        self.state.apply_mouse_mode(mode);
    }

    fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.state.dispatcher.input().is_mouse_button_down(button)
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.state.dispatcher.input().is_key_down(key)
    }

    fn clipboard_text(&mut self) -> Option<String> {
        self.read_clipboard().unwrap_or_else(|err| {
            warn!("{err}");
            None
        })
    }

    fn set_clipboard_text(&mut self, text: &str) {
        if let Err(err) = self.write_clipboard(text) {
            warn!("{err}");
        }
    }

    fn time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl DesktopState {
    fn handle_event(&mut self, event: Event<'_, ()>) {
        match event {
            Event::WindowEvent { event, .. } => self.handle_window_event(event),
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                // Locked cursors stop producing CursorMoved; raw motion carries the deltas.
                if self.takes_raw_motion() {
                    self.dispatcher.mouse_delta(delta.0, delta.1);
                }
            }
            _ => {}
        }
    }

    /// Device motion is global, so only a focused window in grabbed mode consumes it.
    fn takes_raw_motion(&self) -> bool {
        self.dispatcher.input().mouse_mode() == MouseMode::Grabbed
            && self.window.as_ref().is_some_and(|open| open.focused)
    }

    fn handle_window_event(&mut self, event: WindowEvent<'_>) {
        match event {
            WindowEvent::CloseRequested => self.dispatcher.quit(),
            WindowEvent::Focused(focused) => {
                if let Some(open) = self.window.as_mut() {
                    open.focused = focused;
                }
                self.dispatcher.focus(focused);
            }
            WindowEvent::Occluded(occluded) => {
                if let Some(open) = self.window.as_mut() {
                    open.visible = !occluded;
                }
                self.dispatcher.visible(!occluded);
            }
            WindowEvent::Resized(size) => {
                let scale = self.scale_factor();
                let size = size.to_logical::<u32>(scale);
                self.dispatcher.resize(size.width, size.height);
            }
            WindowEvent::ScaleFactorChanged {
                scale_factor,
                new_inner_size,
            } => {
                let size = new_inner_size.to_logical::<u32>(scale_factor);
                self.dispatcher.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { input, .. } => self.handle_keyboard(input),
            WindowEvent::ReceivedCharacter(character) => {
                if !character.is_control() {
                    self.dispatcher.text(character);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    WinitMouseButton::Left => MouseButton::Left,
                    WinitMouseButton::Right => MouseButton::Right,
                    _ => return,
                };
                self.dispatcher
                    .mouse_button(button, state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.dispatcher.input().mouse_mode() == MouseMode::Normal {
                    let position = position.to_logical::<f64>(self.scale_factor());
                    self.dispatcher.mouse_moved(position.x, position.y);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
                    MouseScrollDelta::PixelDelta(position) => {
                        (position.x / PIXELS_PER_LINE, position.y / PIXELS_PER_LINE)
                    }
                };
                self.dispatcher.mouse_wheel(dx, dy);
            }
            _ => {}
        }
    }

    fn handle_keyboard(&mut self, input: KeyboardInput) {
        let Some(code) = input.virtual_keycode else {
            return;
        };
        let Some(key) = KEYS.to_key(code) else {
            trace!(target: "platform::desktop", "dropping unmapped key {code:?}");
            return;
        };
        let action = match input.state {
            ElementState::Pressed => ButtonAction::Pressed,
            ElementState::Released => ButtonAction::Released,
        };
        // winit repeats presses without flagging them; a press of a held key is a repeat.
        let repeat =
            action == ButtonAction::Pressed && self.dispatcher.input().is_key_down(key);
        self.dispatcher.key(action, key, input.scancode, repeat);
    }

    fn scale_factor(&self) -> f64 {
        self.window
            .as_ref()
            .map_or(1.0, |open| open.window.scale_factor())
    }

    fn apply_mouse_mode(&self, mode: MouseMode) {
        let Some(open) = self.window.as_ref() else {
            return;
        };
        match mode {
            MouseMode::Grabbed => {
                let grabbed = open
                    .window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| open.window.set_cursor_grab(CursorGrabMode::Confined));
                if let Err(err) = grabbed {
                    warn!("failed to grab cursor: {err}");
                }
                open.window.set_cursor_visible(false);
            }
            MouseMode::Normal => {
                if let Err(err) = open.window.set_cursor_grab(CursorGrabMode::None) {
                    warn!("failed to release cursor: {err}");
                }
                open.window.set_cursor_visible(true);
            }
        }
    }
}

fn create_event_loop() -> PlatformResult<EventLoop<()>> {
    // winit panics instead of returning an error when no display is reachable.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    event_loop.map_err(|panic| PlatformError::Windowing(panic_message(panic)))
}

fn build_window(event_loop: &EventLoop<()>, config: &WindowConfig) -> PlatformResult<Window> {
    let mut builder = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_resizable(config.resizable);

    if config.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        let (width, height) = window_dimensions(event_loop, config);
        builder = builder.with_inner_size(LogicalSize::new(width, height));
    }

    if let Some(icon) = &config.icon {
        match Icon::from_rgba(icon.rgba.clone(), icon.width, icon.height) {
            Ok(icon) => builder = builder.with_window_icon(Some(icon)),
            Err(err) => warn!("ignoring window icon: {err}"),
        }
    }

    builder
        .build(event_loop)
        .map_err(|err| PlatformError::WindowCreation(err.to_string()))
}

/// Resolves zero dimensions to the primary display's current mode.
fn window_dimensions(event_loop: &EventLoop<()>, config: &WindowConfig) -> (u32, u32) {
    if config.width != 0 && config.height != 0 {
        return (config.width, config.height);
    }
    let display = event_loop.primary_monitor().map(|monitor| {
        let size = monitor.size().to_logical::<u32>(monitor.scale_factor());
        (size.width, size.height)
    });
    let fallback = WindowConfig::default();
    let (display_width, display_height) =
        display.unwrap_or((fallback.width, fallback.height));
    debug!("display mode is {display_width}x{display_height}");
    (
        if config.width == 0 { display_width } else { config.width },
        if config.height == 0 { display_height } else { config.height },
    )
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn clipboard_error(err: arboard::Error) -> PlatformError {
    PlatformError::Clipboard(err.to_string())
}

/// An empty clipboard, or one holding no text, reads as `None`.
fn clipboard_contents(result: Result<String, arboard::Error>) -> PlatformResult<Option<String>> {
    match result {
        Ok(text) => Ok(Some(text)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(err) => Err(clipboard_error(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("no display")), "no display");
        assert_eq!(panic_message(Box::new(String::from("x11"))), "x11");
        assert_eq!(panic_message(Box::new(3_u8)), "unknown panic");
    }

    #[test]
    fn queries_before_a_window_exists() {
        let backend = DesktopBackend::new();
        assert!(!backend.window_is_open());
        assert_eq!(backend.window_size(), (0, 0));
        assert_eq!(backend.window_framebuffer_size(), (0, 0));
        assert_eq!(backend.window_pixel_density(), 0.0);
        assert!(!backend.is_key_down(Key::Space));
    }

    #[test]
    fn raw_motion_needs_a_focused_window() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut backend = DesktopBackend::new();
        let moves = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&moves);
        backend.on_mouse_move(Some(Box::new(move |x, y| sink.borrow_mut().push((x, y)))));
        backend.state.dispatcher.set_mouse_mode(MouseMode::Grabbed);

        backend.state.handle_event(Event::DeviceEvent {
            // SAFETY: the id is only compared, never passed back to the OS.
            device_id: unsafe { winit::event::DeviceId::dummy() },
            event: DeviceEvent::MouseMotion { delta: (4.0, 2.0) },
        });

        assert!(!backend.state.takes_raw_motion());
        assert!(moves.borrow().is_empty());
        assert_eq!(backend.mouse_position(), DVec2::ZERO);
    }

    #[test]
    fn clipboard_failures_become_platform_errors() {
        assert_eq!(
            clipboard_contents(Ok("copied".into())).unwrap(),
            Some("copied".to_string())
        );
        assert_eq!(
            clipboard_contents(Err(arboard::Error::ContentNotAvailable)).unwrap(),
            None
        );
        let err = clipboard_contents(Err(arboard::Error::ClipboardOccupied)).unwrap_err();
        assert!(matches!(err, PlatformError::Clipboard(_)));
        assert!(err.to_string().starts_with("clipboard error: "));
    }

    #[test]
    fn polling_without_a_window_is_a_no_op() {
        let mut backend = DesktopBackend::new();
        backend.poll_events();
        assert!(backend.event_loop.is_none());
    }
}
