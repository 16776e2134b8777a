//! Backend without OS windowing.
//!
//! The window is virtual and the OS event queue is a `VecDeque` the host
//! fills with [`HeadlessEvent`]s. Events go through the same [`Dispatcher`]
//! as the native backends, which makes this the backend tests and
//! display-less tools run against.

use std::collections::VecDeque;
use std::time::Instant;

use glam::DVec2;
use log::{debug, info, trace};

use super::{host_name, Callbacks, Dispatcher, Platform, WindowConfig};
use crate::error::PlatformResult;
use crate::input::{self, ButtonAction, Key, MouseButton, MouseMode, Permission};

/// A simulated OS event.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessEvent {
    Quit,
    Visible(bool),
    Focus(bool),
    Resize(u32, u32),
    /// Key identified by its DOM `code` ("KeyA", "ArrowUp", ...).
    Key {
        action: ButtonAction,
        code: String,
        repeat: bool,
    },
    Text(char),
    MouseButton(MouseButton, bool),
    /// Absolute cursor position.
    MouseMoved(f64, f64),
    /// Relative cursor motion.
    MouseDelta(f64, f64),
    MouseWheel(f64, f64),
    Permission(Permission, bool),
}

#[derive(Debug)]
struct VirtualWindow {
    config: WindowConfig,
    width: u32,
    height: u32,
    visible: bool,
    focused: bool,
}

/// Display size reported when a window asks for the current display mode.
const DISPLAY_SIZE: (u32, u32) = (1920, 1080);

pub struct HeadlessBackend {
    dispatcher: Dispatcher,
    queue: VecDeque<HeadlessEvent>,
    window: Option<VirtualWindow>,
    windows_created: usize,
    started: Instant,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            queue: VecDeque::new(),
            window: None,
            windows_created: 0,
            started: Instant::now(),
        }
    }

    /// Queues `event` for the next [`Platform::poll_events`].
    pub fn push_event(&mut self, event: HeadlessEvent) {
        self.queue.push_back(event);
    }

    /// Number of windows created since construction.
    pub fn windows_created(&self) -> usize {
        self.windows_created
    }

    fn dispatch(&mut self, event: HeadlessEvent) {
        trace!(target: "platform::headless", "{event:?}");
        match event {
            HeadlessEvent::Quit => self.dispatcher.quit(),
            HeadlessEvent::Visible(visible) => {
                if let Some(window) = self.window.as_mut() {
                    window.visible = visible;
                }
                self.dispatcher.visible(visible);
            }
            HeadlessEvent::Focus(focused) => {
                if let Some(window) = self.window.as_mut() {
                    window.focused = focused;
                }
                self.dispatcher.focus(focused);
            }
            HeadlessEvent::Resize(width, height) => {
                if let Some(window) = self.window.as_mut() {
                    window.width = width;
                    window.height = height;
                }
                self.dispatcher.resize(width, height);
            }
            HeadlessEvent::Key {
                action,
                code,
                repeat,
            } => {
                let Some(key) = input::web::KEYS.code_to_key(&code) else {
                    trace!(target: "platform::headless", "dropping unmapped key {code}");
                    return;
                };
                let scancode = input::web::scancode(&code);
                self.dispatcher.key(action, key, scancode, repeat);
            }
            HeadlessEvent::Text(character) => self.dispatcher.text(character),
            HeadlessEvent::MouseButton(button, pressed) => {
                self.dispatcher.mouse_button(button, pressed)
            }
            HeadlessEvent::MouseMoved(x, y) => self.dispatcher.mouse_moved(x, y),
            HeadlessEvent::MouseDelta(dx, dy) => self.dispatcher.mouse_delta(dx, dy),
            HeadlessEvent::MouseWheel(dx, dy) => self.dispatcher.mouse_wheel(dx, dy),
            HeadlessEvent::Permission(permission, granted) => {
                self.dispatcher.permission(permission, granted)
            }
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HeadlessBackend {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn init(&mut self) -> PlatformResult<()> {
        info!("headless platform initialized on {}", host_name());
        Ok(())
    }

    fn destroy(&mut self) {
        self.dispatcher.callbacks_mut().clear();
        self.queue.clear();
        self.window = None;
    }

    fn poll_events(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            self.dispatch(event);
        }
    }

    fn update_callbacks(&mut self, update: Box<dyn FnOnce(&mut Callbacks) + '_>) {
        update(self.dispatcher.callbacks_mut());
    }

    fn open_window(&mut self, config: &WindowConfig) -> PlatformResult<()> {
        if self.window.is_some() {
            return Ok(());
        }
        let width = if config.width == 0 { DISPLAY_SIZE.0 } else { config.width };
        let height = if config.height == 0 { DISPLAY_SIZE.1 } else { config.height };
        debug!("opening virtual window {width}x{height} \"{}\"", config.title);
        self.window = Some(VirtualWindow {
            config: config.clone(),
            width,
            height,
            visible: true,
            focused: true,
        });
        self.windows_created += 1;
        Ok(())
    }

    fn window_config(&self) -> Option<&WindowConfig> {
        self.window.as_ref().map(|window| &window.config)
    }

    fn window_is_open(&self) -> bool {
        self.window.is_some()
    }

    fn window_is_visible(&self) -> bool {
        self.window.as_ref().is_some_and(|window| window.visible)
    }

    fn window_is_focused(&self) -> bool {
        self.window.as_ref().is_some_and(|window| window.focused)
    }

    fn window_size(&self) -> (u32, u32) {
        self.window
            .as_ref()
            .map_or((0, 0), |window| (window.width, window.height))
    }

    fn window_pixel_density(&self) -> f32 {
        if self.window.is_some() {
            1.0
        } else {
            0.0
        }
    }

    fn mouse_position(&self) -> DVec2 {
        self.dispatcher.input().mouse_position()
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.dispatcher.set_mouse_mode(mode);
    }

    fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.dispatcher.input().is_mouse_button_down(button)
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.dispatcher.input().is_key_down(key)
    }

    fn time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key(action: ButtonAction, code: &str) -> HeadlessEvent {
        HeadlessEvent::Key {
            action,
            code: code.to_string(),
            repeat: false,
        }
    }

    #[test]
    fn open_window_is_idempotent() {
        let mut platform = HeadlessBackend::new();
        let config = WindowConfig::default();
        assert!(platform.open_window(&config).is_ok());
        assert!(platform.open_window(&config).is_ok());
        assert_eq!(platform.windows_created(), 1);
        assert!(platform.window_is_open());
    }

    #[test]
    fn queries_without_a_window_return_empty_values() {
        let platform = HeadlessBackend::new();
        assert!(!platform.window_is_open());
        assert!(!platform.window_is_visible());
        assert!(!platform.window_is_focused());
        assert_eq!(platform.window_size(), (0, 0));
        assert_eq!(platform.window_framebuffer_size(), (0, 0));
        assert!(platform.window_config().is_none());
        assert_eq!(platform.mouse_position(), DVec2::ZERO);
    }

    #[test]
    fn zero_size_uses_the_display_mode() {
        let mut platform = HeadlessBackend::new();
        let config = WindowConfig {
            width: 0,
            height: 0,
            ..WindowConfig::default()
        };
        platform.open_window(&config).unwrap();
        assert_eq!(platform.window_size(), DISPLAY_SIZE);
    }

    #[test]
    fn unmapped_keys_never_reach_the_callback() {
        let mut platform = HeadlessBackend::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        platform.on_key(Some(Box::new(move |action, key, scancode, repeat| {
            sink.borrow_mut().push((action, key, scancode, repeat));
        })));

        platform.push_event(key(ButtonAction::Pressed, "NumpadEnter"));
        platform.push_event(key(ButtonAction::Pressed, "MediaPlayPause"));
        platform.push_event(key(ButtonAction::Pressed, "KeyA"));
        platform.poll_events();

        assert_eq!(
            *seen.borrow(),
            vec![(ButtonAction::Pressed, Key::A, 0x1E, false)]
        );
        assert!(platform.is_key_down(Key::A));
    }

    #[test]
    fn events_are_delivered_in_order_on_poll() {
        let mut platform = HeadlessBackend::new();
        platform.open_window(&WindowConfig::default()).unwrap();
        let log = Rc::new(RefCell::new(Vec::<String>::new()));

        let sink = Rc::clone(&log);
        platform.on_resize(Some(Box::new(move |w, h| {
            sink.borrow_mut().push(format!("resize {w}x{h}"))
        })));
        let sink = Rc::clone(&log);
        platform.on_focus(Some(Box::new(move |focused| {
            sink.borrow_mut().push(format!("focus {focused}"))
        })));
        let sink = Rc::clone(&log);
        platform.on_quit(Some(Box::new(move || sink.borrow_mut().push("quit".into()))));

        platform.push_event(HeadlessEvent::Resize(640, 480));
        platform.push_event(HeadlessEvent::Focus(false));
        platform.push_event(HeadlessEvent::Quit);
        assert!(log.borrow().is_empty());

        platform.poll_events();
        assert_eq!(*log.borrow(), vec!["resize 640x480", "focus false", "quit"]);
        assert_eq!(platform.window_size(), (640, 480));
        assert!(!platform.window_is_focused());
    }

    fn register_all(platform: &mut HeadlessBackend, fired: &Rc<RefCell<Vec<&'static str>>>) {
        let sink = Rc::clone(fired);
        platform.on_quit(Some(Box::new(move || sink.borrow_mut().push("quit"))));
        let sink = Rc::clone(fired);
        platform.on_visible(Some(Box::new(move |_| sink.borrow_mut().push("visible"))));
        let sink = Rc::clone(fired);
        platform.on_focus(Some(Box::new(move |_| sink.borrow_mut().push("focus"))));
        let sink = Rc::clone(fired);
        platform.on_resize(Some(Box::new(move |_, _| sink.borrow_mut().push("resize"))));
        let sink = Rc::clone(fired);
        platform.on_key(Some(Box::new(move |_, _, _, _| sink.borrow_mut().push("key"))));
        let sink = Rc::clone(fired);
        platform.on_text(Some(Box::new(move |_| sink.borrow_mut().push("text"))));
        let sink = Rc::clone(fired);
        platform.on_mouse_button(Some(Box::new(move |_, _| {
            sink.borrow_mut().push("mouse_button")
        })));
        let sink = Rc::clone(fired);
        platform.on_mouse_move(Some(Box::new(move |_, _| sink.borrow_mut().push("mouse_move"))));
        let sink = Rc::clone(fired);
        platform.on_mousewheel_move(Some(Box::new(move |_, _| {
            sink.borrow_mut().push("mouse_wheel")
        })));
        let sink = Rc::clone(fired);
        platform.on_permission(Some(Box::new(move |_, _| sink.borrow_mut().push("permission"))));
    }

    fn unregister_all(platform: &mut HeadlessBackend) {
        platform.on_quit(None);
        platform.on_visible(None);
        platform.on_focus(None);
        platform.on_resize(None);
        platform.on_key(None);
        platform.on_text(None);
        platform.on_mouse_button(None);
        platform.on_mouse_move(None);
        platform.on_mousewheel_move(None);
        platform.on_permission(None);
    }

    fn push_one_of_each(platform: &mut HeadlessBackend) {
        platform.push_event(HeadlessEvent::Quit);
        platform.push_event(HeadlessEvent::Visible(true));
        platform.push_event(HeadlessEvent::Focus(true));
        platform.push_event(HeadlessEvent::Resize(800, 600));
        platform.push_event(key(ButtonAction::Pressed, "KeyW"));
        platform.push_event(HeadlessEvent::Text('w'));
        platform.push_event(HeadlessEvent::MouseButton(MouseButton::Left, true));
        platform.push_event(HeadlessEvent::MouseMoved(3.0, 4.0));
        platform.push_event(HeadlessEvent::MouseWheel(0.0, 1.0));
        platform.push_event(HeadlessEvent::Permission(Permission::AudioCapture, true));
    }

    #[test]
    fn null_registration_suppresses_every_kind() {
        let mut platform = HeadlessBackend::new();
        platform.open_window(&WindowConfig::default()).unwrap();
        let fired = Rc::new(RefCell::new(Vec::new()));
        register_all(&mut platform, &fired);

        push_one_of_each(&mut platform);
        platform.poll_events();
        assert_eq!(
            *fired.borrow(),
            vec![
                "quit",
                "visible",
                "focus",
                "resize",
                "key",
                "text",
                "mouse_button",
                "mouse_move",
                "mouse_wheel",
                "permission",
            ]
        );

        fired.borrow_mut().clear();
        unregister_all(&mut platform);
        push_one_of_each(&mut platform);
        platform.poll_events();
        assert!(fired.borrow().is_empty());
        // The shadow state still follows events nobody listens to.
        assert!(platform.is_key_down(Key::W));
        assert!(platform.is_mouse_down(MouseButton::Left));
    }

    #[test]
    fn key_codes_built_at_runtime_are_mapped() {
        let mut platform = HeadlessBackend::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        platform.on_key(Some(Box::new(move |_, key, scancode, _| {
            sink.borrow_mut().push((key, scancode));
        })));

        for digit in [1, 9] {
            platform.push_event(HeadlessEvent::Key {
                action: ButtonAction::Pressed,
                code: format!("Digit{digit}"),
                repeat: false,
            });
        }
        platform.push_event(HeadlessEvent::Key {
            action: ButtonAction::Pressed,
            code: String::from("Arrow") + "Up",
            repeat: false,
        });
        platform.poll_events();

        assert_eq!(
            *seen.borrow(),
            vec![(Key::Digit1, 0x02), (Key::Digit9, 0x0A), (Key::Up, 0xE048)]
        );
    }

    #[test]
    fn grabbed_mode_reports_deltas() {
        let mut platform = HeadlessBackend::new();
        let moves = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&moves);
        platform.on_mouse_move(Some(Box::new(move |x, y| sink.borrow_mut().push((x, y)))));
        platform.set_mouse_mode(MouseMode::Grabbed);

        platform.push_event(HeadlessEvent::MouseMoved(4.0, 2.0));
        platform.push_event(HeadlessEvent::MouseMoved(10.0, 5.0));
        platform.poll_events();

        assert_eq!(*moves.borrow(), vec![(4.0, 2.0), (6.0, 3.0)]);
        assert_eq!(platform.mouse_position(), DVec2::new(10.0, 5.0));
    }

    #[test]
    fn destroy_drops_callbacks_and_window() {
        let mut platform = HeadlessBackend::new();
        platform.open_window(&WindowConfig::default()).unwrap();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        platform.on_quit(Some(Box::new(move || *sink.borrow_mut() += 1)));

        platform.destroy();
        platform.push_event(HeadlessEvent::Quit);
        platform.poll_events();

        assert_eq!(*count.borrow(), 0);
        assert!(!platform.window_is_open());
    }
}
