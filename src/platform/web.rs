//! Browser backend driving a `<canvas>` through web-sys.
//!
//! The browser owns the event loop, so DOM listeners run the dispatcher
//! directly and [`Platform::poll_events`] has nothing to drain. The
//! listeners are kept so `destroy` can detach them again.

use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec2;
use log::{debug, info, trace};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{
    window, Document, Event, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent,
    WheelEvent,
};

use super::{elapsed_seconds, Callbacks, Dispatcher, Platform, WindowConfig};
use crate::error::{PlatformError, PlatformResult};
use crate::input::{self, ButtonAction, Key, MouseButton, MouseMode};

pub const DEFAULT_CANVAS_ID: &str = "canvas";

struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

struct WebState {
    dispatcher: Dispatcher,
    width: u32,
    height: u32,
    focused: bool,
}

pub struct WebBackend {
    canvas_id: String,
    canvas: Option<HtmlCanvasElement>,
    document: Option<Document>,
    state: Rc<RefCell<WebState>>,
    listeners: Vec<Listener>,
    config: Option<WindowConfig>,
    started_ms: f64,
}

/// Milliseconds on the page clock, or wall-clock time where `performance` is missing.
fn now_ms() -> f64 {
    window()
        .and_then(|browser| browser.performance())
        .map_or_else(js_sys::Date::now, |performance| performance.now())
}

impl WebBackend {
    pub fn new(canvas_id: &str) -> Self {
        Self {
            canvas_id: canvas_id.to_string(),
            canvas: None,
            document: None,
            state: Rc::new(RefCell::new(WebState {
                dispatcher: Dispatcher::new(),
                width: 0,
                height: 0,
                focused: true,
            })),
            listeners: Vec::new(),
            config: None,
            started_ms: now_ms(),
        }
    }

    fn listen(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        mut handler: impl FnMut(&mut WebState, &Event) + 'static,
    ) -> PlatformResult<()> {
        let state = Rc::clone(&self.state);
        let closure = Closure::wrap(Box::new(move |event: Event| {
            // A callback that re-enters the backend would find the state borrowed.
            if let Ok(mut state) = state.try_borrow_mut() {
                handler(&mut state, &event);
            }
        }) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .map_err(|err| PlatformError::Windowing(format!("failed to listen for {kind}: {err:?}")))?;
        self.listeners.push(Listener {
            target: target.clone(),
            kind,
            closure,
        });
        Ok(())
    }

    fn attach(&mut self, document: &Document, canvas: &HtmlCanvasElement) -> PlatformResult<()> {
        let browser = window().ok_or_else(|| PlatformError::Windowing("window not available".into()))?;
        let canvas_target: &EventTarget = canvas.as_ref();

        self.listen(browser.as_ref(), "beforeunload", |state, _| {
            state.dispatcher.quit()
        })?;

        let hidden = document.clone();
        self.listen(document.as_ref(), "visibilitychange", move |state, _| {
            state.dispatcher.visible(!hidden.hidden())
        })?;

        self.listen(canvas_target, "focus", |state, _| {
            state.focused = true;
            state.dispatcher.focus(true);
        })?;
        self.listen(canvas_target, "blur", |state, _| {
            state.focused = false;
            state.dispatcher.focus(false);
        })?;

        let resized = canvas.clone();
        self.listen(browser.as_ref(), "resize", move |state, _| {
            let (width, height) = (resized.width(), resized.height());
            if (width, height) != (state.width, state.height) {
                state.width = width;
                state.height = height;
                state.dispatcher.resize(width, height);
            }
        })?;

        for kind in ["mousedown", "mouseup"] {
            self.listen(canvas_target, kind, |state, event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                let button = match event.button() {
                    0 => MouseButton::Left,
                    2 => MouseButton::Right,
                    _ => return,
                };
                state
                    .dispatcher
                    .mouse_button(button, event.type_() == "mousedown");
            })?;
        }

        self.listen(canvas_target, "mousemove", |state, event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            match state.dispatcher.input().mouse_mode() {
                MouseMode::Grabbed => state
                    .dispatcher
                    .mouse_delta(event.movement_x() as f64, event.movement_y() as f64),
                MouseMode::Normal => state
                    .dispatcher
                    .mouse_moved(event.offset_x() as f64, event.offset_y() as f64),
            }
        })?;

        self.listen(canvas_target, "wheel", |state, event| {
            let Some(event) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            // DOM wheel deltas grow downwards.
            state.dispatcher.mouse_wheel(event.delta_x(), -event.delta_y());
        })?;

        for kind in ["keydown", "keyup"] {
            self.listen(canvas_target, kind, |state, event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                handle_key(state, event);
            })?;
        }

        Ok(())
    }
}

fn handle_key(state: &mut WebState, event: &KeyboardEvent) {
    let code = event.code();
    let Some(key) = input::web::KEYS.code_to_key(&code) else {
        trace!(target: "platform::web", "dropping unmapped key {code}");
        return;
    };
    if input::web::scrolls_page(key) {
        event.prevent_default();
    }
    let action = if event.type_() == "keydown" {
        ButtonAction::Pressed
    } else {
        ButtonAction::Released
    };
    let scancode = input::web::scancode(&code);
    state.dispatcher.key(action, key, scancode, event.repeat());

    if action == ButtonAction::Pressed {
        // Printable keys carry their character in `key`; named keys carry a word.
        let text = event.key();
        let mut chars = text.chars();
        if let (Some(character), None) = (chars.next(), chars.next()) {
            if !character.is_control() {
                state.dispatcher.text(character);
            }
        }
    }
}

impl Default for WebBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_ID)
    }
}

impl Platform for WebBackend {
    fn name(&self) -> &'static str {
        "Web"
    }

    fn init(&mut self) -> PlatformResult<()> {
        console_error_panic_hook::set_once();

        let document = window()
            .and_then(|browser| browser.document())
            .ok_or_else(|| PlatformError::Windowing("document not available".into()))?;
        let canvas = document
            .get_element_by_id(&self.canvas_id)
            .ok_or_else(|| {
                PlatformError::Windowing(format!("canvas #{} not found", self.canvas_id))
            })?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| PlatformError::Windowing(format!("#{} is not a canvas", self.canvas_id)))?;

        // Canvases only receive focus and key events with a tab index.
        if !canvas.has_attribute("tabindex") {
            let _ = canvas.set_attribute("tabindex", "0");
        }

        if let Err(err) = self.attach(&document, &canvas) {
            self.destroy();
            return Err(err);
        }

        {
            let mut state = self.state.borrow_mut();
            state.width = canvas.width();
            state.height = canvas.height();
        }
        info!(
            "web platform attached to #{} ({} listeners)",
            self.canvas_id,
            self.listeners.len()
        );
        self.canvas = Some(canvas);
        self.document = Some(document);
        Ok(())
    }

    fn destroy(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.closure.as_ref().unchecked_ref(),
            );
        }
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.dispatcher.callbacks_mut().clear();
        }
        self.canvas = None;
        self.document = None;
        self.config = None;
    }

    fn poll_events(&mut self) {}

    fn update_callbacks(&mut self, update: Box<dyn FnOnce(&mut Callbacks) + '_>) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            update(state.dispatcher.callbacks_mut());
        }
    }

    fn open_window(&mut self, config: &WindowConfig) -> PlatformResult<()> {
        if self.canvas.is_none() {
            return Err(PlatformError::WindowCreation(format!(
                "canvas #{} is not attached",
                self.canvas_id
            )));
        }
        if self.config.is_none() {
            debug!("using canvas #{} as the window", self.canvas_id);
            self.config = Some(config.clone());
        }
        Ok(())
    }

    fn window_config(&self) -> Option<&WindowConfig> {
        self.config.as_ref()
    }

    fn window_is_open(&self) -> bool {
        self.canvas.is_some()
    }

    fn window_is_visible(&self) -> bool {
        self.canvas.is_some() && self.document.as_ref().is_some_and(|document| !document.hidden())
    }

    fn window_is_focused(&self) -> bool {
        self.canvas.is_some() && self.state.try_borrow().is_ok_and(|state| state.focused)
    }

    fn window_size(&self) -> (u32, u32) {
        self.canvas
            .as_ref()
            .map_or((0, 0), |canvas| (canvas.width(), canvas.height()))
    }

    fn window_framebuffer_size(&self) -> (u32, u32) {
        self.window_size()
    }

    fn window_pixel_density(&self) -> f32 {
        if self.canvas.is_none() {
            return 0.0;
        }
        window().map_or(1.0, |browser| browser.device_pixel_ratio() as f32)
    }

    fn mouse_position(&self) -> DVec2 {
        self.state
            .try_borrow()
            .map_or(DVec2::ZERO, |state| state.dispatcher.input().mouse_position())
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.dispatcher.set_mouse_mode(mode);
        }
        match mode {
            MouseMode::Grabbed => {
                if let Some(canvas) = &self.canvas {
                    canvas.request_pointer_lock();
                }
            }
            MouseMode::Normal => {
                if let Some(document) = &self.document {
                    document.exit_pointer_lock();
                }
            }
        }
    }

    fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.state
            .try_borrow()
            .is_ok_and(|state| state.dispatcher.input().is_mouse_button_down(button))
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.state
            .try_borrow()
            .is_ok_and(|state| state.dispatcher.input().is_key_down(key))
    }

    fn core_count(&self) -> u32 {
        window().map_or(1, |browser| {
            (browser.navigator().hardware_concurrency() as u32).max(1)
        })
    }

    fn time(&self) -> f64 {
        elapsed_seconds(self.started_ms, now_ms())
    }

    /// The main thread of a page cannot block.
    fn sleep(&self, _seconds: f64) {}
}
