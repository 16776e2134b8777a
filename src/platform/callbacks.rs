//! Callback registry and the event normalization shared by every backend.
//!
//! Backends translate native events and hand them to a [`Dispatcher`], which
//! updates the input shadow state and then invokes the registered callback
//! for that event kind, if any. Nothing is queued: each call fires at most
//! one callback, synchronously.

use glam::DVec2;
use log::trace;

use crate::input::{ButtonAction, InputState, Key, MouseButton, MouseMode, Permission};

pub type QuitCallback = Box<dyn FnMut()>;
pub type VisibleCallback = Box<dyn FnMut(bool)>;
pub type FocusCallback = Box<dyn FnMut(bool)>;
pub type ResizeCallback = Box<dyn FnMut(u32, u32)>;
/// Receives the action, the logical key, the raw hardware scancode and the
/// auto-repeat flag.
pub type KeyCallback = Box<dyn FnMut(ButtonAction, Key, u32, bool)>;
pub type TextCallback = Box<dyn FnMut(char)>;
pub type MouseButtonCallback = Box<dyn FnMut(MouseButton, bool)>;
/// Receives an absolute position in [`MouseMode::Normal`] and a delta in
/// [`MouseMode::Grabbed`].
pub type MouseMoveCallback = Box<dyn FnMut(f64, f64)>;
pub type WheelCallback = Box<dyn FnMut(f64, f64)>;
pub type PermissionCallback = Box<dyn FnMut(Permission, bool)>;

/// One optional callback per event kind. Assigning `None` unregisters.
#[derive(Default)]
pub struct Callbacks {
    pub quit: Option<QuitCallback>,
    pub visible: Option<VisibleCallback>,
    pub focus: Option<FocusCallback>,
    pub resize: Option<ResizeCallback>,
    pub key: Option<KeyCallback>,
    pub text: Option<TextCallback>,
    pub mouse_button: Option<MouseButtonCallback>,
    pub mouse_move: Option<MouseMoveCallback>,
    pub mouse_wheel: Option<WheelCallback>,
    pub permission: Option<PermissionCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Routes normalized events into the shadow input state and the callbacks.
#[derive(Default)]
pub struct Dispatcher {
    callbacks: Callbacks,
    input: InputState,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.input.set_mouse_mode(mode);
    }

    pub fn quit(&mut self) {
        trace!(target: "platform::event", "quit");
        if let Some(callback) = self.callbacks.quit.as_mut() {
            callback();
        }
    }

    pub fn visible(&mut self, visible: bool) {
        if let Some(callback) = self.callbacks.visible.as_mut() {
            callback(visible);
        }
    }

    pub fn focus(&mut self, focused: bool) {
        if !focused {
            // Releases that happen while unfocused never reach us.
            self.input.clear_buttons();
        }
        if let Some(callback) = self.callbacks.focus.as_mut() {
            callback(focused);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        trace!(target: "platform::event", "resize {width}x{height}");
        if let Some(callback) = self.callbacks.resize.as_mut() {
            callback(width, height);
        }
    }

    pub fn key(&mut self, action: ButtonAction, key: Key, scancode: u32, repeat: bool) {
        self.input.set_key(key, action);
        if let Some(callback) = self.callbacks.key.as_mut() {
            callback(action, key, scancode, repeat);
        }
    }

    pub fn text(&mut self, character: char) {
        if let Some(callback) = self.callbacks.text.as_mut() {
            callback(character);
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        self.input.set_mouse_button(button, pressed);
        if let Some(callback) = self.callbacks.mouse_button.as_mut() {
            callback(button, pressed);
        }
    }

    /// Cursor moved to an absolute position reported by the OS.
    pub fn mouse_moved(&mut self, x: f64, y: f64) {
        let position = DVec2::new(x, y);
        let reported = match self.input.mouse_mode() {
            MouseMode::Normal => position,
            MouseMode::Grabbed => position - self.input.mouse_position(),
        };
        self.input.set_mouse_position(position);
        self.fire_mouse_move(reported);
    }

    /// Cursor moved by a relative amount reported by the OS.
    pub fn mouse_delta(&mut self, dx: f64, dy: f64) {
        let delta = DVec2::new(dx, dy);
        let position = self.input.mouse_position() + delta;
        self.input.set_mouse_position(position);
        let reported = match self.input.mouse_mode() {
            MouseMode::Normal => position,
            MouseMode::Grabbed => delta,
        };
        self.fire_mouse_move(reported);
    }

    fn fire_mouse_move(&mut self, reported: DVec2) {
        if let Some(callback) = self.callbacks.mouse_move.as_mut() {
            callback(reported.x, reported.y);
        }
    }

    pub fn mouse_wheel(&mut self, dx: f64, dy: f64) {
        if let Some(callback) = self.callbacks.mouse_wheel.as_mut() {
            callback(dx, dy);
        }
    }

    pub fn permission(&mut self, permission: Permission, granted: bool) {
        if let Some(callback) = self.callbacks.permission.as_mut() {
            callback(permission, granted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record_moves(dispatcher: &mut Dispatcher) -> Rc<RefCell<Vec<(f64, f64)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        dispatcher.callbacks_mut().mouse_move = Some(Box::new(move |x, y| {
            sink.borrow_mut().push((x, y));
        }));
        log
    }

    #[test]
    fn grabbed_deltas_accumulate_to_the_normal_position() {
        let mut normal = Dispatcher::new();
        let normal_log = record_moves(&mut normal);
        normal.mouse_moved(4.0, 2.0);
        normal.mouse_moved(10.0, 5.0);

        let mut grabbed = Dispatcher::new();
        grabbed.set_mouse_mode(MouseMode::Grabbed);
        let grabbed_log = record_moves(&mut grabbed);
        grabbed.mouse_moved(4.0, 2.0);
        grabbed.mouse_moved(10.0, 5.0);

        assert_eq!(*grabbed_log.borrow(), vec![(4.0, 2.0), (6.0, 3.0)]);
        let sum = grabbed_log
            .borrow()
            .iter()
            .fold((0.0, 0.0), |acc, d| (acc.0 + d.0, acc.1 + d.1));
        assert_eq!(Some(&sum), normal_log.borrow().last());
        assert_eq!(grabbed.input().mouse_position(), DVec2::new(10.0, 5.0));
    }

    #[test]
    fn relative_motion_reports_position_in_normal_mode() {
        let mut dispatcher = Dispatcher::new();
        let log = record_moves(&mut dispatcher);
        dispatcher.mouse_delta(4.0, 2.0);
        dispatcher.mouse_delta(6.0, 3.0);
        assert_eq!(*log.borrow(), vec![(4.0, 2.0), (10.0, 5.0)]);

        dispatcher.set_mouse_mode(MouseMode::Grabbed);
        dispatcher.mouse_delta(1.0, 1.0);
        assert_eq!(log.borrow().last(), Some(&(1.0, 1.0)));
        assert_eq!(dispatcher.input().mouse_position(), DVec2::new(11.0, 6.0));
    }

    #[test]
    fn unregistered_callbacks_are_not_invoked() {
        let mut dispatcher = Dispatcher::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        dispatcher.callbacks_mut().quit = Some(Box::new(move || *sink.borrow_mut() += 1));
        dispatcher.quit();
        dispatcher.callbacks_mut().quit = None;
        dispatcher.quit();
        dispatcher.quit();
        assert_eq!(*count.borrow(), 1);

        let sink = Rc::clone(&count);
        dispatcher.callbacks_mut().quit = Some(Box::new(move || *sink.borrow_mut() += 10));
        dispatcher.quit();
        assert_eq!(*count.borrow(), 11);
    }

    #[test]
    fn key_events_update_shadow_state_without_a_callback() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.key(ButtonAction::Pressed, Key::W, 17, false);
        assert!(dispatcher.input().is_key_down(Key::W));
        dispatcher.key(ButtonAction::Released, Key::W, 17, false);
        assert!(!dispatcher.input().is_key_down(Key::W));
    }

    #[test]
    fn focus_loss_forgets_held_input() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.key(ButtonAction::Pressed, Key::LeftShift, 42, false);
        dispatcher.mouse_button(MouseButton::Left, true);
        dispatcher.focus(false);
        assert!(!dispatcher.input().is_key_down(Key::LeftShift));
        assert!(!dispatcher.input().is_mouse_button_down(MouseButton::Left));
    }
}
