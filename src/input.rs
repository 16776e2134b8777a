use std::collections::HashSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

pub mod android;
pub mod desktop;
pub mod web;

/// Platform-neutral identifier for a keyboard key.
///
/// Native key codes that have no entry here are dropped by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Backtick,
    Minus,
    Equals,
    LeftBracket,
    RightBracket,
    Backslash,
    Semicolon,
    Apostrophe,
    Comma,
    Period,
    Slash,
    LeftControl,
    LeftShift,
    LeftAlt,
    LeftOs,
    RightControl,
    RightShift,
    RightAlt,
    RightOs,
    CapsLock,
    ScrollLock,
    NumLock,
}

impl Key {
    pub const COUNT: usize = Key::ALL.len();

    pub const ALL: [Key; 85] = {
        use Key::*;
        [
            A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
            Digit0, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
            Space, Enter, Tab, Escape, Backspace, Up, Down, Left, Right, Home, End, PageUp,
            PageDown, Insert, Delete, F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
            Backtick, Minus, Equals, LeftBracket, RightBracket, Backslash, Semicolon,
            Apostrophe, Comma, Period, Slash, LeftControl, LeftShift, LeftAlt, LeftOs,
            RightControl, RightShift, RightAlt, RightOs, CapsLock, ScrollLock, NumLock,
        ]
    };

    /// Name used by the scripting layer for this key.
    pub fn name(self) -> &'static str {
        use Key::*;
        match self {
            A => "a",
            B => "b",
            C => "c",
            D => "d",
            E => "e",
            F => "f",
            G => "g",
            H => "h",
            I => "i",
            J => "j",
            K => "k",
            L => "l",
            M => "m",
            N => "n",
            O => "o",
            P => "p",
            Q => "q",
            R => "r",
            S => "s",
            T => "t",
            U => "u",
            V => "v",
            W => "w",
            X => "x",
            Y => "y",
            Z => "z",
            Digit0 => "0",
            Digit1 => "1",
            Digit2 => "2",
            Digit3 => "3",
            Digit4 => "4",
            Digit5 => "5",
            Digit6 => "6",
            Digit7 => "7",
            Digit8 => "8",
            Digit9 => "9",
            Space => "space",
            Enter => "return",
            Tab => "tab",
            Escape => "escape",
            Backspace => "backspace",
            Up => "up",
            Down => "down",
            Left => "left",
            Right => "right",
            Home => "home",
            End => "end",
            PageUp => "pageup",
            PageDown => "pagedown",
            Insert => "insert",
            Delete => "delete",
            F1 => "f1",
            F2 => "f2",
            F3 => "f3",
            F4 => "f4",
            F5 => "f5",
            F6 => "f6",
            F7 => "f7",
            F8 => "f8",
            F9 => "f9",
            F10 => "f10",
            F11 => "f11",
            F12 => "f12",
            Backtick => "`",
            Minus => "-",
            Equals => "=",
            LeftBracket => "[",
            RightBracket => "]",
            Backslash => "\\",
            Semicolon => ";",
            Apostrophe => "'",
            Comma => ",",
            Period => ".",
            Slash => "/",
            LeftControl => "lctrl",
            LeftShift => "lshift",
            LeftAlt => "lalt",
            LeftOs => "lgui",
            RightControl => "rctrl",
            RightShift => "rshift",
            RightAlt => "ralt",
            RightOs => "rgui",
            CapsLock => "capslock",
            ScrollLock => "scrolllock",
            NumLock => "numlock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

/// Mouse buttons recognised by the platform layer. Other buttons are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    Normal,
    /// Cursor hidden and locked; mouse-move events carry deltas.
    Grabbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    AudioCapture,
}

impl Permission {
    pub fn name(self) -> &'static str {
        match self {
            Permission::AudioCapture => "audiocapture",
        }
    }
}

/// Bidirectional map between a backend's native key codes and [`Key`].
#[derive(Debug, Clone, Copy)]
pub struct KeyTable<N: 'static> {
    entries: &'static [(N, Key)],
}

impl<N: Copy + PartialEq> KeyTable<N> {
    pub const fn new(entries: &'static [(N, Key)]) -> Self {
        Self { entries }
    }

    pub fn to_key(&self, native: N) -> Option<Key> {
        self.entries
            .iter()
            .find(|(code, _)| *code == native)
            .map(|(_, key)| *key)
    }

    pub fn to_native(&self, key: Key) -> Option<N> {
        self.entries
            .iter()
            .find(|(_, mapped)| *mapped == key)
            .map(|(code, _)| *code)
    }

    pub fn entries(&self) -> &'static [(N, Key)] {
        self.entries
    }
}

impl KeyTable<&'static str> {
    /// Looks up a borrowed code, such as one read out of a DOM event.
    pub fn code_to_key(&self, code: &str) -> Option<Key> {
        self.entries
            .iter()
            .find(|(native, _)| *native == code)
            .map(|(_, key)| *key)
    }
}

/// Input state reconstructed from the event stream.
///
/// Backends without a synchronous "is this key down" query answer from here.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<Key>,
    mouse_buttons: HashSet<MouseButton>,
    mouse_position: DVec2,
    mouse_mode: MouseMode,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: Key, action: ButtonAction) {
        match action {
            ButtonAction::Pressed => self.keys.insert(key),
            ButtonAction::Released => self.keys.remove(&key),
        };
    }

    pub fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.mouse_buttons.insert(button);
        } else {
            self.mouse_buttons.remove(&button);
        }
    }

    pub fn set_mouse_position(&mut self, position: DVec2) {
        self.mouse_position = position;
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.mouse_mode = mode;
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn mouse_position(&self) -> DVec2 {
        self.mouse_position
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    /// Forgets every held key and button, e.g. after focus loss.
    pub fn clear_buttons(&mut self) {
        self.keys.clear();
        self.mouse_buttons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_a_unique_name() {
        let names: HashSet<&str> = Key::ALL.iter().map(|key| key.name()).collect();
        assert_eq!(names.len(), Key::COUNT);
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(Key::from_name("return"), Some(Key::Enter));
        assert_eq!(Key::from_name("lgui"), Some(Key::LeftOs));
        assert_eq!(Key::from_name("\\"), Some(Key::Backslash));
        assert_eq!(Key::from_name("f13"), None);
        for key in Key::ALL {
            assert_eq!(Key::from_name(key.name()), Some(key));
        }
    }

    #[test]
    fn discriminants_match_table_order() {
        for (index, key) in Key::ALL.iter().enumerate() {
            assert_eq!(*key as usize, index);
        }
    }

    #[test]
    fn input_state_tracks_keys_and_buttons() {
        let mut state = InputState::new();
        state.set_key(Key::Space, ButtonAction::Pressed);
        state.set_mouse_button(MouseButton::Right, true);
        assert!(state.is_key_down(Key::Space));
        assert!(state.is_mouse_button_down(MouseButton::Right));
        assert!(!state.is_mouse_button_down(MouseButton::Left));

        state.set_key(Key::Space, ButtonAction::Released);
        assert!(!state.is_key_down(Key::Space));

        state.set_key(Key::A, ButtonAction::Pressed);
        state.clear_buttons();
        assert!(!state.is_key_down(Key::A));
        assert!(!state.is_mouse_button_down(MouseButton::Right));
    }

    #[test]
    fn key_table_maps_both_ways() {
        const TABLE: KeyTable<u16> = KeyTable::new(&[(4, Key::A), (5, Key::B)]);
        assert_eq!(TABLE.to_key(5), Some(Key::B));
        assert_eq!(TABLE.to_key(6), None);
        assert_eq!(TABLE.to_native(Key::A), Some(4));
        assert_eq!(TABLE.to_native(Key::Z), None);
    }
}
