//! Virtual key codes reported by winit on desktop platforms.

use winit::event::VirtualKeyCode as Code;

use super::{Key, KeyTable};

pub const KEYS: KeyTable<Code> = KeyTable::new(&[
    (Code::A, Key::A),
    (Code::B, Key::B),
    (Code::C, Key::C),
    (Code::D, Key::D),
    (Code::E, Key::E),
    (Code::F, Key::F),
    (Code::G, Key::G),
    (Code::H, Key::H),
    (Code::I, Key::I),
    (Code::J, Key::J),
    (Code::K, Key::K),
    (Code::L, Key::L),
    (Code::M, Key::M),
    (Code::N, Key::N),
    (Code::O, Key::O),
    (Code::P, Key::P),
    (Code::Q, Key::Q),
    (Code::R, Key::R),
    (Code::S, Key::S),
    (Code::T, Key::T),
    (Code::U, Key::U),
    (Code::V, Key::V),
    (Code::W, Key::W),
    (Code::X, Key::X),
    (Code::Y, Key::Y),
    (Code::Z, Key::Z),
    (Code::Key0, Key::Digit0),
    (Code::Key1, Key::Digit1),
    (Code::Key2, Key::Digit2),
    (Code::Key3, Key::Digit3),
    (Code::Key4, Key::Digit4),
    (Code::Key5, Key::Digit5),
    (Code::Key6, Key::Digit6),
    (Code::Key7, Key::Digit7),
    (Code::Key8, Key::Digit8),
    (Code::Key9, Key::Digit9),
    (Code::Space, Key::Space),
    (Code::Return, Key::Enter),
    (Code::Tab, Key::Tab),
    (Code::Escape, Key::Escape),
    (Code::Back, Key::Backspace),
    (Code::Up, Key::Up),
    (Code::Down, Key::Down),
    (Code::Left, Key::Left),
    (Code::Right, Key::Right),
    (Code::Home, Key::Home),
    (Code::End, Key::End),
    (Code::PageUp, Key::PageUp),
    (Code::PageDown, Key::PageDown),
    (Code::Insert, Key::Insert),
    (Code::Delete, Key::Delete),
    (Code::F1, Key::F1),
    (Code::F2, Key::F2),
    (Code::F3, Key::F3),
    (Code::F4, Key::F4),
    (Code::F5, Key::F5),
    (Code::F6, Key::F6),
    (Code::F7, Key::F7),
    (Code::F8, Key::F8),
    (Code::F9, Key::F9),
    (Code::F10, Key::F10),
    (Code::F11, Key::F11),
    (Code::F12, Key::F12),
    (Code::Grave, Key::Backtick),
    (Code::Minus, Key::Minus),
    (Code::Equals, Key::Equals),
    (Code::LBracket, Key::LeftBracket),
    (Code::RBracket, Key::RightBracket),
    (Code::Backslash, Key::Backslash),
    (Code::Semicolon, Key::Semicolon),
    (Code::Apostrophe, Key::Apostrophe),
    (Code::Comma, Key::Comma),
    (Code::Period, Key::Period),
    (Code::Slash, Key::Slash),
    (Code::LControl, Key::LeftControl),
    (Code::LShift, Key::LeftShift),
    (Code::LAlt, Key::LeftAlt),
    (Code::LWin, Key::LeftOs),
    (Code::RControl, Key::RightControl),
    (Code::RShift, Key::RightShift),
    (Code::RAlt, Key::RightAlt),
    (Code::RWin, Key::RightOs),
    (Code::Capital, Key::CapsLock),
    (Code::Scroll, Key::ScrollLock),
    (Code::Numlock, Key::NumLock),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_key_exactly_once() {
        for key in Key::ALL {
            let matches = KEYS.entries().iter().filter(|(_, k)| *k == key).count();
            assert_eq!(matches, 1, "{key:?}");
        }
        assert_eq!(KEYS.entries().len(), Key::COUNT);
    }

    #[test]
    fn reverse_mapping_is_consistent() {
        for (code, key) in KEYS.entries() {
            assert_eq!(KEYS.to_native(*key), Some(*code));
            assert_eq!(KEYS.to_key(*code), Some(*key));
        }
    }

    #[test]
    fn unmapped_codes_are_dropped() {
        assert_eq!(KEYS.to_key(Code::NumpadAdd), None);
        assert_eq!(KEYS.to_key(Code::PlayPause), None);
    }
}
