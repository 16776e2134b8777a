//! `KeyboardEvent.code` values and the scancodes browsers derive from them.

use super::{Key, KeyTable};

pub const KEYS: KeyTable<&'static str> = KeyTable::new(&[
    ("KeyA", Key::A),
    ("KeyB", Key::B),
    ("KeyC", Key::C),
    ("KeyD", Key::D),
    ("KeyE", Key::E),
    ("KeyF", Key::F),
    ("KeyG", Key::G),
    ("KeyH", Key::H),
    ("KeyI", Key::I),
    ("KeyJ", Key::J),
    ("KeyK", Key::K),
    ("KeyL", Key::L),
    ("KeyM", Key::M),
    ("KeyN", Key::N),
    ("KeyO", Key::O),
    ("KeyP", Key::P),
    ("KeyQ", Key::Q),
    ("KeyR", Key::R),
    ("KeyS", Key::S),
    ("KeyT", Key::T),
    ("KeyU", Key::U),
    ("KeyV", Key::V),
    ("KeyW", Key::W),
    ("KeyX", Key::X),
    ("KeyY", Key::Y),
    ("KeyZ", Key::Z),
    ("Digit0", Key::Digit0),
    ("Digit1", Key::Digit1),
    ("Digit2", Key::Digit2),
    ("Digit3", Key::Digit3),
    ("Digit4", Key::Digit4),
    ("Digit5", Key::Digit5),
    ("Digit6", Key::Digit6),
    ("Digit7", Key::Digit7),
    ("Digit8", Key::Digit8),
    ("Digit9", Key::Digit9),
    ("Space", Key::Space),
    ("Enter", Key::Enter),
    ("Tab", Key::Tab),
    ("Escape", Key::Escape),
    ("Backspace", Key::Backspace),
    ("ArrowUp", Key::Up),
    ("ArrowDown", Key::Down),
    ("ArrowLeft", Key::Left),
    ("ArrowRight", Key::Right),
    ("Home", Key::Home),
    ("End", Key::End),
    ("PageUp", Key::PageUp),
    ("PageDown", Key::PageDown),
    ("Insert", Key::Insert),
    ("Delete", Key::Delete),
    ("F1", Key::F1),
    ("F2", Key::F2),
    ("F3", Key::F3),
    ("F4", Key::F4),
    ("F5", Key::F5),
    ("F6", Key::F6),
    ("F7", Key::F7),
    ("F8", Key::F8),
    ("F9", Key::F9),
    ("F10", Key::F10),
    ("F11", Key::F11),
    ("F12", Key::F12),
    ("Backquote", Key::Backtick),
    ("Minus", Key::Minus),
    ("Equal", Key::Equals),
    ("BracketLeft", Key::LeftBracket),
    ("BracketRight", Key::RightBracket),
    ("Backslash", Key::Backslash),
    ("Semicolon", Key::Semicolon),
    ("Quote", Key::Apostrophe),
    ("Comma", Key::Comma),
    ("Period", Key::Period),
    ("Slash", Key::Slash),
    ("ControlLeft", Key::LeftControl),
    ("ShiftLeft", Key::LeftShift),
    ("AltLeft", Key::LeftAlt),
    ("MetaLeft", Key::LeftOs),
    ("ControlRight", Key::RightControl),
    ("ShiftRight", Key::RightShift),
    ("AltRight", Key::RightAlt),
    ("MetaRight", Key::RightOs),
    ("CapsLock", Key::CapsLock),
    ("ScrollLock", Key::ScrollLock),
    ("NumLock", Key::NumLock),
]);

/// PC/AT set 1 scancodes, `0xE0xx` for extended keys.
const SCANCODES: &[(&str, u32)] = &[
    ("Escape", 0x0001),
    ("Digit1", 0x0002),
    ("Digit2", 0x0003),
    ("Digit3", 0x0004),
    ("Digit4", 0x0005),
    ("Digit5", 0x0006),
    ("Digit6", 0x0007),
    ("Digit7", 0x0008),
    ("Digit8", 0x0009),
    ("Digit9", 0x000A),
    ("Digit0", 0x000B),
    ("Minus", 0x000C),
    ("Equal", 0x000D),
    ("Backspace", 0x000E),
    ("Tab", 0x000F),
    ("KeyQ", 0x0010),
    ("KeyW", 0x0011),
    ("KeyE", 0x0012),
    ("KeyR", 0x0013),
    ("KeyT", 0x0014),
    ("KeyY", 0x0015),
    ("KeyU", 0x0016),
    ("KeyI", 0x0017),
    ("KeyO", 0x0018),
    ("KeyP", 0x0019),
    ("BracketLeft", 0x001A),
    ("BracketRight", 0x001B),
    ("Enter", 0x001C),
    ("ControlLeft", 0x001D),
    ("KeyA", 0x001E),
    ("KeyS", 0x001F),
    ("KeyD", 0x0020),
    ("KeyF", 0x0021),
    ("KeyG", 0x0022),
    ("KeyH", 0x0023),
    ("KeyJ", 0x0024),
    ("KeyK", 0x0025),
    ("KeyL", 0x0026),
    ("Semicolon", 0x0027),
    ("Quote", 0x0028),
    ("Backquote", 0x0029),
    ("ShiftLeft", 0x002A),
    ("Backslash", 0x002B),
    ("KeyZ", 0x002C),
    ("KeyX", 0x002D),
    ("KeyC", 0x002E),
    ("KeyV", 0x002F),
    ("KeyB", 0x0030),
    ("KeyN", 0x0031),
    ("KeyM", 0x0032),
    ("Comma", 0x0033),
    ("Period", 0x0034),
    ("Slash", 0x0035),
    ("ShiftRight", 0x0036),
    ("AltLeft", 0x0038),
    ("Space", 0x0039),
    ("CapsLock", 0x003A),
    ("F1", 0x003B),
    ("F2", 0x003C),
    ("F3", 0x003D),
    ("F4", 0x003E),
    ("F5", 0x003F),
    ("F6", 0x0040),
    ("F7", 0x0041),
    ("F8", 0x0042),
    ("F9", 0x0043),
    ("F10", 0x0044),
    ("NumLock", 0x0045),
    ("ScrollLock", 0x0046),
    ("F11", 0x0057),
    ("F12", 0x0058),
    ("ControlRight", 0xE01D),
    ("AltRight", 0xE038),
    ("Home", 0xE047),
    ("ArrowUp", 0xE048),
    ("PageUp", 0xE049),
    ("ArrowLeft", 0xE04B),
    ("ArrowRight", 0xE04D),
    ("End", 0xE04F),
    ("ArrowDown", 0xE050),
    ("PageDown", 0xE051),
    ("Insert", 0xE052),
    ("Delete", 0xE053),
    ("MetaLeft", 0xE05B),
    ("MetaRight", 0xE05C),
];

/// Keys whose browser default scrolls the page under the canvas.
pub fn scrolls_page(key: Key) -> bool {
    matches!(
        key,
        Key::Space
            | Key::Up
            | Key::Down
            | Key::Left
            | Key::Right
            | Key::PageUp
            | Key::PageDown
            | Key::Home
            | Key::End
    )
}

/// Scancode for a DOM `code`, or 0 when the code has none.
pub fn scancode(code: &str) -> u32 {
    SCANCODES
        .iter()
        .find(|(name, _)| *name == code)
        .map_or(0, |(_, scancode)| *scancode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_mapped_key_has_a_scancode() {
        for (code, key) in KEYS.entries() {
            assert_ne!(scancode(code), 0, "{key:?} ({code})");
        }
    }

    #[test]
    fn scancodes_are_unique() {
        let codes: HashSet<u32> = SCANCODES.iter().map(|(_, code)| *code).collect();
        assert_eq!(codes.len(), SCANCODES.len());
    }

    #[test]
    fn mapping_is_consistent() {
        assert_eq!(KEYS.entries().len(), Key::COUNT);
        for (code, key) in KEYS.entries() {
            assert_eq!(KEYS.to_native(*key), Some(*code));
        }
        assert_eq!(KEYS.to_key("NumpadEnter"), None);
        assert_eq!(scancode("NumpadEnter"), 0);
    }

    #[test]
    fn only_scrolling_keys_suppress_the_browser_default() {
        assert!(scrolls_page(Key::Space));
        assert!(scrolls_page(Key::PageDown));
        for key in [Key::F5, Key::F12, Key::R, Key::LeftControl, Key::Tab] {
            assert!(!scrolls_page(key), "{key:?}");
        }
    }

    #[test]
    fn borrowed_codes_are_looked_up() {
        let code = String::from("Key") + "Q";
        assert_eq!(KEYS.code_to_key(&code), Some(Key::Q));
        assert_eq!(KEYS.code_to_key(&code.to_lowercase()), None);
    }

    #[test]
    fn extended_keys_use_the_e0_prefix() {
        assert_eq!(scancode("ArrowUp"), 0xE048);
        assert_eq!(scancode("KeyA"), 0x001E);
    }
}
