//! `AKEYCODE_*` values from the NDK's `android/keycodes.h`.

use super::{Key, KeyTable};

pub const KEYS: KeyTable<u32> = KeyTable::new(&[
    (29, Key::A),
    (30, Key::B),
    (31, Key::C),
    (32, Key::D),
    (33, Key::E),
    (34, Key::F),
    (35, Key::G),
    (36, Key::H),
    (37, Key::I),
    (38, Key::J),
    (39, Key::K),
    (40, Key::L),
    (41, Key::M),
    (42, Key::N),
    (43, Key::O),
    (44, Key::P),
    (45, Key::Q),
    (46, Key::R),
    (47, Key::S),
    (48, Key::T),
    (49, Key::U),
    (50, Key::V),
    (51, Key::W),
    (52, Key::X),
    (53, Key::Y),
    (54, Key::Z),
    (7, Key::Digit0),
    (8, Key::Digit1),
    (9, Key::Digit2),
    (10, Key::Digit3),
    (11, Key::Digit4),
    (12, Key::Digit5),
    (13, Key::Digit6),
    (14, Key::Digit7),
    (15, Key::Digit8),
    (16, Key::Digit9),
    (62, Key::Space),
    (66, Key::Enter),
    (61, Key::Tab),
    (111, Key::Escape),
    // AKEYCODE_DEL is the backspace key; forward delete is AKEYCODE_FORWARD_DEL.
    (67, Key::Backspace),
    (19, Key::Up),
    (20, Key::Down),
    (21, Key::Left),
    (22, Key::Right),
    (122, Key::Home),
    (123, Key::End),
    (92, Key::PageUp),
    (93, Key::PageDown),
    (124, Key::Insert),
    (112, Key::Delete),
    (131, Key::F1),
    (132, Key::F2),
    (133, Key::F3),
    (134, Key::F4),
    (135, Key::F5),
    (136, Key::F6),
    (137, Key::F7),
    (138, Key::F8),
    (139, Key::F9),
    (140, Key::F10),
    (141, Key::F11),
    (142, Key::F12),
    (68, Key::Backtick),
    (69, Key::Minus),
    (70, Key::Equals),
    (71, Key::LeftBracket),
    (72, Key::RightBracket),
    (73, Key::Backslash),
    (74, Key::Semicolon),
    (75, Key::Apostrophe),
    (55, Key::Comma),
    (56, Key::Period),
    (76, Key::Slash),
    (113, Key::LeftControl),
    (59, Key::LeftShift),
    (57, Key::LeftAlt),
    (117, Key::LeftOs),
    (114, Key::RightControl),
    (60, Key::RightShift),
    (58, Key::RightAlt),
    (118, Key::RightOs),
    (115, Key::CapsLock),
    (116, Key::ScrollLock),
    (143, Key::NumLock),
]);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn native_codes_are_unique() {
        let codes: HashSet<u32> = KEYS.entries().iter().map(|(code, _)| *code).collect();
        assert_eq!(codes.len(), KEYS.entries().len());
        assert_eq!(KEYS.entries().len(), Key::COUNT);
    }

    #[test]
    fn documented_codes() {
        assert_eq!(KEYS.to_key(29), Some(Key::A));
        assert_eq!(KEYS.to_key(67), Some(Key::Backspace));
        assert_eq!(KEYS.to_key(112), Some(Key::Delete));
        assert_eq!(KEYS.to_native(Key::Up), Some(19));
    }

    #[test]
    fn unmapped_codes_are_dropped() {
        // AKEYCODE_VOLUME_UP, AKEYCODE_BUTTON_A
        assert_eq!(KEYS.to_key(24), None);
        assert_eq!(KEYS.to_key(96), None);
    }
}
