use minifb::Key;

pub const KEY_COUNT: usize = 16;

/// Host keyboard layout for the hex pad: the 1234/QWER/ASDF/ZXCV block
/// maps onto the console's 123C/456D/789E/A0BF arrangement.
pub const KEYMAP: [(Key, u8); KEY_COUNT] = [
    (Key::Key1, 0x1),
    (Key::Key2, 0x2),
    (Key::Key3, 0x3),
    (Key::Key4, 0xC),
    (Key::Q, 0x4),
    (Key::W, 0x5),
    (Key::E, 0x6),
    (Key::R, 0xD),
    (Key::A, 0x7),
    (Key::S, 0x8),
    (Key::D, 0x9),
    (Key::F, 0xE),
    (Key::Z, 0xA),
    (Key::X, 0x0),
    (Key::C, 0xB),
    (Key::V, 0xF),
];

/// Pressed/released state of the 16 pad keys. Written by the host between
/// steps, read-only to the executing instructions.
pub struct Keyboard {
    keys: [bool; KEY_COUNT],
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
        }
    }

    pub fn reset(&mut self) {
        self.keys = [false; KEY_COUNT];
    }

    /// Latch one pad key; indices above 0xF are ignored.
    pub fn set_key_state(&mut self, key: u8, pressed: bool) {
        if let Some(state) = self.keys.get_mut(key as usize) {
            *state = pressed;
        }
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    /// Lowest pad index currently held, for completing a blocking key read.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&p| p).map(|i| i as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_set_and_release() {
        let mut kb = Keyboard::new();
        kb.set_key_state(0xA, true);
        assert!(kb.is_pressed(0xA));
        kb.set_key_state(0xA, false);
        assert!(!kb.is_pressed(0xA));
    }

    #[test]
    fn test_out_of_range_keys_ignored() {
        let mut kb = Keyboard::new();
        kb.set_key_state(0x20, true);
        assert!(!kb.is_pressed(0x20));
        assert_eq!(kb.first_pressed(), None);
    }

    #[test]
    fn test_first_pressed_prefers_lowest() {
        let mut kb = Keyboard::new();
        kb.set_key_state(0xC, true);
        kb.set_key_state(0x4, true);
        assert_eq!(kb.first_pressed(), Some(0x4));
    }

    #[test]
    fn test_keymap_covers_every_pad_key() {
        let mut seen = [false; KEY_COUNT];
        for (_, pad) in KEYMAP {
            seen[pad as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
