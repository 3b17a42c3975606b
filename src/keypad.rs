pub const NUM_KEYS: usize = 16;

/// One of the sixteen hexadecimal keys on the CHIP-8 keypad.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
}

impl Key {
    pub const ALL: [Key; NUM_KEYS] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
        Key::KeyA,
        Key::KeyB,
        Key::KeyC,
        Key::KeyD,
        Key::KeyE,
        Key::KeyF,
    ];

    /// Register values above 0xF name no key.
    pub fn from_index(index: u8) -> Option<Key> {
        Key::ALL.get(usize::from(index)).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Last known up/down state of every key. Only the input side writes to it;
/// the interpreter borrows it read-only for each step.
#[derive(Default)]
pub struct Keypad {
    pressed: [bool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    pub fn press_key(&mut self, key: Key) {
        self.pressed[key as usize] = true;
    }

    pub fn release_key(&mut self, key: Key) {
        self.pressed[key as usize] = false;
    }

    pub fn release_all(&mut self) {
        self.pressed = [false; NUM_KEYS];
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed[key as usize]
    }

    /// The lowest-numbered key that is currently down.
    pub fn first_pressed(&self) -> Option<Key> {
        Key::ALL.into_iter().find(|&key| self.is_key_pressed(key))
    }
}
