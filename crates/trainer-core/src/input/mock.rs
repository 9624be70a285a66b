use std::collections::HashSet;
use std::sync::Mutex;

use super::KeyState;

/// Scripted keyboard for scheduler tests
#[derive(Default)]
pub struct MockKeyboard {
    pressed: Mutex<HashSet<u32>>,
    toggled: Mutex<HashSet<u32>>,
}

impl MockKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, code: u32) {
        self.pressed.lock().unwrap().insert(code);
    }

    pub fn release(&self, code: u32) {
        self.pressed.lock().unwrap().remove(&code);
    }

    pub fn release_all(&self) {
        self.pressed.lock().unwrap().clear();
    }

    /// Latch a toggle; consumed by the next `is_toggled` query
    pub fn tap(&self, code: u32) {
        self.toggled.lock().unwrap().insert(code);
    }
}

impl KeyState for MockKeyboard {
    fn is_pressed(&self, code: u32) -> bool {
        self.pressed.lock().unwrap().contains(&code)
    }

    fn is_toggled(&self, code: u32) -> bool {
        self.toggled.lock().unwrap().remove(&code)
    }
}
