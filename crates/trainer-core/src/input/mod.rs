//! Keyboard state polling.

use std::sync::Arc;

mod keys;

#[cfg(test)]
pub mod mock;

pub use keys::*;

#[cfg(test)]
pub use mock::MockKeyboard;

/// Asynchronous key state, as reported by the platform
pub trait KeyState {
    /// Whether `code` is currently held down
    fn is_pressed(&self, code: u32) -> bool;

    /// Whether `code` was pressed since the previous query
    fn is_toggled(&self, code: u32) -> bool;

    /// Whether every key of a (non-empty) combination is held down
    fn combo_down(&self, keys: &[u32]) -> bool {
        !keys.is_empty() && keys.iter().all(|&k| self.is_pressed(k))
    }
}

/// Global keyboard state of the interactive session.
///
/// Uses `GetAsyncKeyState` so hotkeys work while the game has focus.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeyboard;

#[cfg(target_os = "windows")]
impl KeyState for SystemKeyboard {
    fn is_pressed(&self, code: u32) -> bool {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

        // SAFETY: GetAsyncKeyState has no preconditions.
        let state = unsafe { GetAsyncKeyState(code as i32) };
        (state as u16 & 0x8000) != 0
    }

    fn is_toggled(&self, code: u32) -> bool {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

        // SAFETY: GetAsyncKeyState has no preconditions.
        let state = unsafe { GetAsyncKeyState(code as i32) };
        (state & 0x0001) != 0
    }
}

#[cfg(not(target_os = "windows"))]
impl KeyState for SystemKeyboard {
    fn is_pressed(&self, _code: u32) -> bool {
        false
    }

    fn is_toggled(&self, _code: u32) -> bool {
        false
    }
}

impl<K: KeyState + ?Sized> KeyState for Arc<K> {
    fn is_pressed(&self, code: u32) -> bool {
        (**self).is_pressed(code)
    }

    fn is_toggled(&self, code: u32) -> bool {
        (**self).is_toggled(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_down_requires_all_keys() {
        let keyboard = MockKeyboard::new();
        keyboard.press(VK_CONTROL);
        assert!(!keyboard.combo_down(&[VK_CONTROL, 0x4D]));

        keyboard.press(0x4D);
        assert!(keyboard.combo_down(&[VK_CONTROL, 0x4D]));
        assert!(keyboard.combo_down(&[0x4D]));
    }

    #[test]
    fn test_empty_combo_never_fires() {
        let keyboard = MockKeyboard::new();
        assert!(!keyboard.combo_down(&[]));
    }
}
