//! Windows virtual-key codes and their display names.
//!
//! Cheat tables store hotkeys as virtual-key codes (`<Key>17</Key>` is Ctrl).

pub const VK_SHIFT: u32 = 0x10;
pub const VK_CONTROL: u32 = 0x11;
pub const VK_MENU: u32 = 0x12;
pub const VK_ESCAPE: u32 = 0x1B;
pub const VK_F1: u32 = 0x70;
pub const VK_F12: u32 = 0x7B;

/// Named keys outside the contiguous letter, digit and function ranges
const NAMED_KEYS: &[(u32, &str)] = &[
    (0x08, "Backspace"),
    (0x09, "Tab"),
    (0x0D, "Enter"),
    (VK_SHIFT, "Shift"),
    (VK_CONTROL, "Ctrl"),
    (VK_MENU, "Alt"),
    (0x13, "Pause"),
    (0x14, "Caps Lock"),
    (VK_ESCAPE, "Esc"),
    (0x20, "Space"),
    (0x21, "Page Up"),
    (0x22, "Page Down"),
    (0x23, "End"),
    (0x24, "Home"),
    (0x25, "Left"),
    (0x26, "Up"),
    (0x27, "Right"),
    (0x28, "Down"),
    (0x2D, "Insert"),
    (0x2E, "Delete"),
    (0x6A, "Num *"),
    (0x6B, "Num +"),
    (0x6D, "Num -"),
    (0x6E, "Num ."),
    (0x6F, "Num /"),
    (0x90, "Num Lock"),
    (0x91, "Scroll Lock"),
    (0xA0, "Left Shift"),
    (0xA1, "Right Shift"),
    (0xA2, "Left Ctrl"),
    (0xA3, "Right Ctrl"),
    (0xA4, "Left Alt"),
    (0xA5, "Right Alt"),
];

/// Display name of a virtual-key code
pub fn key_name(code: u32) -> String {
    match code {
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(code)
            .map(String::from)
            .unwrap_or_default(),
        0x60..=0x69 => format!("Num {}", code - 0x60),
        0x70..=0x87 => format!("F{}", code - VK_F1 + 1),
        _ => NAMED_KEYS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("0x{:02X}", code)),
    }
}

/// Inverse of [`key_name`], case-insensitive; also accepts `0x`-prefixed codes
pub fn key_code(name: &str) -> Option<u32> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }

    let upper = name.to_ascii_uppercase();
    if upper.len() == 1 {
        let c = upper.chars().next()?;
        if c.is_ascii_alphanumeric() {
            return Some(c as u32);
        }
    }

    if let Some(n) = upper.strip_prefix("NUM ").and_then(|n| n.parse::<u32>().ok())
        && n <= 9
    {
        return Some(0x60 + n);
    }

    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u32>().ok())
        && (1..=24).contains(&n)
    {
        return Some(VK_F1 + n - 1);
    }

    NAMED_KEYS
        .iter()
        .find(|(_, key)| key.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

/// Human-readable label for a key combination ("Ctrl+M")
pub fn combo_label(keys: &[u32]) -> String {
    keys.iter()
        .map(|&k| key_name(k))
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_ranges() {
        assert_eq!(key_name(0x41), "A");
        assert_eq!(key_name(0x4D), "M");
        assert_eq!(key_name(0x35), "5");
        assert_eq!(key_name(0x62), "Num 2");
        assert_eq!(key_name(VK_F1), "F1");
        assert_eq!(key_name(VK_F12), "F12");
        assert_eq!(key_name(VK_CONTROL), "Ctrl");
        assert_eq!(key_name(0xFE), "0xFE");
    }

    #[test]
    fn test_key_code_round_trip() {
        for code in [0x41, 0x30, 0x62, VK_F1, VK_F12, VK_CONTROL, VK_ESCAPE, 0x26, 0xA2] {
            assert_eq!(key_code(&key_name(code)), Some(code), "code {:#x}", code);
        }
    }

    #[test]
    fn test_key_code_parsing() {
        assert_eq!(key_code("f12"), Some(VK_F12));
        assert_eq!(key_code("ctrl"), Some(VK_CONTROL));
        assert_eq!(key_code("m"), Some(0x4D));
        assert_eq!(key_code("0x7B"), Some(VK_F12));
        assert_eq!(key_code("F99"), None);
        assert_eq!(key_code("Hyper"), None);
    }

    #[test]
    fn test_combo_label() {
        assert_eq!(combo_label(&[VK_CONTROL, 0x4D]), "Ctrl+M");
        assert_eq!(combo_label(&[VK_F1]), "F1");
        assert_eq!(combo_label(&[]), "");
    }
}
