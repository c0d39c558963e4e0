//! Keystroke Translation
//!
//! Maps characters to HID usage codes plus a modifier mode for a given
//! keyboard layout. Layouts are a small registry of named strategies;
//! `translator_for` resolves a layout tag to its translator.

/// No modifier.
pub const MODE_NONE: u8 = 0x00;
/// Left Ctrl held.
pub const MODE_CTRL: u8 = 0x01;
/// Left Shift held.
pub const MODE_SHIFT: u8 = 0x02;
/// Left Alt held.
pub const MODE_ALT: u8 = 0x04;

/// One translated keystroke: HID usage code plus modifier byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: u8,
    pub mode: u8,
}

impl KeyPress {
    fn plain(code: u8) -> Self {
        Self {
            code,
            mode: MODE_NONE,
        }
    }

    fn shifted(code: u8) -> Self {
        Self {
            code,
            mode: MODE_SHIFT,
        }
    }
}

/// Layout-specific character translation.
pub trait KeyTranslator: Sync {
    /// Layout tag, e.g. `us`.
    fn layout(&self) -> &'static str;

    /// Translate one character. `None` means the layout cannot type it.
    fn lookup(&self, c: char) -> Option<KeyPress>;
}

/// Resolve a layout tag to its translator.
pub fn translator_for(layout: &str) -> Option<&'static dyn KeyTranslator> {
    match layout {
        "us" => Some(&UsLayout),
        _ => None,
    }
}

/// US QWERTY layout.
struct UsLayout;

impl KeyTranslator for UsLayout {
    fn layout(&self) -> &'static str {
        "us"
    }

    fn lookup(&self, c: char) -> Option<KeyPress> {
        // Letters and digits follow the HID usage table directly.
        let key = match c {
            'a'..='z' => KeyPress::plain(0x04 + (c as u8 - b'a')),
            'A'..='Z' => KeyPress::shifted(0x04 + (c.to_ascii_lowercase() as u8 - b'a')),
            '1'..='9' => KeyPress::plain(0x1e + (c as u8 - b'1')),
            '0' => KeyPress::plain(0x27),

            '!' => KeyPress::shifted(0x1e),
            '@' => KeyPress::shifted(0x1f),
            '#' => KeyPress::shifted(0x20),
            '$' => KeyPress::shifted(0x21),
            '%' => KeyPress::shifted(0x22),
            '^' => KeyPress::shifted(0x23),
            '&' => KeyPress::shifted(0x24),
            '*' => KeyPress::shifted(0x25),
            '(' => KeyPress::shifted(0x26),
            ')' => KeyPress::shifted(0x27),

            '\n' => KeyPress::plain(0x28),
            '\t' => KeyPress::plain(0x2b),
            ' ' => KeyPress::plain(0x2c),

            '-' => KeyPress::plain(0x2d),
            '_' => KeyPress::shifted(0x2d),
            '=' => KeyPress::plain(0x2e),
            '+' => KeyPress::shifted(0x2e),
            '[' => KeyPress::plain(0x2f),
            '{' => KeyPress::shifted(0x2f),
            ']' => KeyPress::plain(0x30),
            '}' => KeyPress::shifted(0x30),
            '\\' => KeyPress::plain(0x31),
            '|' => KeyPress::shifted(0x31),
            ';' => KeyPress::plain(0x33),
            ':' => KeyPress::shifted(0x33),
            '\'' => KeyPress::plain(0x34),
            '"' => KeyPress::shifted(0x34),
            '`' => KeyPress::plain(0x35),
            '~' => KeyPress::shifted(0x35),
            ',' => KeyPress::plain(0x36),
            '<' => KeyPress::shifted(0x36),
            '.' => KeyPress::plain(0x37),
            '>' => KeyPress::shifted(0x37),
            '/' => KeyPress::plain(0x38),
            '?' => KeyPress::shifted(0x38),

            _ => return None,
        };
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_layout() {
        assert!(translator_for("dvorak-intl").is_none());
    }

    #[test]
    fn test_us_letters() {
        let us = translator_for("us").unwrap();
        assert_eq!(us.layout(), "us");
        assert_eq!(us.lookup('a'), Some(KeyPress::plain(0x04)));
        assert_eq!(us.lookup('z'), Some(KeyPress::plain(0x1d)));
        assert_eq!(us.lookup('A'), Some(KeyPress::shifted(0x04)));
        assert_eq!(us.lookup('o'), Some(KeyPress::plain(0x12)));
        assert_eq!(us.lookup('k'), Some(KeyPress::plain(0x0e)));
    }

    #[test]
    fn test_us_digits_and_symbols() {
        let us = translator_for("us").unwrap();
        assert_eq!(us.lookup('1'), Some(KeyPress::plain(0x1e)));
        assert_eq!(us.lookup('0'), Some(KeyPress::plain(0x27)));
        assert_eq!(us.lookup('!'), Some(KeyPress::shifted(0x1e)));
        assert_eq!(us.lookup(' '), Some(KeyPress::plain(0x2c)));
        assert_eq!(us.lookup('?'), Some(KeyPress::shifted(0x38)));
    }

    #[test]
    fn test_us_untypeable() {
        let us = translator_for("us").unwrap();
        assert!(us.lookup('é').is_none());
        assert!(us.lookup('§').is_none());
    }
}
