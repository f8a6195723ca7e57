//! Text specs for keys: `"k"`, `"space"`, `","`, `"esc"`, `"rcmd"`.

use crate::Key;

/// Keys whose canonical spec is a symbol rather than the variant name.
const SYMBOLS: &[(Key, &str)] = &[
    (Key::Digit0, "0"),
    (Key::Digit1, "1"),
    (Key::Digit2, "2"),
    (Key::Digit3, "3"),
    (Key::Digit4, "4"),
    (Key::Digit5, "5"),
    (Key::Digit6, "6"),
    (Key::Digit7, "7"),
    (Key::Digit8, "8"),
    (Key::Digit9, "9"),
    (Key::Minus, "-"),
    (Key::Equal, "="),
    (Key::LeftBracket, "["),
    (Key::RightBracket, "]"),
    (Key::Backslash, "\\"),
    (Key::Semicolon, ";"),
    (Key::Quote, "'"),
    (Key::Comma, ","),
    (Key::Period, "."),
    (Key::Slash, "/"),
    (Key::Grave, "`"),
];

/// Extra words accepted when parsing, matched lowercased. Never emitted.
const ALIASES: &[(&str, Key)] = &[
    ("cmd", Key::Command),
    ("lcmd", Key::Command),
    ("rcmd", Key::RightCommand),
    ("ctrl", Key::Control),
    ("lctrl", Key::Control),
    ("rctrl", Key::RightControl),
    ("opt", Key::Option),
    ("alt", Key::Option),
    ("lopt", Key::Option),
    ("lalt", Key::Option),
    ("ropt", Key::RightOption),
    ("ralt", Key::RightOption),
    ("lshift", Key::Shift),
    ("rshift", Key::RightShift),
    ("caps", Key::CapsLock),
    ("fn", Key::Function),
    ("enter", Key::Return),
    ("ret", Key::Return),
    ("del", Key::ForwardDelete),
    ("backspace", Key::Delete),
    ("esc", Key::Escape),
    (" ", Key::Space),
    ("left", Key::LeftArrow),
    ("right", Key::RightArrow),
    ("up", Key::UpArrow),
    ("down", Key::DownArrow),
    ("pgup", Key::PageUp),
    ("pgdn", Key::PageDown),
    ("menu", Key::ContextualMenu),
    ("kpenter", Key::KeypadEnter),
];

impl Key {
    /// Parse a single key spec.
    ///
    /// Tries the case-insensitive variant name, then symbols, then alias
    /// words such as `esc`, `enter`, `rcmd` or `pgdn`.
    pub fn from_spec(s: &str) -> Option<Self> {
        if let Some(k) = Self::from_name(s) {
            return Some(k);
        }
        if let Some((k, _)) = SYMBOLS.iter().find(|(_, sym)| *sym == s) {
            return Some(*k);
        }
        let lowered = s.to_ascii_lowercase();
        ALIASES
            .iter()
            .find(|(word, _)| *word == lowered)
            .map(|(_, k)| *k)
    }

    /// Canonical spec: the symbol for digits and punctuation, otherwise the
    /// lowercased variant name.
    pub fn to_spec(self) -> String {
        match SYMBOLS.iter().find(|(k, _)| *k == self) {
            Some((_, sym)) => (*sym).to_string(),
            None => self.name().to_ascii_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_parses_its_own_spec() {
        for &k in Key::ALL {
            let spec = k.to_spec();
            assert_eq!(Key::from_spec(&spec), Some(k), "{} -> {}", k.name(), spec);
        }
    }

    #[test]
    fn symbols_and_words() {
        assert_eq!(Key::Comma.to_spec(), ",");
        assert_eq!(Key::from_spec("comma"), Some(Key::Comma));
        assert_eq!(Key::from_spec("\\"), Some(Key::Backslash));
        assert_eq!(Key::Space.to_spec(), "space");
        assert_eq!(Key::from_spec(" "), Some(Key::Space));
        assert_eq!(Key::from_spec("A"), Some(Key::A));
        assert_eq!(Key::from_spec("ENTER"), Some(Key::Return));
        assert_eq!(Key::from_spec("esc"), Some(Key::Escape));
        assert_eq!(Key::from_spec("pgdn"), Some(Key::PageDown));
        assert_eq!(Key::from_spec("nosuchkey"), None);
    }

    #[test]
    fn handed_modifier_aliases() {
        assert_eq!(Key::from_spec("rcmd"), Some(Key::RightCommand));
        assert_eq!(Key::from_spec("lcmd"), Some(Key::Command));
        assert_eq!(Key::from_spec("ralt"), Some(Key::RightOption));
        assert_eq!(Key::from_spec("RSHIFT"), Some(Key::RightShift));
    }
}
