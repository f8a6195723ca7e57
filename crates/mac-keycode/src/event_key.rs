use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Flags, Key, Modifier};

/// Reserved key code for modifier-only triggers and flagsChanged matching.
pub const MODIFIERS_ONLY: u16 = 0xFFFF;

/// Kind of a low-level keyboard event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A key was pressed, or auto-repeated.
    KeyDown,
    /// A key was released.
    KeyUp,
    /// Modifier state changed.
    FlagsChanged,
}

/// A (key code, modifier flags) pair as carried by a keyboard event.
///
/// The key code is kept raw so that codes without a `Key` variant still flow
/// through matching; they simply never match a configured trigger.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EventKey {
    key_code: u16,
    flags: Flags,
}

impl EventKey {
    /// Construct from a raw key code and event flags.
    pub const fn new(key_code: u16, flags: Flags) -> Self {
        Self { key_code, flags }
    }

    /// A modifier-only key: no key code, just held modifiers.
    pub const fn modifiers_only(flags: Flags) -> Self {
        Self::new(MODIFIERS_ONLY, flags)
    }

    /// Raw macOS virtual key code.
    pub fn key_code(&self) -> u16 {
        self.key_code
    }

    /// Raw event flags.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The `Key` variant for this code, if known.
    pub fn key(&self) -> Option<Key> {
        Key::from_keycode(self.key_code)
    }

    /// True for modifier-only keys.
    pub fn is_modifiers_only(&self) -> bool {
        self.key_code == MODIFIERS_ONLY
    }

    /// Canonical signature used for trigger lookup.
    pub fn signature(&self, left_right_specific: bool) -> Signature {
        Signature::new(
            self.key_code,
            self.flags.normalized(self.key_code, left_right_specific),
        )
    }

    /// Parses a spec of the form "shift+opt+k".
    ///
    /// - Case-insensitive for both modifiers and the key.
    /// - Components are separated by "+"; the last component is the key spec,
    ///   which may also be a raw hex code such as `0x7f`.
    /// - With `left_right_specific`, `cmd` means the left command key and
    ///   `rcmd` the right one; otherwise both mean either key.
    pub fn parse(s: &str, left_right_specific: bool) -> Option<Self> {
        let mut parts: Vec<&str> = s.split('+').collect();
        let key_raw = parts.pop()?;
        let key_code = if key_raw == " " {
            Key::Space as u16
        } else {
            parse_key_code(key_raw.trim())?
        };
        let flags = parse_modifier_list(&parts, left_right_specific)?;
        Some(Self::new(key_code, flags))
    }

    /// Parses a "+"-separated list of modifiers ("cmd+opt") into flags.
    pub fn parse_modifiers(s: &str, left_right_specific: bool) -> Option<Flags> {
        let parts: Vec<&str> = s.split('+').collect();
        parse_modifier_list(&parts, left_right_specific)
    }
}

/// Resolve a key component to a raw code.
fn parse_key_code(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }
    Key::from_spec(s).map(|k| k as u16)
}

/// Fold modifier components into flags; any empty or unknown component fails.
fn parse_modifier_list(parts: &[&str], left_right_specific: bool) -> Option<Flags> {
    let mut flags = Flags::empty();
    for m in parts {
        let mt = m.trim();
        if mt.is_empty() {
            return None;
        }
        flags |= Modifier::from_spec(mt)?.flags(left_right_specific);
    }
    Some(flags)
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature(true))
    }
}

/// Canonical id of a normalized (key code, flags) pair.
///
/// The key code occupies the upper 32 bits and the normalized flags the lower
/// 32, so equal signatures imply equal matching semantics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Signature(u64);

impl Signature {
    /// Combine an already-normalized pair.
    pub fn new(key_code: u16, flags: Flags) -> Self {
        Self((u64::from(key_code) << 32) | (flags.bits() & 0xFFFF_FFFF))
    }

    /// Key code component.
    pub fn key_code(self) -> u16 {
        (self.0 >> 32) as u16
    }

    /// Flags component.
    pub fn flags(self) -> Flags {
        Flags::from_bits_retain(self.0 & 0xFFFF_FFFF)
    }

    /// Raw packed value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.flags();
        let mut out: Vec<String> = Vec::new();
        // Canonical order: Command, Option, Control, Shift, Function
        let table = [
            (Flags::COMMAND, Flags::LEFT_COMMAND, Flags::RIGHT_COMMAND, "cmd"),
            (Flags::OPTION, Flags::LEFT_OPTION, Flags::RIGHT_OPTION, "opt"),
            (Flags::CONTROL, Flags::LEFT_CONTROL, Flags::RIGHT_CONTROL, "ctrl"),
            (Flags::SHIFT, Flags::LEFT_SHIFT, Flags::RIGHT_SHIFT, "shift"),
        ];
        for (generic, left, right, name) in table {
            if !flags.contains(generic) {
                continue;
            }
            let before = out.len();
            if flags.contains(left) {
                out.push(format!("l{name}"));
            }
            if flags.contains(right) {
                out.push(format!("r{name}"));
            }
            if out.len() == before {
                out.push(name.to_string());
            }
        }
        if flags.contains(Flags::FUNCTION) {
            out.push("fn".to_string());
        }
        let code = self.key_code();
        if code != MODIFIERS_ONLY {
            match Key::from_keycode(code) {
                Some(k) => out.push(k.to_spec()),
                None => out.push(format!("0x{code:02x}")),
            }
        }
        write!(f, "{}", out.join("+"))
    }
}
