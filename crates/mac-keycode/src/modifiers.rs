use std::{collections::HashSet, convert::TryFrom};

use crate::{Flags, Key};

/// Modifier keys available on macOS keyboards.
///
/// The unprefixed variants name the left-hand key when a match is side
/// specific, and either key otherwise.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum Modifier {
    Command,
    Shift,
    Option,
    Control,
    CapsLock,
    Function,
    RightCommand,
    RightShift,
    RightOption,
    RightControl,
}

impl From<Modifier> for Key {
    fn from(m: Modifier) -> Self {
        match m {
            Modifier::Command => Self::Command,
            Modifier::Shift => Self::Shift,
            Modifier::Option => Self::Option,
            Modifier::Control => Self::Control,
            Modifier::CapsLock => Self::CapsLock,
            Modifier::Function => Self::Function,
            Modifier::RightCommand => Self::RightCommand,
            Modifier::RightShift => Self::RightShift,
            Modifier::RightOption => Self::RightOption,
            Modifier::RightControl => Self::RightControl,
        }
    }
}

impl TryFrom<Key> for Modifier {
    type Error = ();
    fn try_from(k: Key) -> Result<Self, Self::Error> {
        match k {
            Key::Command => Ok(Self::Command),
            Key::Shift => Ok(Self::Shift),
            Key::Option => Ok(Self::Option),
            Key::Control => Ok(Self::Control),
            Key::CapsLock => Ok(Self::CapsLock),
            Key::Function => Ok(Self::Function),
            Key::RightCommand => Ok(Self::RightCommand),
            Key::RightShift => Ok(Self::RightShift),
            Key::RightOption => Ok(Self::RightOption),
            Key::RightControl => Ok(Self::RightControl),
            _ => Err(()),
        }
    }
}

impl Modifier {
    /// Parses a modifier specification string via key specs, then converts.
    ///
    /// Accepts case-insensitive variant names and alias words (cmd, rcmd, ctrl,
    /// opt, alt, ralt, caps, fn). Fails if the parsed key is not a modifier.
    pub fn from_spec(s: &str) -> Option<Self> {
        Key::from_spec(s).and_then(|k| Self::try_from(k).ok())
    }

    /// Returns the canonical lowercased spec string for this modifier.
    pub fn to_spec(self) -> String {
        match self {
            Self::Command => "cmd".to_string(),
            Self::Control => "ctrl".to_string(),
            Self::Option => "opt".to_string(),
            Self::RightCommand => "rcmd".to_string(),
            Self::RightControl => "rctrl".to_string(),
            Self::RightOption => "ropt".to_string(),
            Self::RightShift => "rshift".to_string(),
            _ => Key::from(self).name().to_ascii_lowercase(),
        }
    }

    /// Event flag bits this modifier sets.
    ///
    /// When `left_right_specific` is false both hands map to the generic bit.
    /// Caps lock maps to nothing it can be matched on.
    pub fn flags(self, left_right_specific: bool) -> Flags {
        let (generic, left, right) = match self {
            Self::Command | Self::RightCommand => {
                (Flags::COMMAND, Flags::LEFT_COMMAND, Flags::RIGHT_COMMAND)
            }
            Self::Shift | Self::RightShift => (Flags::SHIFT, Flags::LEFT_SHIFT, Flags::RIGHT_SHIFT),
            Self::Option | Self::RightOption => {
                (Flags::OPTION, Flags::LEFT_OPTION, Flags::RIGHT_OPTION)
            }
            Self::Control | Self::RightControl => {
                (Flags::CONTROL, Flags::LEFT_CONTROL, Flags::RIGHT_CONTROL)
            }
            Self::Function => return Flags::FUNCTION,
            Self::CapsLock => return Flags::ALPHA_SHIFT,
        };
        if !left_right_specific {
            return generic;
        }
        if self.is_right() {
            generic | right
        } else {
            generic | left
        }
    }

    /// True for the right-hand variants.
    pub fn is_right(self) -> bool {
        matches!(
            self,
            Self::RightCommand | Self::RightShift | Self::RightOption | Self::RightControl
        )
    }
}

/// Construct a modifier set from macOS CGEventFlags bits.
///
/// Right-hand variants are reported only when the right device bit is set;
/// otherwise a held generic bit reports the unprefixed variant.
pub fn modifiers_from_cg_flags(flags: u64) -> HashSet<Modifier> {
    let f = Flags::from_bits_truncate(flags);
    let mut set = HashSet::new();
    let table = [
        (Flags::SHIFT, Flags::RIGHT_SHIFT, Modifier::Shift, Modifier::RightShift),
        (Flags::CONTROL, Flags::RIGHT_CONTROL, Modifier::Control, Modifier::RightControl),
        (Flags::OPTION, Flags::RIGHT_OPTION, Modifier::Option, Modifier::RightOption),
        (Flags::COMMAND, Flags::RIGHT_COMMAND, Modifier::Command, Modifier::RightCommand),
    ];
    for (generic, right_bit, left, right) in table {
        if !f.contains(generic) {
            continue;
        }
        if f.contains(right_bit) {
            set.insert(right);
        } else {
            set.insert(left);
        }
    }
    if f.contains(Flags::FUNCTION) {
        set.insert(Modifier::Function);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_modifiers() {
        let mods = [
            Modifier::Command,
            Modifier::Shift,
            Modifier::Option,
            Modifier::Control,
            Modifier::CapsLock,
            Modifier::Function,
            Modifier::RightCommand,
            Modifier::RightShift,
            Modifier::RightOption,
            Modifier::RightControl,
        ];
        for m in mods {
            let k: Key = m.into();
            assert_eq!(Modifier::try_from(k), Ok(m));
            assert_eq!(Modifier::from_spec(&m.to_spec()), Some(m));
        }
    }

    #[test]
    fn side_specific_flags() {
        assert_eq!(Modifier::RightCommand.flags(false), Flags::COMMAND);
        assert_eq!(
            Modifier::RightCommand.flags(true),
            Flags::COMMAND | Flags::RIGHT_COMMAND
        );
        assert_eq!(
            Modifier::Option.flags(true),
            Flags::OPTION | Flags::LEFT_OPTION
        );
    }

    #[test]
    fn cg_flags_report_hands() {
        let bits = (Flags::COMMAND | Flags::RIGHT_COMMAND | Flags::SHIFT).bits();
        let set = modifiers_from_cg_flags(bits);
        assert!(set.contains(&Modifier::RightCommand));
        assert!(set.contains(&Modifier::Shift));
        assert_eq!(set.len(), 2);
    }
}
