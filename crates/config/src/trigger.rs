//! Workflow triggers: key chords and modifier-only combinations.

use std::time::Duration;

use mac_keycode::{EventKey, Flags};
use serde::{Deserialize, Serialize};

/// What starts a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// An ordered sequence of key combinations.
    Keyboard(KeyboardTrigger),
    /// A set of modifiers pressed together with no other key.
    Modifiers(ModifierTrigger),
}

impl Trigger {
    /// Keyboard trigger contents, if this is one.
    pub fn as_keyboard(&self) -> Option<&KeyboardTrigger> {
        match self {
            Self::Keyboard(k) => Some(k),
            Self::Modifiers(_) => None,
        }
    }

    /// Whether the triggering keystroke is still delivered to the foreground app.
    pub fn passthrough(&self) -> bool {
        match self {
            Self::Keyboard(k) => k.passthrough,
            Self::Modifiers(m) => m.passthrough,
        }
    }
}

/// A chord trigger with its gesture attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardTrigger {
    /// Chord elements, pressed one after another.
    pub shortcuts: Vec<Shortcut>,
    /// Hold threshold in seconds; only positive values enable hold semantics.
    #[serde(default)]
    pub hold_duration: Option<f64>,
    /// Forward the final keystroke after dispatching.
    #[serde(default)]
    pub passthrough: bool,
    /// Dispatch on key-up instead of key-down.
    #[serde(default)]
    pub key_up: bool,
    /// Treat the first key as a leader whose hold changes later presses.
    #[serde(default)]
    pub leader_key: bool,
    /// Re-dispatch on OS auto-repeat while the key stays down.
    #[serde(default)]
    pub allow_repeat: bool,
}

impl KeyboardTrigger {
    /// Trigger with the given chord and default attributes.
    pub fn new(shortcuts: Vec<Shortcut>) -> Self {
        Self {
            shortcuts,
            hold_duration: None,
            passthrough: false,
            key_up: false,
            leader_key: false,
            allow_repeat: false,
        }
    }

    /// The positive hold threshold, if one is configured.
    pub fn hold(&self) -> Option<Duration> {
        self.hold_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// A modifier-only trigger, e.g. pressing both command keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModifierTrigger {
    /// Modifier specs such as `"cmd"`, `"ropt"`.
    pub modifiers: Vec<String>,
    /// Distinguish left and right modifier keys.
    #[serde(default)]
    pub left_right_specific: bool,
    /// Forward the flags change after dispatching.
    #[serde(default)]
    pub passthrough: bool,
}

impl ModifierTrigger {
    /// Combined modifier flags, or `None` if any spec is unknown or the set is empty.
    pub fn flags(&self) -> Option<Flags> {
        if self.modifiers.is_empty() {
            return None;
        }
        EventKey::parse_modifiers(&self.modifiers.join("+"), self.left_right_specific)
    }

    /// The modifier-only key this trigger matches.
    pub fn event_key(&self) -> Option<EventKey> {
        self.flags().map(EventKey::modifiers_only)
    }
}

/// One chord element.
///
/// Written either as a bare spec string (`"cmd+k"`) or as a struct with an
/// explicit `left_right_specific` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ShortcutRepr")]
pub struct Shortcut {
    /// Key spec, e.g. `"shift+opt+k"`.
    pub key: String,
    /// Match left and right modifier keys separately.
    pub left_right_specific: bool,
}

impl Shortcut {
    /// Side-agnostic shortcut.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            left_right_specific: false,
        }
    }

    /// Shortcut that distinguishes left and right modifiers.
    pub fn specific(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            left_right_specific: true,
        }
    }

    /// The key this shortcut resolves to, or `None` when the spec is invalid.
    pub fn event_key(&self) -> Option<EventKey> {
        EventKey::parse(&self.key, self.left_right_specific)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ShortcutRepr {
    Spec(String),
    Full {
        key: String,
        #[serde(default)]
        left_right_specific: bool,
    },
}

impl From<ShortcutRepr> for Shortcut {
    fn from(r: ShortcutRepr) -> Self {
        match r {
            ShortcutRepr::Spec(key) => Self::new(key),
            ShortcutRepr::Full {
                key,
                left_right_specific,
            } => Self {
                key,
                left_right_specific,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use mac_keycode::Key;

    use super::*;

    #[test]
    fn hold_requires_positive_finite() {
        let mut t = KeyboardTrigger::new(vec![Shortcut::new("a")]);
        assert_eq!(t.hold(), None);
        t.hold_duration = Some(0.0);
        assert_eq!(t.hold(), None);
        t.hold_duration = Some(f64::NAN);
        assert_eq!(t.hold(), None);
        t.hold_duration = Some(0.25);
        assert_eq!(t.hold(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn modifier_trigger_flags() {
        let t = ModifierTrigger {
            modifiers: vec!["cmd".into(), "opt".into()],
            left_right_specific: false,
            passthrough: false,
        };
        let k = t.event_key().expect("valid");
        assert!(k.is_modifiers_only());
        assert_eq!(k.flags(), Flags::COMMAND | Flags::OPTION);

        let bad = ModifierTrigger {
            modifiers: vec!["k".into()],
            ..t
        };
        assert_eq!(bad.event_key(), None);
    }

    #[test]
    fn shortcut_resolves() {
        let s = Shortcut::specific("rcmd+j");
        let k = s.event_key().expect("valid");
        assert_eq!(k.key(), Some(Key::J));
        assert!(k.flags().contains(Flags::RIGHT_COMMAND));
        assert_eq!(Shortcut::new("cmd+nope").event_key(), None);
    }
}
