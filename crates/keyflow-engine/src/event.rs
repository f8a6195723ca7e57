//! Events in, outcomes out.

use mac_keycode::{EventKey, EventType, Flags};

/// A keyboard event as delivered by the event source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Raw virtual key code.
    pub key_code: u16,
    /// Raw modifier flags.
    pub flags: Flags,
    /// Down, up or flags change.
    pub kind: EventType,
    /// OS auto-repeat.
    pub is_repeat: bool,
    /// Posted by our own injector.
    pub is_synthetic: bool,
}

impl KeyEvent {
    /// A fresh key-down.
    pub fn down(key_code: u16, flags: Flags) -> Self {
        Self::new(key_code, flags, EventType::KeyDown)
    }

    /// A key-up.
    pub fn up(key_code: u16, flags: Flags) -> Self {
        Self::new(key_code, flags, EventType::KeyUp)
    }

    /// A modifier change reported on the physical modifier key `key_code`.
    pub fn flags_changed(key_code: u16, flags: Flags) -> Self {
        Self::new(key_code, flags, EventType::FlagsChanged)
    }

    fn new(key_code: u16, flags: Flags, kind: EventType) -> Self {
        Self {
            key_code,
            flags,
            kind,
            is_repeat: false,
            is_synthetic: false,
        }
    }

    /// Mark as an OS auto-repeat.
    pub fn repeat(mut self) -> Self {
        self.is_repeat = true;
        self
    }

    /// Mark as self-injected.
    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }

    /// The key used for trigger lookup.
    ///
    /// Flags changes match modifier-only triggers, so they look up the held
    /// modifiers without a key code.
    pub fn lookup_key(&self) -> EventKey {
        match self.kind {
            EventType::FlagsChanged => EventKey::modifiers_only(self.flags),
            EventType::KeyDown | EventType::KeyUp => EventKey::new(self.key_code, self.flags),
        }
    }
}

/// What the event source should do with the event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Deliver unchanged.
    Forward,
    /// Drop.
    Suppress,
    /// Deliver with a different key code, type and flags.
    Rewrite {
        /// Replacement key code.
        key_code: u16,
        /// Replacement event type.
        kind: EventType,
        /// Replacement flags.
        flags: Flags,
    },
}
