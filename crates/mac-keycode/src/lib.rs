//! mac-keycode: Virtual keycodes, modifier flags and event signatures for macOS.
//!
//! - `Key`: Enum of the macOS virtual keycodes (`kVK_*` from HIToolbox).
//! - `Flags`: CGEventFlags modifier bitmask, including device-specific
//!   left/right bits.
//! - `Modifier`: Enum of modifier keys with conversions to/from `Key` and
//!   `Flags`.
//! - `EventKey` and `Signature`: the (key code, flags) pair carried by every
//!   keyboard event, and the canonical id it is matched by.
//!
//! Variant names are normalized (ANSI_ stripped; digits prefixed with
//! `Digit`). The enum is `repr(u16)` and carries the exact hardware codes.

mod key;
pub use key::Key;

mod spec;

mod flags;
pub use flags::Flags;

mod modifiers;
pub use modifiers::{Modifier, modifiers_from_cg_flags};

mod event_key;
pub use event_key::{EventKey, EventType, MODIFIERS_ONLY, Signature};

