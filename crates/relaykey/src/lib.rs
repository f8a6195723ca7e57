//! Posts synthetic keyboard events on behalf of the match engine.
//!
//! A `RelayKey` posts KeyDown/KeyUp/FlagsChanged events at the HID level.
//! Every event it posts is tagged with [`KEYFLOW_TAG`] in the event source
//! user-data field, so the event tap that feeds the engine can recognize and
//! ignore its own injections.
//!
//! Only macOS has a backend. Elsewhere every post fails with
//! [`Error::Unsupported`], which callers treat like any other best-effort
//! injection failure.
#![warn(unsafe_op_in_unsafe_fn)]
use std::sync::Arc;

use mac_keycode::{EventType, Flags};
use tracing::trace;

mod error;

pub use error::{Error, Result};

/// 'kflw' in ASCII bytes: 0x6b 0x66 0x6c 0x77 -> 1801874551
pub const KEYFLOW_TAG: i64 = 1_801_874_551;

/// True if `user_data` (the event source user-data field) marks one of our injections.
pub fn is_tagged(user_data: i64) -> bool {
    user_data == KEYFLOW_TAG
}

pub(crate) trait Poster: Send + Sync {
    fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> Result<()>;
}

#[cfg(target_os = "macos")]
mod mac {
    use core_graphics::{
        event as cge,
        event_source::{CGEventSource, CGEventSourceStateID},
    };
    use mac_keycode::{EventType, Flags};
    use tracing::{info, warn};

    use crate::{Error, KEYFLOW_TAG, Poster, Result};

    fn ax_is_process_trusted() -> bool {
        unsafe extern "C" {
            fn AXIsProcessTrusted() -> bool;
        }
        unsafe { AXIsProcessTrusted() }
    }

    pub(crate) struct MacPoster;

    impl MacPoster {
        fn build_event(&self, key_code: u16, kind: EventType, flags: Flags) -> Result<cge::CGEvent> {
            let source = match CGEventSource::new(CGEventSourceStateID::HIDSystemState) {
                Ok(s) => s,
                Err(_) => {
                    if !ax_is_process_trusted() {
                        warn!("accessibility_permission_missing_for_event_source");
                        return Err(Error::PermissionDenied("Accessibility"));
                    }
                    return Err(Error::EventSource);
                }
            };
            let down = !matches!(kind, EventType::KeyUp);
            let e = match cge::CGEvent::new_keyboard_event(
                source,
                cge::CGKeyCode::from(key_code),
                down,
            ) {
                Ok(e) => e,
                Err(_) => {
                    if !ax_is_process_trusted() {
                        warn!("accessibility_permission_missing_for_event_create");
                        return Err(Error::PermissionDenied("Accessibility"));
                    }
                    return Err(Error::EventCreate);
                }
            };
            if kind == EventType::FlagsChanged {
                e.set_type(cge::CGEventType::FlagsChanged);
            }
            e.set_flags(cge::CGEventFlags::from_bits_retain(flags.bits()));
            e.set_integer_value_field(cge::EventField::EVENT_SOURCE_USER_DATA, KEYFLOW_TAG);
            Ok(e)
        }
    }

    impl Poster for MacPoster {
        fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> Result<()> {
            let e = self.build_event(key_code, kind, flags)?;
            e.post(cge::CGEventTapLocation::HID);
            info!(key_code, ?kind, flags = flags.bits(), "posted_event");
            Ok(())
        }
    }
}

#[cfg(not(target_os = "macos"))]
struct UnsupportedPoster;

#[cfg(not(target_os = "macos"))]
impl Poster for UnsupportedPoster {
    fn post(&self, _key_code: u16, _kind: EventType, _flags: Flags) -> Result<()> {
        Err(Error::Unsupported)
    }
}

/// Posts synthetic key events.
#[derive(Clone)]
pub struct RelayKey {
    poster: Arc<dyn Poster>,
}

impl Default for RelayKey {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayKey {
    /// Create a relayer for the current platform.
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        let poster: Arc<dyn Poster> = Arc::new(mac::MacPoster);
        #[cfg(not(target_os = "macos"))]
        let poster: Arc<dyn Poster> = Arc::new(UnsupportedPoster);
        Self { poster }
    }

    /// Test helper to inject a custom poster.
    #[cfg(test)]
    pub(crate) fn new_with_poster(poster: Arc<dyn Poster>) -> Self {
        Self { poster }
    }

    /// Post a single event.
    pub fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> Result<()> {
        trace!(key_code, ?kind, flags = flags.bits(), "post");
        self.poster.post(key_code, kind, flags)
    }

    /// Post a key-down followed by a key-up. Stops at the first failure.
    pub fn tap(&self, key_code: u16, flags: Flags) -> Result<()> {
        self.post(key_code, EventType::KeyDown, flags)?;
        self.post(key_code, EventType::KeyUp, flags)
    }
}
