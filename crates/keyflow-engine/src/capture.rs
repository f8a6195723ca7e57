//! Deferred hold confirmation for partial matches.
//!
//! When a chord prefix declares a hold duration, the decision whether the
//! key is being held or is the start of a longer chord is deferred. If no
//! other probe intervenes before the delay passes, further key-downs of the
//! same code are treated as the confirmed hold and swallowed.

use std::time::Duration;

use tracing::debug;

use crate::timer::{OneShot, TimerDriver, TimerHandle, TimerPurpose};

/// Shortest capture delay.
pub const CAPTURE_FLOOR: Duration = Duration::from_millis(125);

/// Single outstanding deferred capture.
#[derive(Debug, Default)]
pub struct ScheduledCapture {
    slot: OneShot,
    pending: Option<u16>,
    confirmed: Option<u16>,
}

impl ScheduledCapture {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay used for a hold duration of `hold`.
    pub fn delay_for(hold: Duration) -> Duration {
        hold.max(CAPTURE_FLOOR)
    }

    /// Replace any outstanding capture with one for `key_code`.
    pub fn schedule(&mut self, key_code: u16, hold: Duration, timers: &dyn TimerDriver) {
        self.confirmed = None;
        self.pending = Some(key_code);
        self.slot
            .arm(timers, TimerPurpose::Capture, Self::delay_for(hold));
    }

    /// Invalidate the outstanding capture. A confirmed capture is kept.
    pub fn cancel(&mut self, timers: &dyn TimerDriver) {
        if self.pending.take().is_some() {
            self.slot.cancel(timers);
        }
    }

    /// Handle a fire. Returns the confirmed key code when `handle` is live.
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<u16> {
        self.slot.fired(handle)?;
        let code = self.pending.take()?;
        debug!(key_code = code, "capture_confirmed");
        self.confirmed = Some(code);
        Some(code)
    }

    /// True if key-downs of `key_code` are a confirmed hold.
    pub fn is_confirmed(&self, key_code: u16) -> bool {
        self.confirmed == Some(key_code)
    }

    /// The key-up of `key_code` ends its capture.
    pub fn release(&mut self, key_code: u16, timers: &dyn TimerDriver) {
        if self.confirmed == Some(key_code) {
            self.confirmed = None;
        }
        if self.pending == Some(key_code) {
            self.cancel(timers);
        }
    }

    /// Drop everything.
    pub fn reset(&mut self, timers: &dyn TimerDriver) {
        self.confirmed = None;
        self.pending = None;
        self.slot.cancel(timers);
    }
}
