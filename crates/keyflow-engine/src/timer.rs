//! One-shot timers.
//!
//! The coordinators never sleep. They ask a [`TimerDriver`] to arm a timer
//! and receive the fire later, on the same timeline as key events, as a
//! `(TimerPurpose, TimerHandle)` pair. Every slot holds at most one live
//! handle; a fire whose handle no longer matches the slot is stale and is
//! ignored.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// What a timer is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Promote a tap or leader gesture to held.
    Promote,
    /// Rapid-succession cooldown after a noisy hold candidate.
    Cooldown,
    /// Deferred hold confirmation for a partial match.
    Capture,
}

/// Identifies one armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Schedules single-shot timers whose fires are delivered back to the engine.
pub trait TimerDriver: Send + Sync {
    /// Arm a timer firing once after `delay`.
    fn arm(&self, purpose: TimerPurpose, delay: Duration) -> TimerHandle;
    /// Cancel `handle`. Unknown or already fired handles are ignored.
    fn disarm(&self, handle: TimerHandle);
}

/// A slot that owns at most one outstanding timer.
#[derive(Debug, Default)]
pub struct OneShot {
    current: Option<(TimerPurpose, TimerHandle)>,
}

impl OneShot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is outstanding, then arm a new timer.
    pub fn arm(&mut self, timers: &dyn TimerDriver, purpose: TimerPurpose, delay: Duration) {
        self.cancel(timers);
        let handle = timers.arm(purpose, delay);
        trace!(%handle, ?purpose, delay_ms = delay.as_millis(), "timer_armed");
        self.current = Some((purpose, handle));
    }

    /// Cancel the outstanding timer, if any.
    pub fn cancel(&mut self, timers: &dyn TimerDriver) {
        if let Some((purpose, handle)) = self.current.take() {
            trace!(%handle, ?purpose, "timer_cancelled");
            timers.disarm(handle);
        }
    }

    /// Purpose of the outstanding timer.
    pub fn pending(&self) -> Option<TimerPurpose> {
        self.current.map(|(p, _)| p)
    }

    /// True if `handle` is the outstanding timer.
    pub fn is_current(&self, handle: TimerHandle) -> bool {
        self.current.is_some_and(|(_, h)| h == handle)
    }

    /// Consume a fire. Returns the purpose when `handle` is live, `None` when stale.
    pub fn fired(&mut self, handle: TimerHandle) -> Option<TimerPurpose> {
        if !self.is_current(handle) {
            trace!(%handle, "timer_stale");
            return None;
        }
        self.current.take().map(|(p, _)| p)
    }
}

type FireFn = dyn Fn(TimerPurpose, TimerHandle) + Send + Sync;

/// Timer driver backed by one tokio task per armed timer.
///
/// Must be used from within a tokio runtime. Fires are passed to the
/// callback given at construction, which is expected to hand them back to
/// the engine's input channel.
#[derive(Clone)]
pub struct TokioTimers {
    next: Arc<AtomicU64>,
    live: Arc<Mutex<HashMap<TimerHandle, CancellationToken>>>,
    on_fire: Arc<FireFn>,
}

impl TokioTimers {
    /// Create a driver delivering fires to `on_fire`.
    pub fn new<F>(on_fire: F) -> Self
    where
        F: Fn(TimerPurpose, TimerHandle) + Send + Sync + 'static,
    {
        Self {
            next: Arc::new(AtomicU64::new(1)),
            live: Arc::new(Mutex::new(HashMap::new())),
            on_fire: Arc::new(on_fire),
        }
    }

    /// Number of timers armed and not yet fired or cancelled.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl TimerDriver for TokioTimers {
    fn arm(&self, purpose: TimerPurpose, delay: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        let cancel = token.clone();
        let live = self.live.clone();
        let on_fire = self.on_fire.clone();
        self.live.lock().insert(handle, token);

        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => {
                    if live.lock().remove(&handle).is_some() {
                        on_fire(purpose, handle);
                    }
                }
                _ = cancel.cancelled() => {
                    trace!(%handle, "timer_task_cancelled");
                }
            }
        });
        handle
    }

    fn disarm(&self, handle: TimerHandle) {
        if let Some(token) = self.live.lock().remove(&handle) {
            token.cancel();
        }
    }
}
