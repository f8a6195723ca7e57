//! Tap, leader and held disambiguation for keys with a hold duration.
//!
//! A gesture starts on the key-down of a hold candidate and ends on the
//! key-up of the same key. One timer slot is shared between promotion and
//! the rapid-succession cooldown, so the coordinator never has more than
//! one timer outstanding.

use std::{sync::Arc, time::Duration};

use config::Workflow;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    KeyEvent,
    timer::{OneShot, TimerDriver, TimerHandle, TimerPurpose},
};

/// Grace factor applied to the hold threshold before promotion.
pub const HOLD_GRACE: f64 = 1.15;
/// A hold candidate this soon after the previous key-up is noise.
pub const RAPID_WINDOW: Duration = Duration::from_millis(120);
/// Cooldown armed when noise is detected.
pub const RAPID_COOLDOWN: Duration = Duration::from_millis(120);
/// Hold threshold for leader keys that declare no hold duration.
pub const DEFAULT_LEADER_HOLD: Duration = Duration::from_millis(200);

/// Gesture phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HoldPhase {
    /// No gesture.
    #[default]
    Idle,
    /// Key is down, not yet promoted.
    Tap,
    /// Leader key is down, not yet promoted.
    Leader,
    /// Promoted: the key has been held past its threshold.
    Held,
}

/// Result of offering a key-down to the gesture coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Begin {
    /// A gesture started; the key-down is consumed.
    Started,
    /// Rapid succession or auto-repeat; replay the key verbatim.
    Noise,
    /// A gesture is already in progress.
    Busy,
}

/// What the key-up of the gesture's key resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Held past the threshold; the hold action already fired.
    AfterHold,
    /// A chord completed while the key was down.
    Consumed,
    /// Another key interrupted; remap this key-up to that key code.
    Rebind(u16),
    /// A quick tap; replay the original key-down and key-up.
    Tap(KeyEvent),
}

/// A promotion to [`HoldPhase::Held`].
#[derive(Clone, Debug)]
pub struct Promotion {
    /// Key held.
    pub key_code: u16,
    /// The originating key-down.
    pub origin: KeyEvent,
    /// Workflow to dispatch now, for exact-match hold workflows.
    pub dispatch: Option<Arc<Workflow>>,
}

#[derive(Debug)]
struct Gesture {
    origin: KeyEvent,
    threshold: Duration,
    started: Instant,
    phase: HoldPhase,
    workflow: Arc<Workflow>,
    exact: bool,
    rebind: Option<u16>,
    consumed: bool,
}

/// Hold gesture state machine.
#[derive(Debug, Default)]
pub struct HoldGestureCoordinator {
    gesture: Option<Gesture>,
    slot: OneShot,
    last_key_up: Option<Instant>,
}

impl HoldGestureCoordinator {
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> HoldPhase {
        self.gesture.as_ref().map_or(HoldPhase::Idle, |g| g.phase)
    }

    /// Key code of the gesture in progress.
    pub fn origin(&self) -> Option<u16> {
        self.gesture.as_ref().map(|g| g.origin.key_code)
    }

    /// Offer a key-down whose candidate workflow has a hold duration or is a
    /// leader key. `exact` marks a completed trigger that dispatches on
    /// promotion.
    pub fn begin(
        &mut self,
        event: &KeyEvent,
        workflow: &Arc<Workflow>,
        exact: bool,
        now: Instant,
        timers: &dyn TimerDriver,
    ) -> Begin {
        if self.gesture.is_some() {
            return Begin::Busy;
        }
        let rapid = self
            .last_key_up
            .is_some_and(|t| now.saturating_duration_since(t) < RAPID_WINDOW);
        let cooling = self.slot.pending() == Some(TimerPurpose::Cooldown);
        if event.is_repeat || rapid || cooling {
            debug!(
                key_code = event.key_code,
                repeat = event.is_repeat,
                rapid,
                cooling,
                "hold_noise"
            );
            self.slot.arm(timers, TimerPurpose::Cooldown, RAPID_COOLDOWN);
            return Begin::Noise;
        }

        let leader = workflow.conditions().is_leader_key;
        let threshold = workflow.hold_duration().unwrap_or(DEFAULT_LEADER_HOLD);
        let phase = if leader {
            HoldPhase::Leader
        } else {
            HoldPhase::Tap
        };
        self.slot
            .arm(timers, TimerPurpose::Promote, threshold.mul_f64(HOLD_GRACE));
        debug!(
            key_code = event.key_code,
            ?phase,
            threshold_ms = threshold.as_millis(),
            "hold_begin"
        );
        self.gesture = Some(Gesture {
            origin: *event,
            threshold,
            started: now,
            phase,
            workflow: workflow.clone(),
            exact,
            rebind: None,
            consumed: false,
        });
        Begin::Started
    }

    /// See a key-down while a gesture may be active.
    ///
    /// Returns `true` when the event belongs to the gesture and must be
    /// suppressed without further processing.
    pub fn key_down(&mut self, event: &KeyEvent, timers: &dyn TimerDriver) -> bool {
        let Some(g) = self.gesture.as_mut() else {
            return false;
        };
        if event.key_code == g.origin.key_code {
            if event.is_repeat {
                return true;
            }
            // A fresh down of the same key: the key-up was lost.
            debug!(key_code = event.key_code, "hold_restart");
            self.reset(timers);
            return false;
        }
        if matches!(g.phase, HoldPhase::Tap | HoldPhase::Leader) && g.rebind.is_none() {
            debug!(
                origin = g.origin.key_code,
                key_code = event.key_code,
                "hold_interrupted"
            );
            g.rebind = Some(event.key_code);
            self.slot.cancel(timers);
        }
        false
    }

    /// A chord completed while the gesture's key was down.
    pub fn complete(&mut self) {
        if let Some(g) = self.gesture.as_mut() {
            g.consumed = true;
        }
    }

    /// Resolve the key-up of the gesture's key. Other key-ups return `None`.
    pub fn key_up(
        &mut self,
        event: &KeyEvent,
        now: Instant,
        timers: &dyn TimerDriver,
    ) -> Option<Release> {
        if self.origin() != Some(event.key_code) {
            return None;
        }
        let g = self.gesture.take()?;
        if self.slot.pending() == Some(TimerPurpose::Promote) {
            self.slot.cancel(timers);
        }
        let held_for = now.saturating_duration_since(g.started);
        let release = if g.consumed {
            Release::Consumed
        } else if g.phase == HoldPhase::Held && held_for > g.threshold {
            Release::AfterHold
        } else if let Some(code) = g.rebind {
            Release::Rebind(code)
        } else {
            Release::Tap(g.origin)
        };
        debug!(
            key_code = event.key_code,
            ?release,
            held_ms = held_for.as_millis(),
            "hold_release"
        );
        Some(release)
    }

    /// Remember a key-up of any key for the rapid-succession guard.
    pub fn note_key_up(&mut self, now: Instant) {
        self.last_key_up = Some(now);
    }

    /// Handle a fire for this coordinator's slot.
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<Promotion> {
        match self.slot.fired(handle)? {
            TimerPurpose::Promote => {
                let g = self.gesture.as_mut()?;
                if !matches!(g.phase, HoldPhase::Tap | HoldPhase::Leader) {
                    return None;
                }
                g.phase = HoldPhase::Held;
                debug!(key_code = g.origin.key_code, "hold_promoted");
                Some(Promotion {
                    key_code: g.origin.key_code,
                    origin: g.origin,
                    dispatch: g.exact.then(|| g.workflow.clone()),
                })
            }
            TimerPurpose::Cooldown | TimerPurpose::Capture => None,
        }
    }

    /// Drop any gesture and cancel the timer.
    pub fn reset(&mut self, timers: &dyn TimerDriver) {
        self.gesture = None;
        self.slot.cancel(timers);
    }
}

#[cfg(test)]
mod tests {
    use config::{KeyboardTrigger, Shortcut, Trigger};
    use mac_keycode::{Flags, Key};

    use super::*;
    use crate::test_support::ManualTimers;

    fn hold_wf(ms: u64, leader: bool) -> Arc<Workflow> {
        let mut k = KeyboardTrigger::new(vec![Shortcut::new("space")]);
        k.hold_duration = Some(ms as f64 / 1000.0);
        k.leader_key = leader;
        Arc::new(Workflow::new("h", "", Some(Trigger::Keyboard(k)), vec![]))
    }

    fn space() -> KeyEvent {
        KeyEvent::down(Key::Space as u16, Flags::empty())
    }

    #[test]
    fn quick_release_is_a_tap() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let t0 = Instant::now();
        assert_eq!(h.begin(&space(), &hold_wf(200, false), false, t0, &timers), Begin::Started);
        assert_eq!(h.phase(), HoldPhase::Tap);
        assert_eq!(timers.live_count(TimerPurpose::Promote), 1);

        let up = KeyEvent::up(Key::Space as u16, Flags::empty());
        let r = h.key_up(&up, t0 + Duration::from_millis(50), &timers);
        assert_eq!(r, Some(Release::Tap(space())));
        assert_eq!(h.phase(), HoldPhase::Idle);
        assert_eq!(timers.live_count(TimerPurpose::Promote), 0);
    }

    #[test]
    fn promotion_waits_for_grace() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let t0 = Instant::now();
        h.begin(&space(), &hold_wf(200, false), true, t0, &timers);
        assert!(timers.advance(Duration::from_millis(229)).is_empty());
        let fired = timers.advance(Duration::from_millis(1));
        assert_eq!(fired.len(), 1);
        let p = h.on_timer(fired[0].1).expect("promotion");
        assert!(p.dispatch.is_some());
        assert_eq!(h.phase(), HoldPhase::Held);

        let up = KeyEvent::up(Key::Space as u16, Flags::empty());
        let r = h.key_up(&up, t0 + Duration::from_millis(300), &timers);
        assert_eq!(r, Some(Release::AfterHold));
    }

    #[test]
    fn interruption_records_rebind() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let t0 = Instant::now();
        h.begin(&space(), &hold_wf(200, true), false, t0, &timers);
        assert_eq!(h.phase(), HoldPhase::Leader);
        let j = KeyEvent::down(Key::J as u16, Flags::empty());
        assert!(!h.key_down(&j, &timers));
        assert_eq!(timers.live_count(TimerPurpose::Promote), 0);
        let up = KeyEvent::up(Key::Space as u16, Flags::empty());
        assert_eq!(
            h.key_up(&up, t0 + Duration::from_millis(80), &timers),
            Some(Release::Rebind(Key::J as u16))
        );
    }

    #[test]
    fn completed_chord_consumes_release() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let t0 = Instant::now();
        h.begin(&space(), &hold_wf(200, true), false, t0, &timers);
        h.key_down(&KeyEvent::down(Key::J as u16, Flags::empty()), &timers);
        h.complete();
        let up = KeyEvent::up(Key::Space as u16, Flags::empty());
        assert_eq!(
            h.key_up(&up, t0 + Duration::from_millis(80), &timers),
            Some(Release::Consumed)
        );
    }

    #[test]
    fn origin_repeats_are_swallowed() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        h.begin(&space(), &hold_wf(200, false), false, Instant::now(), &timers);
        assert!(h.key_down(&space().repeat(), &timers));
        assert!(!h.key_down(&space(), &timers));
        assert_eq!(h.phase(), HoldPhase::Idle);
    }

    #[test]
    fn rapid_candidates_are_noise() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let wf = hold_wf(200, true);
        let t0 = Instant::now();
        h.note_key_up(t0);
        assert_eq!(
            h.begin(&space(), &wf, false, t0 + Duration::from_millis(119), &timers),
            Begin::Noise
        );
        assert_eq!(timers.live_count(TimerPurpose::Cooldown), 1);
        assert_eq!(timers.live_count(TimerPurpose::Promote), 0);

        // Still cooling down, even outside the window.
        assert_eq!(
            h.begin(&space(), &wf, false, t0 + Duration::from_millis(200), &timers),
            Begin::Noise
        );
        let fired = timers.advance(RAPID_COOLDOWN);
        assert!(h.on_timer(fired[0].1).is_none());
        assert_eq!(
            h.begin(&space(), &wf, false, t0 + Duration::from_millis(400), &timers),
            Begin::Started
        );
        assert_eq!(timers.live_count(TimerPurpose::Cooldown), 0);
    }

    #[test]
    fn key_up_of_another_key_makes_a_leader_noise() {
        // Typing "a" then space mid-word must not start a leader hold.
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let t0 = Instant::now();
        h.note_key_up(t0);
        assert_eq!(
            h.begin(&space(), &hold_wf(200, true), false, t0 + Duration::from_millis(30), &timers),
            Begin::Noise
        );
        assert_eq!(h.phase(), HoldPhase::Idle);
        assert_eq!(timers.live_count(TimerPurpose::Promote), 0);
    }

    #[test]
    fn repeat_is_noise() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        assert_eq!(
            h.begin(&space().repeat(), &hold_wf(200, false), false, Instant::now(), &timers),
            Begin::Noise
        );
    }

    #[test]
    fn stale_promotion_is_ignored() {
        let timers = ManualTimers::new();
        let mut h = HoldGestureCoordinator::new();
        let t0 = Instant::now();
        h.begin(&space(), &hold_wf(100, false), false, t0, &timers);
        h.reset(&timers);
        h.begin(&space(), &hold_wf(500, false), false, t0, &timers);
        assert_eq!(timers.live_count(TimerPurpose::Promote), 1);
        let fired = timers.advance(Duration::from_millis(200));
        assert!(fired.is_empty());
        assert_eq!(h.on_timer(TimerHandle(0)).map(|p| p.key_code), None);
        assert_eq!(h.phase(), HoldPhase::Tap);
    }
}
