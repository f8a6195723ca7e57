//! The match state machine.
//!
//! [`MatchCoordinator`] consumes every keyboard event, probes the
//! [`TriggerCache`] with the chord prefix collected so far, and decides
//! whether the event is forwarded, suppressed or rewritten. It owns the hold
//! gesture coordinator and the scheduled capture, and is the only place
//! their timers are armed and resolved.
//!
//! The coordinator is not thread safe and takes `&mut self` everywhere.
//! [`crate::Engine`] owns one on a single task so events and timer fires are
//! handled one at a time.

use std::{mem, sync::Arc};

use config::{UserModeId, Workflow};
use mac_keycode::{EventType, Key};
use tokio::time::Instant;
use tracing::{debug, info, trace};
use trigger_cache::{LookupContext, MatchResult, PrefixId, PrefixListing, TriggerCache};

use crate::{
    Collaborators, KeyEvent, Outcome,
    capture::ScheduledCapture,
    hold::{Begin, HoldGestureCoordinator, HoldPhase, Release},
    key_state::{KeyStateTracker, RepeatingHandler},
    notification::UiEvent,
    timer::{TimerDriver, TimerHandle, TimerPurpose},
};

/// Interception mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// Match and dispatch.
    #[default]
    Intercepting,
    /// Forward everything untouched.
    Disabled,
    /// Match as usual; unmatched events go to the macro recorder.
    MacroRecording,
    /// Report and swallow every key-down; no matching.
    KeyCapture,
}

/// The chord prefix consumed so far and its candidate workflow.
#[derive(Clone, Debug, Default)]
pub struct PartialMatchState {
    /// Current prefix; [`PrefixId::IDLE`] when idle.
    pub prefix: PrefixId,
    /// Workflow whose chord the prefix belongs to.
    pub workflow: Option<Arc<Workflow>>,
}

impl PartialMatchState {
    /// True when no chord is in progress.
    pub fn is_idle(&self) -> bool {
        self.prefix.is_idle()
    }
}

/// Point-in-time view of the coordinator.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Interception mode.
    pub mode: Mode,
    /// Chord progress.
    pub partial: PartialMatchState,
    /// Canonical text of the current prefix.
    pub prefix_text: String,
    /// Hold gesture phase.
    pub hold: HoldPhase,
}

/// Central event state machine.
pub struct MatchCoordinator {
    cache: TriggerCache,
    ctx: LookupContext,
    mode: Mode,
    partial: PartialMatchState,
    /// Suppressed key-downs of the chord in progress, replayed if it is abandoned.
    pending: Vec<KeyEvent>,
    previous_exact: Option<(u16, Arc<Workflow>)>,
    /// Set when the current key-down was swallowed and posted again behind a replayed prefix.
    reinjected: bool,
    keys: KeyStateTracker,
    hold: HoldGestureCoordinator,
    capture: ScheduledCapture,
    timers: Arc<dyn TimerDriver>,
    deps: Collaborators,
}

impl MatchCoordinator {
    /// Create an idle coordinator.
    pub fn new(cache: TriggerCache, deps: Collaborators, timers: Arc<dyn TimerDriver>) -> Self {
        Self {
            cache,
            ctx: LookupContext::default(),
            mode: Mode::default(),
            partial: PartialMatchState::default(),
            pending: Vec::new(),
            previous_exact: None,
            reinjected: false,
            keys: KeyStateTracker::new(),
            hold: HoldGestureCoordinator::new(),
            capture: ScheduledCapture::new(),
            timers,
            deps,
        }
    }

    /// Decide the fate of one event.
    pub fn handle(&mut self, event: &KeyEvent, now: Instant) -> Outcome {
        trace!(
            key_code = event.key_code,
            flags = event.flags.bits(),
            kind = ?event.kind,
            repeat = event.is_repeat,
            synthetic = event.is_synthetic,
            "event"
        );
        if event.is_synthetic {
            return Outcome::Forward;
        }
        match self.mode {
            Mode::Disabled => Outcome::Forward,
            Mode::KeyCapture => self.capture_key(event),
            Mode::Intercepting | Mode::MacroRecording => match event.kind {
                EventType::KeyDown => {
                    let outcome = self.key_down(event, now);
                    // A reinjected down lets its real key-up through.
                    let reinjected = mem::take(&mut self.reinjected);
                    if outcome == Outcome::Suppress && !reinjected {
                        self.keys.mark_suppressed(event.key_code);
                    } else {
                        self.keys.unmark(event.key_code);
                    }
                    outcome
                }
                EventType::KeyUp => {
                    let outcome = self.key_up(event, now);
                    self.hold.note_key_up(now);
                    outcome
                }
                EventType::FlagsChanged => {
                    self.flags_changed(event);
                    Outcome::Forward
                }
            },
        }
    }

    /// Resolve a timer fire. Stale fires do nothing.
    pub fn on_timer(&mut self, purpose: TimerPurpose, handle: TimerHandle) {
        match purpose {
            TimerPurpose::Capture => {
                if let Some(code) = self.capture.on_timer(handle) {
                    trace!(key_code = code, "capture fired");
                }
            }
            TimerPurpose::Promote | TimerPurpose::Cooldown => {
                let Some(p) = self.hold.on_timer(handle) else {
                    return;
                };
                self.notify(UiEvent::GestureChanged {
                    phase: HoldPhase::Held,
                    key_code: p.key_code,
                });
                if let Some(wf) = p.dispatch {
                    self.deps.dispatch(&wf, &p.origin, false);
                }
            }
        }
    }

    /// Install a rebuilt cache. All progress is discarded.
    pub fn set_cache(&mut self, cache: TriggerCache) {
        info!(entries = cache.len(), "trigger cache replaced");
        self.cache = cache;
        self.reset_all();
    }

    /// Set the frontmost application bundle id.
    pub fn set_frontmost(&mut self, app: Option<String>) {
        debug!(?app, "frontmost");
        self.ctx.app = app;
    }

    /// Set the active user modes, in priority order.
    pub fn set_user_modes(&mut self, modes: Vec<UserModeId>) {
        debug!(?modes, "user modes");
        self.ctx.modes = modes;
    }

    /// Switch interception mode. A change cancels every timer and resets all state.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        info!(from = ?self.mode, to = ?mode, "mode change");
        self.reset_all();
        self.mode = mode;
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Point-in-time state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            partial: self.partial.clone(),
            prefix_text: self.cache.prefix_text(self.partial.prefix),
            hold: self.hold.phase(),
        }
    }

    /// Chords for `app` starting with `text`.
    pub fn prefix_listing(&self, app: Option<&str>, text: &str) -> Vec<PrefixListing> {
        self.cache.prefix_listing(app, text)
    }

    fn capture_key(&self, event: &KeyEvent) -> Outcome {
        match event.kind {
            EventType::KeyDown => {
                if !event.is_repeat {
                    self.notify(UiEvent::KeyCaptured {
                        key_code: event.key_code,
                        flags: event.flags,
                    });
                }
                Outcome::Suppress
            }
            EventType::KeyUp => Outcome::Suppress,
            EventType::FlagsChanged => Outcome::Forward,
        }
    }

    fn key_down(&mut self, event: &KeyEvent, now: Instant) -> Outcome {
        let code = event.key_code;
        if self.capture.is_confirmed(code) {
            return Outcome::Suppress;
        }
        if self.hold.key_down(event, &*self.timers) {
            return Outcome::Suppress;
        }
        if event.is_repeat {
            if let Some(handler) = self.keys.repeating(code).cloned() {
                return self.replay(&handler, event);
            }
            if self.keys.is_suppressed(code) {
                return Outcome::Suppress;
            }
        }
        if code == Key::Escape as u16 && !self.partial.is_idle() && !event.flags.has_modifiers() {
            debug!("escape cancels chord");
            self.cancel_partial();
            return Outcome::Suppress;
        }
        self.capture.cancel(&*self.timers);
        self.probe(event, now)
    }

    fn probe(&mut self, event: &KeyEvent, now: Instant) -> Outcome {
        let key = event.lookup_key();
        match self.cache.lookup(&self.ctx, self.partial.prefix, &key) {
            MatchResult::None => {
                if !self.partial.is_idle() {
                    debug!(key_code = event.key_code, "chord abandoned");
                    self.abandon();
                    // The prefix is idle now, so this recurses at most once.
                    let outcome = self.probe(event, now);
                    return self.after_replay(event, outcome);
                }
                if self.mode == Mode::MacroRecording {
                    self.deps.record(event);
                }
                Outcome::Forward
            }
            MatchResult::PartialMatch { prefix, workflow } => {
                self.on_partial(event, prefix, workflow, now)
            }
            MatchResult::ExactMatch(workflow) => self.on_exact(event, workflow, now),
        }
    }

    fn on_partial(
        &mut self,
        event: &KeyEvent,
        prefix: PrefixId,
        workflow: Arc<Workflow>,
        now: Instant,
    ) -> Outcome {
        let c = *workflow.conditions();
        if c.has_hold_duration || c.is_leader_key {
            match self.hold.begin(event, &workflow, false, now, &*self.timers) {
                Begin::Noise => {
                    if self.partial.is_idle() {
                        return Outcome::Forward;
                    }
                    self.abandon();
                    return self.after_replay(event, Outcome::Forward);
                }
                Begin::Started => {
                    if let Some(d) = workflow.hold_duration() {
                        self.capture.schedule(event.key_code, d, &*self.timers);
                    }
                    self.notify(UiEvent::GestureChanged {
                        phase: self.hold.phase(),
                        key_code: event.key_code,
                    });
                }
                Begin::Busy => {}
            }
        }
        debug!(
            prefix = %self.cache.prefix_text(prefix),
            workflow = workflow.id(),
            "partial match"
        );
        self.partial = PartialMatchState {
            prefix,
            workflow: Some(workflow.clone()),
        };
        self.pending.push(*event);
        self.notify(UiEvent::PartialMatch {
            prefix: self.cache.prefix_text(prefix),
            workflow,
        });
        Outcome::Suppress
    }

    fn on_exact(&mut self, event: &KeyEvent, workflow: Arc<Workflow>, now: Instant) -> Outcome {
        let c = *workflow.conditions();
        let pass = if c.is_passthrough {
            Outcome::Forward
        } else {
            Outcome::Suppress
        };
        if event.is_repeat {
            // A repeat without a cached handler never dispatches.
            return pass;
        }
        debug!(workflow = workflow.id(), "exact match");
        self.reset_prefix();
        if self.hold.origin().is_some_and(|o| o != event.key_code) {
            self.hold.complete();
        }
        self.previous_exact = Some((event.key_code, workflow.clone()));

        if let Some(target) = c.rebind_target {
            self.keys
                .set_repeating(event.key_code, RepeatingHandler::Rebind(target));
            return Outcome::Rewrite {
                key_code: target.key_code(),
                kind: EventType::KeyDown,
                flags: target.flags(),
            };
        }
        if c.should_run_on_key_up {
            return pass;
        }
        if c.has_hold_duration || c.is_leader_key {
            match self.hold.begin(event, &workflow, true, now, &*self.timers) {
                Begin::Started => {
                    self.notify(UiEvent::GestureChanged {
                        phase: self.hold.phase(),
                        key_code: event.key_code,
                    });
                    return Outcome::Suppress;
                }
                Begin::Noise => return Outcome::Forward,
                Begin::Busy => {}
            }
        }
        self.deps.dispatch(&workflow, event, false);
        if c.allow_repeat && c.is_repeat_safe {
            self.keys
                .set_repeating(event.key_code, RepeatingHandler::Dispatch(workflow));
        }
        pass
    }

    fn replay(&self, handler: &RepeatingHandler, event: &KeyEvent) -> Outcome {
        match handler {
            RepeatingHandler::Dispatch(wf) => {
                self.deps.dispatch(wf, event, true);
                if wf.conditions().is_passthrough {
                    Outcome::Forward
                } else {
                    Outcome::Suppress
                }
            }
            RepeatingHandler::Rebind(target) => Outcome::Rewrite {
                key_code: target.key_code(),
                kind: EventType::KeyDown,
                flags: target.flags(),
            },
        }
    }

    fn key_up(&mut self, event: &KeyEvent, now: Instant) -> Outcome {
        let code = event.key_code;
        let was_suppressed = self.keys.take_suppressed(code);

        if let Some(release) = self.hold.key_up(event, now, &*self.timers) {
            self.capture.release(code, &*self.timers);
            self.notify(UiEvent::GestureChanged {
                phase: HoldPhase::Idle,
                key_code: code,
            });
            if self.previous_exact.as_ref().is_some_and(|(c, _)| *c == code) {
                self.previous_exact = None;
            }
            return match release {
                Release::AfterHold | Release::Consumed => {
                    self.reset_prefix();
                    Outcome::Suppress
                }
                Release::Rebind(target) => Outcome::Rewrite {
                    key_code: target,
                    kind: EventType::KeyUp,
                    flags: event.flags,
                },
                Release::Tap(origin) => {
                    self.reset_prefix();
                    self.deps.tap(origin.key_code, origin.flags);
                    Outcome::Suppress
                }
            };
        }
        self.capture.release(code, &*self.timers);

        if let Some((c, wf)) = &self.previous_exact
            && *c == code
        {
            let wf = wf.clone();
            self.previous_exact = None;
            if wf.conditions().should_run_on_key_up {
                self.deps.dispatch(&wf, event, false);
                return if wf.conditions().is_passthrough {
                    Outcome::Forward
                } else {
                    Outcome::Suppress
                };
            }
        }

        match self.keys.take_repeating(code) {
            Some(RepeatingHandler::Dispatch(wf)) => self.deps.dispatch(&wf, event, true),
            Some(RepeatingHandler::Rebind(target)) => {
                return Outcome::Rewrite {
                    key_code: target.key_code(),
                    kind: EventType::KeyUp,
                    flags: target.flags(),
                };
            }
            None => {}
        }

        if was_suppressed {
            return Outcome::Suppress;
        }
        if self.mode == Mode::MacroRecording {
            self.deps.record(event);
        }
        Outcome::Forward
    }

    fn flags_changed(&mut self, event: &KeyEvent) {
        // A miss never resets the chord: modifiers are pressed on the way to
        // the next element.
        let key = event.lookup_key();
        if let MatchResult::ExactMatch(wf) = self.cache.lookup(&self.ctx, self.partial.prefix, &key)
        {
            debug!(workflow = wf.id(), "modifier match");
            self.deps.dispatch(&wf, event, false);
        }
    }

    /// Replay the suppressed prefix and return to idle.
    fn abandon(&mut self) {
        for ev in mem::take(&mut self.pending) {
            self.deps.tap(ev.key_code, ev.flags);
        }
        self.cancel_partial();
    }

    /// Post the key-down that follows a replayed prefix ourselves so the
    /// application sees it after the prefix, and swallow the original.
    ///
    /// Falls back to `outcome` when nothing needs posting or the post fails.
    fn after_replay(&mut self, event: &KeyEvent, outcome: Outcome) -> Outcome {
        let (key_code, kind, flags) = match outcome {
            Outcome::Suppress => return outcome,
            Outcome::Forward => (event.key_code, event.kind, event.flags),
            Outcome::Rewrite {
                key_code,
                kind,
                flags,
            } => (key_code, kind, flags),
        };
        if !self.deps.post(key_code, kind, flags) {
            return outcome;
        }
        trace!(key_code, "reinjected after replay");
        self.reinjected = true;
        Outcome::Suppress
    }

    /// Return to idle discarding the suppressed prefix.
    fn cancel_partial(&mut self) {
        self.hold.reset(&*self.timers);
        self.capture.cancel(&*self.timers);
        self.reset_prefix();
    }

    fn reset_prefix(&mut self) {
        self.pending.clear();
        if self.partial.is_idle() {
            return;
        }
        self.partial = PartialMatchState::default();
        self.notify(UiEvent::PartialReset);
    }

    fn reset_all(&mut self) {
        self.hold.reset(&*self.timers);
        self.capture.reset(&*self.timers);
        self.reset_prefix();
        // Release rebind targets whose real key-up will no longer be rewritten.
        for target in self.keys.take_rebinds() {
            debug!(key_code = target.key_code(), "releasing rebind target");
            self.deps.post(target.key_code(), EventType::KeyUp, target.flags());
        }
        self.keys.clear();
        self.previous_exact = None;
    }

    fn notify(&self, event: UiEvent) {
        if let Err(e) = self.deps.notifier.send(event) {
            trace!("ui hint dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    const CONFIG: &str = r#"(
        groups: [(
            id: "g",
            workflows: [
                (id: "hold", trigger: keyboard(shortcuts: ["f"], hold_duration: 0.2)),
                (id: "on-up", trigger: keyboard(shortcuts: ["u"], key_up: true)),
            ],
        )],
    )"#;

    #[test]
    fn hold_release_forgets_the_exact_match() {
        let mut h = Harness::from_ron(CONFIG).unwrap();
        h.down("f");
        assert!(h.coordinator.previous_exact.is_some());
        h.advance(50);
        h.up("f");
        assert!(h.coordinator.previous_exact.is_none());
    }

    #[test]
    fn key_up_trigger_clears_the_exact_match() {
        let mut h = Harness::from_ron(CONFIG).unwrap();
        h.down("u");
        h.up("u");
        assert!(h.coordinator.previous_exact.is_none());
        assert_eq!(h.dispatcher.ids(), vec!["on-up"]);
    }
}
