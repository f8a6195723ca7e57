//! Test support utilities for keyflow-engine unit and integration tests.
//! These helpers are public so integration tests and downstream tools can
//! drive a coordinator without an OS event tap.

use std::{sync::Arc, time::Duration};

use config::{Config, WorkflowGroup};
use mac_keycode::{EventKey, EventType, Flags, Key};
use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, Receiver},
    time::Instant,
};
use trigger_cache::TriggerCache;

use crate::{
    Collaborators, CommandDispatcher, Injector, KeyEvent, MacroRecorder, MatchCoordinator,
    NotificationDispatcher, Outcome, Snapshot, UiEvent,
    timer::{TimerDriver, TimerHandle, TimerPurpose},
};

/// One recorded dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatched {
    /// Workflow id.
    pub workflow: String,
    /// Originating event.
    pub event: KeyEvent,
    /// Repeat flag passed to the dispatcher.
    pub is_repeat: bool,
}

/// Dispatcher that records every call.
#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<Dispatched>>,
}

impl RecordingDispatcher {
    /// Every dispatch so far.
    pub fn calls(&self) -> Vec<Dispatched> {
        self.calls.lock().clone()
    }

    /// Workflow ids dispatched so far, in order.
    pub fn ids(&self) -> Vec<String> {
        self.calls.lock().iter().map(|d| d.workflow.clone()).collect()
    }

    /// Number of dispatches of `id`.
    pub fn count(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|d| d.workflow == id).count()
    }
}

impl CommandDispatcher for RecordingDispatcher {
    fn dispatch(&self, workflow: &Arc<config::Workflow>, event: &KeyEvent, is_repeat: bool) {
        self.calls.lock().push(Dispatched {
            workflow: workflow.id().to_string(),
            event: *event,
            is_repeat,
        });
    }
}

/// Injector that records every post and can be told to fail.
#[derive(Default)]
pub struct RecordingInjector {
    posted: Mutex<Vec<(u16, EventType, Flags)>>,
    failing: Mutex<bool>,
}

impl RecordingInjector {
    /// Make subsequent posts fail (nothing is recorded while failing).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Every successful post so far.
    pub fn posted(&self) -> Vec<(u16, EventType, Flags)> {
        self.posted.lock().clone()
    }

    /// Key codes of posted key-downs.
    pub fn downs(&self) -> Vec<u16> {
        self.posted
            .lock()
            .iter()
            .filter(|(_, kind, _)| *kind == EventType::KeyDown)
            .map(|(code, _, _)| *code)
            .collect()
    }
}

impl Injector for RecordingInjector {
    fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> relaykey::Result<()> {
        if *self.failing.lock() {
            return Err(relaykey::Error::EventCreate);
        }
        self.posted.lock().push((key_code, kind, flags));
        Ok(())
    }
}

/// Macro recorder that keeps every event.
#[derive(Default)]
pub struct RecordingRecorder {
    events: Mutex<Vec<KeyEvent>>,
}

impl RecordingRecorder {
    /// Recorded events.
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().clone()
    }
}

impl MacroRecorder for RecordingRecorder {
    fn record(&self, event: &KeyEvent) {
        self.events.lock().push(*event);
    }
}

#[derive(Default)]
struct ManualInner {
    now: Duration,
    next: u64,
    armed: Vec<(Duration, TimerHandle, TimerPurpose)>,
}

/// Timer driver with a manual clock. Nothing fires until [`ManualTimers::advance`].
#[derive(Default)]
pub struct ManualTimers {
    inner: Mutex<ManualInner>,
}

impl ManualTimers {
    /// Create a driver at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and return the timers now due, earliest first.
    pub fn advance(&self, by: Duration) -> Vec<(TimerPurpose, TimerHandle)> {
        let mut inner = self.inner.lock();
        inner.now += by;
        let now = inner.now;
        let mut due: Vec<(Duration, TimerHandle, TimerPurpose)> = Vec::new();
        inner.armed.retain(|t| {
            if t.0 <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(deadline, handle, _)| (*deadline, *handle));
        due.into_iter().map(|(_, h, p)| (p, h)).collect()
    }

    /// Number of armed timers for `purpose`.
    pub fn live_count(&self, purpose: TimerPurpose) -> usize {
        self.inner
            .lock()
            .armed
            .iter()
            .filter(|t| t.2 == purpose)
            .count()
    }

    /// Total number of armed timers.
    pub fn live(&self) -> usize {
        self.inner.lock().armed.len()
    }
}

impl TimerDriver for ManualTimers {
    fn arm(&self, purpose: TimerPurpose, delay: Duration) -> TimerHandle {
        let mut inner = self.inner.lock();
        let handle = TimerHandle(inner.next);
        inner.next += 1;
        let deadline = inner.now + delay;
        inner.armed.push((deadline, handle, purpose));
        handle
    }

    fn disarm(&self, handle: TimerHandle) {
        self.inner.lock().armed.retain(|t| t.1 != handle);
    }
}

/// Parse a key spec the way the OS reports it, with side bits set.
///
/// Panics on an invalid spec; test input is expected to be well formed.
pub fn key(spec: &str) -> EventKey {
    match EventKey::parse(spec, true) {
        Some(k) => k,
        None => panic!("invalid key spec {spec:?}"),
    }
}

/// A coordinator wired to recording fakes and a manual clock.
pub struct Harness {
    /// The coordinator under test.
    pub coordinator: MatchCoordinator,
    /// Manual timers shared with the coordinator.
    pub timers: Arc<ManualTimers>,
    /// Recorded dispatches.
    pub dispatcher: Arc<RecordingDispatcher>,
    /// Recorded injections.
    pub injector: Arc<RecordingInjector>,
    /// Recorded macro events.
    pub recorder: Arc<RecordingRecorder>,
    ui: Receiver<UiEvent>,
    start: Instant,
    elapsed: Duration,
}

impl Harness {
    /// Build a harness over `groups`.
    pub fn new(groups: &[WorkflowGroup]) -> Self {
        let timers = Arc::new(ManualTimers::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let injector = Arc::new(RecordingInjector::default());
        let recorder = Arc::new(RecordingRecorder::default());
        let (tx, ui) = mpsc::channel(1024);
        let deps = Collaborators {
            dispatcher: dispatcher.clone(),
            injector: injector.clone(),
            recorder: Some(recorder.clone()),
            notifier: NotificationDispatcher::new(tx),
        };
        let coordinator = MatchCoordinator::new(TriggerCache::build(groups), deps, timers.clone());
        Self {
            coordinator,
            timers,
            dispatcher,
            injector,
            recorder,
            ui,
            start: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Build a harness from a RON configuration.
    pub fn from_ron(src: &str) -> config::Result<Self> {
        let cfg: Config = config::from_ron(src)?;
        Ok(Self::new(&cfg.groups))
    }

    /// Current harness time.
    pub fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    /// Feed one event.
    pub fn send(&mut self, event: KeyEvent) -> Outcome {
        let now = self.now();
        self.coordinator.handle(&event, now)
    }

    /// Key-down of `spec`.
    pub fn down(&mut self, spec: &str) -> Outcome {
        let k = key(spec);
        self.send(KeyEvent::down(k.key_code(), k.flags()))
    }

    /// Auto-repeat key-down of `spec`.
    pub fn repeat(&mut self, spec: &str) -> Outcome {
        let k = key(spec);
        self.send(KeyEvent::down(k.key_code(), k.flags()).repeat())
    }

    /// Key-up of `spec`.
    pub fn up(&mut self, spec: &str) -> Outcome {
        let k = key(spec);
        self.send(KeyEvent::up(k.key_code(), k.flags()))
    }

    /// Down then up of `spec`, returning both outcomes.
    pub fn tap(&mut self, spec: &str) -> (Outcome, Outcome) {
        (self.down(spec), self.up(spec))
    }

    /// Modifier change to exactly `mods` (e.g. `"cmd+opt"`, or `""` for none).
    pub fn flags(&mut self, mods: &str) -> Outcome {
        let flags = if mods.is_empty() {
            Flags::empty()
        } else {
            match EventKey::parse_modifiers(mods, true) {
                Some(f) => f,
                None => panic!("invalid modifier spec {mods:?}"),
            }
        };
        self.send(KeyEvent::flags_changed(Key::Command as u16, flags))
    }

    /// Advance the clock by `ms`, firing every timer that falls due.
    pub fn advance(&mut self, ms: u64) {
        let by = Duration::from_millis(ms);
        for (purpose, handle) in self.timers.advance(by) {
            self.coordinator.on_timer(purpose, handle);
        }
        self.elapsed += by;
    }

    /// Drain UI events emitted so far.
    pub fn ui_events(&mut self) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(e) = self.ui.try_recv() {
            out.push(e);
        }
        out
    }

    /// Coordinator snapshot.
    pub fn state(&self) -> Snapshot {
        self.coordinator.snapshot()
    }
}
