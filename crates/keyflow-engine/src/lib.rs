//! Keyflow Engine
//!
//! The engine crate decides, for every low-level keyboard event, whether it
//! reaches the foreground application:
//! - matches single keys, chords and modifier-only triggers against a
//!   compiled [`TriggerCache`]
//! - disambiguates tap, leader and hold gestures with one-shot timers
//! - dispatches matched workflows without blocking the event stream
//! - reports chord and gesture progress to an optional UI sink
//!
//! [`Engine`] runs a [`MatchCoordinator`] on a single tokio task. Events,
//! timer fires and context changes are messages on one channel, so they are
//! processed strictly in order. Collaborators are injected through the
//! traits in [`deps`].
use std::{path::Path, sync::Arc, time::Instant as StdInstant};

mod capture;
mod coordinator;
pub mod deps;
mod error;
mod event;
mod hold;
mod key_state;
mod notification;
pub mod test_support;
mod timer;

// Timing constants for warning thresholds
const KEY_PROC_WARN_MS: u64 = 5;

use config::{Config, UserModeId};
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};
use tracing::{debug, trace, warn};
use trigger_cache::{PrefixListing, TriggerCache};

pub use capture::{CAPTURE_FLOOR, ScheduledCapture};
pub use coordinator::{MatchCoordinator, Mode, PartialMatchState, Snapshot};
pub use deps::{
    Collaborators, CommandDispatcher, CommandExecutor, Injector, MacroRecorder,
    SpawningDispatcher,
};
pub use error::{Error, Result};
pub use event::{KeyEvent, Outcome};
pub use hold::{
    Begin, DEFAULT_LEADER_HOLD, HOLD_GRACE, HoldGestureCoordinator, HoldPhase, Promotion,
    RAPID_COOLDOWN, RAPID_WINDOW, Release,
};
pub use key_state::{KeyStateTracker, RepeatingHandler};
pub use notification::{NotificationDispatcher, UiEvent};
pub use timer::{OneShot, TimerDriver, TimerHandle, TimerPurpose, TokioTimers};

enum Input {
    Event {
        event: KeyEvent,
        reply: oneshot::Sender<Outcome>,
    },
    Timer {
        purpose: TimerPurpose,
        handle: TimerHandle,
    },
    SetCache(Box<TriggerCache>),
    SetFrontmost(Option<String>),
    SetUserModes(Vec<UserModeId>),
    SetMode(Mode),
    PrefixListing {
        app: Option<String>,
        text: String,
        reply: oneshot::Sender<Vec<PrefixListing>>,
    },
    State {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Handle to the engine task.
///
/// Cheap to clone. The task exits once every handle is dropped.
#[derive(Clone)]
pub struct Engine {
    tx: mpsc::UnboundedSender<Input>,
}

impl Engine {
    /// Spawn the engine task with an empty cache. Must be called within a
    /// tokio runtime.
    pub fn spawn(deps: Collaborators) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Input>();
        // Timers hold a weak sender so they never keep the task alive.
        let weak = tx.downgrade();
        let timers = TokioTimers::new(move |purpose, handle| {
            if let Some(tx) = weak.upgrade()
                && tx.send(Input::Timer { purpose, handle }).is_err()
            {
                trace!(%handle, "timer fired after engine stopped");
            }
        });
        let mut coordinator = MatchCoordinator::new(TriggerCache::empty(), deps, Arc::new(timers));

        tokio::spawn(async move {
            while let Some(input) = rx.recv().await {
                process(&mut coordinator, input);
            }
            debug!("engine task exiting");
        });
        Self { tx }
    }

    fn send(&self, input: Input) -> Result<()> {
        self.tx.send(input).map_err(|_| Error::EngineStopped)
    }

    /// Decide the fate of `event`.
    pub async fn handle(&self, event: KeyEvent) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Event { event, reply })?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Blocking variant of [`Engine::handle`] for OS callback threads.
    ///
    /// Must not be called from within an async context.
    pub fn handle_blocking(&self, event: KeyEvent) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Event { event, reply })?;
        rx.blocking_recv().map_err(|_| Error::EngineStopped)
    }

    /// Compile `config` and install it. The cache is built on the caller's thread.
    pub fn set_config(&self, config: &Config) -> Result<()> {
        let cache = TriggerCache::build(&config.groups);
        self.send(Input::SetCache(Box::new(cache)))
    }

    /// Load a configuration file and install it.
    pub fn load_config(&self, path: &Path) -> Result<()> {
        let config = config::load_from_path(path)?;
        self.set_config(&config)
    }

    /// Set the frontmost application bundle id.
    pub fn set_frontmost(&self, app: Option<String>) -> Result<()> {
        self.send(Input::SetFrontmost(app))
    }

    /// Set the active user modes, in priority order.
    pub fn set_user_modes(&self, modes: Vec<UserModeId>) -> Result<()> {
        self.send(Input::SetUserModes(modes))
    }

    /// Switch interception mode.
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.send(Input::SetMode(mode))
    }

    /// Chords registered for `app` that start with `text`.
    pub async fn prefix_listing(
        &self,
        app: Option<String>,
        text: impl Into<String>,
    ) -> Result<Vec<PrefixListing>> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::PrefixListing {
            app,
            text: text.into(),
            reply,
        })?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Coordinator state as of all previously sent inputs.
    pub async fn state(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::State { reply })?;
        rx.await.map_err(|_| Error::EngineStopped)
    }
}

fn process(coordinator: &mut MatchCoordinator, input: Input) {
    match input {
        Input::Event { event, reply } => {
            let start = StdInstant::now();
            let outcome = coordinator.handle(&event, Instant::now());
            let elapsed = start.elapsed();
            if elapsed.as_millis() as u64 > KEY_PROC_WARN_MS {
                warn!(
                    key_code = event.key_code,
                    "Key processing took {:?}", elapsed
                );
            }
            if reply.send(outcome).is_err() {
                // The caller stopped waiting; the event source has already
                // applied its own default.
                debug!(key_code = event.key_code, "outcome receiver dropped");
            }
        }
        Input::Timer { purpose, handle } => coordinator.on_timer(purpose, handle),
        Input::SetCache(cache) => coordinator.set_cache(*cache),
        Input::SetFrontmost(app) => coordinator.set_frontmost(app),
        Input::SetUserModes(modes) => coordinator.set_user_modes(modes),
        Input::SetMode(mode) => coordinator.set_mode(mode),
        Input::PrefixListing { app, text, reply } => {
            let listing = coordinator.prefix_listing(app.as_deref(), &text);
            if reply.send(listing).is_err() {
                trace!("prefix listing receiver dropped");
            }
        }
        Input::State { reply } => {
            if reply.send(coordinator.snapshot()).is_err() {
                trace!("state receiver dropped");
            }
        }
    }
}
