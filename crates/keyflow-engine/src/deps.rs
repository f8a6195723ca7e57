//! Collaborator seams.
//!
//! The coordinator talks to the outside world only through these traits,
//! so tests can substitute recording fakes.

use std::sync::Arc;

use async_trait::async_trait;
use config::Workflow;
use mac_keycode::{EventType, Flags};
use relaykey::RelayKey;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::{KeyEvent, NotificationDispatcher};

/// Fire-and-forget command dispatch.
///
/// Called on the coordination timeline; implementations must return
/// immediately.
pub trait CommandDispatcher: Send + Sync {
    /// Run `workflow`'s commands for `event`.
    fn dispatch(&self, workflow: &Arc<Workflow>, event: &KeyEvent, is_repeat: bool);
}

/// Asynchronous command execution.
#[async_trait]
pub trait CommandExecutor: Send + Sync + 'static {
    /// Execute `workflow`'s commands to completion.
    async fn execute(&self, workflow: Arc<Workflow>, event: KeyEvent, is_repeat: bool);
}

/// Adapts a [`CommandExecutor`] into a [`CommandDispatcher`] by spawning one
/// tokio task per dispatch.
pub struct SpawningDispatcher<E> {
    executor: Arc<E>,
}

impl<E: CommandExecutor> SpawningDispatcher<E> {
    /// Wrap `executor`.
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }
}

impl<E: CommandExecutor> CommandDispatcher for SpawningDispatcher<E> {
    fn dispatch(&self, workflow: &Arc<Workflow>, event: &KeyEvent, is_repeat: bool) {
        let Ok(rt) = Handle::try_current() else {
            warn!(workflow = workflow.id(), "no runtime; dropping dispatch");
            return;
        };
        let executor = self.executor.clone();
        let workflow = workflow.clone();
        let event = *event;
        rt.spawn(async move {
            executor.execute(workflow, event, is_repeat).await;
        });
    }
}

/// Posts synthetic key events. Failures are reported, never fatal.
pub trait Injector: Send + Sync {
    /// Post one event.
    fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> relaykey::Result<()>;

    /// Post a key-down followed by a key-up. Stops at the first failure.
    fn tap(&self, key_code: u16, flags: Flags) -> relaykey::Result<()> {
        self.post(key_code, EventType::KeyDown, flags)?;
        self.post(key_code, EventType::KeyUp, flags)
    }
}

impl Injector for RelayKey {
    fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> relaykey::Result<()> {
        Self::post(self, key_code, kind, flags)
    }

    fn tap(&self, key_code: u16, flags: Flags) -> relaykey::Result<()> {
        Self::tap(self, key_code, flags)
    }
}

/// Receives events that matched nothing while macro recording is active.
pub trait MacroRecorder: Send + Sync {
    /// Record one event.
    fn record(&self, event: &KeyEvent);
}

/// Everything the coordinator calls out to.
#[derive(Clone)]
pub struct Collaborators {
    /// Command dispatch.
    pub dispatcher: Arc<dyn CommandDispatcher>,
    /// Synthetic event injection.
    pub injector: Arc<dyn Injector>,
    /// Macro recording sink, if any.
    pub recorder: Option<Arc<dyn MacroRecorder>>,
    /// UI hint sink.
    pub notifier: NotificationDispatcher,
}

impl Collaborators {
    /// Collaborators with the given dispatcher, posting through `RelayKey`.
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>) -> Self {
        Self {
            dispatcher,
            injector: Arc::new(RelayKey::new()),
            recorder: None,
            notifier: NotificationDispatcher::none(),
        }
    }

    pub(crate) fn dispatch(&self, workflow: &Arc<Workflow>, event: &KeyEvent, is_repeat: bool) {
        debug!(workflow = workflow.id(), is_repeat, "dispatch");
        self.dispatcher.dispatch(workflow, event, is_repeat);
    }

    /// Post a down then up of `key_code`. Failures are logged and swallowed.
    pub(crate) fn tap(&self, key_code: u16, flags: Flags) {
        if let Err(e) = self.injector.tap(key_code, flags) {
            warn!(key_code, "tap injection failed: {}", e);
        }
    }

    /// Post one event, returning false if it could not be posted.
    pub(crate) fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> bool {
        match self.injector.post(key_code, kind, flags) {
            Ok(()) => true,
            Err(e) => {
                warn!(key_code, ?kind, "injection failed: {}", e);
                false
            }
        }
    }

    pub(crate) fn record(&self, event: &KeyEvent) {
        if let Some(r) = &self.recorder {
            r.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config::Workflow;
    use mac_keycode::Flags;
    use parking_lot::Mutex;
    use tokio::time;

    use super::*;
    use crate::test_support::{RecordingDispatcher, RecordingInjector};

    #[derive(Default)]
    struct Exec {
        seen: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl CommandExecutor for Arc<Exec> {
        async fn execute(&self, workflow: Arc<Workflow>, _event: KeyEvent, is_repeat: bool) {
            self.seen.lock().push((workflow.id().to_string(), is_repeat));
        }
    }

    #[tokio::test]
    async fn spawning_dispatcher_runs_executor() {
        let exec = Arc::new(Exec::default());
        let d = SpawningDispatcher::new(exec.clone());
        let wf = Arc::new(Workflow::new("w", "", None, vec![]));
        d.dispatch(&wf, &KeyEvent::down(0, Flags::empty()), true);
        time::sleep(Duration::from_millis(5)).await;
        assert_eq!(*exec.seen.lock(), vec![("w".to_string(), true)]);
    }

    #[test]
    fn spawning_dispatcher_without_runtime_drops() {
        let exec = Arc::new(Exec::default());
        let d = SpawningDispatcher::new(exec.clone());
        let wf = Arc::new(Workflow::new("w", "", None, vec![]));
        d.dispatch(&wf, &KeyEvent::down(0, Flags::empty()), false);
        assert!(exec.seen.lock().is_empty());
    }

    #[test]
    fn tap_goes_through_the_injector() {
        let injector = Arc::new(RecordingInjector::default());
        let mut deps = Collaborators::new(Arc::new(RecordingDispatcher::default()));
        deps.injector = injector.clone();
        deps.tap(7, Flags::SHIFT);
        assert_eq!(
            injector.posted(),
            vec![
                (7, EventType::KeyDown, Flags::SHIFT),
                (7, EventType::KeyUp, Flags::SHIFT),
            ]
        );

        injector.set_failing(true);
        deps.tap(8, Flags::empty());
        assert!(!deps.post(8, EventType::KeyDown, Flags::empty()));
        assert_eq!(injector.posted().len(), 2);
    }
}
