//! Drive the engine from a recorded trace.
//!
//! Commands are not executed; every dispatch and injection is written to the
//! transcript instead, next to the outcome of each event.

use std::sync::Arc;

use async_trait::async_trait;
use config::{Config, UserModeId, Workflow};
use keyflow_engine::{
    Collaborators, CommandExecutor, Engine, Injector, KeyEvent, NotificationDispatcher, Outcome,
    SpawningDispatcher, UiEvent,
};
use mac_keycode::{EventKey, EventType, Flags};
use parking_lot::Mutex;
use relaykey::RelayKey;
use tokio::{
    runtime::Builder,
    sync::mpsc::{self, Receiver},
    task, time,
};
use tracing::debug;

use crate::{
    Result,
    cli::ReplayArgs,
    trace::{self, Action, TraceStep},
};

/// Lines produced by a replay, optionally echoed as they arrive.
#[derive(Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
    echo: bool,
}

impl Transcript {
    /// A transcript that prints each line to stdout as well.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    fn push(&self, line: String) {
        if self.echo {
            println!("{line}");
        }
        self.lines.lock().push(line);
    }

    /// Everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

struct EchoExecutor {
    transcript: Transcript,
}

#[async_trait]
impl CommandExecutor for EchoExecutor {
    async fn execute(&self, workflow: Arc<Workflow>, _event: KeyEvent, is_repeat: bool) {
        let repeat = if is_repeat { " (repeat)" } else { "" };
        self.transcript.push(format!(
            "  run {} [{} commands]{repeat}",
            workflow.id(),
            workflow.commands().len()
        ));
    }
}

struct EchoInjector {
    transcript: Transcript,
    relay: Option<RelayKey>,
}

impl Injector for EchoInjector {
    fn post(&self, key_code: u16, kind: EventType, flags: Flags) -> relaykey::Result<()> {
        self.transcript.push(format!(
            "  inject {} {}",
            kind_name(kind),
            EventKey::new(key_code, flags)
        ));
        match &self.relay {
            Some(relay) => relay.post(key_code, kind, flags),
            None => Ok(()),
        }
    }
}

fn kind_name(kind: EventType) -> &'static str {
    match kind {
        EventType::KeyDown => "down",
        EventType::KeyUp => "up",
        EventType::FlagsChanged => "flags",
    }
}

/// Short text form of an outcome.
pub fn describe(outcome: Outcome) -> String {
    match outcome {
        Outcome::Forward => "forward".to_string(),
        Outcome::Suppress => "suppress".to_string(),
        Outcome::Rewrite {
            key_code,
            kind,
            flags,
        } => format!("rewrite {} {}", kind_name(kind), EventKey::new(key_code, flags)),
    }
}

fn describe_ui(event: &UiEvent) -> String {
    match event {
        UiEvent::PartialMatch { prefix, workflow } => {
            format!("  ui partial {prefix} ({})", workflow.id())
        }
        UiEvent::PartialReset => "  ui reset".to_string(),
        UiEvent::GestureChanged { phase, key_code } => {
            format!("  ui gesture {phase:?} {}", EventKey::new(*key_code, Flags::empty()))
        }
        UiEvent::KeyCaptured { key_code, flags } => {
            format!("  ui captured {}", EventKey::new(*key_code, *flags))
        }
    }
}

/// Where and how a replay runs.
pub struct Session {
    /// Frontmost application at the start.
    pub app: Option<String>,
    /// Active user modes at the start.
    pub modes: Vec<UserModeId>,
    /// Post injections through the OS as well as recording them.
    pub inject: bool,
}

/// Replay `steps` against `config`, writing into `transcript`.
///
/// `wait` steps sleep on the tokio clock, so a paused runtime replays
/// instantly.
pub async fn replay(
    config: &Config,
    session: Session,
    steps: &[TraceStep],
    transcript: &Transcript,
) -> Result<()> {
    let (tx, mut ui) = mpsc::channel(256);
    let deps = Collaborators {
        dispatcher: Arc::new(SpawningDispatcher::new(EchoExecutor {
            transcript: transcript.clone(),
        })),
        injector: Arc::new(EchoInjector {
            transcript: transcript.clone(),
            relay: session.inject.then(RelayKey::new),
        }),
        recorder: None,
        notifier: NotificationDispatcher::new(tx),
    };
    let engine = Engine::spawn(deps);
    engine.set_config(config)?;
    engine.set_frontmost(session.app)?;
    engine.set_user_modes(session.modes)?;

    for step in steps {
        match step.action()? {
            Action::Event(event) => {
                let outcome = engine.handle(event).await?;
                transcript.push(format!("{step} -> {}", describe(outcome)));
            }
            Action::Wait(d) => {
                transcript.push(step.to_string());
                time::sleep(d).await;
            }
            Action::Focus(app) => {
                transcript.push(step.to_string());
                engine.set_frontmost(app)?;
            }
            Action::Modes(modes) => {
                transcript.push(step.to_string());
                engine.set_user_modes(modes)?;
            }
        }
        // Let spawned dispatches write their lines before the next step.
        task::yield_now().await;
        drain_ui(&mut ui, transcript);
    }

    let state = engine.state().await?;
    drain_ui(&mut ui, transcript);
    transcript.push(format!(
        "state: mode={:?} prefix={:?} hold={:?}",
        state.mode, state.prefix_text, state.hold
    ));
    debug!(steps = steps.len(), "replay finished");
    Ok(())
}

fn drain_ui(ui: &mut Receiver<UiEvent>, transcript: &Transcript) {
    while let Ok(event) = ui.try_recv() {
        transcript.push(describe_ui(&event));
    }
}

/// Entry point for `keyflow replay`.
pub fn run(
    config: &Config,
    app: Option<String>,
    modes: Vec<UserModeId>,
    args: &ReplayArgs,
) -> Result<()> {
    let steps = trace::load(&args.trace)?;
    let rt = Builder::new_current_thread().enable_all().build()?;
    let session = Session {
        app,
        modes,
        inject: args.inject,
    };
    let realtime = args.realtime;
    rt.block_on(async move {
        if !realtime {
            time::pause();
        }
        replay(config, session, &steps, &Transcript::echoing()).await
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const CONFIG: &str = r#"(
        groups: [(
            id: "g",
            workflows: [
                (
                    id: "chord",
                    trigger: keyboard(shortcuts: ["cmd+k", "a"]),
                    commands: [(id: "c", kind: text("hi"))],
                ),
                (
                    id: "hold",
                    trigger: keyboard(shortcuts: ["f"], hold_duration: 0.2),
                    commands: [(id: "c", kind: text("held"))],
                ),
            ],
        )],
    )"#;

    fn session() -> Session {
        Session {
            app: None,
            modes: Vec::new(),
            inject: false,
        }
    }

    async fn run_trace(src: &str) -> Vec<String> {
        let config = config::from_ron(CONFIG).unwrap();
        let steps = trace::parse(src, Path::new("t.ron")).unwrap();
        let transcript = Transcript::default();
        replay(&config, session(), &steps, &transcript).await.unwrap();
        transcript.lines()
    }

    #[test]
    fn describes_outcomes() {
        assert_eq!(describe(Outcome::Forward), "forward");
        assert_eq!(describe(Outcome::Suppress), "suppress");
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_keys_forward() {
        let lines = run_trace(r#"[down("z"), up("z")]"#).await;
        assert_eq!(lines[0], r#"down("z") -> forward"#);
        assert_eq!(lines[1], r#"up("z") -> forward"#);
        assert!(lines.last().unwrap().starts_with("state: mode=Intercepting"));
    }

    #[tokio::test(start_paused = true)]
    async fn chord_dispatches_once() {
        let lines = run_trace(r#"[down("cmd+k"), up("cmd+k"), down("a"), up("a")]"#).await;
        assert_eq!(lines[0], r#"down("cmd+k") -> suppress"#);
        assert!(lines.iter().any(|l| l.starts_with("  ui partial cmd+k")));
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("  run chord")).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn held_key_promotes_after_wait() {
        let lines = run_trace(r#"[down("f"), wait(300), up("f")]"#).await;
        assert_eq!(lines[0], r#"down("f") -> suppress"#);
        assert!(lines.iter().any(|l| l.starts_with("  run hold")));
        assert!(lines.contains(&r#"up("f") -> suppress"#.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn quick_tap_is_replayed() {
        let lines = run_trace(r#"[down("f"), wait(50), up("f")]"#).await;
        assert!(!lines.iter().any(|l| l.starts_with("  run hold")));
        assert!(lines.iter().any(|l| l.starts_with("  inject down")));
    }
}
