//! Recorded key traces for `replay`.
//!
//! A trace is a RON list of steps:
//!
//! ```ron
//! [focus("com.apple.Terminal"), down("cmd+k"), up("cmd+k"), wait(50), flags("")]
//! ```

use std::{fmt, fs, path::Path, time::Duration};

use config::UserModeId;
use keyflow_engine::KeyEvent;
use mac_keycode::{EventKey, Flags, Key};
use serde::Deserialize;

use crate::{Error, Result};

/// One step of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStep {
    /// Key-down of a key spec such as `"cmd+k"`.
    Down(String),
    /// Key-up of a key spec.
    Up(String),
    /// OS auto-repeat key-down of a key spec.
    Repeat(String),
    /// Modifier state changes to exactly these modifiers; `""` releases all.
    Flags(String),
    /// Let this many milliseconds pass.
    Wait(u64),
    /// Change the frontmost application; `""` clears it.
    Focus(String),
    /// Replace the active user modes, highest priority first.
    Modes(Vec<String>),
}

/// What a step asks the replayer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Feed an event to the engine.
    Event(KeyEvent),
    /// Sleep.
    Wait(Duration),
    /// Frontmost application change.
    Focus(Option<String>),
    /// Active user modes change.
    Modes(Vec<UserModeId>),
}

fn event_key(spec: &str) -> Result<EventKey> {
    EventKey::parse(spec, true).ok_or_else(|| Error::KeySpec(spec.to_string()))
}

impl TraceStep {
    /// Resolve key specs into an [`Action`].
    pub fn action(&self) -> Result<Action> {
        Ok(match self {
            Self::Down(spec) => {
                let k = event_key(spec)?;
                Action::Event(KeyEvent::down(k.key_code(), k.flags()))
            }
            Self::Up(spec) => {
                let k = event_key(spec)?;
                Action::Event(KeyEvent::up(k.key_code(), k.flags()))
            }
            Self::Repeat(spec) => {
                let k = event_key(spec)?;
                Action::Event(KeyEvent::down(k.key_code(), k.flags()).repeat())
            }
            Self::Flags(mods) => {
                let flags = if mods.is_empty() {
                    Flags::empty()
                } else {
                    EventKey::parse_modifiers(mods, true)
                        .ok_or_else(|| Error::KeySpec(mods.clone()))?
                };
                Action::Event(KeyEvent::flags_changed(Key::Command as u16, flags))
            }
            Self::Wait(ms) => Action::Wait(Duration::from_millis(*ms)),
            Self::Focus(app) if app.is_empty() => Action::Focus(None),
            Self::Focus(app) => Action::Focus(Some(app.clone())),
            Self::Modes(ids) => {
                Action::Modes(ids.iter().map(|m| UserModeId::from(m.as_str())).collect())
            }
        })
    }
}

impl fmt::Display for TraceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down(s) => write!(f, "down({s:?})"),
            Self::Up(s) => write!(f, "up({s:?})"),
            Self::Repeat(s) => write!(f, "repeat({s:?})"),
            Self::Flags(s) => write!(f, "flags({s:?})"),
            Self::Wait(ms) => write!(f, "wait({ms})"),
            Self::Focus(s) => write!(f, "focus({s:?})"),
            Self::Modes(ids) => write!(f, "modes({ids:?})"),
        }
    }
}

/// Parse trace source; `path` is only used for error reporting.
pub fn parse(src: &str, path: &Path) -> Result<Vec<TraceStep>> {
    ron::from_str(src).map_err(|e| Error::Trace {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read and parse a trace file.
pub fn load(path: &Path) -> Result<Vec<TraceStep>> {
    let src = fs::read_to_string(path)?;
    parse(&src, path)
}
