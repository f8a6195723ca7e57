//! Commands a workflow runs when it matches.
//!
//! Executing commands is the job of the host application; the engine only
//! needs to know which kinds are safe to repeat and whether a workflow is a
//! plain key rebind.

use serde::{Deserialize, Serialize};

use crate::Shortcut;

/// A single command within a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Disabled commands are skipped and ignored by condition derivation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// What the command does.
    pub kind: CommandKind,
}

/// Serde default for `enabled` flags.
pub(crate) fn default_true() -> bool {
    true
}

impl Command {
    /// Enabled command with an empty name.
    pub fn new(id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            enabled: true,
            kind,
        }
    }
}

/// Command payloads, opaque to the engine apart from their kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CommandKind {
    /// Launch or focus an application by bundle id.
    Application(String),
    /// A built-in host action.
    Builtin(String),
    /// Post one or more keystrokes.
    Keyboard { keys: Vec<Shortcut> },
    /// Select a menu bar item by path.
    Menubar(Vec<String>),
    /// A mouse action.
    Mouse(String),
    /// Open a file or URL.
    Open(String),
    /// Run a script.
    Script(String),
    /// Run a named system shortcut.
    Shortcut(String),
    /// A system command such as sleep or lock.
    SystemCommand(String),
    /// Type a string of text.
    Text(String),
    /// A window management action.
    Window(String),
}

impl CommandKind {
    /// Kinds that behave the same when replayed on every OS auto-repeat.
    pub fn is_repeat_safe(&self) -> bool {
        matches!(self, Self::Keyboard { .. } | Self::Mouse(_))
    }
}
