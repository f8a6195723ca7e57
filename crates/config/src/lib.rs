//! Workflow configuration for keyflow.
//!
//! A configuration is a list of [`WorkflowGroup`]s. Each group scopes its
//! workflows to a set of applications (or globally) and may declare user
//! modes. Each [`Workflow`] pairs an optional [`Trigger`] with the commands it
//! runs, and carries a derived [`ConditionRecord`] that the engine consults on
//! every match.

use std::result::Result as StdResult;

mod command;
mod error;
mod loader;
mod trigger;
mod types;
mod workflow;

#[cfg(test)]
mod test_parse;

pub use command::{Command, CommandKind};
pub use error::{Error, excerpt_at};
pub use loader::{from_json, from_ron, load_from_path};
pub use trigger::{KeyboardTrigger, ModifierTrigger, Shortcut, Trigger};
pub use types::{Config, Rule, UserMode, UserModeId, WorkflowGroup};
pub use workflow::{ConditionRecord, ExecutionMode, Workflow};

/// Alias for results produced by this crate.
pub type Result<T> = StdResult<T, Error>;
