//! Top-level configuration: groups, scope rules and user modes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Workflow;

/// The full configuration, supplied wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Workflow groups, in build order.
    #[serde(default)]
    pub groups: Vec<WorkflowGroup>,
}

impl Config {
    /// Iterate over every workflow in every group.
    pub fn workflows(&self) -> impl Iterator<Item = &Workflow> {
        self.groups.iter().flat_map(|g| g.workflows.iter())
    }
}

/// A set of workflows sharing a scope and user modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowGroup {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Disabled groups contribute nothing.
    #[serde(default)]
    pub disabled: bool,
    /// Application scope; `None` means global.
    #[serde(default)]
    pub rule: Option<Rule>,
    /// User modes under which this group's triggers are also registered.
    #[serde(default)]
    pub user_modes: Vec<UserMode>,
    /// Workflows in build order.
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

impl WorkflowGroup {
    /// Enabled, global group.
    pub fn new(id: impl Into<String>, workflows: Vec<Workflow>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            disabled: false,
            rule: None,
            user_modes: Vec::new(),
            workflows,
        }
    }

    /// Bundle ids this group applies to, or empty for global scope.
    pub fn bundle_identifiers(&self) -> &[String] {
        self.rule
            .as_ref()
            .map(|r| r.bundle_identifiers.as_slice())
            .unwrap_or(&[])
    }
}

/// Application allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Bundle identifiers; empty means global.
    #[serde(default)]
    pub bundle_identifiers: Vec<String>,
}

/// Identifier of a user mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserModeId(pub String);

impl UserModeId {
    /// Borrow the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserModeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A user-toggled mode that enables extra triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserMode {
    /// Stable identifier.
    pub id: UserModeId,
    /// Display name.
    #[serde(default)]
    pub name: String,
}
