//! Workflows and the condition record derived from them.

use std::time::Duration;

use mac_keycode::EventKey;
use serde::{Deserialize, Serialize};

use crate::{Command, CommandKind, Trigger, command::default_true};

/// How overlapping runs of the same workflow are scheduled by the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Runs may overlap.
    #[default]
    Concurrent,
    /// Runs are queued one after another.
    Serial,
}

/// Facts about a workflow the match loop consults on every event.
///
/// A pure function of the workflow's trigger, commands and enabled flag. It
/// is recomputed wholesale whenever any of those change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionRecord {
    /// A positive hold duration is configured.
    pub has_hold_duration: bool,
    /// The triggering keystroke is forwarded after dispatch.
    pub is_passthrough: bool,
    /// The trigger is a leader key.
    pub is_leader_key: bool,
    /// Auto-repeat re-dispatches the workflow.
    pub allow_repeat: bool,
    /// Dispatch happens on key-up.
    pub should_run_on_key_up: bool,
    /// Every enabled command is safe to replay under auto-repeat.
    pub is_repeat_safe: bool,
    /// Set when the workflow only remaps its trigger to another key.
    pub rebind_target: Option<EventKey>,
}

impl ConditionRecord {
    /// Derive the record. Disabled workflows yield the all-false record.
    pub fn compute(trigger: Option<&Trigger>, commands: &[Command], enabled: bool) -> Self {
        if !enabled {
            return Self::default();
        }
        let keyboard = trigger.and_then(Trigger::as_keyboard);
        let active: Vec<&Command> = commands.iter().filter(|c| c.enabled).collect();
        let rebind_target = match active.as_slice() {
            [only] => match &only.kind {
                CommandKind::Keyboard { keys } if keys.len() == 1 => keys[0].event_key(),
                _ => None,
            },
            _ => None,
        };
        Self {
            has_hold_duration: keyboard.and_then(|k| k.hold()).is_some(),
            is_passthrough: trigger.is_some_and(Trigger::passthrough),
            is_leader_key: keyboard.is_some_and(|k| k.leader_key),
            allow_repeat: keyboard.is_some_and(|k| k.allow_repeat),
            should_run_on_key_up: keyboard.is_some_and(|k| k.key_up),
            is_repeat_safe: active.iter().all(|c| c.kind.is_repeat_safe()),
            rebind_target,
        }
    }
}

/// A trigger paired with the commands it runs.
///
/// Fields are private so the derived [`ConditionRecord`] can never go stale:
/// every setter recomputes it, as does deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWorkflow", into = "RawWorkflow")]
pub struct Workflow {
    id: String,
    name: String,
    enabled: bool,
    execution_mode: ExecutionMode,
    trigger: Option<Trigger>,
    commands: Vec<Command>,
    conditions: ConditionRecord,
}

impl Workflow {
    /// Enabled, concurrent workflow.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        trigger: Option<Trigger>,
        commands: Vec<Command>,
    ) -> Self {
        RawWorkflow {
            id: id.into(),
            name: name.into(),
            enabled: true,
            execution_mode: ExecutionMode::default(),
            trigger,
            commands,
        }
        .into()
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the workflow participates in matching.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Executor scheduling hint.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// The configured trigger.
    pub fn trigger(&self) -> Option<&Trigger> {
        self.trigger.as_ref()
    }

    /// The configured commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The derived condition record.
    pub fn conditions(&self) -> &ConditionRecord {
        &self.conditions
    }

    /// Positive hold threshold of a keyboard trigger.
    pub fn hold_duration(&self) -> Option<Duration> {
        self.trigger
            .as_ref()
            .and_then(Trigger::as_keyboard)
            .and_then(|k| k.hold())
    }

    /// Replace the trigger.
    pub fn set_trigger(&mut self, trigger: Option<Trigger>) {
        self.trigger = trigger;
        self.recompute();
    }

    /// Replace the commands.
    pub fn set_commands(&mut self, commands: Vec<Command>) {
        self.commands = commands;
        self.recompute();
    }

    /// Enable or disable.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.recompute();
    }

    /// Set the execution mode. Does not affect conditions.
    pub fn set_execution_mode(&mut self, mode: ExecutionMode) {
        self.execution_mode = mode;
    }

    fn recompute(&mut self) {
        self.conditions =
            ConditionRecord::compute(self.trigger.as_ref(), &self.commands, self.enabled);
    }
}

/// Serialized form of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkflow {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    execution_mode: ExecutionMode,
    #[serde(default)]
    trigger: Option<Trigger>,
    #[serde(default)]
    commands: Vec<Command>,
}

impl From<RawWorkflow> for Workflow {
    fn from(r: RawWorkflow) -> Self {
        let conditions = ConditionRecord::compute(r.trigger.as_ref(), &r.commands, r.enabled);
        Self {
            id: r.id,
            name: r.name,
            enabled: r.enabled,
            execution_mode: r.execution_mode,
            trigger: r.trigger,
            commands: r.commands,
            conditions,
        }
    }
}

impl From<Workflow> for RawWorkflow {
    fn from(w: Workflow) -> Self {
        Self {
            id: w.id,
            name: w.name,
            enabled: w.enabled,
            execution_mode: w.execution_mode,
            trigger: w.trigger,
            commands: w.commands,
        }
    }
}
