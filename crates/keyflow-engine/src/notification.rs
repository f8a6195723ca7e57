use std::sync::Arc;

use config::Workflow;
use mac_keycode::Flags;
use tokio::sync::mpsc::{Sender, error::TrySendError};
use tracing::trace;

use crate::{Error, Result, hold::HoldPhase};

/// Observation-only messages for on-screen hints.
#[derive(Clone, Debug)]
pub enum UiEvent {
    /// A chord advanced; `prefix` is the canonical text consumed so far.
    PartialMatch {
        /// Canonical chord prefix, e.g. `"cmd+k"`.
        prefix: String,
        /// Candidate workflow for the prefix.
        workflow: Arc<Workflow>,
    },
    /// The chord in progress was cancelled or abandoned.
    PartialReset,
    /// A hold gesture changed phase.
    GestureChanged {
        /// New phase.
        phase: HoldPhase,
        /// Key that started the gesture.
        key_code: u16,
    },
    /// A key-down seen in key capture mode.
    KeyCaptured {
        /// Raw key code.
        key_code: u16,
        /// Raw flags.
        flags: Flags,
    },
}

/// Sends hint updates to the UI layer.
///
/// Sends never block; a full or closed channel drops the message.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    tx: Option<Sender<UiEvent>>,
}

impl NotificationDispatcher {
    /// Create a dispatcher from a UI message channel.
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A dispatcher with no UI attached.
    pub fn none() -> Self {
        Self { tx: None }
    }

    /// Send one event.
    pub fn send(&self, event: UiEvent) -> Result<()> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        trace!(?event, "ui_event");
        tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => Error::ChannelFull,
            TrySendError::Closed(_) => Error::ChannelClosed,
        })
    }
}
