use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the keyflow engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,

    /// The UI event channel is at capacity; the message was dropped.
    #[error("UI channel full")]
    ChannelFull,

    /// The engine task has exited; no further input is accepted.
    #[error("Engine stopped")]
    EngineStopped,

    /// Configuration failed to load.
    #[error("Config error: {0}")]
    Config(#[from] config::Error),
}
