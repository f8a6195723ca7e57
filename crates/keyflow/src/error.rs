//! Error handling for the keyflow binary.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for keyflow operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Configuration loading or validation errors.
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    /// Errors surfaced by the engine.
    #[error("Engine error: {0}")]
    Engine(#[from] keyflow_engine::Error),
    /// The trace file could not be parsed.
    #[error("Failed to parse trace {path}: {message}")]
    Trace {
        /// Trace file.
        path: PathBuf,
        /// Parser message with location.
        message: String,
    },
    /// A key or modifier spec in the trace did not resolve.
    #[error("Unknown key spec '{0}'")]
    KeySpec(String),
}

impl Error {
    /// Render for the terminal; configuration errors get their excerpt.
    pub fn pretty(&self) -> String {
        match self {
            Self::Config(e) => e.pretty(),
            other => format!("error: {other}"),
        }
    }
}
