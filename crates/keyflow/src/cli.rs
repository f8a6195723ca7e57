//! Command-line interface definitions for keyflow.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use config::UserModeId;
use logging::LogArgs;

/// Command-line interface for the `keyflow` binary.
#[derive(Parser, Debug)]
#[command(
    name = "keyflow",
    about = "Inspect keyflow configurations and replay key traces",
    version
)]
pub struct Cli {
    /// Logging controls shared across keyflow binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Path to a keyflow configuration file (RON or JSON).
    #[arg(long, short, global = true, value_name = "PATH", default_value = "keyflow.ron")]
    pub config: PathBuf,

    /// Bundle identifier of the frontmost application.
    #[arg(long, global = true, value_name = "BUNDLE_ID")]
    pub app: Option<String>,

    /// Active user mode; repeat for several, highest priority first.
    #[arg(long = "mode", global = true, value_name = "ID")]
    pub modes: Vec<String>,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Active user modes as config ids.
    pub fn user_modes(&self) -> Vec<UserModeId> {
        self.modes.iter().map(|m| UserModeId::from(m.as_str())).collect()
    }
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the configuration, reporting unresolvable shortcuts.
    Check,
    /// List chords starting with a prefix.
    List(ListArgs),
    /// Feed a recorded key trace through the engine and print every outcome.
    Replay(ReplayArgs),
}

/// Arguments for the `list` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Space-separated chord prefix, e.g. `"cmd+k a"`. Lists everything when omitted.
    #[arg(value_name = "PREFIX", default_value = "")]
    pub prefix: String,
}

/// Arguments for the `replay` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// RON trace file: a list of steps such as `down("a")`, `wait(50)`, `up("a")`.
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Honour `wait` steps in wall-clock time instead of advancing a paused clock.
    #[arg(long)]
    pub realtime: bool,

    /// Also post replayed and rebound keys to the OS (macOS only).
    #[arg(long)]
    pub inject: bool,
}
