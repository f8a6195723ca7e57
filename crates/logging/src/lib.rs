#![warn(missing_docs)]

//! Shared logging helpers and CLI argument definitions for the keyflow workspace.
//!
//! Binaries flatten [`LogArgs`] into their clap parser, turn it into a filter
//! spec with [`LogArgs::spec`], and install a subscriber with [`init`].

use std::{env, io};

use clap::Args;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt};

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "keyflow_engine=trace,trigger_cache=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Filter spec for these arguments. See [`compute_spec`].
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        // Apps and core crates
        "keyflow",
        "keyflow_engine",
        "trigger_cache",
        "config",
        // macOS integration crates
        "mac_keycode",
        "relaykey",
        // Utilities
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

/// Install a stderr fmt subscriber filtered by `spec`.
///
/// A subscriber that is already installed wins; this only logs at debug.
pub fn init(spec: &str) {
    let installed = registry()
        .with(env_filter_from_spec(spec))
        .with(fmt::layer().with_writer(io::stderr).without_time())
        .try_init()
        .is_ok();
    if !installed {
        debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_overrides_everything() {
        assert_eq!(
            compute_spec(true, false, Some("warn"), Some("relaykey=trace")),
            "relaykey=trace"
        );
    }

    #[test]
    fn level_applies_to_our_crates() {
        let spec = compute_spec(false, false, Some("WARN"), None);
        assert!(spec.contains("keyflow_engine=warn"));
        assert!(spec.contains("trigger_cache=warn"));
        assert_eq!(spec.split(',').count(), our_crates().len());
    }

    #[test]
    fn trace_beats_debug() {
        let args = LogArgs {
            trace: true,
            debug: true,
            ..LogArgs::default()
        };
        assert!(args.spec().contains("config=trace"));
    }

    #[test]
    fn spec_builds_a_filter() {
        let f = env_filter_from_spec(&level_spec_for("debug"));
        assert!(f.to_string().contains("keyflow=debug"));
    }
}
