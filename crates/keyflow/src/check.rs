//! `keyflow check`: validate a configuration.

use std::path::Path;

use config::Config;
use tracing::{info, warn};
use trigger_cache::TriggerCache;

use crate::Result;

/// Summary of a loaded configuration.
#[derive(Debug, PartialEq, Eq)]
pub struct Report {
    /// Groups in the file.
    pub groups: usize,
    /// Workflows across all groups.
    pub workflows: usize,
    /// Compiled cache entries.
    pub entries: usize,
    /// `(workflow, spec)` pairs that never match.
    pub unresolved: Vec<(String, String)>,
}

impl Report {
    /// Inspect an already-loaded configuration.
    pub fn for_config(config: &Config) -> Self {
        let cache = TriggerCache::build(&config.groups);
        Self {
            groups: config.groups.len(),
            workflows: config.workflows().count(),
            entries: cache.len(),
            unresolved: config
                .unresolved_shortcuts()
                .into_iter()
                .map(|(w, s)| (w.to_string(), s.to_string()))
                .collect(),
        }
    }
}

/// Entry point for `keyflow check`.
pub fn run(path: &Path) -> Result<()> {
    let config = config::load_from_path(path)?;
    let report = Report::for_config(&config);
    for (workflow, spec) in &report.unresolved {
        warn!(workflow, spec, "unresolvable shortcut");
        println!("warning: workflow '{workflow}' has unresolvable shortcut '{spec}'");
    }
    info!(path = %path.display(), "configuration ok");
    println!(
        "{}: {} groups, {} workflows, {} cache entries",
        path.display(),
        report.groups,
        report.workflows,
        report.entries
    );
    Ok(())
}
