//! `keyflow list`: chords continuing a prefix.

use config::Config;
use trigger_cache::TriggerCache;

/// Rows of `chord`, `workflow id` and `scope`, sorted by chord.
pub fn rows(config: &Config, app: Option<&str>, prefix: &str) -> Vec<(String, String, String)> {
    let cache = TriggerCache::build(&config.groups);
    let mut rows: Vec<_> = cache
        .prefix_listing(app, prefix)
        .into_iter()
        .map(|l| {
            let scope = if l.global {
                "global".to_string()
            } else {
                app.unwrap_or_default().to_string()
            };
            (l.chord, l.workflow.id().to_string(), scope)
        })
        .collect();
    rows.sort();
    rows
}

/// Entry point for `keyflow list`.
pub fn run(config: &Config, app: Option<&str>, prefix: &str) {
    let rows = rows(config, app, prefix);
    if rows.is_empty() {
        println!("no chords start with '{prefix}'");
        return;
    }
    let width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    for (chord, id, scope) in rows {
        println!("{chord:<width$}  {id}  ({scope})");
    }
}
