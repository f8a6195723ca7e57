//! Parse, validate and load configuration documents.

use std::{collections::HashSet, ffi::OsStr, fs, path::Path};

use ron::{Options, extensions::Extensions};
use tracing::debug;

use crate::{Config, Error, Result, Trigger, excerpt_at};

/// Parse and validate a RON document.
///
/// Optional fields may be written without `Some(..)` and newtype variants
/// without their inner parentheses, e.g. `trigger: keyboard(shortcuts: ["a"])`.
pub fn from_ron(src: &str) -> Result<Config> {
    let options = Options::default()
        .with_default_extension(Extensions::IMPLICIT_SOME)
        .with_default_extension(Extensions::UNWRAP_VARIANT_NEWTYPES);
    let cfg: Config = options.from_str(src).map_err(|e| {
        let (line, col) = (e.span.start.line, e.span.start.col);
        Error::Parse {
            path: None,
            line,
            col,
            message: e.code.to_string(),
            excerpt: excerpt_at(src, line, col),
        }
    })?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Parse and validate a JSON document.
pub fn from_json(src: &str) -> Result<Config> {
    let cfg: Config = serde_json::from_str(src).map_err(|e| {
        let (line, col) = (e.line().max(1), e.column().max(1));
        Error::Parse {
            path: None,
            line,
            col,
            message: e.to_string(),
            excerpt: excerpt_at(src, line, col),
        }
    })?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Load a configuration from disk, choosing the format by extension.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let parse: fn(&str) -> Result<Config> = match path.extension().and_then(OsStr::to_str) {
        Some("ron") => from_ron,
        Some("json") => from_json,
        _ => {
            return Err(Error::Read {
                path: Some(path.to_path_buf()),
                message: "Unsupported config format (expected a .ron or .json file)".to_string(),
            });
        }
    };
    let src = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    let cfg = parse(&src).map_err(|e| e.with_path(path))?;
    debug!(
        path = %path.display(),
        groups = cfg.groups.len(),
        "loaded configuration"
    );
    Ok(cfg)
}

/// Reject configurations the engine cannot interpret.
fn validate(cfg: &Config) -> Result<()> {
    let mut seen = HashSet::new();
    for w in cfg.workflows() {
        if !seen.insert(w.id()) {
            return Err(Error::validation(format!(
                "duplicate workflow id '{}'",
                w.id()
            )));
        }
        match w.trigger() {
            Some(Trigger::Keyboard(k)) => {
                if k.shortcuts.is_empty() {
                    return Err(Error::validation(format!(
                        "workflow '{}': keyboard trigger has no shortcuts",
                        w.id()
                    )));
                }
                if let Some(d) = k.hold_duration
                    && (!d.is_finite() || d < 0.0)
                {
                    return Err(Error::validation(format!(
                        "workflow '{}': invalid hold_duration {}",
                        w.id(),
                        d
                    )));
                }
            }
            Some(Trigger::Modifiers(m)) => {
                if m.modifiers.is_empty() {
                    return Err(Error::validation(format!(
                        "workflow '{}': modifier trigger has no modifiers",
                        w.id()
                    )));
                }
            }
            None => {}
        }
    }
    Ok(())
}

impl Config {
    /// `(workflow id, spec)` for every shortcut that does not resolve to a key.
    ///
    /// Such shortcuts are legal but never match.
    pub fn unresolved_shortcuts(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        for w in self.workflows() {
            match w.trigger() {
                Some(Trigger::Keyboard(k)) => {
                    for s in &k.shortcuts {
                        if s.event_key().is_none() {
                            out.push((w.id(), s.key.as_str()));
                        }
                    }
                }
                Some(Trigger::Modifiers(m)) if m.event_key().is_none() => {
                    for s in &m.modifiers {
                        out.push((w.id(), s.as_str()));
                    }
                }
                _ => {}
            }
        }
        out
    }
}
