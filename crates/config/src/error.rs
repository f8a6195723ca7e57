//! Configuration errors.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Why a configuration could not be used.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// The file could not be read, or has an unknown extension.
    #[error("{message}")]
    Read {
        /// File being read, when known.
        path: Option<PathBuf>,
        /// Underlying cause.
        message: String,
    },
    /// RON or JSON that does not deserialize, with the offending location.
    #[error("{message}")]
    Parse {
        /// Source file, when known.
        path: Option<PathBuf>,
        /// 1-based line.
        line: usize,
        /// 1-based column.
        col: usize,
        /// Parser message.
        message: String,
        /// Source lines around the location with a caret under the column.
        excerpt: String,
    },
    /// Well-formed input describing an unusable configuration.
    #[error("{message}")]
    Validation {
        /// Source file, when known.
        path: Option<PathBuf>,
        /// What is wrong.
        message: String,
    },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            path: None,
            message: message.into(),
        }
    }

    fn path_slot(&mut self) -> &mut Option<PathBuf> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                path
            }
        }
    }

    /// Record the source file unless one is already set.
    pub(crate) fn with_path(mut self, p: &Path) -> Self {
        let slot = self.path_slot();
        if slot.is_none() {
            *slot = Some(p.to_path_buf());
        }
        self
    }

    /// The source file, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Validation { path, .. } => {
                path.as_deref()
            }
        }
    }

    /// Multi-line rendering for terminals: heading, location, message and,
    /// for parse errors, the excerpt.
    pub fn pretty(&self) -> String {
        let file = self.path().map(|p| p.display().to_string());
        match self {
            Self::Read { message, .. } => match file {
                Some(f) => format!("Cannot read {f}: {message}"),
                None => format!("Cannot read configuration: {message}"),
            },
            Self::Parse {
                line,
                col,
                message,
                excerpt,
                ..
            } => {
                let at = match file {
                    Some(f) => format!("{f}:{line}:{col}"),
                    None => format!("line {line}, column {col}"),
                };
                format!("Config parse error at {at}\n{message}\n{excerpt}")
            }
            Self::Validation { message, .. } => match file {
                Some(f) => format!("Invalid configuration in {f}\n{message}"),
                None => format!("Invalid configuration\n{message}"),
            },
        }
    }
}

/// Up to two lines before `line_no` and one after, numbered, with a caret
/// under `col_no`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let first = line_no.saturating_sub(2).max(1);
    let mut out = String::new();
    for (n, text) in source
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .skip(first - 1)
        .take_while(|(n, _)| *n <= line_no + 1)
    {
        let gutter = format!(" {n:>4} | ");
        let _ignored = writeln!(out, "{gutter}{text}");
        if n == line_no {
            let pad = gutter.len() + col_no.saturating_sub(1);
            let _ignored = writeln!(out, "{:pad$}^", "");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_marks_column() {
        let ex = excerpt_at("one\ntwo\nthree\n", 2, 3);
        let lines: Vec<&str> = ex.lines().collect();
        assert_eq!(lines[0], "    1 | one");
        assert_eq!(lines[1], "    2 | two");
        assert_eq!(lines[2], format!("{}^", " ".repeat(10)));
        assert_eq!(lines[3], "    3 | three");
    }

    #[test]
    fn excerpt_clamps_at_end_of_source() {
        let ex = excerpt_at("only", 1, 1);
        assert_eq!(ex.lines().count(), 2);
    }

    #[test]
    fn path_is_attached_once() {
        let e = Error::validation("duplicate workflow id 'x'")
            .with_path(Path::new("/tmp/a.ron"))
            .with_path(Path::new("/tmp/b.ron"));
        assert_eq!(e.path(), Some(Path::new("/tmp/a.ron")));
        assert!(e.pretty().starts_with("Invalid configuration in /tmp/a.ron"));
    }
}
