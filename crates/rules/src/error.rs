//! Error types for rule loading and execution.

use std::path::PathBuf;

/// Errors that can occur while loading, watching, or executing rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A named rule file is missing or unreadable. Recoverable: callers skip
    /// the file and carry on with the rest.
    #[error("cannot read rule file '{file}': {source}")]
    FileRead {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A line inside an existing rule file is not a valid rule.
    /// Fatal for the reload that hit it.
    #[error("{file}:{line}: {message}")]
    Parse {
        file: String,
        /// 1-based line number.
        line: usize,
        message: String,
    },

    /// Directory-level filesystem error.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

impl RuleError {
    /// Whether the caller may skip the offending file and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RuleError::FileRead { .. })
    }
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
