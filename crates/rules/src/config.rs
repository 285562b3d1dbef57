//! Engine configuration, built explicitly or from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::matcher::ComparisonMode;

/// Default rules directory, relative to the working directory.
pub const DEFAULT_RULES_DIR: &str = "data/rules";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Configuration for a single [`RuleEngine`](crate::engine::RuleEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the `*.jsonl` rule files (scanned non-recursively).
    pub rules_dir: PathBuf,
    /// String comparison policy shared by every matching pass.
    pub comparison: ComparisonMode,
    /// Create `rules_dir` (and parents) at engine construction if missing.
    pub create_dir: bool,
}

impl EngineConfig {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            comparison: ComparisonMode::default(),
            create_dir: true,
        }
    }

    pub fn with_comparison(mut self, comparison: ComparisonMode) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_create_dir(mut self, create_dir: bool) -> Self {
        self.create_dir = create_dir;
        self
    }

    /// Build config from environment variables (call [`load_dotenv`] first).
    ///
    /// - `RULES_DIR`: rules directory (default `data/rules`)
    /// - `RULES_COMPARISON`: `normalized` or `strict` (default `normalized`)
    pub fn from_env() -> Result<Self, RuleError> {
        let rules_dir = env_opt("RULES_DIR").unwrap_or_else(|| DEFAULT_RULES_DIR.to_string());
        let comparison = match env_opt("RULES_COMPARISON") {
            Some(raw) => ComparisonMode::from_str(&raw)?,
            None => ComparisonMode::default(),
        };
        Ok(Self::new(rules_dir).with_comparison(comparison))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RULES_DIR)
    }
}
