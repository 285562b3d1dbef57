//! Per-file load outcomes.

/// Outcome of loading a single rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// File name within the rules directory.
    pub file: String,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// File was read and parsed; `rules` may be zero for comment-only files.
    Loaded { rules: usize },
    /// File could not be read and contributed no rules.
    Skipped { reason: String },
}

impl LoadReport {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }
}
