//! Filesystem rule loader with change detection.
//!
//! Reads every `*.jsonl` file in the rules directory (non-recursive), one
//! JSON rule per line, and fingerprints each file by modification time and
//! SHA-256 content hash. A changed fingerprint means the whole rule set is
//! rebuilt; there is no per-file patching.

mod core;
pub mod fingerprint;
mod report;
pub(crate) mod watcher;

#[cfg(test)]
mod tests;

pub use self::core::{parse_file, LoadedRuleSet, RuleLoader};
pub use self::fingerprint::{scan, should_reload, DirSnapshot, FileFingerprint};
pub use self::report::{LoadReport, LoadStatus};

/// Extension of rule files.
pub const RULE_FILE_EXTENSION: &str = "jsonl";
