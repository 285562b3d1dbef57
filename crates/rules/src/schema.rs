//! Rule definitions as they appear on disk, one JSON object per line.
//!
//! ```text
//! {"id":"r1","priority":10,"when":{"tongue.color":"red"},"then":{"constitution":"heat"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a matched rule's output combines with output already accumulated
/// under the same key.
///
/// `Skip` and `Replace` both keep the first present value, so for those keys
/// the rule evaluated first (highest priority) owns the output. `Append`
/// accumulates arrays and objects instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Union arrays, merge objects key-by-key, keep present scalars.
    #[default]
    Append,
    /// First writer wins: a present value is never overwritten.
    Replace,
    /// Keep a present value, otherwise adopt the new one.
    Skip,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MergeStrategy::Append => "append",
            MergeStrategy::Replace => "replace",
            MergeStrategy::Skip => "skip",
        };
        f.write_str(s)
    }
}

/// A single rule parsed from one line of a `.jsonl` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Unique identifier within a loaded rule set.
    pub id: String,
    /// Evaluation order key, higher first.
    #[serde(default)]
    pub priority: i64,
    /// Dot-path conditions, all of which must hold.
    #[serde(default)]
    pub when: Map<String, Value>,
    /// Output keys merged into the result when the rule matches.
    #[serde(default)]
    pub then: Map<String, Value>,
    #[serde(default, alias = "mergeStrategy")]
    pub merge: MergeStrategy,
}

/// A rule together with where it was defined.
///
/// The source location is the tie-break for equal priorities: file name
/// ascending, then line ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRule {
    pub rule: RuleDefinition,
    /// File name (not path) of the `.jsonl` file.
    pub file: String,
    /// 1-based line number within `file`.
    pub line: usize,
}

impl LoadedRule {
    pub fn id(&self) -> &str {
        &self.rule.id
    }
}
