//! Single-pass and sequential execution over loaded rules.
//!
//! Both modes share one [`Matcher`] and the merge resolver, so a rule file
//! behaves the same whether it runs alone or as a step of a sequence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::matcher::{ComparisonMode, Matcher};
use crate::merge::merge_into;
use crate::schema::{LoadedRule, MergeStrategy};

/// Accumulated output of one execution plus the ids of the rules that
/// matched, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub result: Map<String, Value>,
    #[serde(rename = "matchedRules")]
    pub matched_rules: Vec<String>,
}

impl ExecutionResult {
    /// True when no rule matched.
    pub fn is_empty(&self) -> bool {
        self.matched_rules.is_empty() && self.result.is_empty()
    }

    /// Look up an output key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.result.get(key)
    }
}

/// Evaluate `rules` in the given order against a read-only `context`.
///
/// Each matching rule merges its `then` payload into a fresh result under its
/// own strategy and appends its id to the matched list. Array unions dedup
/// under the matcher's comparison mode.
pub fn execute_rules<'a, I>(rules: I, context: &Value, matcher: &Matcher) -> ExecutionResult
where
    I: IntoIterator<Item = &'a LoadedRule>,
{
    let mut out = ExecutionResult::default();
    for loaded in rules {
        if !matcher.matches(&loaded.rule, context) {
            continue;
        }
        debug!(
            rule_id = %loaded.rule.id,
            file = %loaded.file,
            priority = loaded.rule.priority,
            merge = %loaded.rule.merge,
            "rule matched"
        );
        merge_into(&mut out.result, &loaded.rule.then, loaded.rule.merge, matcher.mode());
        out.matched_rules.push(loaded.rule.id.clone());
    }
    out
}

/// Run `run_file` once per file in caller order, threading derived output
/// forward.
///
/// After each file, its partial result is `append`-merged into the cumulative
/// result, and every key it produced is written into a working copy of the
/// context with the cumulative value, so later files can match on it. The
/// caller's `context` is not modified. A non-object context is treated as
/// empty for folding.
///
/// `mode` is the comparison mode of the per-file runs; the cumulative union
/// dedups with it too.
///
/// Recoverable errors (a missing or unreadable file) skip that file; any
/// other error aborts the run.
pub fn run_sequential<S, F>(
    context: &Value,
    file_order: &[S],
    mode: ComparisonMode,
    mut run_file: F,
) -> Result<ExecutionResult>
where
    S: AsRef<str>,
    F: FnMut(&str, &Value) -> Result<ExecutionResult>,
{
    let mut working = match context {
        Value::Object(_) => context.clone(),
        _ => Value::Object(Map::new()),
    };
    let mut cumulative = ExecutionResult::default();

    for file in file_order {
        let file = file.as_ref();
        let partial = match run_file(file, &working) {
            Ok(p) => p,
            Err(e) if e.is_recoverable() => {
                warn!(file = %file, error = %e, "skipping rule file in sequential run");
                continue;
            }
            Err(e) => return Err(e),
        };

        debug!(
            file = %file,
            matched = partial.matched_rules.len(),
            keys = partial.result.len(),
            "sequential step complete"
        );

        merge_into(&mut cumulative.result, &partial.result, MergeStrategy::Append, mode);
        fold_into_context(&mut working, &partial.result, &cumulative.result);
        cumulative.matched_rules.extend(partial.matched_rules);
    }

    Ok(cumulative)
}

/// Write every key of `partial` into `context`, using the cumulative value
/// for that key.
fn fold_into_context(context: &mut Value, partial: &Map<String, Value>, cumulative: &Map<String, Value>) {
    let Value::Object(map) = context else {
        return;
    };
    for key in partial.keys() {
        if let Some(value) = cumulative.get(key) {
            map.insert(key.clone(), value.clone());
        }
    }
}
