//! Merge resolver: combines a matched rule's output with the accumulated result.
//!
//! A value is *present* when it is not `null` and, for arrays and objects,
//! non-empty. Absent targets always adopt the incoming value, so an empty
//! container left by an earlier rule can still be filled by a later one.
//!
//! | strategy  | present target                          | absent target |
//! |-----------|-----------------------------------------|---------------|
//! | `skip`    | kept                                    | source        |
//! | `replace` | kept (first writer wins)                | source        |
//! | `append`  | arrays unioned, objects merged, scalars kept | source   |

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::matcher::ComparisonMode;
use crate::schema::MergeStrategy;

/// Whether a value counts as present for merge purposes.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Merge `source` into `target` under `strategy` and return the merged value.
///
/// `Replace` does not overwrite: like `Skip`, it keeps a present target and
/// only fills an absent one. Rules are evaluated highest priority first, so
/// under either strategy the highest-priority matching rule owns the key.
///
/// `mode` decides which array elements count as duplicates under `Append`,
/// the same equality the matcher uses for conditions.
pub fn merge(
    target: Option<&Value>,
    source: &Value,
    strategy: MergeStrategy,
    mode: ComparisonMode,
) -> Value {
    let target = match target.filter(|t| is_present(t)) {
        Some(t) => t,
        None => return source.clone(),
    };

    match strategy {
        MergeStrategy::Skip | MergeStrategy::Replace => target.clone(),
        MergeStrategy::Append => append(target, source, mode),
    }
}

/// Apply [`merge`] once per key of `output`, writing into `result`.
pub fn merge_into(
    result: &mut Map<String, Value>,
    output: &Map<String, Value>,
    strategy: MergeStrategy,
    mode: ComparisonMode,
) {
    for (key, source) in output {
        let merged = merge(result.get(key), source, strategy, mode);
        result.insert(key.clone(), merged);
    }
}

fn append(target: &Value, source: &Value, mode: ComparisonMode) -> Value {
    match (target, source) {
        (Value::Array(existing), Value::Array(incoming)) => union(existing, incoming, mode),
        // A bare scalar appended to a list joins it as one element.
        (Value::Array(existing), scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            union(existing, std::slice::from_ref(scalar), mode)
        }
        (Value::Object(existing), Value::Object(incoming)) => {
            let mut merged = existing.clone();
            merge_into(&mut merged, incoming, MergeStrategy::Append, mode);
            Value::Object(merged)
        }
        _ => target.clone(),
    }
}

fn union(existing: &[Value], incoming: &[Value], mode: ComparisonMode) -> Value {
    let mut set = OrderedSet::new(mode);
    set.extend(existing.iter().cloned());
    set.extend(incoming.iter().cloned());
    Value::Array(set.into_vec())
}

// ── Ordered set ─────────────────────────────────────────────────────

/// Insertion-ordered set of JSON values.
///
/// Membership is keyed on [`ComparisonMode::value_key`], so two values are
/// duplicates exactly when the matcher would call them equal. The first
/// spelling seen is the one kept.
#[derive(Debug, Clone)]
pub struct OrderedSet {
    mode: ComparisonMode,
    items: IndexMap<String, Value>,
}

impl OrderedSet {
    pub fn new(mode: ComparisonMode) -> Self {
        Self {
            mode,
            items: IndexMap::new(),
        }
    }

    /// Insert `value` at the end unless an equal value is already present.
    /// Returns whether it was inserted.
    pub fn insert(&mut self, value: Value) -> bool {
        let key = self.mode.value_key(&value);
        if self.items.contains_key(&key) {
            return false;
        }
        self.items.insert(key, value);
        true
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains_key(&self.mode.value_key(value))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.items.into_values().collect()
    }
}

impl Default for OrderedSet {
    fn default() -> Self {
        Self::new(ComparisonMode::default())
    }
}

impl Extend<Value> for OrderedSet {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
