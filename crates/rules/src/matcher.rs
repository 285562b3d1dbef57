//! Path matcher: evaluates a rule's `when` conditions against a fact context.
//!
//! Each condition key is a dot-delimited path into the context
//! (`tongue.color`, `palm.lines.heart`). All conditions must hold; there is
//! no OR/NOT and no array-index syntax. What "holds" means depends on the
//! expected value:
//!
//! - scalar: equality under the engine's [`ComparisonMode`]
//! - array: intersection with an array, membership for a scalar
//! - object: each sub-key is a nested condition against the resolved object
//! - an absent actual value (missing or `null`) only satisfies `null` or `[]`

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::RuleError;
use crate::schema::RuleDefinition;

// ── Comparison mode ─────────────────────────────────────────────────

/// String comparison policy used for every scalar equality check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Strings compare trimmed and case-insensitively.
    #[default]
    Normalized,
    /// Strings compare byte-for-byte.
    Strict,
}

impl ComparisonMode {
    pub fn strings_equal(&self, a: &str, b: &str) -> bool {
        match self {
            ComparisonMode::Strict => a == b,
            ComparisonMode::Normalized => {
                let (a, b) = (a.trim(), b.trim());
                a == b || a.to_lowercase() == b.to_lowercase()
            }
        }
    }

    /// Equality of two JSON values under this mode.
    ///
    /// Strings follow [`strings_equal`](Self::strings_equal). Numbers compare
    /// exactly: integers as integers, so large ids never collapse through
    /// `f64`, and an integral float equals the same integer (`1 == 1.0`).
    /// Values of different JSON types are never equal; containers compare
    /// element-wise (arrays) or key-wise (objects).
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::String(x), Value::String(y)) => self.strings_equal(x, y),
            (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(x, y)| self.values_equal(x, y))
            }
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .all(|(k, v)| y.get(k).is_some_and(|w| self.values_equal(v, w)))
            }
            _ => a == b,
        }
    }

    /// Canonical text for `value` such that two values have the same key
    /// exactly when [`values_equal`](Self::values_equal) holds.
    ///
    /// Object keys are emitted in sorted order regardless of how the map
    /// iterates, strings are normalized under [`ComparisonMode::Normalized`],
    /// and integral numbers render as integers.
    pub fn value_key(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_key(value, &mut out);
        out
    }

    fn normalize<'a>(&self, s: &'a str) -> Cow<'a, str> {
        match self {
            ComparisonMode::Strict => Cow::Borrowed(s),
            ComparisonMode::Normalized => Cow::Owned(s.trim().to_lowercase()),
        }
    }

    fn write_key(&self, value: &Value, out: &mut String) {
        match value {
            Value::String(s) => out.push_str(&Value::String(self.normalize(s).into_owned()).to_string()),
            Value::Number(n) => match integral(n) {
                Some(i) => out.push_str(&i.to_string()),
                None => out.push_str(&n.to_string()),
            },
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_key(item, out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                out.push('{');
                for (i, (key, item)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&Value::String(key.clone()).to_string());
                    out.push(':');
                    self.write_key(item, out);
                }
                out.push('}');
            }
            other => out.push_str(&other.to_string()),
        }
    }
}

/// The exact integer value of `n`, if it has one.
///
/// Integers are taken as-is; a float counts only when it has no fractional
/// part and fits in an `i128`, where the conversion is exact.
fn integral(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() < 1e38).then_some(f as i128)
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (integral(x), integral(y)) {
        (Some(x), Some(y)) => x == y,
        (None, None) => x.as_f64() == y.as_f64(),
        _ => false,
    }
}

impl FromStr for ComparisonMode {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" => Ok(ComparisonMode::Normalized),
            "strict" => Ok(ComparisonMode::Strict),
            other => Err(RuleError::Config(format!(
                "unknown comparison mode '{other}' (expected 'normalized' or 'strict')"
            ))),
        }
    }
}

// ── Path resolution ─────────────────────────────────────────────────

/// Resolve a dot-delimited path against nested JSON objects.
///
/// Returns `None` for a missing key, an empty segment, or a non-object
/// intermediate value. Unresolved paths are not errors; they match as absent.
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// ── Matcher ─────────────────────────────────────────────────────────

/// Condition evaluator shared by the single-pass and sequential pipelines.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    mode: ComparisonMode,
}

impl Matcher {
    pub fn new(mode: ComparisonMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// Whether every `when` condition of `rule` holds for `context`.
    pub fn matches(&self, rule: &RuleDefinition, context: &Value) -> bool {
        self.matches_conditions(&rule.when, context)
    }

    /// Logical AND over `(path, expected)` pairs. An empty clause matches.
    pub fn matches_conditions(&self, when: &Map<String, Value>, context: &Value) -> bool {
        when.iter()
            .all(|(path, expected)| self.matches_value(expected, resolve_path(context, path)))
    }

    fn matches_value(&self, expected: &Value, actual: Option<&Value>) -> bool {
        let actual = match actual {
            None | Some(Value::Null) => {
                return match expected {
                    Value::Null => true,
                    Value::Array(items) => items.is_empty(),
                    _ => false,
                };
            }
            Some(v) => v,
        };

        match expected {
            Value::Array(options) => match actual {
                Value::Array(values) => options
                    .iter()
                    .any(|opt| values.iter().any(|v| self.values_equal(opt, v))),
                Value::Object(_) => false,
                scalar => options.iter().any(|opt| self.values_equal(opt, scalar)),
            },
            Value::Object(nested) => match actual {
                Value::Object(_) => self.matches_conditions(nested, actual),
                _ => false,
            },
            scalar => self.values_equal(scalar, actual),
        }
    }

    /// Equality under the matcher's [`ComparisonMode`].
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        self.mode.values_equal(a, b)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
