//! The sorted, immutable set of currently loaded rules.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::loader::{DirSnapshot, LoadedRuleSet};
use crate::schema::LoadedRule;

/// Rules in evaluation order: priority descending, then file name
/// ascending, then line ascending.
///
/// A store is never mutated after construction. Reloads build a new one and
/// swap it in whole.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: Vec<LoadedRule>,
    by_id: HashMap<String, usize>,
    /// Files that were read successfully, including ones with no rules.
    files: BTreeSet<String>,
    snapshot: DirSnapshot,
    loaded_at: DateTime<Utc>,
}

impl RuleStore {
    pub fn new(set: LoadedRuleSet) -> Self {
        let LoadedRuleSet {
            mut rules,
            snapshot,
            reports,
        } = set;

        rules.sort_by(|a, b| {
            b.rule
                .priority
                .cmp(&a.rule.priority)
                .then_with(|| a.file.cmp(&b.file))
                .then_with(|| a.line.cmp(&b.line))
        });

        let by_id = rules
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.rule.id.clone(), idx))
            .collect();
        let files = reports
            .into_iter()
            .filter(|r| r.is_loaded())
            .map(|r| r.file)
            .collect();

        Self {
            rules,
            by_id,
            files,
            snapshot,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(LoadedRuleSet {
            rules: Vec::new(),
            snapshot: DirSnapshot::empty(),
            reports: Vec::new(),
        })
    }

    /// All rules in evaluation order.
    pub fn rules(&self) -> &[LoadedRule] {
        &self.rules
    }

    /// Rules defined in `file`, in evaluation order.
    pub fn rules_in_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a LoadedRule> + 'a {
        self.rules.iter().filter(move |r| r.file == file)
    }

    /// Whether `file` was present and readable at load time.
    pub fn contains_file(&self, file: &str) -> bool {
        self.files.contains(file)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&LoadedRule> {
        self.by_id.get(id).map(|&idx| &self.rules[idx])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn snapshot(&self) -> &DirSnapshot {
        &self.snapshot
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadReport, LoadStatus};
    use crate::schema::RuleDefinition;

    fn loaded(id: &str, priority: i64, file: &str, line: usize) -> LoadedRule {
        let rule: RuleDefinition =
            serde_json::from_value(serde_json::json!({"id": id, "priority": priority})).unwrap();
        LoadedRule {
            rule,
            file: file.to_string(),
            line,
        }
    }

    fn store(rules: Vec<LoadedRule>, files: &[&str]) -> RuleStore {
        RuleStore::new(LoadedRuleSet {
            rules,
            snapshot: DirSnapshot::empty(),
            reports: files
                .iter()
                .map(|f| LoadReport {
                    file: f.to_string(),
                    status: LoadStatus::Loaded { rules: 0 },
                })
                .collect(),
        })
    }

    fn ids(store: &RuleStore) -> Vec<&str> {
        store.rules().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn sorts_by_priority_then_file_then_line() {
        let s = store(
            vec![
                loaded("b-low", 1, "b.jsonl", 1),
                loaded("b-high", 10, "b.jsonl", 2),
                loaded("a-high-2", 10, "a.jsonl", 5),
                loaded("a-high-1", 10, "a.jsonl", 3),
            ],
            &["a.jsonl", "b.jsonl"],
        );
        assert_eq!(ids(&s), vec!["a-high-1", "a-high-2", "b-high", "b-low"]);
    }

    #[test]
    fn negative_priorities_sort_last() {
        let s = store(
            vec![loaded("neg", -5, "a.jsonl", 1), loaded("zero", 0, "a.jsonl", 2)],
            &["a.jsonl"],
        );
        assert_eq!(ids(&s), vec!["zero", "neg"]);
    }

    #[test]
    fn lookup_by_id_and_file() {
        let s = store(
            vec![loaded("r1", 1, "a.jsonl", 1), loaded("r2", 2, "b.jsonl", 1)],
            &["a.jsonl", "b.jsonl", "empty.jsonl"],
        );
        assert_eq!(s.get("r1").map(|r| r.file.as_str()), Some("a.jsonl"));
        assert!(s.get("nope").is_none());
        assert_eq!(s.rules_in_file("b.jsonl").map(|r| r.id()).collect::<Vec<_>>(), vec!["r2"]);
        assert!(s.contains_file("empty.jsonl"));
        assert!(!s.contains_file("missing.jsonl"));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn empty_store_has_no_rules() {
        let s = RuleStore::empty();
        assert!(s.is_empty());
        assert_eq!(s.file_names().count(), 0);
    }
}
