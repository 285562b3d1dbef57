//! Core [`RuleLoader`]: reads and parses every rule file in a directory.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, RuleError};
use crate::schema::{LoadedRule, RuleDefinition};

use super::fingerprint::{list_rule_files, read_fingerprinted, DirSnapshot};
use super::report::{LoadReport, LoadStatus};

/// Everything produced by one full directory load.
#[derive(Debug, Clone)]
pub struct LoadedRuleSet {
    /// Rules in file-name then line order (not yet priority-sorted).
    pub rules: Vec<LoadedRule>,
    /// Fingerprints of the files as they were read.
    pub snapshot: DirSnapshot,
    /// Per-file outcomes, in file-name order.
    pub reports: Vec<LoadReport>,
}

/// Filesystem-backed rule loader for one directory.
#[derive(Debug, Clone)]
pub struct RuleLoader {
    rules_dir: PathBuf,
}

impl RuleLoader {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Load every `*.jsonl` file in the rules directory.
    ///
    /// Unreadable files are skipped with a warning and still fingerprinted, so
    /// they do not make the snapshot look stale forever. The first malformed
    /// line or duplicate rule id aborts the whole load.
    pub fn load_all(&self) -> Result<LoadedRuleSet> {
        let mut rules = Vec::new();
        let mut fingerprints = Vec::new();
        let mut reports = Vec::new();
        let mut seen: HashMap<String, (String, usize)> = HashMap::new();

        for (name, path) in list_rule_files(&self.rules_dir)? {
            let (fingerprint, bytes) = read_fingerprinted(&name, &path);
            fingerprints.push(fingerprint);

            let contents = match bytes.and_then(decode_utf8) {
                Ok(c) => c,
                Err(source) => {
                    let err = RuleError::FileRead {
                        file: name.clone(),
                        source,
                    };
                    warn!(file = %name, error = %err, "skipping unreadable rule file");
                    reports.push(LoadReport {
                        file: name,
                        status: LoadStatus::Skipped {
                            reason: err.to_string(),
                        },
                    });
                    continue;
                }
            };

            let parsed = parse_file(&name, &contents)?;
            for loaded in &parsed {
                if let Some((first_file, first_line)) =
                    seen.insert(loaded.rule.id.clone(), (loaded.file.clone(), loaded.line))
                {
                    return Err(RuleError::Parse {
                        file: loaded.file.clone(),
                        line: loaded.line,
                        message: format!(
                            "duplicate rule id '{}' (first defined at {}:{})",
                            loaded.rule.id, first_file, first_line
                        ),
                    });
                }
            }

            debug!(file = %name, rules = parsed.len(), "parsed rule file");
            reports.push(LoadReport {
                file: name,
                status: LoadStatus::Loaded {
                    rules: parsed.len(),
                },
            });
            rules.extend(parsed);
        }

        Ok(LoadedRuleSet {
            rules,
            snapshot: DirSnapshot::new(fingerprints),
            reports,
        })
    }
}

fn decode_utf8(bytes: Vec<u8>) -> io::Result<String> {
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Parse the contents of one rule file.
///
/// Blank lines and lines starting with `#` are ignored. Line numbers in
/// errors and in the returned rules are 1-based.
pub fn parse_file(file: &str, contents: &str) -> Result<Vec<LoadedRule>> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut rules = Vec::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let rule: RuleDefinition = serde_json::from_str(trimmed).map_err(|e| RuleError::Parse {
            file: file.to_string(),
            line,
            message: e.to_string(),
        })?;

        if rule.id.trim().is_empty() {
            return Err(RuleError::Parse {
                file: file.to_string(),
                line,
                message: "rule id must not be empty".to_string(),
            });
        }

        rules.push(LoadedRule {
            rule,
            file: file.to_string(),
            line,
        });
    }

    Ok(rules)
}
