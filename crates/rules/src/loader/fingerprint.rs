//! Change detection: per-file (mtime, content hash) fingerprints.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{Result, RuleError};

use super::RULE_FILE_EXTENSION;

/// Fingerprint of one rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    /// SHA-256 hex digest of the file bytes; `None` when unreadable.
    pub hash: Option<String>,
}

/// Fingerprints of every rule file in a directory, ordered by file name.
///
/// Equality compares the fingerprints only, not when they were taken.
#[derive(Debug, Clone)]
pub struct DirSnapshot {
    files: Vec<FileFingerprint>,
    taken_at: DateTime<Utc>,
}

impl DirSnapshot {
    pub fn new(mut files: Vec<FileFingerprint>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            files,
            taken_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn files(&self) -> &[FileFingerprint] {
        &self.files
    }

    pub fn get(&self, name: &str) -> Option<&FileFingerprint> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl PartialEq for DirSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

impl Eq for DirSnapshot {}

/// SHA-256 hex digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

/// List `*.jsonl` files directly inside `dir`, sorted by name.
///
/// Dotfiles and subdirectories are ignored. A missing directory lists as
/// empty.
pub(crate) fn list_rule_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %dir.display(), "rules directory does not exist");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(RuleError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RuleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || !path.is_file() {
            continue;
        }
        let is_rule_file = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == RULE_FILE_EXTENSION)
            .unwrap_or(false);
        if is_rule_file {
            files.push((name, path));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Stat and read one file, returning its fingerprint and its bytes.
pub(crate) fn read_fingerprinted(name: &str, path: &Path) -> (FileFingerprint, io::Result<Vec<u8>>) {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
    let bytes = fs::read(path);
    let hash = bytes.as_ref().ok().map(|b| content_hash(b));
    let fingerprint = FileFingerprint {
        name: name.to_string(),
        path: path.to_path_buf(),
        modified,
        hash,
    };
    (fingerprint, bytes)
}

/// Fingerprint every rule file in `dir`.
pub fn scan(dir: &Path) -> Result<DirSnapshot> {
    let files = list_rule_files(dir)?
        .into_iter()
        .map(|(name, path)| read_fingerprinted(&name, &path).0)
        .collect();
    Ok(DirSnapshot::new(files))
}

/// Whether `dir` no longer matches `previous`: a file was added or removed,
/// or any file's modification time or content hash changed.
pub fn should_reload(previous: &DirSnapshot, dir: &Path) -> Result<bool> {
    Ok(scan(dir)? != *previous)
}
