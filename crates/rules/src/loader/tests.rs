//! Tests for the rule loader and change detector.

use std::fs;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use super::*;
use crate::error::RuleError;
use crate::schema::MergeStrategy;

const CONSTITUTION_RULES: &str = r#"# tongue-driven rules
{"id":"heat-tongue","priority":10,"when":{"tongue.color":"red"},"then":{"constitution":"heat"}}

{"id":"damp-coating","priority":5,"when":{"tongue.coating":"thick"},"then":{"tags":["damp"]},"merge":"append"}
"#;

fn temp_loader() -> (TempDir, RuleLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = RuleLoader::new(dir.path());
    (dir, loader)
}

fn set_mtime(path: &std::path::Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

#[test]
fn parse_file_skips_blank_and_comment_lines() {
    let rules = parse_file("tongue.jsonl", CONSTITUTION_RULES).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].id(), "heat-tongue");
    assert_eq!(rules[0].line, 2);
    assert_eq!(rules[1].id(), "damp-coating");
    assert_eq!(rules[1].line, 4);
    assert_eq!(rules[1].rule.merge, MergeStrategy::Append);
    assert!(rules.iter().all(|r| r.file == "tongue.jsonl"));
}

#[test]
fn parse_file_reports_line_of_malformed_rule() {
    let contents = "{\"id\":\"ok\"}\n\n{\"id\": \"broken\", \n";
    let err = parse_file("bad.jsonl", contents).unwrap_err();
    match err {
        RuleError::Parse { file, line, .. } => {
            assert_eq!(file, "bad.jsonl");
            assert_eq!(line, 3);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn parse_file_rejects_schema_violations() {
    let err = parse_file("bad.jsonl", r#"{"id":"r","priority":"high"}"#).unwrap_err();
    assert!(matches!(err, RuleError::Parse { line: 1, .. }));

    let err = parse_file("bad.jsonl", r#"{"id":"  "}"#).unwrap_err();
    assert!(matches!(err, RuleError::Parse { line: 1, .. }));
}

#[test]
fn parse_file_strips_byte_order_mark() {
    let rules = parse_file("bom.jsonl", "\u{feff}{\"id\":\"r1\"}").unwrap();
    assert_eq!(rules.len(), 1);
}

#[test]
fn load_all_reads_only_jsonl_files() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("tongue.jsonl"), CONSTITUTION_RULES).unwrap();
    fs::write(dir.path().join(".hidden.jsonl"), r#"{"id":"hidden"}"#).unwrap();
    fs::write(dir.path().join("readme.txt"), "not a rule").unwrap();
    fs::create_dir(dir.path().join("nested.jsonl")).unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("deep.jsonl"), r#"{"id":"deep"}"#).unwrap();

    let set = loader.load_all().unwrap();
    let ids: Vec<_> = set.rules.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["heat-tongue", "damp-coating"]);
    assert_eq!(set.snapshot.len(), 1);
    assert_eq!(set.reports.len(), 1);
    assert_eq!(set.reports[0].status, LoadStatus::Loaded { rules: 2 });
}

#[test]
fn load_all_orders_files_by_name() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("b.jsonl"), r#"{"id":"from-b"}"#).unwrap();
    fs::write(dir.path().join("a.jsonl"), r#"{"id":"from-a"}"#).unwrap();

    let set = loader.load_all().unwrap();
    let files: Vec<_> = set.reports.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, vec!["a.jsonl", "b.jsonl"]);
    assert_eq!(set.rules[0].id(), "from-a");
}

#[test]
fn load_all_rejects_duplicate_ids_across_files() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.jsonl"), r#"{"id":"dup"}"#).unwrap();
    fs::write(dir.path().join("b.jsonl"), "\n{\"id\":\"dup\"}").unwrap();

    let err = loader.load_all().unwrap_err();
    match err {
        RuleError::Parse { file, line, message } => {
            assert_eq!(file, "b.jsonl");
            assert_eq!(line, 2);
            assert!(message.contains("a.jsonl:1"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn load_all_skips_non_utf8_file() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.jsonl"), r#"{"id":"ok"}"#).unwrap();
    fs::write(dir.path().join("b.jsonl"), [0xffu8, 0xfe, 0x00]).unwrap();

    let set = loader.load_all().unwrap();
    assert_eq!(set.rules.len(), 1);
    assert!(matches!(set.reports[1].status, LoadStatus::Skipped { .. }));
    // Still fingerprinted so the next scan does not look stale.
    assert_eq!(set.snapshot.len(), 2);
    assert!(!should_reload(&set.snapshot, dir.path()).unwrap());
}

#[test]
fn missing_directory_loads_empty() {
    let dir = TempDir::new().unwrap();
    let loader = RuleLoader::new(dir.path().join("absent"));
    let set = loader.load_all().unwrap();
    assert!(set.rules.is_empty());
    assert!(set.snapshot.is_empty());
}

// ── Change detection ────────────────────────────────────────────

#[test]
fn unchanged_directory_is_not_stale() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.jsonl"), CONSTITUTION_RULES).unwrap();
    let set = loader.load_all().unwrap();
    assert!(!should_reload(&set.snapshot, dir.path()).unwrap());
}

#[test]
fn touched_file_is_stale() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("a.jsonl");
    fs::write(&path, CONSTITUTION_RULES).unwrap();
    let set = loader.load_all().unwrap();

    set_mtime(&path, SystemTime::now() + Duration::from_secs(60));
    assert!(should_reload(&set.snapshot, dir.path()).unwrap());
}

#[test]
fn content_change_with_same_mtime_is_stale() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("a.jsonl");
    fs::write(&path, r#"{"id":"one"}"#).unwrap();
    let set = loader.load_all().unwrap();
    let original = set.snapshot.get("a.jsonl").and_then(|f| f.modified).unwrap();

    fs::write(&path, r#"{"id":"two"}"#).unwrap();
    set_mtime(&path, original);
    assert!(should_reload(&set.snapshot, dir.path()).unwrap());
}

#[test]
fn added_and_removed_files_are_stale() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.jsonl"), r#"{"id":"one"}"#).unwrap();
    let set = loader.load_all().unwrap();

    fs::write(dir.path().join("b.jsonl"), r#"{"id":"two"}"#).unwrap();
    assert!(should_reload(&set.snapshot, dir.path()).unwrap());

    fs::remove_file(dir.path().join("b.jsonl")).unwrap();
    assert!(!should_reload(&set.snapshot, dir.path()).unwrap());

    fs::remove_file(dir.path().join("a.jsonl")).unwrap();
    assert!(should_reload(&set.snapshot, dir.path()).unwrap());
}

#[test]
fn non_rule_files_do_not_affect_snapshot() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.jsonl"), r#"{"id":"one"}"#).unwrap();
    let set = loader.load_all().unwrap();

    fs::write(dir.path().join("notes.md"), "scratch").unwrap();
    assert!(!should_reload(&set.snapshot, dir.path()).unwrap());
}

#[test]
fn content_hash_is_sha256_hex() {
    assert_eq!(
        fingerprint::content_hash(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
