//! Declarative JSONL rule engine for deriving constitution results from facts.
//!
//! This crate provides:
//! - JSONL rule files loaded from a directory, fingerprinted by mtime and hash
//! - Lazy hot reload with atomic store swaps and last-known-good fallback
//! - Dot-path fact matching with a single, explicit comparison mode
//! - Per-key merge strategies (`append`, `replace`, `skip`)
//! - Single-pass and multi-file sequential execution

pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod merge;
pub mod schema;
pub mod store;

pub use config::EngineConfig;
pub use engine::{ExecutionResult, RuleEngine};
pub use error::{Result, RuleError};
pub use matcher::{ComparisonMode, Matcher};
pub use schema::{LoadedRule, MergeStrategy, RuleDefinition};
pub use store::RuleStore;
