//! Execution pipeline and engine lifecycle.
//!
//! The engine has three states: cold (nothing loaded), warm (store matches
//! the rules directory) and stale (a file changed since the last load).
//! `execute*` calls always run against a warm store; a stale directory is
//! reloaded transparently before matching begins.

mod core;
mod pipeline;


pub use self::core::RuleEngine;
pub use self::pipeline::{execute_rules, run_sequential, ExecutionResult};
