//! [`RuleEngine`]: lazily loaded, hot-reloading rule store plus execution.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use notify::RecommendedWatcher;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, RuleError};
use crate::loader::watcher::spawn_watcher;
use crate::loader::{scan, DirSnapshot, RuleLoader};
use crate::matcher::Matcher;
use crate::store::RuleStore;

use super::pipeline::{execute_rules, run_sequential, ExecutionResult};

/// Declarative rule engine bound to one rules directory.
///
/// The engine starts cold. Every `execute*` call first compares the
/// directory against the fingerprints of the published store and, when
/// anything changed, rebuilds the whole store before matching. The new store
/// is published with a single swap, so concurrent callers see either the old
/// rules or the new ones.
///
/// A reload that hits a malformed line is abandoned: a warm engine keeps
/// serving its last good store, a cold engine returns the error.
pub struct RuleEngine {
    state: Arc<EngineState>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<Mutex<RecommendedWatcher>>,
}

struct EngineState {
    config: EngineConfig,
    loader: RuleLoader,
    matcher: Matcher,
    /// Published store; `None` while cold.
    store: RwLock<Option<Arc<RuleStore>>>,
    /// Snapshot whose content failed to parse, so it is not re-parsed on
    /// every call.
    rejected: Mutex<Option<DirSnapshot>>,
    /// Serializes rebuilds.
    reload_lock: Mutex<()>,
}

impl RuleEngine {
    /// Create an engine for `config.rules_dir`. Nothing is loaded until the
    /// first call that needs rules.
    pub fn new(config: EngineConfig) -> Self {
        if config.create_dir && !config.rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&config.rules_dir) {
                warn!(path = %config.rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        let loader = RuleLoader::new(config.rules_dir.clone());
        let matcher = Matcher::new(config.comparison);
        Self {
            state: Arc::new(EngineState {
                config,
                loader,
                matcher,
                store: RwLock::new(None),
                rejected: Mutex::new(None),
                reload_lock: Mutex::new(()),
            }),
            _watcher: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    pub fn rules_dir(&self) -> &Path {
        self.state.loader.rules_dir()
    }

    pub fn matcher(&self) -> &Matcher {
        &self.state.matcher
    }

    /// Whether a store has been published.
    pub fn is_loaded(&self) -> bool {
        self.state.current().is_some()
    }

    /// The current store, refreshed from disk first if stale.
    pub fn store(&self) -> Result<Arc<RuleStore>> {
        self.state.refresh()
    }

    /// Rebuild the store unconditionally.
    ///
    /// Unlike the lazy refresh, a parse error is returned even when warm; the
    /// previously published store stays in place either way.
    pub fn reload(&self) -> Result<Arc<RuleStore>> {
        let seen = self.state.current();
        self.state.rebuild(seen.as_ref(), None, true)
    }

    /// Single pass over every loaded rule.
    pub fn execute(&self, context: &Value) -> Result<ExecutionResult> {
        let store = self.state.refresh()?;
        Ok(execute_rules(store.rules(), context, &self.state.matcher))
    }

    /// Single pass over the rules of one file.
    ///
    /// A file that is not present (or was unreadable) yields a recoverable
    /// [`RuleError::FileRead`].
    pub fn execute_file(&self, file: &str, context: &Value) -> Result<ExecutionResult> {
        let store = self.state.refresh()?;
        execute_in_file(&store, file, context, &self.state.matcher)
    }

    /// Run files in caller order, folding each file's output into the context
    /// seen by the next. Missing files are skipped.
    ///
    /// The whole run uses one store, even if files change mid-run.
    pub fn execute_sequential<S: AsRef<str>>(&self, context: &Value, file_order: &[S]) -> Result<ExecutionResult> {
        let store = self.state.refresh()?;
        let matcher = self.state.matcher;
        run_sequential(context, file_order, matcher.mode(), |file, ctx| {
            execute_in_file(&store, file, ctx, &matcher)
        })
    }

    /// Start a filesystem watcher that refreshes the store as soon as a rule
    /// file changes, instead of waiting for the next `execute*` call.
    pub fn watch(&mut self) -> Result<()> {
        let state = Arc::clone(&self.state);
        let watcher = spawn_watcher(self.state.loader.rules_dir(), move || {
            if let Err(e) = state.refresh() {
                warn!(error = %e, "eager rule refresh failed");
            }
        })?;
        self._watcher = Some(Mutex::new(watcher));
        Ok(())
    }
}

fn execute_in_file(store: &RuleStore, file: &str, context: &Value, matcher: &Matcher) -> Result<ExecutionResult> {
    if !store.contains_file(file) {
        return Err(RuleError::FileRead {
            file: file.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "rule file not loaded"),
        });
    }
    Ok(execute_rules(store.rules_in_file(file), context, matcher))
}

impl EngineState {
    fn current(&self) -> Option<Arc<RuleStore>> {
        self.store.read().expect("rule store lock poisoned").clone()
    }

    /// Return a store that reflects the directory, reloading if stale.
    fn refresh(&self) -> Result<Arc<RuleStore>> {
        let current = self.current();
        let Some(store) = current.as_ref() else {
            return self.rebuild(None, None, false);
        };

        let observed = scan(self.loader.rules_dir())?;
        if *store.snapshot() == observed {
            return Ok(Arc::clone(store));
        }
        if self.rejected.lock().expect("rejected lock poisoned").as_ref() == Some(&observed) {
            debug!("rules directory unchanged since last rejected reload");
            return Ok(Arc::clone(store));
        }

        match self.rebuild(Some(store), Some(observed), false) {
            Ok(fresh) => Ok(fresh),
            Err(e) => {
                warn!(error = %e, rules = store.len(), "rule reload failed, serving last good rules");
                Ok(Arc::clone(store))
            }
        }
    }

    /// Load the directory and publish the result.
    ///
    /// `seen` is the store the caller observed; if another caller published
    /// a different one while this one waited on the lock, that store is
    /// returned instead of loading again (unless `force`).
    fn rebuild(&self, seen: Option<&Arc<RuleStore>>, observed: Option<DirSnapshot>, force: bool) -> Result<Arc<RuleStore>> {
        let _guard = self.reload_lock.lock().expect("reload lock poisoned");

        if !force {
            if let Some(current) = self.current() {
                let unchanged = seen.map(|s| Arc::ptr_eq(s, &current)).unwrap_or(false);
                if !unchanged {
                    return Ok(current);
                }
            }
        }

        match self.loader.load_all() {
            Ok(set) => {
                let store = Arc::new(RuleStore::new(set));
                *self.store.write().expect("rule store lock poisoned") = Some(Arc::clone(&store));
                *self.rejected.lock().expect("rejected lock poisoned") = None;
                info!(
                    path = %self.loader.rules_dir().display(),
                    rules = store.len(),
                    files = store.snapshot().len(),
                    "rule store loaded"
                );
                Ok(store)
            }
            Err(e) => {
                if let Some(observed) = observed {
                    *self.rejected.lock().expect("rejected lock poisoned") = Some(observed);
                }
                Err(e)
            }
        }
    }
}
