//! Filesystem watcher that triggers an eager refresh on rule file changes.

use std::path::Path;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::error::Result;

use super::RULE_FILE_EXTENSION;

/// Whether a watcher event concerns a rule file in a way that may change the
/// rule set.
pub(crate) fn is_rule_event(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Metadata(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Remove(RemoveKind::File)
            | EventKind::Remove(RemoveKind::Any)
    );
    relevant_kind && event.paths.iter().any(|p| is_rule_path(p))
}

fn is_rule_path(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| !n.starts_with('.'))
        .unwrap_or(false);
    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == RULE_FILE_EXTENSION)
        .unwrap_or(false);
    visible && is_jsonl
}

/// Watch `dir` (non-recursively) and call `on_change` for every rule file event.
pub(crate) fn spawn_watcher<F>(dir: &Path, on_change: F) -> Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    let mut watcher = notify::recommended_watcher(
        move |res: std::result::Result<Event, notify::Error>| match res {
            Ok(event) if is_rule_event(&event) => on_change(),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "filesystem watcher error"),
        },
    )?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

    info!(path = %dir.display(), "watching rules directory for changes");
    Ok(watcher)
}
