//! Filesystem change delivery.
//!
//! Every notify event is forwarded as-is. There is no debouncing: rapid
//! successive writes produce one event each.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use crate::server::ServerError;

/// A change to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File created or modified
    Changed(PathBuf),

    /// File removed
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Changed(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// Keeps the underlying watcher alive while events are consumed.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch the given paths recursively. A path that does not exist yet is
    /// covered by watching its nearest existing ancestor.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), ServerError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(256);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| ServerError::WatchError(e.to_string()))?;

        for path in watch_targets(paths) {
            watcher
                .watch(&path, RecursiveMode::Recursive)
                .map_err(|e| ServerError::WatchError(format!("{}: {}", path.display(), e)))?;
            tracing::debug!("Watching {}", path.display());
        }

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    if let Some(watch_event) = classify_event(path, &event.kind) {
                        if async_tx.blocking_send(watch_event).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Existing directories to watch for `paths`, without any already covered by
/// another target.
fn watch_targets(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = Vec::new();

    for path in paths {
        let Some(existing) = path.ancestors().find(|ancestor| ancestor.exists()) else {
            tracing::warn!("Not watching {}: no part of it exists", path.display());
            continue;
        };
        if existing != path.as_path() {
            tracing::warn!(
                "{} does not exist; watching {} instead",
                path.display(),
                existing.display()
            );
        }
        if !targets.contains(&existing.to_path_buf()) {
            targets.push(existing.to_path_buf());
        }
    }

    let covered = |target: &PathBuf, targets: &[PathBuf]| {
        targets
            .iter()
            .any(|other| other != target && target.starts_with(other))
    };
    let nested: Vec<PathBuf> = targets
        .iter()
        .filter(|target| covered(target, &targets))
        .cloned()
        .collect();
    targets.retain(|target| !nested.contains(target));
    targets
}

fn classify_event(path: PathBuf, kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Changed(path)),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
        _ => None,
    }
}
