//! Filesystem watcher for the override directories.
//!
//! The notify callback only signals a bounded channel. A single task drains
//! it and waits for a quiet period (trailing debounce) before asking the
//! registry to rebuild, so a burst of writes produces one rebuild. Writes
//! that never pause still rebuild once every ten debounce windows.

use std::path::{Path, PathBuf};
use std::sync::Weak;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

use super::discovery::has_recognized_extension;
use super::registry::PersonaRegistry;

/// Longest a steady stream of changes can postpone a rebuild, in debounce windows.
const MAX_DEBOUNCE_FACTOR: u32 = 10;

/// Running watcher plus its debounce task.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Signal the debounce task and wait for it to finish. A pending
    /// debounce is dropped without rebuilding.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                warn!(error = %e, "Persona watcher task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start watching `dirs` recursively. Must be called inside a tokio runtime.
pub fn spawn(
    dirs: &[PathBuf],
    debounce: Duration,
    capacity: usize,
    registry: Weak<PersonaRegistry>,
) -> Result<WatchHandle> {
    let (tx, rx) = mpsc::channel::<()>(capacity.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| match event {
        Ok(event) => {
            if !is_relevant(&event) {
                return;
            }
            match tx.try_send(()) {
                Ok(()) => {}
                // A rebuild is already queued; it will observe this change.
                Err(mpsc::error::TrySendError::Full(())) => trace!("Change queue full"),
                Err(mpsc::error::TrySendError::Closed(())) => {
                    debug!("Watch event dropped because the debounce task is gone")
                }
            }
        }
        Err(e) => warn!(error = %e, "Persona watch backend error"),
    })
    .map_err(|e| Error::watcher(format!("watch backend error: {}", e)))?;

    for dir in dirs {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| Error::Watcher {
                message: e.to_string(),
                path: Some(dir.clone()),
            })?;
        debug!(path = %dir.display(), "Watching persona directory");
    }

    let task = tokio::spawn(debounce_loop(rx, shutdown_rx, debounce, registry));

    Ok(WatchHandle {
        _watcher: watcher,
        shutdown: shutdown_tx,
        task,
    })
}

async fn debounce_loop(
    mut events: mpsc::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
    debounce: Duration,
    registry: Weak<PersonaRegistry>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            event = events.recv() => {
                if event.is_none() {
                    return;
                }
            }
        }

        // Restart the window on every change until it stays quiet, but
        // never hold a rebuild back for longer than `max_wait`.
        let started = Instant::now();
        let max_wait = debounce.saturating_mul(MAX_DEBOUNCE_FACTOR);
        let mut coalesced = 1u64;
        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                event = events.recv() => match event {
                    Some(()) => coalesced += 1,
                    None => break,
                },
                _ = tokio::time::sleep(debounce) => break,
                _ = tokio::time::sleep(max_wait.saturating_sub(started.elapsed())) => {
                    debug!(coalesced, "Rebuilding under continuous changes");
                    break;
                }
            }
        }

        let Some(registry) = registry.upgrade() else {
            return;
        };
        debug!(coalesced, "Persona directories changed, rebuilding");
        registry.reload().await;
    }
}

/// Content changes to persona documents or to directories.
///
/// Access and metadata-only events are ignored: reading files during a
/// rebuild can touch atime, which would otherwise trigger another rebuild.
pub(crate) fn is_relevant(event: &Event) -> bool {
    match event.kind {
        EventKind::Access(_) => return false,
        EventKind::Modify(ModifyKind::Metadata(_)) => return false,
        _ => {}
    }
    event.paths.is_empty() || event.paths.iter().any(|p| is_candidate_path(p))
}

fn is_candidate_path(path: &Path) -> bool {
    has_recognized_extension(path) || path.extension().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_content_changes_are_relevant() {
        assert!(is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/p/a.yaml"
        )));
        assert!(is_relevant(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/p/a.yml"
        )));
        assert!(is_relevant(&event(
            EventKind::Remove(RemoveKind::Folder),
            "/p/nested"
        )));
    }

    #[test]
    fn test_noise_is_ignored() {
        assert!(!is_relevant(&event(
            EventKind::Access(AccessKind::Any),
            "/p/a.yaml"
        )));
        assert!(!is_relevant(&event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)),
            "/p/a.yaml"
        )));
        assert!(!is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/p/.a.yaml.swp"
        )));
        assert!(!is_relevant(&event(
            EventKind::Modify(ModifyKind::Any),
            "/p/readme.md"
        )));
    }
}
