//! Watch mode: keep hardware in sync with the preference file.
//!
//! Restores once at start, then re-applies every feature whenever the
//! preference file or the configuration file changes on disk.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use log::{debug, error, info, warn};
use notify::{Event, EventHandler, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app_context::AppState;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Forwards filesystem notifications into the async loop.
#[derive(Debug)]
struct AsyncEventHandler {
    sender: mpsc::UnboundedSender<notify::Result<Event>>,
}

impl EventHandler for AsyncEventHandler {
    fn handle_event(&mut self, event: notify::Result<Event>) {
        if let Err(e) = self.sender.send(event) {
            error!("Failed to send filesystem event to async handler: {}", e);
        }
    }
}

/// Files whose changes trigger a new restore pass.
#[derive(Debug, Clone)]
struct WatchedFiles {
    preferences: PathBuf,
    config: PathBuf,
}

impl WatchedFiles {
    /// Files named by the current configuration.
    async fn current(state: &AppState) -> Self {
        Self {
            preferences: state.preferences_path().await,
            config: state.config_manager().path().to_path_buf(),
        }
    }

    /// Whether the event touches one of the watched files.
    fn is_relevant(&self, event: &Event) -> bool {
        let touches = event
            .paths
            .iter()
            .any(|path| same_file_name(path, &self.preferences) || same_file_name(path, &self.config));

        touches && (event.kind.is_modify() || event.kind.is_create())
    }

    fn directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = [&self.preferences, &self.config]
            .into_iter()
            .map(|p| watch_dir(p))
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

/// Directories to drop and to add when the watch set moves from `old` to `new`.
fn watch_changes(old: &WatchedFiles, new: &WatchedFiles) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let (old_dirs, new_dirs) = (old.directories(), new.directories());
    let removed = old_dirs
        .iter()
        .filter(|dir| !new_dirs.contains(dir))
        .cloned()
        .collect();
    let added = new_dirs
        .into_iter()
        .filter(|dir| !old_dirs.contains(dir))
        .collect();
    (removed, added)
}

fn watch_directory(watcher: &mut impl Watcher, dir: &Path) {
    match watcher.watch(dir, RecursiveMode::NonRecursive) {
        Ok(()) => info!("Watching directory: {}", dir.display()),
        Err(e) => warn!("Cannot watch {}: {}", dir.display(), e),
    }
}

fn same_file_name(path: &Path, target: &Path) -> bool {
    path == target || (path.file_name().is_some() && path.file_name() == target.file_name())
}

// Watch the parent: the store and editors replace files by rename.
fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

/// Runs watch mode until `cancel_token` fires.
pub async fn run(state: Arc<AppState>, cancel_token: CancellationToken) -> Result<()> {
    let report = state.restore_all().await;
    info!("Initial restore applied {} features", report.applied());

    let mut files = WatchedFiles::current(&state).await;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut watcher = recommended_watcher(AsyncEventHandler { sender: event_tx })?;

    for dir in files.directories() {
        watch_directory(&mut watcher, &dir);
    }

    let mut debounce_interval = tokio::time::interval(DEBOUNCE);
    debounce_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut has_pending_event = false;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Watcher cancelled");
                break;
            }

            event_result = event_rx.recv() => {
                match event_result {
                    Some(Ok(event)) => {
                        debug!("Received filesystem event: {:?}", event);
                        if files.is_relevant(&event) {
                            has_pending_event = true;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Filesystem watcher error: {}", e);
                    }
                    None => {
                        warn!("Filesystem event channel closed");
                        break;
                    }
                }
            }

            _ = debounce_interval.tick() => {
                if has_pending_event {
                    has_pending_event = false;
                    reapply(&state).await;

                    // A reload may point the store somewhere else.
                    let current = WatchedFiles::current(&state).await;
                    let (removed, added) = watch_changes(&files, &current);
                    for dir in &removed {
                        if let Err(e) = watcher.unwatch(dir) {
                            debug!("Cannot unwatch {}: {}", dir.display(), e);
                        }
                    }
                    for dir in &added {
                        watch_directory(&mut watcher, dir);
                    }
                    files = current;
                }
            }
        }
    }

    Ok(())
}

async fn reapply(state: &AppState) {
    if let Err(e) = state.config_manager().reload().await {
        warn!("Keeping previous configuration: {e:#}");
    }

    let report = state.restore_all().await;
    info!("Re-applied {} features after file change", report.applied());
}
