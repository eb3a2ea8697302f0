//! Per-root event dispatch.
//!
//! One dispatcher owns one source root: it bridges the root's `notify`
//! stream into an mpsc channel and replays classified events onto the
//! mirror, one event fully handled before the next is taken. Roots never
//! block each other; each dispatcher runs in its own task.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::mirror::TreeMirror;
use crate::notifier::SignalNotifier;
use crate::{debug_event, log_event};

use super::classify::{ClassifiedEvent, classify};
use super::error::WatchError;

/// Replays filesystem changes for one source root into the mirror.
pub struct WatchDispatcher {
    mirror: TreeMirror,
    notifier: Arc<SignalNotifier>,
    events: mpsc::Receiver<notify::Result<notify::Event>>,
    _watcher: Option<RecommendedWatcher>,
}

impl WatchDispatcher {
    /// Subscribe to live change events for the mirror's source root.
    pub fn watch_root(
        mirror: TreeMirror,
        notifier: Arc<SignalNotifier>,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(256);
        let init_err = |e: &notify::Error| WatchError::InitFailed {
            path: mirror.source_root().to_path_buf(),
            reason: e.to_string(),
        };

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                // Dropped events after shutdown are fine.
                let _ = tx.blocking_send(res);
            })
            .map_err(|e| init_err(&e))?;
        watcher
            .watch(mirror.source_root(), RecursiveMode::Recursive)
            .map_err(|e| init_err(&e))?;

        Ok(Self {
            mirror,
            notifier,
            events: rx,
            _watcher: Some(watcher),
        })
    }

    /// Build a dispatcher over an externally supplied event stream.
    ///
    /// Used by tests to feed synthetic events without a real backend.
    pub fn with_stream(
        mirror: TreeMirror,
        notifier: Arc<SignalNotifier>,
        events: mpsc::Receiver<notify::Result<notify::Event>>,
    ) -> Self {
        Self {
            mirror,
            notifier,
            events,
            _watcher: None,
        }
    }

    /// Run the dispatch loop until a fatal event or stream loss.
    ///
    /// Never returns `Ok` during normal operation; the loop is meant to
    /// live as long as the process.
    pub async fn run(mut self) -> Result<(), WatchError> {
        let root = self.mirror.source_root().to_path_buf();
        log_event!("watcher", "watching", "{}", root.display());

        loop {
            let Some(result) = self.events.recv().await else {
                return Err(WatchError::StreamClosed { root });
            };
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    return Err(WatchError::Fatal {
                        root,
                        reason: e.to_string(),
                    });
                }
            };

            for action in classify(&event, &root) {
                match action {
                    ClassifiedEvent::Content(path) => {
                        debug_event!("watcher", "content", "{}", path.display());
                        self.notifier.notify();
                    }
                    ClassifiedEvent::Created(path) => self.handle_created(&path),
                    ClassifiedEvent::Removed(path) => self.mirror.remove_mapped(&path),
                    ClassifiedEvent::Fatal(reason) => {
                        return Err(WatchError::Fatal { root, reason });
                    }
                }
            }
        }
    }

    /// Mirror a newly appeared source object.
    ///
    /// A moved-in directory may already carry a subtree, so directories get
    /// the full recursive walk. Objects that vanished again before we could
    /// stat them are left to their own removal event.
    fn handle_created(&self, path: &Path) {
        let Ok(meta) = fs::symlink_metadata(path) else {
            debug_event!("watcher", "created object vanished", "{}", path.display());
            return;
        };

        if meta.is_dir() {
            self.mirror.mirror_tree(path);
        } else if meta.is_file() {
            if let Err(e) = self.mirror.start_channel(path) {
                tracing::warn!("[watcher] {e}");
            }
        } else {
            debug_event!("watcher", "skipping non-file object", "{}", path.display());
        }
    }
}
