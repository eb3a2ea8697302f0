//! Ordered teardown of everything the mirror created.
//!
//! Every artifact placed in the destination tree registers exactly one undo
//! action here before its creation is considered complete. At shutdown the
//! registry drains in reverse registration order, so channels under a
//! directory are always removed before the directory itself. Actions are
//! idempotent: a target that is already gone is a normal outcome.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::debug_event;
use crate::mirror::release_channel;

/// One recorded undo action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// Release and unlink a content channel's pipe.
    RemoveChannel(PathBuf),
    /// Remove a mirrored directory (expected empty by drain order).
    RemoveDir(PathBuf),
}

impl CleanupAction {
    fn run(&self) {
        match self {
            CleanupAction::RemoveChannel(path) => {
                release_channel(path);
            }
            CleanupAction::RemoveDir(path) => {
                if let Err(e) = std::fs::remove_dir(path) {
                    // Already removed (deletion race) or never created; both
                    // are tolerated.
                    debug_event!("cleanup", "rmdir skipped", "{}: {e}", path.display());
                }
            }
        }
    }
}

/// Append-only record of undo actions, drained LIFO exactly once.
///
/// Shared between the per-root dispatchers and the shutdown path; all
/// access is serialized through the inner mutex.
#[derive(Default)]
pub struct CleanupRegistry {
    actions: Mutex<Vec<CleanupAction>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an undo action for an artifact that was just created.
    pub fn register(&self, action: CleanupAction) {
        self.actions.lock().push(action);
    }

    /// Number of currently registered actions.
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    /// Execute every registered action, most recent first.
    ///
    /// The action list is taken out under the lock, so a second invocation
    /// finds nothing to do. Callers must stop every registering party
    /// before draining; an action registered after the take is never run.
    pub fn run_all(&self) {
        let actions = std::mem::take(&mut *self.actions.lock());
        if actions.is_empty() {
            return;
        }
        crate::log_event!("cleanup", "draining", "{} actions", actions.len());
        for action in actions.iter().rev() {
            action.run();
        }
    }
}
