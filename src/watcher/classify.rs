//! Event classification.
//!
//! Maps raw `notify` events onto the four actions the dispatcher knows how
//! to take. Non-mutating events (opens, reads, close-without-write,
//! metadata changes) classify to nothing at all.

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind, RenameMode};
use notify::Event;

/// A filesystem event reduced to its mirror-level meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    /// File content changed; the consumer gets signaled, the mirror itself
    /// needs no update because channels render on every read.
    Content(PathBuf),
    /// A new object appeared (create or move-in).
    Created(PathBuf),
    /// An object vanished (delete or move-out).
    Removed(PathBuf),
    /// The watched root itself is gone; the process must shut down.
    Fatal(String),
}

/// Classify one raw event into zero or more actions.
pub fn classify(event: &Event, root: &Path) -> Vec<ClassifiedEvent> {
    match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            content_for(&event.paths)
        }
        EventKind::Access(_) => Vec::new(),

        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            content_for(&event.paths)
        }
        EventKind::Modify(ModifyKind::Metadata(_)) | EventKind::Modify(ModifyKind::Other) => {
            Vec::new()
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            removed_for(&event.paths, root)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => created_for(&event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths[0] is the old name, paths[1] the new one.
            let mut actions = Vec::new();
            if let Some(from) = event.paths.first() {
                actions.extend(removed_for(std::slice::from_ref(from), root));
            }
            if let Some(to) = event.paths.get(1) {
                actions.push(ClassifiedEvent::Created(to.clone()));
            }
            actions
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Backend did not say which side of the rename this is; the
            // object's current existence decides.
            event
                .paths
                .iter()
                .map(|path| {
                    if path.exists() {
                        ClassifiedEvent::Created(path.clone())
                    } else if path == root {
                        fatal_root(root)
                    } else {
                        ClassifiedEvent::Removed(path.clone())
                    }
                })
                .collect()
        }

        EventKind::Create(_) => created_for(&event.paths),
        EventKind::Remove(_) => removed_for(&event.paths, root),

        EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn content_for(paths: &[PathBuf]) -> Vec<ClassifiedEvent> {
    paths
        .iter()
        .map(|path| ClassifiedEvent::Content(path.clone()))
        .collect()
}

fn created_for(paths: &[PathBuf]) -> Vec<ClassifiedEvent> {
    paths
        .iter()
        .map(|path| ClassifiedEvent::Created(path.clone()))
        .collect()
}

fn removed_for(paths: &[PathBuf], root: &Path) -> Vec<ClassifiedEvent> {
    paths
        .iter()
        .map(|path| {
            if path == root {
                fatal_root(root)
            } else {
                ClassifiedEvent::Removed(path.clone())
            }
        })
        .collect()
}

fn fatal_root(root: &Path) -> ClassifiedEvent {
    ClassifiedEvent::Fatal(format!("watched root {} removed", root.display()))
}
