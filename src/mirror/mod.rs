//! Shadow-copy construction for one source root.
//!
//! `TreeMirror` walks a source root once, recreates its directory skeleton
//! under the destination (permission bits preserved), and starts one
//! [`ContentChannel`] per regular file. Every created artifact is recorded
//! with the shared [`CleanupRegistry`] before its creation counts as
//! complete, in an order that makes the LIFO drain remove files before the
//! directories containing them.
//!
//! The same primitives serve the watch dispatcher: a directory that appears
//! mid-flight (create or move-in) is mirrored with the identical walk.

mod channel;
mod error;

pub use channel::{ContentChannel, release_channel};
pub use error::MirrorError;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::cleanup::{CleanupAction, CleanupRegistry};
use crate::render::TemplateRenderer;
use crate::{debug_event, log_event, paths};

/// Mirrors one source root into the destination tree.
pub struct TreeMirror {
    source_root: PathBuf,
    destination_root: PathBuf,
    /// Where the source root's own path lands under the destination.
    dest_base: PathBuf,
    registry: Arc<CleanupRegistry>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl std::fmt::Debug for TreeMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeMirror")
            .field("source_root", &self.source_root)
            .field("destination_root", &self.destination_root)
            .field("dest_base", &self.dest_base)
            .finish_non_exhaustive()
    }
}

impl TreeMirror {
    /// Prepare a mirror for `source_root`.
    ///
    /// Fails with [`MirrorError::DestinationInvalid`] when the destination
    /// is not an existing directory; nothing is touched in that case.
    pub fn new(
        destination_root: &Path,
        source_root: &Path,
        registry: Arc<CleanupRegistry>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Result<Self, MirrorError> {
        if !destination_root.is_dir() {
            return Err(MirrorError::DestinationInvalid {
                path: destination_root.to_path_buf(),
            });
        }
        Ok(Self {
            source_root: source_root.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            dest_base: paths::mirror_base(destination_root, source_root),
            registry,
            renderer,
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Map an absolute source path to its destination path.
    pub fn mapped(&self, source_path: &Path) -> PathBuf {
        paths::dest_path(&self.dest_base, &self.source_root, source_path)
    }

    /// Build the initial shadow copy.
    ///
    /// Per-entry failures are logged and skipped; only failures preparing
    /// the destination base itself abort.
    pub fn mirror(&self) -> Result<(), MirrorError> {
        self.ensure_base_parents()?;

        let meta = fs::symlink_metadata(&self.source_root)
            .map_err(|e| MirrorError::io(&self.source_root, e))?;
        if meta.is_dir() {
            self.mirror_tree(&self.source_root);
        } else if meta.is_file() {
            self.start_channel(&self.source_root)?;
        } else {
            debug_event!("mirror", "skipping non-file root", "{}", self.source_root.display());
        }
        Ok(())
    }

    /// Create the ancestors of the mirror base that do not exist yet.
    ///
    /// A root like `/a/b` mirrored into `/etc` needs `/etc/a` even though
    /// `/a` itself is not part of the walk. Created ancestors are registered
    /// shallowest-first so the drain removes them last.
    fn ensure_base_parents(&self) -> Result<(), MirrorError> {
        let mut missing = Vec::new();
        let mut cursor = self.dest_base.parent();
        while let Some(dir) = cursor {
            if dir.exists() {
                break;
            }
            missing.push(dir.to_path_buf());
            cursor = dir.parent();
        }
        for dir in missing.iter().rev() {
            fs::create_dir(dir).map_err(|e| MirrorError::io(dir, e))?;
            self.registry.register(CleanupAction::RemoveDir(dir.clone()));
        }
        Ok(())
    }

    /// Mirror a directory subtree: skeleton first, then one channel per
    /// regular file. Symlinks, devices, and sockets are silently skipped.
    ///
    /// Registration order gives the cleanup invariant for free: the walk is
    /// top-down, so parents are registered before children, and files are
    /// registered strictly after all directories.
    pub fn mirror_tree(&self, subroot: &Path) {
        let mut files = Vec::new();
        for entry in WalkDir::new(subroot).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("[mirror] walk error under {}: {e}", subroot.display());
                    continue;
                }
            };
            let file_type = entry.file_type();
            if file_type.is_dir() {
                if let Err(e) = self.create_dir_mirrored(entry.path()) {
                    tracing::warn!("[mirror] {e}");
                }
            } else if file_type.is_file() {
                files.push(entry.into_path());
            }
        }

        for file in &files {
            if let Err(e) = self.start_channel(file) {
                tracing::warn!("[mirror] {e}");
            }
        }
    }

    /// Create one mirrored directory with the source's permission bits.
    pub fn create_dir_mirrored(&self, src_dir: &Path) -> Result<(), MirrorError> {
        let mapped = self.mapped(src_dir);
        if mapped.is_dir() {
            // Already present, e.g. overlapping roots. Not ours to remove.
            return Ok(());
        }
        let mode = fs::metadata(src_dir)
            .map_err(|e| MirrorError::io(src_dir, e))?
            .permissions()
            .mode();
        fs::create_dir(&mapped).map_err(|e| MirrorError::io(&mapped, e))?;
        fs::set_permissions(&mapped, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| MirrorError::io(&mapped, e))?;
        self.registry
            .register(CleanupAction::RemoveDir(mapped.clone()));
        log_event!("mirror", "dir", "{}", mapped.display());
        Ok(())
    }

    /// Create and start a content channel for one source file.
    ///
    /// A destination object already present at the mapped path means a
    /// channel is (still) serving it; the duplicate is skipped to keep the
    /// one-task-per-file contract.
    pub fn start_channel(&self, src_file: &Path) -> Result<(), MirrorError> {
        let mapped = self.mapped(src_file);
        if fs::symlink_metadata(&mapped).is_ok() {
            debug_event!("mirror", "channel exists", "{}", mapped.display());
            return Ok(());
        }
        let channel = ContentChannel::create(
            src_file,
            &mapped,
            &self.destination_root,
            self.renderer.clone(),
        )?;
        self.registry
            .register(CleanupAction::RemoveChannel(mapped.clone()));
        channel.spawn();
        log_event!("mirror", "channel", "{}", mapped.display());
        Ok(())
    }

    /// Remove the mapped counterpart of a vanished source object.
    ///
    /// The source is already gone, so file-vs-directory is decided by the
    /// destination object, which is isomorphic to the source at this point.
    /// Directories are removed recursively after every channel beneath them
    /// is released; stragglers' own removal events later find nothing and
    /// are swallowed.
    pub fn remove_mapped(&self, src_path: &Path) {
        let mapped = self.mapped(src_path);
        let Ok(meta) = fs::symlink_metadata(&mapped) else {
            // Lost the removal race; normal outcome.
            debug_event!("mirror", "already removed", "{}", mapped.display());
            return;
        };

        if meta.is_dir() {
            for entry in WalkDir::new(&mapped).follow_links(false) {
                let Ok(entry) = entry else { continue };
                if !entry.file_type().is_dir() {
                    release_channel(entry.path());
                }
            }
            if let Err(e) = fs::remove_dir_all(&mapped) {
                debug_event!("mirror", "rmdir skipped", "{}: {e}", mapped.display());
            }
            log_event!("mirror", "removed dir", "{}", mapped.display());
        } else {
            release_channel(&mapped);
            log_event!("mirror", "removed channel", "{}", mapped.display());
        }
    }
}
