//! Source-to-destination path mapping.
//!
//! Pure path arithmetic shared by the mirror and the watch dispatcher.
//! No filesystem access happens here.

use std::path::{Path, PathBuf};

/// Map an absolute source path to its destination path.
///
/// Strips the `source_root` prefix and appends the remainder to
/// `destination_root`. Callers guarantee that `source_path` lies under
/// `source_root`; mapping the root itself yields `destination_root`.
pub fn dest_path(destination_root: &Path, source_root: &Path, source_path: &Path) -> PathBuf {
    let relative = source_path.strip_prefix(source_root).unwrap_or(source_path);
    if relative.as_os_str().is_empty() {
        // `join("")` would append a trailing slash, which the OS rejects
        // for non-directory operations like mkfifo.
        return destination_root.to_path_buf();
    }
    destination_root.join(relative)
}

/// Re-root a source root under the destination.
///
/// The mirror of `/a/conf` under destination `/etc` lives at `/etc/a/conf`,
/// so the source root's own absolute path becomes the relative suffix.
pub fn mirror_base(destination_root: &Path, source_root: &Path) -> PathBuf {
    let relative = source_root.strip_prefix("/").unwrap_or(source_root);
    destination_root.join(relative)
}
