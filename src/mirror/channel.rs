//! Per-file live content channels.
//!
//! A content channel is a named pipe at the mapped destination path plus a
//! standing blocking task. The task parks in open-for-write until a consumer
//! opens the pipe for reading, then renders the source file's current bytes
//! and writes them out. Every read therefore observes content produced from
//! the environment at that moment, never a snapshot.
//!
//! Removal protocol: [`release_channel`] first opens the pipe read-side
//! nonblocking, which wakes a task parked in the write-side open, then
//! unlinks the pipe. The task identifies its pipe by device and inode
//! captured at creation, never by name alone, so once the name is unlinked
//! or points at a replacement pipe the woken task exits without touching
//! the replacement. A new channel at the same path therefore never shares
//! its pipe with a released task.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

use crate::debug_event;
use crate::render::TemplateRenderer;

use super::error::MirrorError;

/// A standing, renderable copy of one source file.
pub struct ContentChannel {
    source: PathBuf,
    pipe_path: PathBuf,
    destination_root: PathBuf,
    renderer: Arc<dyn TemplateRenderer>,
    /// Identity of the pipe this channel owns. `pipe_path` can come to
    /// name a different object; these never can.
    pipe_dev: u64,
    pipe_ino: u64,
}

impl ContentChannel {
    /// Create the destination pipe with the source file's permission bits.
    ///
    /// The pipe exists on disk after this returns; call [`spawn`] to start
    /// serving reads.
    ///
    /// [`spawn`]: ContentChannel::spawn
    pub fn create(
        source: &Path,
        pipe_path: &Path,
        destination_root: &Path,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Result<Self, MirrorError> {
        let mode = fs::metadata(source)
            .map_err(|e| MirrorError::io(source, e))?
            .permissions()
            .mode();

        mkfifo(pipe_path, Mode::from_bits_truncate(mode)).map_err(|e| {
            MirrorError::io(pipe_path, std::io::Error::from_raw_os_error(e as i32))
        })?;
        // mkfifo is subject to the umask; set the bits explicitly.
        fs::set_permissions(pipe_path, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| MirrorError::io(pipe_path, e))?;
        let pipe_meta =
            fs::symlink_metadata(pipe_path).map_err(|e| MirrorError::io(pipe_path, e))?;

        Ok(Self {
            source: source.to_path_buf(),
            pipe_path: pipe_path.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            renderer,
            pipe_dev: pipe_meta.dev(),
            pipe_ino: pipe_meta.ino(),
        })
    }

    /// Path of the destination pipe.
    pub fn pipe_path(&self) -> &Path {
        &self.pipe_path
    }

    /// Whether `pipe_path` still names the pipe this channel created.
    fn owns_path(&self) -> bool {
        fs::symlink_metadata(&self.pipe_path)
            .is_ok_and(|meta| meta.dev() == self.pipe_dev && meta.ino() == self.pipe_ino)
    }

    fn is_own_pipe(&self, pipe: &fs::File) -> bool {
        pipe.metadata()
            .is_ok_and(|meta| meta.dev() == self.pipe_dev && meta.ino() == self.pipe_ino)
    }

    /// Start the serving task.
    ///
    /// The task runs until the destination root or the source file no longer
    /// exists, the pipe is unlinked or replaced, or a render fails.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.serve())
    }

    fn serve(self) {
        debug_event!("channel", "serving", "{}", self.pipe_path.display());
        loop {
            if !self.destination_root.is_dir() || !self.source.is_file() {
                break;
            }

            // Unlinked, or a successor channel already took the name over.
            if !self.owns_path() {
                break;
            }

            // Rendezvous: blocks until a consumer opens the read side.
            let pipe = match OpenOptions::new().write(true).open(&self.pipe_path) {
                Ok(pipe) => pipe,
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => {
                    tracing::warn!(
                        "[channel] cannot open {}: {e}",
                        self.pipe_path.display()
                    );
                    break;
                }
            };
            let mut pipe = pipe;

            // The name can be replaced between the stat above and the open
            // resolving it; a replacement's readers are not ours to serve.
            if !self.is_own_pipe(&pipe) {
                break;
            }

            let raw = match fs::read(&self.source) {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => {
                    tracing::warn!("[channel] cannot read {}: {e}", self.source.display());
                    break;
                }
            };

            match self.renderer.render(&raw) {
                Ok(rendered) => {
                    if let Err(e) = pipe.write_all(&rendered) {
                        // Reader went away mid-write; liveness is re-checked
                        // at the top of the loop.
                        debug_event!(
                            "channel",
                            "write interrupted",
                            "{}: {e}",
                            self.pipe_path.display()
                        );
                    }
                }
                Err(e) => {
                    // Channel-fatal: this file stops being served, the rest
                    // of the mirror is unaffected.
                    tracing::error!("[channel] render failed for {}: {e}", self.source.display());
                    break;
                }
            }
        }

        // Unlink only our own pipe; the name may already belong to a
        // replacement channel.
        if self.owns_path() {
            let _ = fs::remove_file(&self.pipe_path);
        }
        debug_event!("channel", "closed", "{}", self.pipe_path.display());
    }
}

/// Remove a content channel's pipe, waking its task first.
///
/// Safe to call for pipes that are already gone; the removal race is a
/// normal outcome, not an error.
pub fn release_channel(pipe_path: &Path) {
    // Appear as a reader to wake a writer parked in open(2). The read end
    // is held across the unlink so a writer arriving mid-removal still
    // finds a reader; its next identity check then fails and the task exits.
    let reader = OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(pipe_path);
    let _ = fs::remove_file(pipe_path);
    drop(reader);
    debug_event!("channel", "released", "{}", pipe_path.display());
}
