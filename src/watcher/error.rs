//! Error types for the watch dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watching a source root.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to start watching {path}: {reason}")]
    InitFailed { path: PathBuf, reason: String },

    #[error("fatal watch event on {root}: {reason}")]
    Fatal { root: PathBuf, reason: String },

    #[error("event stream for {root} closed unexpectedly")]
    StreamClosed { root: PathBuf },
}
