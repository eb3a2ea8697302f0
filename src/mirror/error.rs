//! Error types for mirror construction.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from building or mutating a mirror tree.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("destination is not an existing directory: {path}")]
    DestinationInvalid { path: PathBuf },

    #[error("mirror operation failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MirrorError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
