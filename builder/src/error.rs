//! Error types for the offline builder.
//!
//! Only the conditions that leave the pipeline unable to produce a bundle
//! live here. Per-file read failures, per-tool fetch and extraction failures,
//! and validation findings are recovered where they occur and surface as data
//! in the manifest instead.

use crate::packaging::PackagingError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort a build run.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// The workspace (or one of its directories or files) could not be written.
    #[error("cannot write workspace path {path}: {source}")]
    WorkspaceWrite {
        /// Path that could not be created or written.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The definition source directory does not exist or is not a directory.
    #[error("definition source {path} not found or not a directory")]
    SourceNotFound {
        /// The configured source directory.
        path: Utf8PathBuf,
    },

    /// The corpus version tag is empty or contains unsupported characters.
    #[error("invalid corpus version: {reason}")]
    InvalidVersion {
        /// Description of the validation failure.
        reason: String,
    },

    /// The configuration could not be loaded or is incomplete.
    #[error("configuration error: {reason}")]
    Config {
        /// Description of the configuration problem.
        reason: String,
    },

    /// The final archive could not be assembled.
    #[error("packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The run was cancelled before the archive was written.
    #[error("build cancelled before the package was assembled")]
    Cancelled,

    /// A path on disk is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// The JSON manifest could not be serialised.
    #[error("failed to serialise manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl BuilderError {
    /// Wrap an I/O failure on `path` as a [`BuilderError::WorkspaceWrite`].
    #[must_use]
    pub fn workspace_write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::WorkspaceWrite {
            path: path.into(),
            source,
        }
    }

    /// Return the process exit code associated with this error.
    ///
    /// Cancellation follows the shell convention for `SIGINT`; every other
    /// fatal condition exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Result type alias using [`BuilderError`].
pub type Result<T> = std::result::Result<T, BuilderError>;
