//! Tool download over HTTP.
//!
//! Provides a trait-based abstraction for downloading a tool URL into a
//! local file, enabling dependency injection for testing.

use camino::Utf8Path;
use std::fs;
use std::io;
use std::time::Duration;

/// Trait for downloading tool files.
///
/// Implementations must be shareable across the fetch worker pool.
///
/// # Examples
///
/// ```
/// use offline_builder::fetch::HttpDownloader;
/// use std::time::Duration;
///
/// let downloader = HttpDownloader::new(Duration::from_secs(30));
/// // Use downloader.download(url, dest) in production
/// # let _ = downloader;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ToolDownloader: Send + Sync {
    /// Download `url` into `dest`, creating or truncating the file.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing the failure; use
    /// [`DownloadError::is_retryable`] to decide whether to try again.
    fn download(&self, url: &str, dest: &Utf8Path) -> Result<u64, DownloadError>;
}

/// Errors arising from a single download attempt.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The requested tool was not found (HTTP 404).
    #[error("tool not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The request did not complete within the per-attempt timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// The URL that was requested.
        url: String,
    },

    /// Connection, TLS, DNS, or body transfer failure.
    #[error("download failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server returned a zero-length body.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The URL that was requested.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] io::Error),
}

impl DownloadError {
    /// Return true when another attempt could plausibly succeed.
    ///
    /// Server errors, throttling, request timeouts, transport failures, and
    /// empty bodies are retried. Missing resources and other client errors
    /// fail immediately, as do local write failures.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || matches!(*status, 408 | 429),
            Self::Timeout { .. } | Self::Transport { .. } | Self::EmptyBody { .. } => true,
            Self::NotFound { .. } | Self::Io(_) => false,
        }
    }
}

/// HTTP-based downloader using `ureq`.
#[derive(Clone)]
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    /// Create a downloader whose requests each time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl ToolDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Utf8Path) -> Result<u64, DownloadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = fs::File::create(dest)?;
        io::copy(&mut response.into_body().as_reader(), &mut file).map_err(|e| {
            DownloadError::Transport {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        })
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status) => DownloadError::Status {
            url: url.to_owned(),
            status: *status,
        },
        ureq::Error::Timeout(_) => DownloadError::Timeout {
            url: url.to_owned(),
        },
        other => DownloadError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
