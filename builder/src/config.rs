//! Configuration loading and resolution.
//!
//! Settings come from three layers: built-in defaults, an optional TOML file
//! named by `--config`, and command-line flags. Later layers win. The result
//! is a [`Settings`] value that the pipeline consumes without further
//! validation.

use crate::cli::Cli;
use crate::error::{BuilderError, Result};
use crate::fetch::RetryPolicy;
use crate::loader::DEFAULT_EXTENSIONS;
use crate::version::CorpusVersion;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "dist";
/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Retries per tool used when none are configured.
pub const DEFAULT_RETRIES: u32 = 3;
/// First backoff delay used when none is configured.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
/// Backoff ceiling used when none is configured.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

/// The contents of a TOML configuration file.
///
/// Every field is optional; unknown keys are rejected so typos surface as
/// errors rather than silently falling back to defaults.
///
/// # Examples
///
/// ```
/// use offline_builder::config::FileConfig;
///
/// let config: FileConfig = toml::from_str("version = \"1.0\"\nretries = 5\n")
///     .expect("valid TOML");
/// assert_eq!(config.version.as_deref(), Some("1.0"));
/// assert_eq!(config.retries, Some(5));
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory containing artifact definitions.
    pub source: Option<Utf8PathBuf>,
    /// Output directory for the workspace and archive.
    pub output: Option<Utf8PathBuf>,
    /// Corpus version tag.
    pub version: Option<String>,
    /// Directory copied into `binaries/`.
    pub binaries: Option<Utf8PathBuf>,
    /// Number of worker threads.
    pub concurrency: Option<usize>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Retries per tool after the first attempt.
    pub retries: Option<u32>,
    /// First backoff delay in milliseconds.
    pub retry_base_delay_ms: Option<u64>,
    /// Backoff ceiling in milliseconds.
    pub retry_max_delay_ms: Option<u64>,
    /// Definition file extensions.
    pub extensions: Option<Vec<String>>,
}

impl FileConfig {
    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Config`] if the file cannot be read or is not
    /// valid configuration TOML.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| BuilderError::Config {
            reason: format!("cannot read {path}: {err}"),
        })?;
        toml::from_str(&text).map_err(|err| BuilderError::Config {
            reason: format!("invalid configuration in {path}: {err}"),
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory containing artifact definitions.
    pub source: Utf8PathBuf,
    /// Output directory for the workspace and archive.
    pub output: Utf8PathBuf,
    /// Validated corpus version.
    pub version: CorpusVersion,
    /// Optional directory copied into `binaries/`.
    pub binaries: Option<Utf8PathBuf>,
    /// Number of worker threads.
    pub concurrency: NonZeroUsize,
    /// Per-request download timeout.
    pub timeout: Duration,
    /// Retry and backoff policy for downloads.
    pub retry: RetryPolicy,
    /// Definition file extensions.
    pub extensions: Vec<String>,
    /// Whether to stop after reporting what would be done.
    pub dry_run: bool,
}

impl Settings {
    /// Resolve settings from the command line, loading `--config` if given.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Config`] if the configuration file is invalid
    /// or a required value is missing, and
    /// [`BuilderError::InvalidVersion`] if the version tag is malformed.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    /// Merge command-line flags over file values over defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Config`] if `source` or `version` is missing
    /// or `concurrency` or `timeout` is zero, and
    /// [`BuilderError::InvalidVersion`] if the version tag is malformed.
    pub fn merge(cli: &Cli, file: FileConfig) -> Result<Self> {
        let source = cli
            .source
            .clone()
            .or(file.source)
            .ok_or_else(|| missing("source"))?;
        let version_tag = cli
            .corpus_version
            .clone()
            .or(file.version)
            .ok_or_else(|| missing("version"))?;
        let version = CorpusVersion::try_from(version_tag.as_str())?;

        let concurrency = match cli.concurrency.or(file.concurrency) {
            Some(n) => NonZeroUsize::new(n).ok_or_else(|| BuilderError::Config {
                reason: "concurrency must be at least 1".to_owned(),
            })?,
            None => default_concurrency(),
        };

        let timeout_secs = cli
            .timeout
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(BuilderError::Config {
                reason: "timeout must be at least 1 second".to_owned(),
            });
        }

        let retry = RetryPolicy::new(
            cli.retries.or(file.retries).unwrap_or(DEFAULT_RETRIES),
            Duration::from_millis(
                file.retry_base_delay_ms
                    .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            ),
            Duration::from_millis(file.retry_max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS)),
        );

        let extensions = file.extensions.unwrap_or_else(|| {
            DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect()
        });

        Ok(Self {
            source,
            output: cli
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR)),
            version,
            binaries: cli.binaries.clone().or(file.binaries),
            concurrency,
            timeout: Duration::from_secs(timeout_secs),
            retry,
            extensions,
            dry_run: cli.dry_run,
        })
    }

    /// Render the settings as `Label: value` lines for dry-run output.
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Source: {}", self.source),
            format!("Output: {}", self.output),
            format!("Version: {}", self.version),
            format!("Concurrency: {}", self.concurrency),
            format!("Timeout: {}s", self.timeout.as_secs()),
            format!("Retries: {}", self.retry.max_retries),
            format!("Extensions: {}", self.extensions.join(", ")),
        ];
        if let Some(binaries) = &self.binaries {
            lines.push(format!("Binaries: {binaries}"));
        }
        lines
    }
}

fn missing(field: &str) -> BuilderError {
    BuilderError::Config {
        reason: format!("`{field}` must be given on the command line or in the configuration file"),
    }
}

fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
