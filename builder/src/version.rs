//! Corpus version newtype and deterministic bundle naming.
//!
//! The version tag names every output of a run: the workspace directory
//! `offline_builder_v<version>/` and the archive
//! `offline_builder_v<version>.zip`. The tag must be non-empty and contain
//! only ASCII alphanumerics, hyphens, dots, and underscores so that it is
//! safe in file names on every platform.

use crate::error::{BuilderError, Result};
use std::fmt;

/// The fixed prefix for bundle names.
const BUNDLE_PREFIX: &str = "offline_builder_v";

/// The fixed archive file extension.
const ARCHIVE_EXTENSION: &str = ".zip";

/// A validated corpus or release version tag (e.g. `0.7.2`).
///
/// A single leading `v` or `V` is stripped so that `v0.7.2` and `0.7.2`
/// name the same bundle.
///
/// # Examples
///
/// ```
/// use offline_builder::version::CorpusVersion;
///
/// let version = CorpusVersion::try_from("v0.7.2").expect("valid version");
/// assert_eq!(version.as_str(), "0.7.2");
/// assert_eq!(version.archive_file_name(), "offline_builder_v0.7.2.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorpusVersion(String);

fn is_valid_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_'
}

impl CorpusVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the bundle stem, used for the workspace directory name and
    /// as the root directory inside the archive.
    #[must_use]
    pub fn bundle_stem(&self) -> String {
        format!("{BUNDLE_PREFIX}{}", self.0)
    }

    /// Return the archive file name.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}{ARCHIVE_EXTENSION}", self.bundle_stem())
    }
}

impl TryFrom<&str> for CorpusVersion {
    type Error = BuilderError;

    fn try_from(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let stripped = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if stripped.is_empty() {
            return Err(BuilderError::InvalidVersion {
                reason: "version must not be empty".to_owned(),
            });
        }
        if let Some(bad) = stripped.chars().find(|c| !is_valid_version_char(*c)) {
            return Err(BuilderError::InvalidVersion {
                reason: format!("invalid character '{bad}' in version \"{value}\""),
            });
        }
        Ok(Self(stripped.to_owned()))
    }
}

impl TryFrom<String> for CorpusVersion {
    type Error = BuilderError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for CorpusVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorpusVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
