//! Archive extraction for fetched tools.
//!
//! Extracts `.zip` archives into a sibling directory with path traversal
//! protection. Entries are unpacked into a hidden staging directory first and
//! renamed into place only once every entry has been written, so a failed
//! extraction never leaves a half-populated tool directory behind.

use super::fetcher::STAGING_SUFFIX;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::path::{Component, Path};

/// Trait for extracting tool archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use offline_builder::fetch::ZipExtractor;
///
/// let extractor = ZipExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// # let _ = extractor;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the extracted files. An existing
    /// `dest_dir` is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::EmptyArchive`]
    /// if no files are found, and [`ExtractionError::Zip`] or
    /// [`ExtractionError::Io`] on read and write failures.
    fn extract(
        &self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a readable zip archive.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default extractor using the `zip` crate.
///
/// Validates each entry path before extraction to guard against path
/// traversal attacks (zip-slip).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let staging = staging_dir_for(dest_dir);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let extracted = match unpack_into(archive_path, &staging) {
            Ok(extracted) => extracted,
            Err(err) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(err);
            }
        };

        if dest_dir.exists() {
            fs::remove_dir_all(dest_dir)?;
        }
        fs::rename(&staging, dest_dir)?;
        Ok(extracted)
    }
}

fn staging_dir_for(dest_dir: &Utf8Path) -> Utf8PathBuf {
    let name = dest_dir.file_name().unwrap_or("extract");
    dest_dir.with_file_name(format!(".{name}{STAGING_SUFFIX}"))
}

fn unpack_into(archive_path: &Utf8Path, staging: &Utf8Path) -> Result<Vec<String>, ExtractionError> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_name = entry.name().replace('\\', "/");
        validate_entry_path(Path::new(&entry_name))?;

        let out_path = staging.join(&entry_name);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))?;
        }

        extracted.push(entry_name);
    }

    if extracted.is_empty() {
        return Err(ExtractionError::EmptyArchive);
    }
    Ok(extracted)
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components, roots, or drive prefixes.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
