//! Versioned bundle packaging.
//!
//! Zips the whole workspace directory into
//! `<output>/offline_builder_v<version>.zip` with every entry rooted at
//! `offline_builder_v<version>/`, then writes a `<archive>.sha256` sidecar.
//! Entries are added in sorted order with a fixed timestamp, so identical
//! workspaces produce identical archives. In-progress downloads and
//! extraction staging directories left directly under `external_tools/` are
//! never packaged.

use crate::digest::compute_sha256;
use crate::fetch::is_partial_name;
use crate::version::CorpusVersion;
use crate::workspace::TOOLS_DIR;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Suffix of the checksum sidecar written next to the archive.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Errors arising while assembling the bundle archive.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// An I/O operation failed (reading workspace files, writing the archive).
    #[error("I/O error during packaging: {0}")]
    Io(#[from] io::Error),

    /// The zip writer rejected an entry.
    #[error("zip error during packaging: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Walking the workspace directory failed.
    #[error("cannot walk workspace: {0}")]
    Walk(#[from] walkdir::Error),

    /// The workspace directory to package does not exist.
    #[error("workspace directory {path} does not exist")]
    MissingWorkspace {
        /// The expected workspace directory.
        path: Utf8PathBuf,
    },

    /// A workspace path is not valid UTF-8.
    #[error("workspace path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Input parameters for [`assemble`].
#[derive(Debug, Clone)]
pub struct PackageParams {
    /// The populated workspace directory.
    pub workspace_dir: Utf8PathBuf,
    /// Directory the archive and its sidecar are written to.
    pub output_dir: Utf8PathBuf,
    /// Version naming the archive and its root directory.
    pub version: CorpusVersion,
}

/// Output produced by [`assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    /// Path to the created `.zip` archive.
    pub archive_path: Utf8PathBuf,
    /// Path to the `.sha256` sidecar.
    pub checksum_path: Utf8PathBuf,
    /// Lowercase hex SHA-256 digest of the archive.
    pub sha256: String,
    /// Number of file entries written.
    pub file_count: usize,
}

/// Package the workspace into the versioned archive.
///
/// The archive is written under a hidden temporary name and renamed into
/// place once complete, replacing any archive left by an earlier run.
///
/// # Errors
///
/// Returns [`PackagingError::MissingWorkspace`] if the workspace does not
/// exist, or an I/O, zip, or walk error if the archive cannot be written.
pub fn assemble(params: &PackageParams) -> Result<PackageOutput, PackagingError> {
    if !params.workspace_dir.is_dir() {
        return Err(PackagingError::MissingWorkspace {
            path: params.workspace_dir.clone(),
        });
    }
    fs::create_dir_all(&params.output_dir)?;

    let archive_name = params.version.archive_file_name();
    let archive_path = params.output_dir.join(&archive_name);
    let partial_path = params.output_dir.join(format!(".{archive_name}.partial"));

    let file_count = match write_archive(
        &params.workspace_dir,
        &params.version.bundle_stem(),
        &partial_path,
    ) {
        Ok(count) => count,
        Err(err) => {
            let _ = fs::remove_file(&partial_path);
            return Err(err);
        }
    };
    fs::rename(&partial_path, &archive_path)?;

    let sha256 = compute_sha256(&archive_path)?;
    let checksum_path = Utf8PathBuf::from(format!("{archive_path}{CHECKSUM_SUFFIX}"));
    fs::write(&checksum_path, format!("{sha256}  {archive_name}\n"))?;

    info!("packaged {file_count} files into {archive_path}");
    Ok(PackageOutput {
        archive_path,
        checksum_path,
        sha256,
        file_count,
    })
}

fn write_archive(
    workspace_dir: &Utf8Path,
    root_name: &str,
    dest: &Utf8Path,
) -> Result<usize, PackagingError> {
    let mut zip = ZipWriter::new(fs::File::create(dest)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut file_count = 0;
    let walker = WalkDir::new(workspace_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_temporary(entry));
    for entry in walker {
        let entry = entry?;
        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| PackagingError::NonUtf8Path {
            path: entry.path().to_string_lossy().into_owned(),
        })?;
        let Ok(relative) = path.strip_prefix(workspace_dir) else {
            continue;
        };
        let name = entry_name(root_name, relative);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options.unix_permissions(file_mode(&entry)))?;
            io::copy(&mut fs::File::open(path)?, &mut zip)?;
            file_count += 1;
        } else {
            debug!("not packaging {path}: not a regular file");
        }
    }

    zip.finish()?.sync_all()?;
    Ok(file_count)
}

fn entry_name(root_name: &str, relative: &Utf8Path) -> String {
    if relative.as_str().is_empty() {
        root_name.to_owned()
    } else {
        format!("{root_name}/{}", relative.as_str().replace('\\', "/"))
    }
}

/// In-progress downloads and hidden extraction staging directories sitting
/// directly in `external_tools/`. Anything deeper is archive content.
fn is_temporary(entry: &DirEntry) -> bool {
    let in_tools_dir = entry.depth() == 2
        && entry
            .path()
            .parent()
            .and_then(|parent| parent.file_name())
            .is_some_and(|parent| parent == TOOLS_DIR);
    if !in_tools_dir {
        return false;
    }
    is_partial_name(&entry.file_name().to_string_lossy())
}

#[cfg(unix)]
fn file_mode(entry: &DirEntry) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    entry
        .metadata()
        .map_or(0o644, |metadata| metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_entry: &DirEntry) -> u32 {
    0o644
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
