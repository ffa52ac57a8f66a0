//! Bundle workspace layout and preparation.
//!
//! The workspace is the directory that becomes the archive:
//!
//! ```text
//! <output>/offline_builder_v<version>/
//!     binaries/
//!     artifact_definitions/<relative path of each definition>
//!     external_tools/
//!     external_tools_manifest.json
//!     external_tools_manifest.csv
//!     build_summary.txt
//! ```

use crate::error::{BuilderError, Result};
use crate::loader::LoadedDefinition;
use crate::manifest::DEFINITIONS_DIR;
use crate::version::CorpusVersion;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use walkdir::WalkDir;

/// Directory for the deployed binary's executables.
pub const BINARIES_DIR: &str = "binaries";

/// Directory for fetched tools and their extracted contents.
pub const TOOLS_DIR: &str = "external_tools";

/// Paths of one bundle workspace.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use offline_builder::version::CorpusVersion;
/// use offline_builder::workspace::Workspace;
///
/// let version = CorpusVersion::try_from("1.0").expect("valid version");
/// let workspace = Workspace::new(Utf8Path::new("dist"), &version);
/// assert_eq!(workspace.root().as_str(), "dist/offline_builder_v1.0");
/// assert_eq!(workspace.tools_dir().as_str(), "dist/offline_builder_v1.0/external_tools");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    output_dir: Utf8PathBuf,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Describe the workspace for `version` below `output_dir`.
    #[must_use]
    pub fn new(output_dir: &Utf8Path, version: &CorpusVersion) -> Self {
        Self {
            output_dir: output_dir.to_owned(),
            root: output_dir.join(version.bundle_stem()),
        }
    }

    /// Return the output directory holding the workspace and the archive.
    #[must_use]
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Return the workspace root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return the `binaries/` directory.
    #[must_use]
    pub fn binaries_dir(&self) -> Utf8PathBuf {
        self.root.join(BINARIES_DIR)
    }

    /// Return the `artifact_definitions/` directory.
    #[must_use]
    pub fn definitions_dir(&self) -> Utf8PathBuf {
        self.root.join(DEFINITIONS_DIR)
    }

    /// Return the `external_tools/` directory.
    #[must_use]
    pub fn tools_dir(&self) -> Utf8PathBuf {
        self.root.join(TOOLS_DIR)
    }

    /// Create a fresh workspace and verify it is writable.
    ///
    /// Output of an earlier run with the same version is removed first so
    /// the bundle reflects only this run.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::WorkspaceWrite`] if any directory cannot be
    /// created or the writability probe fails.
    pub fn prepare(&self) -> Result<()> {
        if self.root.exists() {
            info!("removing previous workspace {}", self.root);
            fs::remove_dir_all(&self.root)
                .map_err(|source| BuilderError::workspace_write(&self.root, source))?;
        }
        for dir in [self.binaries_dir(), self.definitions_dir(), self.tools_dir()] {
            fs::create_dir_all(&dir).map_err(|source| BuilderError::workspace_write(&dir, source))?;
        }
        self.probe_writable()
    }

    /// Verify the workspace accepts new files by creating a temporary one.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::WorkspaceWrite`] if the probe file cannot be
    /// created.
    pub fn probe_writable(&self) -> Result<()> {
        tempfile::NamedTempFile::new_in(&self.root)
            .map(drop)
            .map_err(|source| BuilderError::workspace_write(&self.root, source))
    }

    /// Copy every loaded definition to `artifact_definitions/<relative>`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::WorkspaceWrite`] if a copy cannot be written.
    pub fn copy_definitions(&self, definitions: &[LoadedDefinition]) -> Result<()> {
        let base = self.definitions_dir();
        for definition in definitions {
            let dest = base.join(&definition.relative_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| BuilderError::workspace_write(parent, source))?;
            }
            fs::write(&dest, &definition.raw_text)
                .map_err(|source| BuilderError::workspace_write(&dest, source))?;
        }
        debug!("copied {} definitions to {base}", definitions.len());
        Ok(())
    }

    /// Copy every regular file below `source` into `binaries/`, keeping
    /// relative paths. Returns the number of files copied.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::SourceNotFound`] if `source` is not a
    /// directory, or [`BuilderError::WorkspaceWrite`] if a file cannot be
    /// read or written.
    pub fn copy_binaries(&self, source: &Utf8Path) -> Result<usize> {
        if !source.is_dir() {
            return Err(BuilderError::SourceNotFound {
                path: source.to_owned(),
            });
        }
        let base = self.binaries_dir();
        let mut copied = 0;
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                BuilderError::workspace_write(source, std::io::Error::other(err))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8Path::from_path(entry.path()).ok_or_else(|| BuilderError::NonUtf8Path {
                path: entry.path().to_string_lossy().into_owned(),
            })?;
            let Ok(relative) = path.strip_prefix(source) else {
                continue;
            };
            let dest = base.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| BuilderError::workspace_write(parent, source))?;
            }
            fs::copy(path, &dest).map_err(|source| BuilderError::workspace_write(&dest, source))?;
            copied += 1;
        }
        info!("copied {copied} binaries into {base}");
        Ok(copied)
    }

    /// Write `contents` to `name` directly below the workspace root.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::WorkspaceWrite`] if the file cannot be written.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<Utf8PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, contents).map_err(|source| BuilderError::workspace_write(&path, source))?;
        Ok(path)
    }
}
