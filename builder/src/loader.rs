//! Definition loader for artifact corpora.
//!
//! Walks a source directory recursively and yields the raw text of every
//! file whose extension marks it as an artifact definition. The walk is lazy
//! and holds no state between calls: every call to
//! [`DefinitionLoader::iter`] re-reads the filesystem.
//!
//! Unreadable files never abort a run. [`DefinitionLoader::load_all`] logs
//! each failure and records it as a [`SkippedFile`] so the manifest can list
//! what was left out.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Extensions recognised as artifact definitions when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// The raw contents of one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDefinition {
    /// Absolute (or root-joined) path of the file.
    pub path: Utf8PathBuf,
    /// Path relative to the source root, used when copying into the workspace.
    pub relative_path: Utf8PathBuf,
    /// File contents with any leading byte-order mark removed.
    pub raw_text: String,
    /// File size in bytes as reported by the filesystem.
    pub size_bytes: u64,
    /// Last modification time, when the platform reports one.
    pub last_modified: Option<SystemTime>,
}

/// A per-file failure encountered while loading the corpus.
#[derive(Debug, Error)]
pub enum FileReadError {
    /// The file could not be read (permissions, invalid UTF-8, vanished).
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path of the unreadable file.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A directory entry could not be traversed.
    #[error("cannot traverse {path}: {reason}")]
    Walk {
        /// Lossy rendering of the path that failed.
        path: String,
        /// Description of the traversal failure.
        reason: String,
    },

    /// The file path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
}

impl FileReadError {
    /// Return the path the failure refers to.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Read { path, .. } => path.to_string(),
            Self::Walk { path, .. } | Self::NonUtf8Path { path } => path.clone(),
        }
    }
}

/// A file that was left out of the run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: String,
    /// Human-readable reason.
    pub reason: String,
}

impl From<&FileReadError> for SkippedFile {
    fn from(err: &FileReadError) -> Self {
        Self {
            path: err.path(),
            reason: err.to_string(),
        }
    }
}

/// Every definition that could be read plus every file that could not.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Successfully read definitions, in walk order.
    pub definitions: Vec<LoadedDefinition>,
    /// Files skipped because they could not be read.
    pub skipped: Vec<SkippedFile>,
}

/// Recursive loader for definition files below a root directory.
///
/// # Examples
///
/// ```no_run
/// use offline_builder::loader::DefinitionLoader;
///
/// let loader = DefinitionLoader::with_default_extensions("artifacts");
/// let outcome = loader.load_all();
/// println!("{} definitions", outcome.definitions.len());
/// ```
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    root: Utf8PathBuf,
    extensions: Vec<String>,
    excluded: Vec<PathBuf>,
}

impl DefinitionLoader {
    /// Create a loader for `root` matching the given file extensions.
    ///
    /// Extensions are compared case-insensitively and may be given with or
    /// without a leading dot.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            root: root.into(),
            extensions,
            excluded: Vec::new(),
        }
    }

    /// Skip `dir` and everything below it when it sits inside the source
    /// tree.
    ///
    /// Paths are compared after canonicalisation, so `dist`, `./dist`, and an
    /// absolute spelling all match. The source root itself is never skipped.
    #[must_use]
    pub fn excluding(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        let dir = dir.as_ref();
        let resolved = fs::canonicalize(dir).unwrap_or_else(|_| dir.as_std_path().to_path_buf());
        self.excluded.push(resolved);
        self
    }

    /// Create a loader using [`DEFAULT_EXTENSIONS`].
    #[must_use]
    pub fn with_default_extensions(root: impl Into<Utf8PathBuf>) -> Self {
        let extensions: Vec<String> = DEFAULT_EXTENSIONS
            .iter()
            .map(|ext| (*ext).to_owned())
            .collect();
        Self::new(root, &extensions)
    }

    /// Return the source root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return true when `path` carries a definition extension.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            self.extensions.iter().any(|wanted| *wanted == ext)
        })
    }

    /// Lazily walk the source tree, yielding one result per candidate file.
    ///
    /// Entries are visited in file-name order so repeated runs see the
    /// corpus in the same sequence.
    pub fn iter(&self) -> impl Iterator<Item = Result<LoadedDefinition, FileReadError>> + '_ {
        WalkDir::new(self.root.as_std_path())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_excluded(entry))
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        return None;
                    }
                    let path = match Utf8PathBuf::try_from(entry.into_path()) {
                        Ok(path) => path,
                        Err(err) => {
                            return Some(Err(FileReadError::NonUtf8Path {
                                path: err.into_path_buf().display().to_string(),
                            }));
                        }
                    };
                    if !self.matches(&path) || !path.is_file() {
                        return None;
                    }
                    Some(self.read(path))
                }
                Err(err) => Some(Err(FileReadError::Walk {
                    path: err.path().map_or_else(
                        || self.root.to_string(),
                        |path| path.display().to_string(),
                    ),
                    reason: err.to_string(),
                })),
            })
    }

    /// Read every definition, logging and recording each unreadable file.
    #[must_use]
    pub fn load_all(&self) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        for result in self.iter() {
            match result {
                Ok(definition) => {
                    debug!("loaded definition {}", definition.relative_path);
                    outcome.definitions.push(definition);
                }
                Err(err) => {
                    warn!("skipping definition: {err}");
                    outcome.skipped.push(SkippedFile::from(&err));
                }
            }
        }
        outcome
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || self.excluded.is_empty() || !entry.file_type().is_dir() {
            return false;
        }
        let skip = fs::canonicalize(entry.path()).is_ok_and(|path| self.excluded.contains(&path));
        if skip {
            debug!("not loading from {}", entry.path().display());
        }
        skip
    }

    fn read(&self, path: Utf8PathBuf) -> Result<LoadedDefinition, FileReadError> {
        let raw_text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) => return Err(FileReadError::Read { path, source }),
        };
        let raw_text = match raw_text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_owned(),
            None => raw_text,
        };
        let metadata = fs::metadata(&path).ok();
        let relative_path = path
            .strip_prefix(&self.root)
            .map_or_else(|_| path.clone(), Utf8Path::to_path_buf);

        Ok(LoadedDefinition {
            size_bytes: metadata.as_ref().map_or(0, fs::Metadata::len),
            last_modified: metadata.and_then(|meta| meta.modified().ok()),
            path,
            relative_path,
            raw_text,
        })
    }
}
