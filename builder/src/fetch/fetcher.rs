//! Fetch orchestration for resolved tools.
//!
//! Each fetch is independent and failure-isolated: every outcome, good or
//! bad, comes back as an updated [`ResolvedTool`] and nothing here aborts the
//! run.

use super::download::{DownloadError, ToolDownloader};
use super::extraction::ArchiveExtractor;
use super::retry::RetryPolicy;
use crate::cancel::CancellationToken;
use crate::digest::compute_sha256;
use crate::resolver::{FetchStatus, ResolvedTool};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::fs;

/// Suffix for in-progress downloads.
pub const PARTIAL_SUFFIX: &str = ".download";

/// Suffix of the hidden staging directory an archive is unpacked into.
pub const STAGING_SUFFIX: &str = ".partial";

/// Return true for names the fetcher only uses while a tool is in flight:
/// `<file>.download` partials and hidden `.<dir>.partial` staging
/// directories.
///
/// # Examples
///
/// ```
/// use offline_builder::fetch::is_partial_name;
///
/// assert!(is_partial_name("t1.zip.download"));
/// assert!(is_partial_name(".t1.partial"));
/// assert!(!is_partial_name("t1.zip"));
/// ```
#[must_use]
pub fn is_partial_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(PARTIAL_SUFFIX)
        || (name.starts_with('.') && name.ends_with(STAGING_SUFFIX))
}

/// Failure reason recorded for tools skipped after cancellation.
pub const CANCELLED_REASON: &str = "cancelled before fetch";

/// Downloads, verifies, and unpacks tools into `external_tools/`.
pub struct Fetcher<'a> {
    downloader: &'a dyn ToolDownloader,
    extractor: &'a dyn ArchiveExtractor,
    tools_dir: Utf8PathBuf,
    retry: RetryPolicy,
}

impl<'a> Fetcher<'a> {
    /// Create a fetcher writing into `tools_dir`, which must already exist.
    #[must_use]
    pub fn new(
        downloader: &'a dyn ToolDownloader,
        extractor: &'a dyn ArchiveExtractor,
        tools_dir: impl Into<Utf8PathBuf>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            downloader,
            extractor,
            tools_dir: tools_dir.into(),
            retry,
        }
    }

    /// Return the directory tools are written into.
    #[must_use]
    pub fn tools_dir(&self) -> &Utf8Path {
        &self.tools_dir
    }

    /// Fetch one tool and return its updated record.
    ///
    /// The download lands in `<file_name>.download`, is checked for a
    /// non-empty body, and is then renamed to `<file_name>`. Zip archives are
    /// extracted into [`ResolvedTool::extraction_dir_name`]; an extraction failure is recorded as a
    /// warning and leaves the tool [`FetchStatus::Verified`].
    #[must_use]
    pub fn fetch(&self, tool: &ResolvedTool) -> ResolvedTool {
        let final_path = self.tools_dir.join(&tool.file_name);
        let partial_path = self
            .tools_dir
            .join(format!("{}{PARTIAL_SUFFIX}", tool.file_name));
        debug!("{} {} -> {}", FetchStatus::Downloading, tool.url, partial_path);

        let downloaded = self.retry.run(
            |attempt| {
                if attempt > 0 {
                    debug!("retry {attempt} for {}", tool.url);
                }
                self.attempt(&tool.url, &partial_path)
            },
            DownloadError::is_retryable,
        );
        if let Err(err) = downloaded {
            remove_partial(&partial_path);
            warn!("fetch failed for {}: {err}", tool.url);
            return tool.failed(err.to_string());
        }

        if let Err(err) = fs::rename(&partial_path, &final_path) {
            remove_partial(&partial_path);
            warn!("cannot move {partial_path} into place: {err}");
            return tool.failed(format!("cannot move download into place: {err}"));
        }

        let mut fetched = ResolvedTool {
            status: FetchStatus::Verified,
            local_path: Some(final_path.clone()),
            failure: None,
            ..tool.clone()
        };
        match compute_sha256(&final_path) {
            Ok(digest) => fetched.sha256 = Some(digest),
            Err(err) => fetched
                .warnings
                .push(format!("cannot compute SHA-256: {err}")),
        }
        info!("verified {} ({})", tool.file_name, tool.url);

        if let Some(dir_name) = tool.extraction_dir_name() {
            let dest = self.tools_dir.join(dir_name);
            self.extract_into_place(&mut fetched, &final_path, dest);
        }
        fetched
    }

    /// Fetch every tool on `pool`, preserving input order.
    ///
    /// Tools not yet started when `cancel` fires come back
    /// [`FetchStatus::Failed`] with [`CANCELLED_REASON`].
    #[must_use]
    pub fn fetch_all(
        &self,
        tools: &[ResolvedTool],
        pool: &ThreadPool,
        cancel: &CancellationToken,
    ) -> Vec<ResolvedTool> {
        pool.install(|| {
            tools
                .par_iter()
                .map(|tool| {
                    if cancel.is_cancelled() {
                        return tool.failed(CANCELLED_REASON);
                    }
                    self.fetch(tool)
                })
                .collect()
        })
    }

    fn attempt(&self, url: &str, partial_path: &Utf8Path) -> Result<u64, DownloadError> {
        let written = self.downloader.download(url, partial_path)?;
        let on_disk = fs::metadata(partial_path)?.len();
        if on_disk == 0 {
            return Err(DownloadError::EmptyBody {
                url: url.to_owned(),
            });
        }
        Ok(written.max(on_disk))
    }

    fn extract_into_place(
        &self,
        fetched: &mut ResolvedTool,
        archive_path: &Utf8Path,
        dest: Utf8PathBuf,
    ) {
        match self.extractor.extract(archive_path, &dest) {
            Ok(files) => {
                debug!("extracted {} file(s) into {dest}", files.len());
                fetched.extracted_path = Some(dest);
            }
            Err(err) => {
                warn!("extraction failed for {}: {err}", fetched.file_name);
                fetched.warnings.push(format!("extraction failed: {err}"));
            }
        }
    }
}

fn remove_partial(path: &Utf8Path) {
    if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            warn!("cannot remove partial download {path}: {err}");
        }
    }
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
