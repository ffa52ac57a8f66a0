//! Dependency resolution: collapse tool references into one fetch job per
//! unique URL.
//!
//! Resolution is a pure, global barrier step. It must see every reference in
//! the corpus before producing anything, because a tool referenced by two
//! artifacts in different files has to be fetched exactly once.

use crate::artifact::ToolReference;
use crate::fetch::is_partial_name;
use camino::Utf8PathBuf;
use log::warn;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// File name used when neither the URL nor the tool names yield one.
const FALLBACK_FILE_NAME: &str = "tool";

/// Suffix marking a tool as a zip archive to unpack.
const ZIP_SUFFIX: &str = ".zip";

/// Lifecycle of a resolved tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FetchStatus {
    /// Resolved but not yet fetched.
    #[default]
    Pending,
    /// A fetch is in progress.
    Downloading,
    /// Downloaded, non-empty, and moved into place.
    Verified,
    /// Every attempt failed, or the fetch was cancelled.
    Failed,
}

impl FetchStatus {
    /// Return the label used in the manifest.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Downloading => "Downloading",
            Self::Verified => "Verified",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unique tool, keyed by its trimmed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    /// Trimmed download URL.
    pub url: String,
    /// File name under `external_tools/`, unique across the resolved set.
    pub file_name: String,
    /// Every name the tool was declared under.
    pub tool_names: BTreeSet<String>,
    /// Every artifact that references the tool. Never empty.
    pub referencing_artifacts: BTreeSet<String>,
    /// Location of the verified download.
    pub local_path: Option<Utf8PathBuf>,
    /// Directory holding the extracted archive contents.
    pub extracted_path: Option<Utf8PathBuf>,
    /// Hex SHA-256 digest of the verified download.
    pub sha256: Option<String>,
    /// Current fetch status.
    pub status: FetchStatus,
    /// Reason for a `Failed` status.
    pub failure: Option<String>,
    /// Non-fatal problems, such as a failed extraction.
    pub warnings: Vec<String>,
}

impl ResolvedTool {
    fn pending(url: String, file_name: String) -> Self {
        Self {
            url,
            file_name,
            tool_names: BTreeSet::new(),
            referencing_artifacts: BTreeSet::new(),
            local_path: None,
            extracted_path: None,
            sha256: None,
            status: FetchStatus::Pending,
            failure: None,
            warnings: Vec::new(),
        }
    }

    /// Return a copy marked [`FetchStatus::Failed`] with `reason`.
    #[must_use]
    pub fn failed(&self, reason: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Failed,
            failure: Some(reason.into()),
            local_path: None,
            extracted_path: None,
            sha256: None,
            ..self.clone()
        }
    }

    /// Return true when the file name ends in `.zip` (case-insensitive)
    /// after a non-empty stem.
    #[must_use]
    pub fn is_zip_archive(&self) -> bool {
        self.extraction_dir_name().is_some()
    }

    /// Return the directory under `external_tools/` that a zip archive is
    /// unpacked into, or `None` for any other file.
    ///
    /// Resolution reserves this name alongside `file_name`, so it never
    /// clashes with another tool's file or directory.
    #[must_use]
    pub fn extraction_dir_name(&self) -> Option<&str> {
        extraction_dir_name(&self.file_name)
    }
}

/// Group references by trimmed URL into one [`ResolvedTool`] each.
///
/// The result is sorted by URL. References with an empty URL are dropped
/// with a warning.
///
/// # Examples
///
/// ```
/// use offline_builder::artifact::ToolReference;
/// use offline_builder::resolver::resolve;
///
/// let reference = |artifact: &str| ToolReference {
///     artifact_name: artifact.to_owned(),
///     tool_name: "tool1".to_owned(),
///     url: "https://example/t1.zip".to_owned(),
/// };
/// let resolved = resolve(&[reference("A"), reference("B")]);
/// assert_eq!(resolved.len(), 1);
/// assert_eq!(resolved[0].file_name, "t1.zip");
/// assert_eq!(resolved[0].referencing_artifacts.len(), 2);
/// ```
#[must_use]
pub fn resolve(references: &[ToolReference]) -> Vec<ResolvedTool> {
    let mut groups: BTreeMap<&str, Vec<&ToolReference>> = BTreeMap::new();
    for reference in references {
        let url = reference.url.trim();
        if url.is_empty() {
            warn!(
                "dropping tool {} in {}: empty URL",
                reference.tool_name, reference.artifact_name
            );
            continue;
        }
        groups.entry(url).or_default().push(reference);
    }

    let mut taken: HashSet<String> = HashSet::new();
    groups
        .into_iter()
        .map(|(url, group)| {
            let first_tool = group.first().map_or("", |r| r.tool_name.as_str());
            let base = file_name_for(url, first_tool);
            let file_name = reserve(&base, &mut taken);
            let mut tool = ResolvedTool::pending(url.to_owned(), file_name);
            for reference in group {
                tool.tool_names.insert(reference.tool_name.clone());
                tool.referencing_artifacts
                    .insert(reference.artifact_name.clone());
            }
            tool
        })
        .collect()
}

/// Derive a file name from the final URL path segment.
///
/// Query strings and fragments are ignored and percent-escapes decoded. A
/// URL without a usable segment falls back to `tool_name`, then to `tool`.
/// A name the fetcher reserves for in-flight files gets a trailing `_`.
#[must_use]
pub fn file_name_for(url: &str, tool_name: &str) -> String {
    let from_url = last_segment(url).map(|segment| sanitise(&segment));
    if let Some(name) = from_url.filter(|name| is_usable(name)) {
        return settled(name);
    }
    let from_tool = sanitise(tool_name.trim());
    if is_usable(&from_tool) {
        return settled(from_tool);
    }
    FALLBACK_FILE_NAME.to_owned()
}

fn settled(name: String) -> String {
    if is_partial_name(&name) {
        format!("{name}_")
    } else {
        name
    }
}

fn last_segment(url: &str) -> Option<String> {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let segment = parsed.path_segments()?.next_back()?.to_owned();
            Some(percent_decode(&segment))
        }
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            let segment = path.rsplit('/').next()?;
            Some(percent_decode(segment))
        }
    }
}

fn percent_decode(segment: &str) -> String {
    // Form decoding treats these as separators, so keep them literal.
    let escaped = segment
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map_or_else(|| segment.to_owned(), |(key, _)| key.into_owned())
}

fn sanitise(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

fn extraction_dir_name(file_name: &str) -> Option<&str> {
    let stem_len = file_name.len().checked_sub(ZIP_SUFFIX.len())?;
    if stem_len == 0 || !file_name.is_char_boundary(stem_len) {
        return None;
    }
    let (stem, suffix) = file_name.split_at(stem_len);
    suffix.eq_ignore_ascii_case(ZIP_SUFFIX).then_some(stem)
}

/// Pick the first free variant of `base` and claim every path it occupies
/// under `external_tools/`: the file itself and, for a zip archive, its
/// extraction directory.
fn reserve(base: &str, taken: &mut HashSet<String>) -> String {
    let (stem, extension) = split_extension(base);
    let mut counter = 1;
    loop {
        let candidate = if counter == 1 {
            base.to_owned()
        } else {
            format!("{stem}-{counter}{extension}")
        };
        let mut claimed = vec![candidate.to_ascii_lowercase()];
        if let Some(dir) = extraction_dir_name(&candidate) {
            claimed.push(dir.to_ascii_lowercase());
        }
        if claimed.iter().all(|path| !taken.contains(path)) {
            taken.extend(claimed);
            return candidate;
        }
        counter += 1;
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reference(artifact: &str, tool: &str, url: &str) -> ToolReference {
        ToolReference {
            artifact_name: artifact.to_owned(),
            tool_name: tool.to_owned(),
            url: url.to_owned(),
        }
    }

    #[test]
    fn groups_by_trimmed_url() {
        let resolved = resolve(&[
            reference("A", "tool1", "https://example/t1.zip"),
            reference("B", "tool1", "  https://example/t1.zip "),
        ]);
        assert_eq!(resolved.len(), 1);
        let tool = &resolved[0];
        assert_eq!(tool.url, "https://example/t1.zip");
        assert_eq!(
            tool.referencing_artifacts.iter().collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert_eq!(tool.status, FetchStatus::Pending);
    }

    #[test]
    fn distinct_urls_stay_distinct() {
        let resolved = resolve(&[
            reference("A", "tool", "https://example/v1/tool.exe"),
            reference("A", "tool", "https://example/v2/tool.exe"),
        ]);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].file_name, "tool.exe");
        assert_eq!(resolved[1].file_name, "tool-2.exe");
    }

    #[test]
    fn drops_empty_urls() {
        let resolved = resolve(&[reference("A", "tool", "   ")]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn output_is_sorted_by_url() {
        let resolved = resolve(&[
            reference("A", "b", "https://example/b.exe"),
            reference("A", "a", "https://example/a.exe"),
        ]);
        let urls: Vec<&str> = resolved.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example/a.exe", "https://example/b.exe"]);
    }

    #[test]
    fn collects_every_declared_name() {
        let resolved = resolve(&[
            reference("A", "Autorun_amd64", "https://example/autorunsc64.exe"),
            reference("B", "Autoruns", "https://example/autorunsc64.exe"),
        ]);
        assert_eq!(resolved[0].tool_names.len(), 2);
    }

    #[rstest]
    #[case::plain("https://example.com/tools/t1.zip", "x", "t1.zip")]
    #[case::query("https://example.com/dl/tool.exe?version=2#top", "x", "tool.exe")]
    #[case::percent("https://example.com/My%20Tool.exe", "x", "My Tool.exe")]
    #[case::encoded_slash("https://example.com/a%2Fb.exe", "x", "a_b.exe")]
    #[case::trailing_slash("https://example.com/download/", "Autoruns", "Autoruns")]
    #[case::bare_host("https://example.com", "Some:Tool", "Some_Tool")]
    #[case::nothing_usable("https://example.com/", "", "tool")]
    #[case::not_a_url("ftp-ish/path/file.bin", "x", "file.bin")]
    #[case::partial_suffix("https://example.com/setup.download", "x", "setup.download_")]
    #[case::staging_name("https://example.com/.t1.partial", "x", ".t1.partial_")]
    fn derives_file_names(#[case] url: &str, #[case] tool: &str, #[case] expected: &str) {
        assert_eq!(file_name_for(url, tool), expected);
    }

    #[test]
    fn disambiguation_is_case_insensitive() {
        let mut taken = HashSet::new();
        assert_eq!(reserve("Tool.zip", &mut taken), "Tool.zip");
        assert_eq!(reserve("tool.zip", &mut taken), "tool-2.zip");
        assert_eq!(reserve("TOOL.ZIP", &mut taken), "TOOL-3.ZIP");
        assert_eq!(reserve("README", &mut taken), "README");
        assert_eq!(reserve("README", &mut taken), "README-2");
    }

    #[test]
    fn archive_directory_does_not_clash_with_plain_file() {
        let resolved = resolve(&[
            reference("A", "t1", "https://example/t1"),
            reference("B", "t1", "https://example/t1.zip"),
        ]);
        assert_eq!(resolved[0].file_name, "t1");
        assert_eq!(resolved[0].extraction_dir_name(), None);
        assert_eq!(resolved[1].file_name, "t1-2.zip");
        assert_eq!(resolved[1].extraction_dir_name(), Some("t1-2"));
    }

    #[test]
    fn plain_file_avoids_an_earlier_archive_directory() {
        let resolved = resolve(&[
            reference("A", "t1", "https://a.example/t1.zip"),
            reference("B", "t1", "https://b.example/t1"),
        ]);
        assert_eq!(resolved[0].file_name, "t1.zip");
        assert_eq!(resolved[0].extraction_dir_name(), Some("t1"));
        assert_eq!(resolved[1].file_name, "t1-2");
    }

    #[test]
    fn failed_copy_clears_artefacts_of_success() {
        let tool = ResolvedTool {
            local_path: Some(Utf8PathBuf::from("external_tools/t.exe")),
            sha256: Some("ab".to_owned()),
            ..ResolvedTool::pending("https://x/t.exe".to_owned(), "t.exe".to_owned())
        };
        let failed = tool.failed("HTTP 500");
        assert_eq!(failed.status, FetchStatus::Failed);
        assert_eq!(failed.failure.as_deref(), Some("HTTP 500"));
        assert!(failed.local_path.is_none());
        assert!(failed.sha256.is_none());
        assert_eq!(failed.url, tool.url);
    }

    #[rstest]
    #[case::lower("t1.zip", true)]
    #[case::upper("T1.ZIP", true)]
    #[case::exe("t1.exe", false)]
    #[case::bare_suffix(".zip", false)]
    fn detects_zip_archives(#[case] file_name: &str, #[case] expected: bool) {
        let tool = ResolvedTool::pending("u".to_owned(), file_name.to_owned());
        assert_eq!(tool.is_zip_archive(), expected);
    }
}
