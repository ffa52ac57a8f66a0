//! The in-memory manifest aggregate and its JSON projection.
//!
//! [`Manifest::build`] joins parser, resolver, fetcher, and validator output
//! into one value. The JSON document, the CSV tool list, and the text report
//! are all rendered from that value and never recomputed independently.

use crate::artifact::{ArtifactDefinition, Platform, ToolReference};
use crate::loader::SkippedFile;
use crate::resolver::{FetchStatus, ResolvedTool};
use crate::validation::ValidationResult;
use crate::version::CorpusVersion;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Directory (relative to the workspace root) holding copied definitions.
pub const DEFINITIONS_DIR: &str = "artifact_definitions";

/// Everything the pipeline learned about one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// The parsed definition.
    pub definition: ArtifactDefinition,
    /// Path of the definition relative to the source root.
    pub relative_path: Utf8PathBuf,
    /// Tool references extracted from the definition.
    pub references: Vec<ToolReference>,
    /// The validation outcome.
    pub validation: ValidationResult,
}

/// An ISO 8601 UTC timestamp recording when the manifest was generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GeneratedAt(String);

impl GeneratedAt {
    /// Wrap an existing timestamp string.
    ///
    /// # Examples
    ///
    /// ```
    /// use offline_builder::manifest::GeneratedAt;
    ///
    /// let ts = GeneratedAt::new("2026-02-03T00:00:00Z");
    /// assert_eq!(ts.as_str(), "2026-02-03T00:00:00Z");
    /// ```
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Capture the current time as `YYYY-MM-DDThh:mm:ssZ`.
    ///
    /// A clock set before the Unix epoch is reported as the epoch itself.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self(format_epoch_secs(secs))
    }

    /// Return the timestamp as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneratedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format a Unix epoch timestamp as `YYYY-MM-DDThh:mm:ssZ`.
fn format_epoch_secs(epoch_secs: u64) -> String {
    let (year, month, day) = civil_from_epoch(epoch_secs);
    let day_secs = epoch_secs % 86_400;
    let hour = day_secs / 3_600;
    let minute = (day_secs % 3_600) / 60;
    let second = day_secs % 60;
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Convert a Unix epoch timestamp to a `(year, month, day)` triple using
/// Howard Hinnant's `civil_from_days` algorithm.
fn civil_from_epoch(epoch_secs: u64) -> (i64, u64, u64) {
    let z = i64::try_from(epoch_secs / 86_400).unwrap_or(i64::MAX / 2) + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097).unsigned_abs(); // day of era [0, 146_096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = i64::try_from(yoe).unwrap_or(0) + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Inputs joined into a [`Manifest`].
#[derive(Debug, Clone, Copy)]
pub struct ManifestInputs<'a> {
    /// The corpus version being packaged.
    pub version: &'a CorpusVersion,
    /// When the manifest was generated.
    pub generated_at: &'a GeneratedAt,
    /// Workspace root; recorded paths are made relative to it.
    pub workspace_root: &'a Utf8Path,
    /// One record per parsed definition.
    pub artifacts: &'a [ArtifactRecord],
    /// Every resolved tool after fetching.
    pub tools: &'a [ResolvedTool],
    /// Files the loader could not read.
    pub skipped: &'a [SkippedFile],
}

/// Headline counts for a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Summary {
    /// Parsed definitions.
    pub total_artifacts: usize,
    /// Unique tools (distinct URLs).
    pub total_tools: usize,
    /// Artifacts referencing at least one tool.
    pub artifacts_with_tools: usize,
    /// Artifacts referencing no tools.
    pub artifacts_without_tools: usize,
    /// Tools fetched and verified.
    pub verified_tools: usize,
    /// Tools that could not be fetched.
    pub failed_tools: usize,
    /// Artifacts with at least one validation error.
    pub invalid_artifacts: usize,
    /// Definition files that could not be read.
    pub skipped_files: usize,
}

/// One tool as referenced by one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToolDetail {
    /// Name the artifact declared the tool under.
    pub tool_name: String,
    /// Trimmed download URL.
    pub url: String,
    /// File name under `external_tools/`.
    pub file_name: String,
    /// Fetch status label.
    pub status: String,
    /// Workspace-relative extraction directory, when extracted.
    pub extracted_path: Option<String>,
}

/// The per-artifact join of definition, tools, and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestEntry {
    /// Display name (declared name or file stem).
    pub name: String,
    /// Declared author.
    pub author: Option<String>,
    /// Target platform.
    pub platform: Platform,
    /// Workspace-relative path of the copied definition.
    pub source_file: String,
    /// Number of tool references.
    pub tool_count: usize,
    /// Declared tool names, sorted and deduplicated.
    pub tools: Vec<String>,
    /// One row per tool reference.
    pub tool_details: Vec<ToolDetail>,
    /// Validation score.
    pub validation_score: u8,
    /// Validation verdict.
    pub is_valid: bool,
    /// Validation errors.
    pub errors: Vec<String>,
    /// Validation warnings.
    pub warnings: Vec<String>,
}

/// One unique tool with its fetch outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToolRecord {
    /// Trimmed download URL.
    pub url: String,
    /// File name under `external_tools/`.
    pub file_name: String,
    /// Fetch status label.
    pub status: String,
    /// Every name the tool was declared under.
    pub tool_names: Vec<String>,
    /// Every artifact referencing the tool.
    pub referencing_artifacts: Vec<String>,
    /// Workspace-relative path of the verified download.
    pub local_path: Option<String>,
    /// Workspace-relative extraction directory.
    pub extracted_path: Option<String>,
    /// Hex SHA-256 digest of the verified download.
    pub sha256: Option<String>,
    /// Failure reason for failed tools.
    pub failure: Option<String>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
}

/// A definition file left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkippedRecord {
    /// Path of the file.
    pub path: String,
    /// Why it was skipped.
    pub reason: String,
}

/// The single aggregate every output is projected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    /// Corpus version.
    pub version: String,
    /// Generation timestamp.
    pub generated_at: GeneratedAt,
    /// Headline counts.
    pub summary: Summary,
    /// Per-artifact entries, sorted by name then source file.
    pub artifacts: Vec<ManifestEntry>,
    /// Unique tools, sorted by URL.
    pub tools: Vec<ToolRecord>,
    /// Unreadable definition files, sorted by path.
    pub skipped_files: Vec<SkippedRecord>,
}

impl Manifest {
    /// Join all pipeline outputs into one manifest.
    #[must_use]
    pub fn build(inputs: ManifestInputs<'_>) -> Self {
        let by_url: BTreeMap<&str, &ResolvedTool> = inputs
            .tools
            .iter()
            .map(|tool| (tool.url.as_str(), tool))
            .collect();

        let mut artifacts: Vec<ManifestEntry> = inputs
            .artifacts
            .iter()
            .map(|record| entry_for(record, &by_url, inputs.workspace_root))
            .collect();
        artifacts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.source_file.cmp(&b.source_file)));

        let mut tools: Vec<ToolRecord> = inputs
            .tools
            .iter()
            .map(|tool| tool_record(tool, inputs.workspace_root))
            .collect();
        tools.sort_by(|a, b| a.url.cmp(&b.url));

        let mut skipped_files: Vec<SkippedRecord> = inputs
            .skipped
            .iter()
            .map(|skipped| SkippedRecord {
                path: skipped.path.replace('\\', "/"),
                reason: skipped.reason.clone(),
            })
            .collect();
        skipped_files.sort_by(|a, b| a.path.cmp(&b.path));

        let artifacts_with_tools = artifacts.iter().filter(|e| e.tool_count > 0).count();
        let summary = Summary {
            total_artifacts: artifacts.len(),
            total_tools: tools.len(),
            artifacts_with_tools,
            artifacts_without_tools: artifacts.len() - artifacts_with_tools,
            verified_tools: count_status(inputs.tools, FetchStatus::Verified),
            failed_tools: count_status(inputs.tools, FetchStatus::Failed),
            invalid_artifacts: artifacts.iter().filter(|e| !e.is_valid).count(),
            skipped_files: skipped_files.len(),
        };

        Self {
            version: inputs.version.to_string(),
            generated_at: inputs.generated_at.clone(),
            summary,
            artifacts,
            tools,
            skipped_files,
        }
    }

    /// Render the manifest as pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns any serialisation error from `serde_json`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

fn count_status(tools: &[ResolvedTool], status: FetchStatus) -> usize {
    tools.iter().filter(|tool| tool.status == status).count()
}

fn entry_for(
    record: &ArtifactRecord,
    by_url: &BTreeMap<&str, &ResolvedTool>,
    workspace_root: &Utf8Path,
) -> ManifestEntry {
    let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
    for reference in &record.references {
        pairs.insert((reference.url.trim(), reference.tool_name.as_str()));
    }

    let tool_details: Vec<ToolDetail> = pairs
        .into_iter()
        .filter_map(|(url, tool_name)| {
            let tool = by_url.get(url)?;
            Some(ToolDetail {
                tool_name: tool_name.to_owned(),
                url: url.to_owned(),
                file_name: tool.file_name.clone(),
                status: tool.status.to_string(),
                extracted_path: tool
                    .extracted_path
                    .as_deref()
                    .map(|path| workspace_relative(path, workspace_root)),
            })
        })
        .collect();
    let tools: BTreeSet<String> = tool_details
        .iter()
        .map(|detail| detail.tool_name.clone())
        .collect();

    let definition = &record.definition;
    let validation = &record.validation;
    ManifestEntry {
        name: definition.display_name(),
        author: definition.author.clone(),
        platform: definition.platform,
        source_file: format!(
            "{DEFINITIONS_DIR}/{}",
            record.relative_path.as_str().replace('\\', "/")
        ),
        tool_count: tool_details.len(),
        tools: tools.into_iter().collect(),
        tool_details,
        validation_score: validation.score,
        is_valid: validation.is_valid,
        errors: validation.errors.clone(),
        warnings: validation.warnings.clone(),
    }
}

fn tool_record(tool: &ResolvedTool, workspace_root: &Utf8Path) -> ToolRecord {
    ToolRecord {
        url: tool.url.clone(),
        file_name: tool.file_name.clone(),
        status: tool.status.to_string(),
        tool_names: tool.tool_names.iter().cloned().collect(),
        referencing_artifacts: tool.referencing_artifacts.iter().cloned().collect(),
        local_path: tool
            .local_path
            .as_deref()
            .map(|path| workspace_relative(path, workspace_root)),
        extracted_path: tool
            .extracted_path
            .as_deref()
            .map(|path| workspace_relative(path, workspace_root)),
        sha256: tool.sha256.clone(),
        failure: tool.failure.clone(),
        warnings: tool.warnings.clone(),
    }
}

/// Render `path` relative to `root` with `/` separators.
#[must_use]
pub fn workspace_relative(path: &Utf8Path, root: &Utf8Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .as_str()
        .replace('\\', "/")
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
