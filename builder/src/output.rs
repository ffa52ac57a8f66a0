//! User-facing console output.
//!
//! Progress lines and the end-of-run summary are written to an injected
//! writer (stderr in the binary) so they can be asserted on in tests.

use crate::config::Settings;
use crate::manifest::Summary;
use camino::Utf8Path;
use std::io::Write;

/// Write one line, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the headline counts printed at the end of every run.
///
/// # Examples
///
/// ```
/// use offline_builder::manifest::Summary;
/// use offline_builder::output::summary_line;
///
/// let summary = Summary { total_tools: 3, verified_tools: 2, failed_tools: 1, ..Summary::default() };
/// assert_eq!(
///     summary_line(&summary),
///     "Tools: 2 verified, 1 failed (3 unique); artifacts: 0 (0 invalid)"
/// );
/// ```
#[must_use]
pub fn summary_line(summary: &Summary) -> String {
    format!(
        "Tools: {} verified, {} failed ({} unique); artifacts: {} ({} invalid)",
        summary.verified_tools,
        summary.failed_tools,
        summary.total_tools,
        summary.total_artifacts,
        summary.invalid_artifacts
    )
}

/// Format the success message naming the archive.
#[must_use]
pub fn success_message(archive_path: &Utf8Path) -> String {
    format!("Bundle written to {archive_path}")
}

/// What a dry run discovered, without having written anything.
#[derive(Debug, Clone, Copy)]
pub struct DryRunInfo<'a> {
    /// The resolved settings.
    pub settings: &'a Settings,
    /// Path the workspace would be created at.
    pub workspace_root: &'a Utf8Path,
    /// Definitions that could be read.
    pub definitions: usize,
    /// Definitions that could not be read.
    pub skipped: usize,
    /// Unique tool URLs referenced by the corpus.
    pub unique_tools: usize,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be written".to_owned(),
            String::new(),
        ];
        lines.extend(self.settings.display_lines());
        lines.push(format!("Workspace: {}", self.workspace_root));
        lines.push(String::new());
        lines.push(format!("Definitions: {}", self.definitions));
        lines.push(format!("Unreadable files: {}", self.skipped));
        lines.push(format!("Unique tools: {}", self.unique_tools));
        lines.join("\n")
    }
}
