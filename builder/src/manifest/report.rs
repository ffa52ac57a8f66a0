//! Plain-text build summary rendered from the manifest.

use super::model::Manifest;

/// Render the human-readable build summary.
///
/// Sections with nothing to report are omitted; the headline counts are
/// always present.
#[must_use]
pub fn render(manifest: &Manifest) -> String {
    let summary = &manifest.summary;
    let mut lines = vec![
        format!("Offline builder bundle {}", manifest.version),
        format!("Generated at: {}", manifest.generated_at),
        String::new(),
        format!(
            "Artifacts: {} ({} with tools, {} without tools, {} invalid)",
            summary.total_artifacts,
            summary.artifacts_with_tools,
            summary.artifacts_without_tools,
            summary.invalid_artifacts
        ),
        format!(
            "Tools: {} ({} verified, {} failed)",
            summary.total_tools, summary.verified_tools, summary.failed_tools
        ),
        format!("Skipped files: {}", summary.skipped_files),
    ];

    let failed: Vec<String> = manifest
        .tools
        .iter()
        .filter_map(|tool| {
            let reason = tool.failure.as_deref()?;
            Some(format!("  - {}: {reason}", tool.url))
        })
        .collect();
    push_section(&mut lines, "Failed tools:", failed);

    let tool_warnings: Vec<String> = manifest
        .tools
        .iter()
        .flat_map(|tool| {
            tool.warnings
                .iter()
                .map(move |warning| format!("  - {}: {warning}", tool.file_name))
        })
        .collect();
    push_section(&mut lines, "Tool warnings:", tool_warnings);

    let invalid: Vec<String> = manifest
        .artifacts
        .iter()
        .filter(|entry| !entry.is_valid)
        .map(|entry| {
            format!(
                "  - {} ({}, score {}): {}",
                entry.name,
                entry.source_file,
                entry.validation_score,
                entry.errors.join("; ")
            )
        })
        .collect();
    push_section(&mut lines, "Invalid artifacts:", invalid);

    let skipped: Vec<String> = manifest
        .skipped_files
        .iter()
        .map(|file| format!("  - {}: {}", file.path, file.reason))
        .collect();
    push_section(&mut lines, "Skipped files:", skipped);

    let verified: Vec<String> = manifest
        .tools
        .iter()
        .filter_map(|tool| {
            let digest = tool.sha256.as_deref()?;
            Some(format!("  {digest}  {}", tool.file_name))
        })
        .collect();
    push_section(&mut lines, "Verified tool checksums (SHA-256):", verified);

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn push_section(lines: &mut Vec<String>, heading: &str, body: Vec<String>) {
    if body.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(heading.to_owned());
    lines.extend(body);
}
