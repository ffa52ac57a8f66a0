//! CSV projection of the manifest's tool list.
//!
//! One row per unique tool, so the number of data rows always equals the
//! number of distinct URLs. Fields are quoted per RFC 4180 when they contain
//! a comma, a double quote, or a line break.

use super::model::{Manifest, ToolRecord};

/// Header row of the tool manifest.
pub const HEADER: [&str; 5] = ["Artifact", "Url", "FileName", "ExtractedTo", "Status"];

/// Separator between referencing artifact names in the `Artifact` column.
pub const ARTIFACT_SEPARATOR: &str = ";";

/// Render the tool manifest as CSV, one `\n`-terminated line per row.
#[must_use]
pub fn render(manifest: &Manifest) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().copied());
    for tool in &manifest.tools {
        push_row(&mut out, row_for(tool).iter().map(String::as_str));
    }
    out
}

fn row_for(tool: &ToolRecord) -> [String; 5] {
    [
        tool.referencing_artifacts.join(ARTIFACT_SEPARATOR),
        tool.url.clone(),
        tool.file_name.clone(),
        tool.extracted_path.clone().unwrap_or_default(),
        tool.status.clone(),
    ]
}

fn push_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = fields.map(quote_field).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Quote `field` when it contains a separator, quote, or line break.
///
/// # Examples
///
/// ```
/// use offline_builder::manifest::csv;
///
/// assert_eq!(csv::quote_field("plain"), "plain");
/// assert_eq!(csv::quote_field("a,b"), "\"a,b\"");
/// ```
#[must_use]
pub fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
