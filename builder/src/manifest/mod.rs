//! Manifest aggregation and its three projections.
//!
//! [`Manifest`] is built once per run. The JSON document, the CSV tool list
//! ([`csv::render`]), and the text report ([`report::render`]) are all
//! rendered from it.

pub mod csv;
mod model;
pub mod report;

pub use model::{
    ArtifactRecord, DEFINITIONS_DIR, GeneratedAt, Manifest, ManifestEntry, ManifestInputs,
    SkippedRecord, Summary, ToolDetail, ToolRecord, workspace_relative,
};

/// File name of the JSON manifest inside the workspace.
pub const JSON_FILE_NAME: &str = "external_tools_manifest.json";

/// File name of the CSV tool manifest inside the workspace.
pub const CSV_FILE_NAME: &str = "external_tools_manifest.csv";

/// File name of the text build summary inside the workspace.
pub const SUMMARY_FILE_NAME: &str = "build_summary.txt";
