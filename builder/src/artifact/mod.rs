//! Artifact definitions: the parsed model, the tolerant parser, and the tool
//! reference extractor.

mod definition;
mod lines;
mod parser;
mod tool_refs;

pub use definition::{ArtifactDefinition, Platform, Sections, ToolReference};
pub use parser::{parse, parse_loaded};
pub use tool_refs::{extract, extract_with_owner};
