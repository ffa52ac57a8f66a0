//! Tolerant parser for artifact definition text.
//!
//! Parsing never fails. A file that declares nothing recognisable still
//! yields an [`ArtifactDefinition`] with every optional field unset; quality
//! problems are the validator's business.

use super::definition::{ArtifactDefinition, Platform, Sections};
use super::lines::{self, KeyLine};
use crate::loader::LoadedDefinition;
use camino::Utf8Path;

/// Top-level block the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TopBlock {
    None,
    Parameters,
    SupportedOs,
    Other,
}

#[derive(Debug, Default)]
struct Collected {
    name: Option<String>,
    author: Option<String>,
    description: Option<String>,
    supported_os: Vec<String>,
    parameters: Vec<String>,
    preconditions: Vec<String>,
    queries: Vec<String>,
    sections: Sections,
}

/// Parse raw definition text read from `path`.
///
/// File metadata is left empty; use [`parse_loaded`] when the definition came
/// from the loader.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use offline_builder::artifact::{parse, Platform};
///
/// let definition = parse("name: Foo\n", Utf8Path::new("corpus/Foo.yaml"));
/// assert_eq!(definition.name.as_deref(), Some("Foo"));
/// assert_eq!(definition.platform, Platform::Generic);
/// ```
#[must_use]
pub fn parse(raw_text: &str, path: &Utf8Path) -> ArtifactDefinition {
    let collected = scan(raw_text);
    let platform = platform_from_directory(path)
        .unwrap_or_else(|| platform_from_supported_os(&collected.supported_os));

    ArtifactDefinition {
        name: collected.name,
        author: collected.author,
        description: collected.description,
        platform,
        parameters: collected.parameters,
        preconditions: collected.preconditions,
        queries: collected.queries,
        sections: collected.sections,
        source_path: path.to_path_buf(),
        size_bytes: 0,
        last_modified: None,
    }
}

/// Parse a definition produced by the loader, carrying over its metadata.
#[must_use]
pub fn parse_loaded(loaded: &LoadedDefinition) -> ArtifactDefinition {
    ArtifactDefinition {
        size_bytes: loaded.size_bytes,
        last_modified: loaded.last_modified,
        ..parse(&loaded.raw_text, &loaded.path)
    }
}

fn scan(raw_text: &str) -> Collected {
    let lines: Vec<&str> = raw_text.lines().collect();
    let mut collected = Collected::default();
    let mut block = TopBlock::None;
    let mut parameter_column: Option<usize> = None;
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        if lines::is_ignorable(line) {
            index += 1;
            continue;
        }
        if lines::is_document_separator(line) {
            block = TopBlock::None;
            index += 1;
            continue;
        }

        let Some(key_line) = KeyLine::parse(line) else {
            if block == TopBlock::SupportedOs {
                if let Some(item) = line.trim().strip_prefix('-') {
                    collected.supported_os.extend(lines::inline_list(item));
                }
            }
            index += 1;
            continue;
        };

        let value = lines::read_value(&lines, index, &key_line);
        if key_line.is_top_level() {
            block = record_top_level(&mut collected, key_line.key, &value.text);
            parameter_column = None;
        } else {
            record_nested(
                &mut collected,
                block,
                &mut parameter_column,
                &key_line,
                &value.text,
            );
        }
        index = value.next_line;
    }
    collected
}

fn record_top_level(collected: &mut Collected, key: &str, value: &str) -> TopBlock {
    match key {
        "name" => set_first(&mut collected.name, value),
        "author" => set_first(&mut collected.author, value),
        "description" => set_first(&mut collected.description, value),
        "sources" => collected.sections.sources = true,
        "tools" => collected.sections.tools = true,
        "parameters" => {
            collected.sections.parameters = true;
            return TopBlock::Parameters;
        }
        "precondition" => {
            collected.sections.precondition = true;
            push_non_empty(&mut collected.preconditions, value);
        }
        "query" => push_non_empty(&mut collected.queries, value),
        "supported_os" => {
            collected.supported_os.extend(lines::inline_list(value));
            return TopBlock::SupportedOs;
        }
        _ => {}
    }
    TopBlock::Other
}

fn record_nested(
    collected: &mut Collected,
    block: TopBlock,
    parameter_column: &mut Option<usize>,
    key_line: &KeyLine<'_>,
    value: &str,
) {
    if block == TopBlock::Parameters && key_line.list_item && parameter_column.is_none() {
        *parameter_column = Some(key_line.key_column);
    }
    match key_line.key {
        "precondition" => push_non_empty(&mut collected.preconditions, value),
        "query" => push_non_empty(&mut collected.queries, value),
        "name" if block == TopBlock::Parameters => {
            if *parameter_column == Some(key_line.key_column) {
                push_non_empty(&mut collected.parameters, value);
            }
        }
        _ => {}
    }
}

fn set_first(slot: &mut Option<String>, value: &str) {
    if slot.is_none() && !value.trim().is_empty() {
        *slot = Some(value.trim().to_owned());
    }
}

fn push_non_empty(target: &mut Vec<String>, value: &str) {
    if !value.trim().is_empty() {
        target.push(value.to_owned());
    }
}

fn platform_from_directory(path: &Utf8Path) -> Option<Platform> {
    path.parent()
        .and_then(Utf8Path::file_name)
        .and_then(Platform::from_label)
}

fn platform_from_supported_os(labels: &[String]) -> Platform {
    let mut found: Vec<Platform> = labels
        .iter()
        .filter_map(|label| Platform::from_label(label))
        .filter(|platform| *platform != Platform::Generic)
        .collect();
    found.sort();
    found.dedup();
    match found.as_slice() {
        [single] => *single,
        _ => Platform::Generic,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
