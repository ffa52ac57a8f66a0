//! Line-level primitives shared by the parser and the tool extractor.
//!
//! Definitions are YAML-like but frequently hand-edited, so nothing here
//! attempts to build a document tree. Each line is classified on its own
//! (`key: value`, list item, blank, comment) and block scalars are consumed
//! as opaque text so their contents never masquerade as keys.

use regex::Regex;
use std::sync::OnceLock;

/// A `key: value` line, optionally introduced by a list dash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyLine<'a> {
    /// Leading whitespace width.
    pub(crate) indent: usize,
    /// Column at which the key starts (after any `- ` marker).
    pub(crate) key_column: usize,
    /// The line opens a list item.
    pub(crate) list_item: bool,
    /// The key text.
    pub(crate) key: &'a str,
    /// Raw text after the colon, untrimmed of comments and quotes.
    pub(crate) raw_value: &'a str,
}

impl<'a> KeyLine<'a> {
    /// Classify `line` as a key line, if it is one.
    pub(crate) fn parse(line: &'a str) -> Option<Self> {
        let captures = key_line_pattern()?.captures(line)?;
        let indent = captures.name("indent").map_or(0, |m| m.as_str().len());
        let dash = captures.name("dash").map_or(0, |m| m.as_str().len());
        let key = captures.name("key")?.as_str();
        let raw_value = captures.name("value").map_or("", |m| m.as_str());
        Some(Self {
            indent,
            key_column: indent + dash,
            list_item: dash > 0,
            key,
            raw_value,
        })
    }

    /// Return true for an unindented, non-list key.
    pub(crate) fn is_top_level(&self) -> bool {
        self.indent == 0 && !self.list_item
    }
}

const KEY_LINE_PATTERN: &str = r"^(?P<indent>[ \t]*)(?P<dash>-[ \t]+)?(?P<key>[A-Za-z_][A-Za-z0-9_.\-]*)[ \t]*:(?:[ \t]+(?P<value>.*))?$";
const BLOCK_INDICATOR_PATTERN: &str = r"^[|>][+\-]?[0-9]?[+\-]?$";

/// Compile `pattern` once into `cell`. A pattern that fails to compile is
/// logged and yields `None`, so every line classifies as plain text.
fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .map_err(|err| log::error!("invalid line pattern {pattern}: {err}"))
            .ok()
    })
    .as_ref()
}

fn key_line_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&PATTERN, KEY_LINE_PATTERN)
}

fn block_indicator_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&PATTERN, BLOCK_INDICATOR_PATTERN)
}

/// Width of the leading whitespace of `line`.
pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Return true for blank lines and comment lines.
pub(crate) fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Return true for a YAML document separator.
pub(crate) fn is_document_separator(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Strip quotes and trailing comments from an inline scalar.
pub(crate) fn clean_scalar(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('"') {
        return match rest.find('"') {
            Some(end) => rest[..end].replace("\\\"", "\""),
            None => rest.to_owned(),
        };
    }
    if let Some(rest) = trimmed.strip_prefix('\'') {
        return match rest.find('\'') {
            Some(end) => rest[..end].to_owned(),
            None => rest.to_owned(),
        };
    }
    match trimmed.find(" #") {
        Some(comment) => trimmed[..comment].trim_end().to_owned(),
        None => trimmed.to_owned(),
    }
}

/// The value of a key line after any block scalar has been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScalarValue {
    /// Cleaned value text (block scalars are dedented and joined).
    pub(crate) text: String,
    /// Index of the first line after the value.
    pub(crate) next_line: usize,
}

/// Read the value of the key line at `index`, consuming a block scalar body
/// when the value is a `|` or `>` indicator.
pub(crate) fn read_value(lines: &[&str], index: usize, key_line: &KeyLine<'_>) -> ScalarValue {
    let inline = clean_scalar(key_line.raw_value);
    if !block_indicator_pattern().is_some_and(|pattern| pattern.is_match(&inline)) {
        return ScalarValue {
            text: inline,
            next_line: index + 1,
        };
    }
    let folded = inline.starts_with('>');
    collect_block(lines, index + 1, key_line.key_column, folded)
}

fn collect_block(lines: &[&str], start: usize, parent_indent: usize, folded: bool) -> ScalarValue {
    let mut body: Vec<&str> = Vec::new();
    let mut next_line = start;
    for line in lines.iter().skip(start) {
        if line.trim().is_empty() {
            body.push("");
        } else if indent_of(line) <= parent_indent {
            break;
        } else {
            body.push(line);
        }
        next_line += 1;
    }
    while body.last().is_some_and(|line| line.is_empty()) {
        body.pop();
    }

    let min_indent = body
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| indent_of(line))
        .min()
        .unwrap_or(0);
    let dedented: Vec<&str> = body
        .iter()
        .map(|line| line.get(min_indent..).unwrap_or(""))
        .collect();

    let text = if folded {
        dedented
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        dedented.join("\n")
    };
    ScalarValue { text, next_line }
}

/// Split an inline flow sequence (`[a, b]`) or a bare scalar into items.
pub(crate) fn inline_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(clean_scalar)
        .filter(|item| !item.is_empty())
        .collect()
}
