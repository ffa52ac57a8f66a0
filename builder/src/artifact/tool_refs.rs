//! Tool reference extraction.
//!
//! Definitions declare the tools they deploy as small blocks carrying a
//! `name:` and a `url:`. The extractor walks the text top to bottom with two
//! states: `Scanning` between blocks and `InToolBlock` while a candidate
//! block is open. Ownership follows the most recent column-0 `name:`, so
//! references are attributed to whichever artifact declaration precedes them.

use super::definition::ToolReference;
use super::lines::{self, KeyLine};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Scanning,
    InToolBlock(ToolBlock),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ToolBlock {
    indent: usize,
    name: Option<String>,
    url: Option<String>,
    emitted: bool,
}

impl ToolBlock {
    fn open(indent: usize) -> Self {
        Self {
            indent,
            name: None,
            url: None,
            emitted: false,
        }
    }
}

struct Extractor<'a> {
    fallback_owner: &'a str,
    owner: Option<String>,
    state: ScanState,
    references: Vec<ToolReference>,
}

impl<'a> Extractor<'a> {
    fn new(fallback_owner: &'a str) -> Self {
        Self {
            fallback_owner,
            owner: None,
            state: ScanState::Scanning,
            references: Vec::new(),
        }
    }

    fn close_block(&mut self) {
        self.state = ScanState::Scanning;
    }

    fn on_separator(&mut self) {
        self.close_block();
        self.owner = None;
    }

    fn on_other_line(&mut self, line: &str) {
        if let ScanState::InToolBlock(block) = &self.state {
            if lines::indent_of(line) < block.indent {
                self.close_block();
            }
        }
    }

    fn on_key(&mut self, key_line: &KeyLine<'_>, value: &str) {
        if key_line.is_top_level() {
            self.close_block();
            if key_line.key == "name" && !value.is_empty() {
                self.owner = Some(value.to_owned());
            }
            return;
        }

        if let ScanState::InToolBlock(block) = &self.state {
            if key_line.indent < block.indent {
                self.close_block();
            }
        }

        if self.fills_open_block(key_line) {
            self.fill(key_line.key, value);
        } else if self.opens_block(key_line) {
            self.state = ScanState::InToolBlock(ToolBlock::open(key_line.key_column));
            self.fill(key_line.key, value);
        }
    }

    fn fills_open_block(&self, key_line: &KeyLine<'_>) -> bool {
        let ScanState::InToolBlock(block) = &self.state else {
            return false;
        };
        if key_line.list_item || key_line.key_column != block.indent {
            return false;
        }
        // A second name at the same column starts the next sibling block.
        !(key_line.key == "name" && block.name.is_some())
    }

    fn opens_block(&self, key_line: &KeyLine<'_>) -> bool {
        let is_tool_key = matches!(key_line.key, "name" | "url");
        if !key_line.list_item {
            return key_line.key == "name";
        }
        match &self.state {
            // List items nested inside an open block are block content.
            ScanState::InToolBlock(block) if key_line.key_column > block.indent => is_tool_key,
            _ => true,
        }
    }

    fn fill(&mut self, key: &str, value: &str) {
        let ScanState::InToolBlock(block) = &mut self.state else {
            return;
        };
        if value.is_empty() {
            return;
        }
        match key {
            "name" if block.name.is_none() => block.name = Some(value.to_owned()),
            "url" if block.url.is_none() => block.url = Some(value.to_owned()),
            _ => return,
        }
        if block.emitted {
            return;
        }
        if let (Some(name), Some(url)) = (&block.name, &block.url) {
            block.emitted = true;
            let artifact_name = self
                .owner
                .clone()
                .unwrap_or_else(|| self.fallback_owner.to_owned());
            self.references.push(ToolReference {
                artifact_name,
                tool_name: name.clone(),
                url: url.clone(),
            });
        }
    }
}

/// Extract every tool reference from raw definition text.
///
/// References that appear before any top-level `name:` get an empty artifact
/// name; use [`extract_with_owner`] to supply one.
#[must_use]
pub fn extract(raw_text: &str) -> Vec<ToolReference> {
    extract_with_owner(raw_text, "")
}

/// Extract every tool reference, attributing blocks that precede any
/// top-level `name:` to `fallback_owner`.
///
/// # Examples
///
/// ```
/// use offline_builder::artifact::extract_with_owner;
///
/// let raw = "name: Windows.Sys.Autoruns\ntools:\n  - name: Autorunsc\n    url: https://example.com/a.zip\n";
/// let references = extract_with_owner(raw, "Autoruns");
/// assert_eq!(references.len(), 1);
/// assert_eq!(references[0].artifact_name, "Windows.Sys.Autoruns");
/// assert_eq!(references[0].tool_name, "Autorunsc");
/// ```
#[must_use]
pub fn extract_with_owner(raw_text: &str, fallback_owner: &str) -> Vec<ToolReference> {
    let lines: Vec<&str> = raw_text.lines().collect();
    let mut extractor = Extractor::new(fallback_owner);
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        if lines::is_ignorable(line) {
            index += 1;
            continue;
        }
        if lines::is_document_separator(line) {
            extractor.on_separator();
            index += 1;
            continue;
        }
        match KeyLine::parse(line) {
            Some(key_line) => {
                let value = lines::read_value(&lines, index, &key_line);
                extractor.on_key(&key_line, value.text.trim());
                index = value.next_line;
            }
            None => {
                extractor.on_other_line(line);
                index += 1;
            }
        }
    }
    extractor.references
}

#[cfg(test)]
#[path = "tool_refs_tests.rs"]
mod tests;
