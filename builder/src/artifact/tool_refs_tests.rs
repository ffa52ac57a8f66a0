//! Unit tests for tool reference extraction, including unusual nesting.

use super::*;
use rstest::rstest;

fn pairs(references: &[ToolReference]) -> Vec<(&str, &str, &str)> {
    references
        .iter()
        .map(|r| (r.artifact_name.as_str(), r.tool_name.as_str(), r.url.as_str()))
        .collect()
}

#[test]
fn extracts_list_item_tools() {
    let raw = "\
name: A
tools:
  - name: tool1
    url: https://example/t1.zip
  - name: tool2
    url: https://example/t2.exe
";
    assert_eq!(
        pairs(&extract(raw)),
        vec![
            ("A", "tool1", "https://example/t1.zip"),
            ("A", "tool2", "https://example/t2.exe"),
        ]
    );
}

#[test]
fn url_before_name_is_accepted() {
    let raw = "\
name: A
tools:
  - url: https://example/t1.zip
    name: tool1
";
    assert_eq!(
        pairs(&extract(raw)),
        vec![("A", "tool1", "https://example/t1.zip")]
    );
}

#[test]
fn name_without_url_emits_nothing() {
    let raw = "\
name: A
tools:
  - name: NoUrl
    serve_locally: true
  - name: WithUrl
    url: https://example/w.exe
";
    assert_eq!(
        pairs(&extract(raw)),
        vec![("A", "WithUrl", "https://example/w.exe")]
    );
}

#[test]
fn url_without_name_emits_nothing() {
    let raw = "name: A\ntools:\n  - url: https://example/orphan.exe\n";
    assert!(extract(raw).is_empty());
}

#[test]
fn each_block_emits_once() {
    let raw = "\
name: A
tools:
  - name: tool1
    url: https://example/first
    url: https://example/second
";
    assert_eq!(
        pairs(&extract(raw)),
        vec![("A", "tool1", "https://example/first")]
    );
}

#[test]
fn tools_before_top_level_name_use_fallback_owner() {
    let raw = "\
tools:
  - name: early
    url: https://example/early.exe
name: Late
";
    assert_eq!(
        pairs(&extract_with_owner(raw, "FileStem")),
        vec![("FileStem", "early", "https://example/early.exe")]
    );
}

#[test]
fn document_separator_resets_owner() {
    let raw = "\
name: First
tools:
  - name: a
    url: https://example/a
---
tools:
  - name: b
    url: https://example/b
---
name: Third
tools:
  - name: c
    url: https://example/c
";
    assert_eq!(
        pairs(&extract_with_owner(raw, "fallback")),
        vec![
            ("First", "a", "https://example/a"),
            ("fallback", "b", "https://example/b"),
            ("Third", "c", "https://example/c"),
        ]
    );
}

#[test]
fn dedented_line_closes_block() {
    let raw = "\
name: A
tools:
  - name: tool1
description: text
  url: https://example/lost
";
    assert!(extract(raw).is_empty());
}

#[test]
fn nested_list_items_do_not_split_a_block() {
    let raw = "\
name: A
tools:
  - name: tool1
    args:
      - flag: /accepteula
    url: https://example/t1.exe
";
    assert_eq!(
        pairs(&extract(raw)),
        vec![("A", "tool1", "https://example/t1.exe")]
    );
}

#[test]
fn same_url_in_two_artifacts_is_preserved() {
    let raw = "\
name: A
tools:
  - name: shared
    url: https://example/t1.zip
---
name: B
tools:
  - name: shared
    url: https://example/t1.zip
";
    let references = extract(raw);
    assert_eq!(references.len(), 2);
    assert_eq!(references[0].artifact_name, "A");
    assert_eq!(references[1].artifact_name, "B");
}

#[test]
fn block_scalar_bodies_are_skipped() {
    let raw = "\
name: A
description: |
  - name: fake
    url: https://example/fake
sources:
  - query: SELECT 1
";
    assert!(extract(raw).is_empty());
}

#[rstest]
#[case::quoted_values("  - name: \"tool\"\n    url: 'https://example/t'\n")]
#[case::trailing_comment("  - name: tool # comment\n    url: https://example/t\n")]
#[case::indented_mapping("  name: tool\n  url: https://example/t\n")]
fn tolerates_formatting_variants(#[case] body: &str) {
    let raw = format!("name: A\ntools:\n{body}");
    assert_eq!(
        pairs(&extract(&raw)),
        vec![("A", "tool", "https://example/t")]
    );
}

#[test]
fn sibling_names_at_same_column_open_new_blocks() {
    let raw = "\
name: A
tools:
  name: first
  name: second
  url: https://example/second
";
    assert_eq!(
        pairs(&extract(raw)),
        vec![("A", "second", "https://example/second")]
    );
}
