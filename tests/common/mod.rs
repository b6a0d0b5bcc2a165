//! Shared helpers for the integration tests.

#![allow(dead_code)]

use skein::ast::{NodeId, NodeKind, Story};
use skein::{parse_collecting, Diagnostic, MemoryResolver, ParseOptions};

/// Parses `source` as `main.ink` with the given in-memory files available.
pub fn parse_with_files(source: &str, files: &[(&str, &str)]) -> (Story, Vec<Diagnostic>) {
    let resolver = files
        .iter()
        .fold(MemoryResolver::new(), |r, (name, text)| r.with_file(*name, *text));
    let (story, diagnostics) = parse_collecting(source, Some("main.ink"), &resolver, ParseOptions::default());
    (story, diagnostics.diagnostics)
}

pub fn parse_ok(source: &str) -> Story {
    let (story, diagnostics) = parse_with_files(source, &[]);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    story
}

pub fn nodes_named(story: &Story, name: &str) -> Vec<NodeId> {
    story.find_all(|k| k.name() == name)
}

/// Every `Text` node's text, in tree order.
pub fn texts(story: &Story) -> Vec<String> {
    nodes_named(story, "Text")
        .into_iter()
        .filter_map(|id| story.text(id).map(str::to_string))
        .collect()
}

pub fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.message.as_str()).collect()
}

pub fn is_kind(story: &Story, id: NodeId, name: &str) -> bool {
    story.kind(id).name() == name
}

pub fn only<'a>(story: &'a Story, name: &str) -> (NodeId, &'a NodeKind) {
    let found = nodes_named(story, name);
    assert_eq!(found.len(), 1, "expected one {name}, found {}", found.len());
    (found[0], story.kind(found[0]))
}
