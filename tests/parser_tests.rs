mod common;

use common::*;
use skein::ast::pretty::describe;
use skein::ast::{NodeKind, NumberValue, SequenceType};
use skein::{Compiler, SkeinError};

#[test]
fn test_choices_flow_into_gather() {
    let story = parse_ok("Hello\n* choice one\n* choice two\n- gather\nEnd");

    let choices = nodes_named(&story, "Choice");
    assert_eq!(choices.len(), 2);
    for choice in &choices {
        let NodeKind::Choice {
            indentation_depth, ..
        } = story.kind(*choice)
        else {
            unreachable!()
        };
        assert_eq!(*indentation_depth, 1);
    }

    let (_, gather) = only(&story, "Gather");
    let NodeKind::Gather { rejoins, .. } = gather else {
        unreachable!()
    };
    assert_eq!(rejoins, &choices);

    let texts = texts(&story);
    assert_eq!(texts.first().map(String::as_str), Some("Hello"));
    assert!(texts.contains(&"End".to_string()));
}

#[test]
fn test_global_variable_declaration() {
    let story = parse_ok("VAR x = 5");
    let (_, assignment) = only(&story, "VariableAssignment");
    let NodeKind::VariableAssignment {
        name,
        value: Some(value),
        is_global_declaration,
        is_new_temporary,
    } = assignment
    else {
        panic!("unexpected {assignment:?}")
    };
    assert!(*is_global_declaration);
    assert!(!*is_new_temporary);
    assert_eq!(story.identifier(*name), Some("x"));
    assert_eq!(
        story.kind(*value),
        &NodeKind::Number {
            value: NumberValue::Int(5)
        }
    );
}

#[test]
fn test_top_level_divert() {
    let story = parse_ok("-> knotName");
    let (id, divert) = only(&story, "Divert");
    let NodeKind::Divert {
        is_tunnel,
        is_thread,
        ..
    } = divert
    else {
        unreachable!()
    };
    assert!(!*is_tunnel);
    assert!(!*is_thread);
    assert_eq!(story.dotted_name(id).as_deref(), Some("knotName"));
}

#[test]
fn test_once_sequence() {
    let story = parse_ok("{ once: A | B }");
    let (_, sequence) = only(&story, "Sequence");
    let NodeKind::Sequence {
        sequence_type,
        alternatives,
    } = sequence
    else {
        unreachable!()
    };
    assert_eq!(*sequence_type, SequenceType::ONCE);
    let alternatives: Vec<String> = alternatives.iter().map(|a| describe(&story, *a)).collect();
    assert_eq!(alternatives, vec!["A", "B"]);
}

#[test]
fn test_missing_include() {
    let (story, diagnostics) = parse_with_files("INCLUDE missing.ink", &[]);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_error());
    assert_eq!(diagnostics[0].message, "Failed to load: 'missing.ink'");
    let (_, include) = only(&story, "IncludedFile");
    assert!(matches!(include, NodeKind::IncludedFile { story: None }));
}

#[test]
fn test_sequence_type_validation() {
    let (story, diagnostics) = parse_with_files("{once cycle: a|b}\n{shuffle: c|d}\n{shuffle once: e|f}\n", &[]);
    assert_eq!(
        messages(&diagnostics),
        vec!["Sequence type combination not supported: once cycle"]
    );
    let types: Vec<SequenceType> = nodes_named(&story, "Sequence")
        .into_iter()
        .map(|id| match story.kind(id) {
            NodeKind::Sequence { sequence_type, .. } => *sequence_type,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(
        types,
        vec![
            SequenceType::STOPPING,
            SequenceType::SHUFFLE | SequenceType::STOPPING,
            SequenceType::SHUFFLE | SequenceType::ONCE,
        ]
    );
}

#[test]
fn test_every_node_has_parent_and_span() {
    let source = "\
VAR health = 10
LIST colours = red, (green), blue = 5
=== intro ===
Welcome{health > 5: , traveller|}. # greeting
* [Ask] \"Who are you?\" -> questions
* (leave) {health > 1} Leave <>
  -> END
- (after) ~ health--
-> questions

=== questions ===
{
- health > 8: Fine.
- else: Tired.
}
{stopping:
- First
- Second
}
->->
";
    let story = parse_ok(source);
    let root = story.root();
    for (index, node) in story.nodes().iter().enumerate() {
        if index == root.index() {
            assert!(node.parent.is_none());
            continue;
        }
        let parent = node.parent.unwrap_or_else(|| panic!("node {index} has no parent"));
        assert!(story.children(parent).iter().any(|c| c.index() == index));
        assert!(story.span(parent).contains(&node.span));
    }
}

#[test]
fn test_errors_do_not_stop_parsing() {
    let source = "Line one\n~ temp = 5\n{x: a|b|c}\n== knot ==\nStill here\n";
    let (story, diagnostics) = parse_with_files(source, &[]);
    assert!(diagnostics.len() >= 2, "{diagnostics:?}");
    let mut lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
    lines.dedup();
    assert!(lines.contains(&2));
    assert!(lines.contains(&3));
    assert!(story.flow("knot").is_some());
    assert!(texts(&story).contains(&"Still here".to_string()));
}

#[test]
fn test_comments_keep_line_numbers() {
    let source = "/* a\nlong\ncomment */\nHello // trailing\n}\n";
    let (_, diagnostics) = parse_with_files(source, &[]);
    assert_eq!(messages(&diagnostics), vec!["Unexpected content: '}'"]);
    assert_eq!(diagnostics[0].line, 5);
}

#[test]
fn test_without_sink_first_error_is_returned() {
    let result = Compiler::new().parse("Fine\nVAR = 3\n", Some("story.ink"));
    match result {
        Err(SkeinError::Unhandled { diagnostic }) => {
            assert_eq!(diagnostic.line, 2);
            assert_eq!(diagnostic.file.as_deref(), Some("story.ink"));
        }
        other => panic!("expected an unhandled error, got {other:?}"),
    }
}

#[test]
fn test_glue_tags_and_threads() {
    let story = parse_ok("Hello <> # mood\n<- background\n== background ==\nRain.\n");
    assert_eq!(nodes_named(&story, "Glue").len(), 1);
    assert!(!nodes_named(&story, "Tag").is_empty());
    let threads: Vec<_> = nodes_named(&story, "Divert")
        .into_iter()
        .filter(|id| matches!(story.kind(*id), NodeKind::Divert { is_thread: true, .. }))
        .collect();
    assert_eq!(threads.len(), 1);
    assert_eq!(story.dotted_name(threads[0]).as_deref(), Some("background"));
}

#[test]
fn test_json_export() {
    let story = parse_ok("Hi\n");
    let json = story.to_json().unwrap();
    assert!(json.contains(r#""kind": "Story""#));
    assert!(json.contains(r#""text": "Hi""#));
}
