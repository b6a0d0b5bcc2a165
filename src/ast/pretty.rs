//! Human-readable renderings of the tree.
//!
//! `describe` prints an expression back in ink-like syntax, for error
//! messages. `outline` prints a whole story as an indented listing, one node
//! per line.

use std::fmt::Write;

use super::{NodeId, NodeKind, NodeLookup, SequenceType, Story};

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Renders an expression or small content node in source-like form.
pub fn describe(nodes: &impl NodeLookup, id: NodeId) -> String {
    let join = |ids: &[NodeId], sep: &str| {
        ids.iter()
            .map(|i| describe(nodes, *i))
            .collect::<Vec<_>>()
            .join(sep)
    };
    match nodes.kind(id) {
        NodeKind::Text { text } => text.clone(),
        NodeKind::Identifier { name } => name.clone(),
        NodeKind::Path { components } => join(components, "."),
        NodeKind::VariableReference { path } => join(path, "."),
        NodeKind::Number { value } => value.to_string(),
        NodeKind::StringExpression { content } => format!("\"{}\"", join(content, "")),
        NodeKind::Divert {
            target, arguments, ..
        } => {
            let target = target.map(|t| describe(nodes, t)).unwrap_or_default();
            if arguments.is_empty() {
                format!("-> {target}")
            } else {
                format!("-> {target}({})", join(arguments, ", "))
            }
        }
        NodeKind::DivertTarget { divert } => describe(nodes, *divert),
        NodeKind::Unary { op, inner } => format!("{}{}", op.symbol(), describe(nodes, *inner)),
        NodeKind::Binary { left, op, right } => format!(
            "({} {} {})",
            describe(nodes, *left),
            op.symbol(),
            describe(nodes, *right)
        ),
        NodeKind::FunctionCall {
            name, arguments, ..
        } => format!("{}({})", describe(nodes, *name), join(arguments, ", ")),
        NodeKind::ListLiteral { items } => format!("({})", join(items, ", ")),
        NodeKind::IncDec {
            target,
            expression,
            is_increment,
        } => {
            let target = describe(nodes, *target);
            match (expression, is_increment) {
                (None, true) => format!("{target}++"),
                (None, false) => format!("{target}--"),
                (Some(e), true) => format!("{target} += {}", describe(nodes, *e)),
                (Some(e), false) => format!("{target} -= {}", describe(nodes, *e)),
            }
        }
        NodeKind::MultipleCondition { conditions } => join(conditions, " && "),
        NodeKind::ContentList { content } => join(content, ""),
        NodeKind::Glue => "<>".to_string(),
        other => other.name().to_string(),
    }
}

/// Renders a sequence type as its annotation words.
pub fn sequence_type_words(sequence_type: SequenceType) -> String {
    let mut words = Vec::new();
    if sequence_type.contains(SequenceType::ONCE) {
        words.push("once");
    }
    if sequence_type.contains(SequenceType::CYCLE) {
        words.push("cycle");
    }
    if sequence_type.contains(SequenceType::SHUFFLE) {
        words.push("shuffle");
    }
    if sequence_type.contains(SequenceType::STOPPING) {
        words.push("stopping");
    }
    words.join(" ")
}

// ============================================================================
// OUTLINE
// ============================================================================

/// An indented listing of every node reachable from the root.
pub fn outline(story: &Story, with_spans: bool) -> String {
    let mut out = String::new();
    write_node(story, story.root(), 0, with_spans, &mut out);
    out
}

fn write_node(story: &Story, id: NodeId, depth: usize, with_spans: bool, out: &mut String) {
    let _ = write!(out, "{:indent$}{}", "", label(story, id), indent = depth * 2);
    if with_spans {
        let _ = write!(out, "  @{}", story.span(id));
    }
    out.push('\n');
    if let NodeKind::IncludedFile { story: Some(included) } = story.kind(id) {
        write_node(included, included.root(), depth + 1, with_spans, out);
        return;
    }
    for child in story.children(id) {
        write_node(story, child, depth + 1, with_spans, out);
    }
}

/// One-line summary of a node.
fn label(story: &Story, id: NodeId) -> String {
    match story.kind(id) {
        NodeKind::Story { .. } => match story.file() {
            Some(file) => format!("Story {file}"),
            None => "Story".to_string(),
        },
        NodeKind::Text { text } => format!("Text {text:?}"),
        NodeKind::Tag { is_start } => format!("Tag {}", if *is_start { "start" } else { "end" }),
        NodeKind::Identifier { name } => format!("Identifier {name}"),
        NodeKind::Divert {
            is_tunnel,
            is_thread,
            is_empty,
            ..
        } => {
            let mut flags = Vec::new();
            if *is_tunnel {
                flags.push("tunnel");
            }
            if *is_thread {
                flags.push("thread");
            }
            if *is_empty {
                flags.push("empty");
            }
            if flags.is_empty() {
                format!("Divert {}", describe(story, id))
            } else {
                format!("Divert {} [{}]", describe(story, id), flags.join(", "))
            }
        }
        NodeKind::Choice {
            indentation_depth,
            once_only,
            is_invisible_default,
            ..
        } => {
            let mut text = format!(
                "Choice depth={indentation_depth} {}",
                if *once_only { "once" } else { "sticky" }
            );
            if *is_invisible_default {
                text.push_str(" default");
            }
            text
        }
        NodeKind::Gather {
            indentation_depth,
            rejoins,
            ..
        } => format!("Gather depth={indentation_depth} rejoins={}", rejoins.len()),
        NodeKind::Weave {
            base_indentation, ..
        } => format!("Weave base={base_indentation}"),
        NodeKind::Flow {
            flow_kind,
            name,
            arguments,
            is_function,
            ..
        } => {
            let args: Vec<&str> = arguments.iter().map(|a| a.name.as_str()).collect();
            format!(
                "{}{:?} {}({})",
                if *is_function { "Function " } else { "" },
                flow_kind,
                describe(story, *name),
                args.join(", ")
            )
        }
        NodeKind::Sequence { sequence_type, .. } => {
            format!("Sequence {}", sequence_type_words(*sequence_type))
        }
        NodeKind::ConditionalBranch {
            is_true_branch,
            is_else,
            matching_equality,
            is_inline,
            ..
        } => {
            let role = if *is_else {
                "else"
            } else if *is_true_branch {
                "true"
            } else if *matching_equality {
                "match"
            } else {
                "branch"
            };
            format!("ConditionalBranch {role}{}", if *is_inline { " inline" } else { "" })
        }
        NodeKind::VariableAssignment {
            name,
            is_global_declaration,
            is_new_temporary,
            ..
        } => {
            let prefix = if *is_global_declaration {
                "VAR "
            } else if *is_new_temporary {
                "temp "
            } else {
                ""
            };
            format!("VariableAssignment {prefix}{}", describe(story, *name))
        }
        NodeKind::ListElement {
            in_initial_list,
            value,
            ..
        } => {
            let mut text = "ListElement".to_string();
            if *in_initial_list {
                text.push_str(" selected");
            }
            if let Some(value) = value {
                let _ = write!(text, " = {value}");
            }
            text
        }
        NodeKind::ExternalDeclaration { parameters, .. } => {
            format!("ExternalDeclaration ({})", parameters.join(", "))
        }
        NodeKind::FunctionCall { .. }
        | NodeKind::VariableReference { .. }
        | NodeKind::Number { .. }
        | NodeKind::StringExpression { .. }
        | NodeKind::Unary { .. }
        | NodeKind::Binary { .. }
        | NodeKind::IncDec { .. }
        | NodeKind::ListLiteral { .. } => {
            format!("{} {}", story.kind(id).name(), describe(story, id))
        }
        NodeKind::AuthorWarning { message } => format!("AuthorWarning {message:?}"),
        NodeKind::IncludedFile { story: None } => "IncludedFile (empty)".to_string(),
        other => other.name().to_string(),
    }
}
