//! Knots, stitches and functions.

use once_cell::sync::Lazy;

use super::whitespace::spaced;
use super::{InkParser, StatementLevel};
use crate::ast::{weave, FlowArgument, FlowKind, NodeId, NodeKind};
use crate::chars::CharacterSet;
use crate::engine::{exclude, one, Rules};

static EQUALS: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("="));

/// A parsed `== name(args) ==` or `= name(args)` header.
#[derive(Debug, Clone)]
pub(crate) struct FlowDecl {
    pub name: NodeId,
    pub arguments: Vec<FlowArgument>,
    pub is_function: bool,
}

impl InkParser<'_, '_> {
    pub(crate) fn knot_definition(&mut self) -> Option<NodeId> {
        let decl = self.parse(Self::knot_declaration)?;

        let _ = self.expect_or(
            Self::end_of_line,
            "end of line after knot name definition",
            Self::skip_to_next_line,
        );

        let content = self.expect_or(
            |p| p.statements_at_level(StatementLevel::Knot),
            "at least one line within the knot",
            Self::knot_stitch_no_content_recovery,
        )?;

        Some(self.flow(FlowKind::Knot, decl, content))
    }

    pub(crate) fn knot_declaration(&mut self) -> Option<FlowDecl> {
        self.whitespace();
        self.knot_title_equals()?;
        self.whitespace();

        let identifier = self.parse(Self::identifier_node);
        let is_function = identifier.is_some_and(|id| self.identifier_name(id) == "function");

        let name = if is_function {
            let _ = self.expect(Self::whitespace, "whitespace after the 'function' keyword");
            self.parse(Self::identifier_node)
        } else {
            identifier
        };
        let name = match name {
            Some(name) => name,
            None => {
                let what = if is_function { "function" } else { "knot" };
                self.error(format!("Expected the name of the {what}"));
                self.missing_identifier()
            }
        };

        self.whitespace();
        let arguments = self
            .parse(Self::bracketed_knot_decl_arguments)
            .unwrap_or_default();
        self.whitespace();

        // Closing equals are optional.
        let _ = self.parse(Self::knot_title_equals);

        Some(FlowDecl {
            name,
            arguments,
            is_function,
        })
    }

    /// Two or more `=`.
    fn knot_title_equals(&mut self) -> Option<()> {
        let equals = self.parse_chars_from_set(&EQUALS)?;
        (equals.len() > 1).then_some(())
    }

    pub(crate) fn stitch_definition(&mut self) -> Option<NodeId> {
        let decl = self.parse(Self::stitch_declaration)?;

        let _ = self.expect_or(Self::end_of_line, "end of line after stitch name", Self::skip_to_next_line);

        let content = self.expect_or(
            |p| p.statements_at_level(StatementLevel::Stitch),
            "at least one line within the stitch",
            Self::knot_stitch_no_content_recovery,
        )?;

        Some(self.flow(FlowKind::Stitch, decl, content))
    }

    /// A single `=`, then the stitch name.
    pub(crate) fn stitch_declaration(&mut self) -> Option<FlowDecl> {
        self.whitespace();
        self.parse_string("=")?;
        if self.parse_string("=").is_some() {
            return None;
        }
        self.whitespace();

        let is_function = self.parse_string("function").is_some();
        if is_function {
            self.whitespace();
        }

        let name = self.parse(Self::identifier_node)?;
        self.whitespace();
        let arguments = self
            .parse(Self::bracketed_knot_decl_arguments)
            .unwrap_or_default();
        self.whitespace();

        Some(FlowDecl {
            name,
            arguments,
            is_function,
        })
    }

    /// Skips to the next knot header and stands in a marker for the body.
    fn knot_stitch_no_content_recovery(&mut self) -> Option<Vec<NodeId>> {
        let _ = self.parse_until(Self::knot_declaration, Some(&EQUALS), None);
        Some(vec![self.text("<ERROR IN FLOW>")])
    }

    fn flow(&mut self, flow_kind: FlowKind, decl: FlowDecl, content: Vec<NodeId>) -> NodeId {
        let content = weave::weave_and_sub_flows(&mut self.arena, content);
        self.alloc(NodeKind::Flow {
            flow_kind,
            name: decl.name,
            arguments: decl.arguments,
            content,
            is_function: decl.is_function,
        })
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    /// `(a, ref b, -> c)`
    pub(crate) fn bracketed_knot_decl_arguments(&mut self) -> Option<Vec<FlowArgument>> {
        self.parse_string("(")?;

        let arguments = self
            .interleave(
                one(spaced(Self::flow_decl_argument)),
                exclude(|p: &mut Self| p.parse_string(",")),
            )
            .unwrap_or_default();

        let _ = self.expect(|p| p.parse_string(")"), "closing ')' for parameter list");
        Some(arguments)
    }

    /// `name`, `-> name`, `ref name` or `ref -> name`.
    fn flow_decl_argument(&mut self) -> Option<FlowArgument> {
        let first = self.identifier();
        self.whitespace();
        let is_divert_target = self.parse_string("->").is_some();
        self.whitespace();
        let second = self.identifier();

        if first.is_none() && second.is_none() {
            return None;
        }

        let is_by_reference = first.as_deref() == Some("ref");
        let name = if is_by_reference {
            if second.is_none() {
                self.error("Expected an parameter name after 'ref'");
            }
            second
        } else {
            let name = if is_divert_target { second } else { first };
            if name.is_none() {
                self.error("Expected an parameter name");
            }
            name
        };

        Some(FlowArgument {
            name: name.unwrap_or_default(),
            is_by_reference,
            is_divert_target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::ast::{FlowArgument, FlowKind, NodeKind, Story};

    fn flow_header(story: &Story, dotted: &str) -> (FlowKind, Vec<FlowArgument>, bool) {
        let id = story.flow(dotted).unwrap_or_else(|| panic!("no flow {dotted}"));
        match story.kind(id) {
            NodeKind::Flow {
                flow_kind,
                arguments,
                is_function,
                ..
            } => (*flow_kind, arguments.clone(), *is_function),
            _ => unreachable!(),
        }
    }

    fn argument(name: &str, is_by_reference: bool, is_divert_target: bool) -> FlowArgument {
        FlowArgument {
            name: name.to_string(),
            is_by_reference,
            is_divert_target,
        }
    }

    #[test]
    fn test_knot_with_stitches() {
        let source = "Intro\n=== station ===\nYou arrive.\n= platform\nA train.\n= ticket_office\nClosed.\n=== street\nBusy.\n";
        let (story, diagnostics) = parse_str(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(flow_header(&story, "station").0, FlowKind::Knot);
        assert_eq!(flow_header(&story, "station.platform").0, FlowKind::Stitch);
        assert!(story.flow("station.ticket_office").is_some());
        assert!(story.flow("street").is_some());
        assert!(story.flow("street.platform").is_none());

        // The knot body is a weave followed by its stitches.
        let knot = story.flow("station").unwrap();
        let NodeKind::Flow { content, .. } = story.kind(knot) else {
            unreachable!()
        };
        let kinds: Vec<&str> = content.iter().map(|id| story.kind(*id).name()).collect();
        assert_eq!(kinds, vec!["Weave", "Flow", "Flow"]);
    }

    #[test]
    fn test_function_parameters() {
        let source = "== function apply(a, ref b, -> target, ref -> back) ==\n~ return a\n";
        let (story, diagnostics) = parse_str(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (_, arguments, is_function) = flow_header(&story, "apply");
        assert!(is_function);
        assert_eq!(
            arguments,
            vec![
                argument("a", false, false),
                argument("b", true, false),
                argument("target", false, true),
                argument("back", true, true),
            ]
        );
    }

    #[test]
    fn test_knot_parameters_without_closing_equals() {
        let (story, diagnostics) = parse_str("== greet(name)\nHi {name}\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (_, arguments, is_function) = flow_header(&story, "greet");
        assert!(!is_function);
        assert_eq!(arguments, vec![argument("name", false, false)]);
    }

    #[test]
    fn test_missing_knot_name() {
        let (_, diagnostics) = parse_str("==\nText\n");
        assert_eq!(messages(&diagnostics), vec!["Expected the name of the knot"]);
    }

    #[test]
    fn test_missing_function_name() {
        let (_, diagnostics) = parse_str("== function ==\n~ return\n");
        assert_eq!(messages(&diagnostics)[0], "Expected the name of the function");
    }

    #[test]
    fn test_empty_knot_recovers() {
        let (story, diagnostics) = parse_str("== empty ==\n== next ==\nHi\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Expected at least one line within the knot but saw '== next =='"]
        );
        assert!(texts(&story).contains(&"<ERROR IN FLOW>".to_string()));
        assert!(story.flow("next").is_some());
    }

    #[test]
    fn test_ref_without_name() {
        let (_, diagnostics) = parse_str("== f(ref) ==\nHi\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Expected an parameter name after 'ref'"]
        );
    }

    #[test]
    fn test_gathers_do_not_leak_out_of_knots() {
        let source = "* Top choice\n== knot ==\n* Inner\n- Gathered\n";
        let (story, diagnostics) = parse_str(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let gather = nodes_named(&story, "Gather")[0];
        let NodeKind::Gather { rejoins, .. } = story.kind(gather) else {
            unreachable!()
        };
        assert_eq!(rejoins.len(), 1);
        let inner = rejoins[0];
        assert!(story.ancestors(inner).any(|a| matches!(story.kind(a), NodeKind::Flow { .. })));
    }
}
