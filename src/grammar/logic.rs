//! `~` logic lines and the global declarations: VAR, CONST, LIST, EXTERNAL.

use super::InkParser;
use crate::ast::{NodeId, NodeKind, NumberValue};
use crate::engine::Rules;

impl InkParser<'_, '_> {
    /// `~ return`, `~ temp x = 5`, `~ x += 1`, `~ f()`.
    pub(crate) fn logic_line(&mut self) -> Option<Vec<NodeId>> {
        self.whitespace();
        self.parse_string("~")?;
        self.whitespace();

        let rules: [fn(&mut Self) -> Option<NodeId>; 3] = [
            Self::return_statement,
            Self::temp_declaration_or_assignment,
            Self::expression,
        ];
        let Some(result) = self.parse(|p| p.one_of(&rules)) else {
            self.report_expected("expression after '~'");
            self.skip_to_next_line();
            return Some(vec![self.content_list(Vec::new())]);
        };

        // Only calls and increments are worth evaluating on their own.
        let kind = self.kind(result);
        let useless = kind.is_expression()
            && !matches!(kind, NodeKind::FunctionCall { .. } | NodeKind::IncDec { .. });
        if useless {
            let is_include = matches!(kind, NodeKind::VariableReference { path }
                if path.len() == 1 && self.identifier_name(path[0]) == "include");
            if is_include {
                self.error("'~ include' is no longer the correct syntax - please use 'INCLUDE your_filename.ink', without the tilda, and in block capitals.");
            } else {
                self.error("Logic following a '~' can't be that type of expression. It can only be something like:\n\t~ return\n\t~ var x = blah\n\t~ x++\n\t~ myFunction()");
            }
        }

        if let NodeKind::FunctionCall {
            should_pop_returned_value,
            ..
        } = self.kind_mut(result)
        {
            *should_pop_returned_value = true;
        }

        // A call may print, so the line needs its own newline.
        let mut output = vec![result];
        if self.contains_function_call(result) {
            let newline = self.text("\n");
            output = vec![self.content_list(vec![result, newline])];
        }

        let _ = self.expect_or(Self::end_of_line, "end of line", Self::skip_to_next_line);
        Some(output)
    }

    fn contains_function_call(&self, id: NodeId) -> bool {
        let kind = self.kind(id);
        matches!(kind, NodeKind::FunctionCall { .. })
            || kind.children().into_iter().any(|child| self.contains_function_call(child))
    }

    fn return_statement(&mut self) -> Option<NodeId> {
        self.whitespace();
        let keyword = self.identifier()?;
        if keyword != "return" {
            return None;
        }
        self.whitespace();
        let value = self.parse(Self::expression);
        Some(self.alloc(NodeKind::Return { value }))
    }

    /// `temp x = e`, `x = e`, `x += e` or `x -= e`.
    fn temp_declaration_or_assignment(&mut self) -> Option<NodeId> {
        self.whitespace();
        let is_new_temporary = self.parse(Self::parse_temp_keyword).is_some();
        self.whitespace();

        let name = if is_new_temporary {
            self.expect(Self::identifier_node, "variable name")?
        } else {
            self.parse(Self::identifier_node)?
        };
        self.whitespace();

        let is_increment = self.parse_string("+").is_some();
        let is_decrement = self.parse_string("-").is_some();
        if is_increment && is_decrement {
            self.error("Unexpected sequence '+-'");
        }

        if self.parse_string("=").is_none() {
            if is_new_temporary {
                self.error("Expected '='");
            }
            return None;
        }

        let value = self.expect(Self::expression, "value expression to be assigned");

        if is_increment || is_decrement {
            return Some(self.alloc(NodeKind::IncDec {
                target: name,
                expression: value,
                is_increment,
            }));
        }
        Some(self.alloc(NodeKind::VariableAssignment {
            name,
            value,
            is_global_declaration: false,
            is_new_temporary,
        }))
    }

    fn parse_temp_keyword(&mut self) -> Option<()> {
        (self.identifier()? == "temp").then_some(())
    }

    /// Consumes `keyword` as a whole identifier.
    fn keyword(&mut self, keyword: &str) -> Option<()> {
        self.parse(|p| (p.identifier()? == keyword).then_some(()))
    }

    // ========================================================================
    // GLOBAL DECLARATIONS
    // ========================================================================

    /// `VAR name = value`
    pub(crate) fn variable_declaration(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.keyword("VAR")?;
        self.whitespace();

        let name = self.expect(Self::identifier_node, "variable name")?;
        self.whitespace();

        self.expect(
            |p| p.parse_string("="),
            "the '=' for an assignment of a value, e.g. '= 5' (initial values are mandatory)",
        )?;
        self.whitespace();

        let message = format!("initial value for {}", self.identifier_name(name));
        let value = self.expect(Self::expression, &message)?;

        let allowed = matches!(
            self.kind(value),
            NodeKind::Number { .. } | NodeKind::StringExpression { .. } | NodeKind::DivertTarget { .. }
                | NodeKind::VariableReference { .. } | NodeKind::ListLiteral { .. }
        );
        if !allowed {
            self.error("initial value for a variable must be a number, constant, list or divert target");
        }

        if self.parse(|p| p.parse_string(",")).is_some() {
            self.error("Unexpected ','. If you're trying to declare a new list, use the LIST keyword, not VAR");
        } else if matches!(self.kind(value), NodeKind::StringExpression { .. }) && !self.is_single_string(value) {
            self.error("Constant strings cannot contain any logic.");
        }

        Some(self.alloc(NodeKind::VariableAssignment {
            name,
            value: Some(value),
            is_global_declaration: true,
            is_new_temporary: false,
        }))
    }

    /// `LIST name = a, (b), c = 5`
    pub(crate) fn list_declaration(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.keyword("LIST")?;
        self.whitespace();

        let name = self.expect(Self::identifier_node, "list name")?;
        self.whitespace();

        let _ = self.expect(|p| p.parse_string("="), "the '=' for an assignment of the list definition");
        self.whitespace();

        let definition = self.expect(Self::list_definition, "list item names")?;
        Some(self.alloc(NodeKind::VariableAssignment {
            name,
            value: Some(definition),
            is_global_declaration: true,
            is_new_temporary: false,
        }))
    }

    fn list_definition(&mut self) -> Option<NodeId> {
        self.any_whitespace();
        let elements = self.separated_list(Self::list_element_definition, Self::list_element_definition_separator)?;
        Some(self.alloc(NodeKind::ListDefinition { elements }))
    }

    fn list_element_definition_separator(&mut self) -> Option<()> {
        self.any_whitespace();
        self.parse_string(",")?;
        self.any_whitespace();
        Some(())
    }

    /// `name`, `(name)` for an initially selected element, `name = 3`.
    fn list_element_definition(&mut self) -> Option<NodeId> {
        let in_initial_list = self.parse_string("(").is_some();
        let mut needs_close = in_initial_list;

        self.whitespace();
        let name = self.parse(Self::identifier_node)?;
        self.whitespace();

        if in_initial_list && self.parse_string(")").is_some() {
            needs_close = false;
            self.whitespace();
        }

        let mut value = None;
        if self.parse_string("=").is_some() {
            self.whitespace();
            let number = self.expect(Self::expression_int, "value to be assigned to list item");
            if let Some(NodeKind::Number {
                value: NumberValue::Int(v),
            }) = number.map(|id| self.kind(id))
            {
                value = Some(*v);
            }
            if needs_close {
                self.whitespace();
                if self.parse_string(")").is_some() {
                    needs_close = false;
                }
            }
        }

        if needs_close {
            self.error("Expected closing ')'");
        }

        Some(self.alloc(NodeKind::ListElement {
            name,
            in_initial_list,
            value,
        }))
    }

    /// `CONST name = value`
    pub(crate) fn const_declaration(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.keyword("CONST")?;
        self.whitespace();

        let name = self.expect(Self::identifier_node, "constant name")?;
        self.whitespace();

        let _ = self.expect(
            |p| p.parse_string("="),
            "the '=' for an assignment of a value, e.g. '= 5' (initial values are mandatory)",
        );
        self.whitespace();

        let message = format!("initial value for {}", self.identifier_name(name));
        let value = self.expect(Self::expression, &message)?;

        let allowed = matches!(
            self.kind(value),
            NodeKind::Number { .. } | NodeKind::DivertTarget { .. } | NodeKind::StringExpression { .. }
        );
        if !allowed {
            self.error("initial value for a constant must be a number or divert target");
        } else if matches!(self.kind(value), NodeKind::StringExpression { .. }) && !self.is_single_string(value) {
            self.error("Constant strings cannot contain any logic.");
        }

        Some(self.alloc(NodeKind::ConstDeclaration { name, value }))
    }

    /// `EXTERNAL name(a, b)`
    pub(crate) fn external_declaration(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.keyword("EXTERNAL")?;
        self.whitespace();

        let name = match self.expect(Self::identifier_node, "name of external function") {
            Some(name) => name,
            None => self.missing_identifier(),
        };
        self.whitespace();

        let message = format!(
            "declaration of arguments for EXTERNAL, even if empty, i.e. 'EXTERNAL {}()'",
            self.identifier_name(name)
        );
        let arguments = self
            .expect(Self::bracketed_knot_decl_arguments, &message)
            .unwrap_or_default();

        let parameters = arguments.into_iter().map(|arg| arg.name).collect();
        Some(self.alloc(NodeKind::ExternalDeclaration { name, parameters }))
    }

    /// `TODO: message` lines become warnings.
    pub(crate) fn author_warning(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.keyword("TODO")?;
        self.whitespace();
        let _ = self.parse_string(":");
        self.whitespace();

        let message = self
            .parser
            .parse_until_chars_from_str("\n\r")
            .unwrap_or_default();
        self.warning(format!("TODO: {message}"));
        Some(self.alloc(NodeKind::AuthorWarning { message }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::ast::pretty::describe;
    use crate::ast::Story;

    fn list_elements(story: &Story) -> Vec<(String, bool, Option<i32>)> {
        nodes_named(story, "ListElement")
            .into_iter()
            .map(|id| match story.kind(id) {
                NodeKind::ListElement {
                    name,
                    in_initial_list,
                    value,
                } => (story.identifier(*name).unwrap_or_default().to_string(), *in_initial_list, *value),
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_global_variable() {
        let (story, diagnostics) = parse_str("VAR x = 5");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "VariableAssignment")[0];
        let NodeKind::VariableAssignment {
            name,
            value: Some(value),
            is_global_declaration,
            is_new_temporary,
        } = story.kind(id)
        else {
            unreachable!()
        };
        assert_eq!(story.identifier(*name), Some("x"));
        assert!(*is_global_declaration);
        assert!(!*is_new_temporary);
        assert_eq!(
            story.kind(*value),
            &NodeKind::Number {
                value: NumberValue::Int(5)
            }
        );
    }

    #[test]
    fn test_var_rejects_expressions() {
        let (_, diagnostics) = parse_str("VAR x = 1 + 2\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["initial value for a variable must be a number, constant, list or divert target"]
        );
    }

    #[test]
    fn test_var_comma_suggests_list() {
        let (_, diagnostics) = parse_str("VAR colours = red, green\n");
        assert!(messages(&diagnostics)[0].starts_with("Unexpected ','"));
    }

    #[test]
    fn test_var_missing_value() {
        let (_, diagnostics) = parse_str("VAR x\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Expected the '=' for an assignment of a value, e.g. '= 5' (initial values are mandatory) but saw end of line"]
        );
    }

    #[test]
    fn test_const_declaration() {
        let (story, diagnostics) = parse_str("CONST LIMIT = 10\nCONST GREETING = \"hi\"\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(nodes_named(&story, "ConstDeclaration").len(), 2);

        let (_, diagnostics) = parse_str("CONST X = y\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["initial value for a constant must be a number or divert target"]
        );

        let (_, diagnostics) = parse_str("CONST S = \"a {b}\"\n");
        assert_eq!(messages(&diagnostics), vec!["Constant strings cannot contain any logic."]);
    }

    #[test]
    fn test_list_declaration() {
        let (story, diagnostics) = parse_str("LIST mood = sad, (neutral), happy = 5, (ecstatic = 10)\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            list_elements(&story),
            vec![
                ("sad".to_string(), false, None),
                ("neutral".to_string(), true, None),
                ("happy".to_string(), false, Some(5)),
                ("ecstatic".to_string(), true, Some(10)),
            ]
        );
    }

    #[test]
    fn test_list_unclosed_element() {
        let (_, diagnostics) = parse_str("LIST l = (a, b\n");
        assert_eq!(messages(&diagnostics), vec!["Expected closing ')'"]);
    }

    #[test]
    fn test_external_declaration() {
        let (story, diagnostics) = parse_str("EXTERNAL play_sound(name, volume)\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "ExternalDeclaration")[0];
        let NodeKind::ExternalDeclaration { parameters, .. } = story.kind(id) else {
            unreachable!()
        };
        assert_eq!(parameters, &vec!["name".to_string(), "volume".to_string()]);

        let (_, diagnostics) = parse_str("EXTERNAL beep\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Expected declaration of arguments for EXTERNAL, even if empty, i.e. 'EXTERNAL beep()' but saw end of line"]
        );
    }

    #[test]
    fn test_temp_and_compound_assignment() {
        let (story, diagnostics) = parse_str("~ temp x = 1\n~ x = 2\n~ x += 3\n~ x -= 4\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let assignments: Vec<bool> = nodes_named(&story, "VariableAssignment")
            .into_iter()
            .map(|id| matches!(story.kind(id), NodeKind::VariableAssignment { is_new_temporary: true, .. }))
            .collect();
        assert_eq!(assignments, vec![true, false]);
        let compound: Vec<String> = nodes_named(&story, "IncDec")
            .into_iter()
            .map(|id| describe(&story, id))
            .collect();
        assert_eq!(compound, vec!["x += 3", "x -= 4"]);
    }

    #[test]
    fn test_temp_without_equals() {
        let (_, diagnostics) = parse_str("~ temp x\n");
        assert_eq!(messages(&diagnostics)[0], "Expected '='");
    }

    #[test]
    fn test_function_call_line() {
        let (story, diagnostics) = parse_str("~ shuffle_deck()\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "FunctionCall")[0];
        assert!(matches!(
            story.kind(id),
            NodeKind::FunctionCall {
                should_pop_returned_value: true,
                ..
            }
        ));
        let parent = story.parent(id).unwrap();
        let NodeKind::ContentList { content } = story.kind(parent) else {
            panic!("call should be wrapped with a newline");
        };
        assert_eq!(story.text(content[1]), Some("\n"));
    }

    #[test]
    fn test_useless_expression() {
        let (_, diagnostics) = parse_str("~ 5 + 4\n");
        assert!(messages(&diagnostics)[0].starts_with("Logic following a '~' can't be that type of expression"));
        let (_, diagnostics) = parse_str("~ include other.ink\n");
        assert!(messages(&diagnostics)[0].starts_with("'~ include' is no longer the correct syntax"));
    }

    #[test]
    fn test_missing_logic() {
        let (_, diagnostics) = parse_str("~\nNext\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Expected expression after '~' but saw end of line"]
        );
    }

    #[test]
    fn test_return_in_function() {
        let (story, diagnostics) = parse_str("== function double(x) ==\n~ return x * 2\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "Return")[0];
        let NodeKind::Return { value: Some(value) } = story.kind(id) else {
            unreachable!()
        };
        assert_eq!(describe(&story, *value), "(x * 2)");
    }

    #[test]
    fn test_author_warning() {
        let (story, diagnostics) = parse_str("TODO: write the ending\nText\n");
        assert_eq!(messages(&diagnostics), vec!["TODO: write the ending"]);
        assert_eq!(nodes_named(&story, "AuthorWarning").len(), 1);
    }
}
