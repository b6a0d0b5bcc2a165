//! Expressions: a precedence-climbing loop over unary terms.

use super::whitespace::spaced;
use super::{GrammarFlags, InkParser};
use crate::ast::pretty::describe;
use crate::ast::{BinaryOp, NodeId, NodeKind, NumberValue, UnaryOp};
use crate::engine::{exclude, one, Rules};

/// Names that can never be variable references.
pub fn is_reserved_keyword(name: &str) -> bool {
    matches!(
        name,
        "true" | "false" | "not" | "return" | "else" | "VAR" | "CONST" | "temp" | "LIST" | "function"
    )
}

#[derive(Debug, Clone, Copy)]
struct InfixOperator {
    symbol: &'static str,
    op: BinaryOp,
    precedence: u8,
    /// Word operators must be followed by whitespace so `orange` is not `or ange`.
    require_whitespace: bool,
}

const fn infix(symbol: &'static str, op: BinaryOp, precedence: u8, require_whitespace: bool) -> InfixOperator {
    InfixOperator {
        symbol,
        op,
        precedence,
        require_whitespace,
    }
}

/// Longest spellings first, so `<=` wins over `<` and `hasnt` over `has`.
const OPERATORS: [InfixOperator; 21] = [
    infix("hasnt", BinaryOp::Hasnt, 3, true),
    infix("and", BinaryOp::And, 1, true),
    infix("has", BinaryOp::Has, 3, true),
    infix("mod", BinaryOp::Modulo, 8, true),
    infix("&&", BinaryOp::And, 1, false),
    infix("||", BinaryOp::Or, 1, false),
    infix("or", BinaryOp::Or, 1, true),
    infix("==", BinaryOp::Equal, 2, false),
    infix(">=", BinaryOp::GreaterOrEqual, 2, false),
    infix("<=", BinaryOp::LessOrEqual, 2, false),
    infix("!=", BinaryOp::NotEqual, 2, false),
    infix("!?", BinaryOp::Hasnt, 3, false),
    infix("<", BinaryOp::Less, 2, false),
    infix(">", BinaryOp::Greater, 2, false),
    infix("?", BinaryOp::Has, 3, false),
    infix("^", BinaryOp::Intersect, 3, false),
    infix("+", BinaryOp::Add, 4, false),
    infix("-", BinaryOp::Subtract, 5, false),
    infix("*", BinaryOp::Multiply, 6, false),
    infix("/", BinaryOp::Divide, 7, false),
    infix("%", BinaryOp::Modulo, 8, false),
];

impl InkParser<'_, '_> {
    pub(crate) fn expression(&mut self) -> Option<NodeId> {
        self.expression_above(0)
    }

    /// Parses a term followed by every infix operator binding tighter than
    /// `minimum`. Equal precedence stops the inner loop, so chains of the
    /// same operator associate to the left.
    fn expression_above(&mut self, minimum: u8) -> Option<NodeId> {
        self.whitespace();

        let mut expr = self.parse(Self::expression_unary)?;
        self.whitespace();

        loop {
            let id = self.begin_rule();
            match self.parse_infix_operator() {
                Some(op) if op.precedence > minimum => {
                    let message = format!("right side of '{}' expression", op.symbol);
                    match self.expect(|p| p.expression_infix_right(expr, op), &message) {
                        Some(binary) => {
                            expr = self.succeed_rule(id, binary)?;
                        }
                        None => {
                            let _ = self.fail_rule::<()>(id);
                            return None;
                        }
                    }
                }
                _ => {
                    let _ = self.fail_rule::<()>(id);
                    break;
                }
            }
        }

        self.whitespace();
        Some(expr)
    }

    fn expression_infix_right(&mut self, left: NodeId, op: InfixOperator) -> Option<NodeId> {
        self.whitespace();
        let right = self.parse(|p| p.expression_above(op.precedence))?;
        Some(self.arena.alloc_spanning(NodeKind::Binary {
            left,
            op: op.op,
            right,
        }))
    }

    fn parse_infix_operator(&mut self) -> Option<InfixOperator> {
        // `a -> x` ends the expression at the divert.
        if self.peek(|p: &mut Self| p.parse_string("->")) {
            return None;
        }
        for op in OPERATORS {
            let id = self.begin_rule();
            if self.parse_string(op.symbol).is_some() {
                if op.require_whitespace && self.whitespace().is_none() {
                    let _ = self.fail_rule::<()>(id);
                    continue;
                }
                return self.succeed_rule(id, op);
            }
            let _ = self.fail_rule::<()>(id);
        }
        None
    }

    // ========================================================================
    // UNARY TERMS
    // ========================================================================

    fn expression_unary(&mut self) -> Option<NodeId> {
        // Checked first so `->` is never read as a minus.
        if let Some(target) = self.parse(Self::expression_divert_target) {
            return Some(target);
        }

        let prefixes: [fn(&mut Self) -> Option<UnaryOp>; 2] = [
            |p| p.parse_string("-").map(|_| UnaryOp::Negate),
            |p| p.parse_string("!").map(|_| UnaryOp::Not),
        ];
        let prefix = match self.one_of(&prefixes) {
            Some(op) => Some(op),
            None => self.parse(Self::expression_not),
        };

        self.whitespace();

        // Variables may start with digits, so names come before literals;
        // calls come before names so the parentheses are seen.
        let terms: [fn(&mut Self) -> Option<NodeId>; 5] = [
            Self::expression_list,
            Self::expression_paren,
            Self::expression_function_call,
            Self::expression_variable_name,
            Self::expression_literal,
        ];
        let mut expr = self.one_of(&terms);

        if expr.is_none() && prefix.is_some() {
            expr = self.parse(Self::expression_unary);
        }
        let mut expr = expr?;

        if let Some(op) = prefix {
            expr = self.unary(op, expr);
        }

        self.whitespace();

        let postfixes: [fn(&mut Self) -> Option<bool>; 2] = [
            |p| p.parse_string("++").map(|_| true),
            |p| p.parse_string("--").map(|_| false),
        ];
        if let Some(is_increment) = self.one_of(&postfixes) {
            match self.kind(expr).clone() {
                NodeKind::VariableReference { path } => {
                    let target = self.joined_identifier(&path);
                    expr = self.alloc(NodeKind::IncDec {
                        target,
                        expression: None,
                        is_increment,
                    });
                }
                _ => {
                    let shown = describe(&self.arena, expr);
                    self.error(format!(
                        "can only increment and decrement variables, but saw '{shown}'"
                    ));
                }
            }
        }

        Some(expr)
    }

    /// Applies a prefix operator, folding it into number literals.
    fn unary(&mut self, op: UnaryOp, inner: NodeId) -> NodeId {
        let folded = match (op, self.kind(inner)) {
            (UnaryOp::Negate, NodeKind::Number { value }) => match value {
                NumberValue::Int(v) => Some(NumberValue::Int(v.wrapping_neg())),
                NumberValue::Float(v) => Some(NumberValue::Float(-v)),
                NumberValue::Bool(_) => None,
            },
            (UnaryOp::Not, NodeKind::Number { value }) => Some(match value {
                NumberValue::Int(v) => NumberValue::Bool(*v == 0),
                NumberValue::Float(v) => NumberValue::Bool(*v == 0.0),
                NumberValue::Bool(v) => NumberValue::Bool(!v),
            }),
            _ => None,
        };
        match folded {
            Some(value) => self.alloc(NodeKind::Number { value }),
            None => self.alloc(NodeKind::Unary { op, inner }),
        }
    }

    /// The identifier naming a variable reference's target.
    fn joined_identifier(&mut self, path: &[NodeId]) -> NodeId {
        if let [single] = path {
            return *single;
        }
        let name = path
            .iter()
            .map(|id| self.identifier_name(*id).to_string())
            .collect::<Vec<_>>()
            .join(".");
        self.alloc(NodeKind::Identifier { name })
    }

    /// `not`, spelled as a word. Read as an identifier so `notable` stays a name.
    fn expression_not(&mut self) -> Option<UnaryOp> {
        let word = self.identifier()?;
        (word == "not").then_some(UnaryOp::Not)
    }

    fn expression_divert_target(&mut self) -> Option<NodeId> {
        self.whitespace();
        let divert = self.parse(Self::single_divert)?;
        if matches!(self.kind(divert), NodeKind::Divert { is_thread: true, .. }) {
            return None;
        }
        self.whitespace();
        Some(self.alloc(NodeKind::DivertTarget { divert }))
    }

    // ========================================================================
    // LITERALS
    // ========================================================================

    fn expression_literal(&mut self) -> Option<NodeId> {
        let literals: [fn(&mut Self) -> Option<NodeId>; 4] = [
            Self::expression_float,
            Self::expression_int,
            Self::expression_bool,
            Self::expression_string,
        ];
        self.one_of(&literals)
    }

    pub(crate) fn expression_int(&mut self) -> Option<NodeId> {
        let value = self.parse_int()?;
        Some(self.alloc(NodeKind::Number {
            value: NumberValue::Int(value),
        }))
    }

    fn expression_float(&mut self) -> Option<NodeId> {
        let value = self.parse_float()?;
        Some(self.alloc(NodeKind::Number {
            value: NumberValue::Float(value),
        }))
    }

    fn expression_bool(&mut self) -> Option<NodeId> {
        let value = match self.identifier()?.as_str() {
            "true" => true,
            "false" => false,
            _ => return None,
        };
        Some(self.alloc(NodeKind::Number {
            value: NumberValue::Bool(value),
        }))
    }

    fn expression_string(&mut self) -> Option<NodeId> {
        self.parse_string("\"")?;

        self.set_flag(GrammarFlags::PARSING_STRING, true);
        let content = self.parse(Self::mixed_text_and_logic);
        let _ = self.expect(|p| p.parse_string("\""), "close quote for string expression");
        self.set_flag(GrammarFlags::PARSING_STRING, false);

        let content = match content {
            None => vec![self.text("")],
            Some(content) => {
                let has_divert = content
                    .iter()
                    .any(|id| matches!(self.kind(*id), NodeKind::Divert { .. }));
                if has_divert {
                    self.error("String expressions cannot contain diverts (->)");
                }
                content
            }
        };
        Some(self.alloc(NodeKind::StringExpression { content }))
    }

    /// True for a string literal holding plain text only.
    pub(crate) fn is_single_string(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::StringExpression { content } => {
                matches!(content.as_slice(), [only] if matches!(self.kind(*only), NodeKind::Text { .. }))
            }
            _ => false,
        }
    }

    // ========================================================================
    // NAMES, CALLS AND LISTS
    // ========================================================================

    fn expression_function_call(&mut self) -> Option<NodeId> {
        let name = self.identifier_node()?;
        self.whitespace();
        let arguments = self.parse(Self::expression_function_call_arguments)?;
        Some(self.alloc(NodeKind::FunctionCall {
            name,
            arguments,
            should_pop_returned_value: false,
        }))
    }

    /// `(a, b)`. An empty pair of parentheses gives no arguments.
    pub(crate) fn expression_function_call_arguments(&mut self) -> Option<Vec<NodeId>> {
        self.parse_string("(")?;
        let arguments = self
            .interleave(one(Self::expression), exclude(|p: &mut Self| p.parse_string(",")))
            .unwrap_or_default();
        self.whitespace();
        let _ = self.expect(|p| p.parse_string(")"), "closing ')' for function call");
        Some(arguments)
    }

    fn expression_variable_name(&mut self) -> Option<NodeId> {
        let path = self.interleave(
            one(Self::identifier_node),
            exclude(spaced(|p: &mut Self| p.parse_string("."))),
        )?;
        if is_reserved_keyword(self.identifier_name(path[0])) {
            return None;
        }
        Some(self.alloc(NodeKind::VariableReference { path }))
    }

    fn expression_paren(&mut self) -> Option<NodeId> {
        self.parse_string("(")?;
        let inner = self.parse(Self::expression)?;
        self.whitespace();
        let _ = self.expect(|p| p.parse_string(")"), "closing parenthesis ')' for expression");
        Some(inner)
    }

    /// `(a, b.c)` list literal. One item in parentheses is a list too.
    fn expression_list(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.parse_string("(")?;
        self.whitespace();
        let items = self
            .separated_list(Self::list_member, spaced(|p: &mut Self| p.parse_string(",")))
            .unwrap_or_default();
        self.whitespace();
        self.parse_string(")")?;
        Some(self.alloc(NodeKind::ListLiteral { items }))
    }

    fn list_member(&mut self) -> Option<NodeId> {
        self.whitespace();
        let mut name = self.identifier()?;
        if self.parse_string(".").is_some() {
            let element = self.expect(
                Self::identifier,
                "element name within list definition (i.e. after the '.')",
            );
            name = format!("{name}.{}", element.unwrap_or_default());
        }
        self.whitespace();
        Some(self.alloc(NodeKind::Identifier { name }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::ast::pretty::describe;
    use crate::ast::Story;

    /// Renders the value of the first `~ temp` in the source.
    fn assigned(source: &str) -> (Story, String) {
        let (story, diagnostics) = parse_str(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "VariableAssignment")[0];
        let NodeKind::VariableAssignment { value: Some(value), .. } = story.kind(id) else {
            panic!("no value");
        };
        let shown = describe(&story, *value);
        (story, shown)
    }

    #[test]
    fn test_precedence() {
        let (_, shown) = assigned("~ temp x = 2 + 3 * 4\n");
        assert_eq!(shown, "(2 + (3 * 4))");
    }

    #[test]
    fn test_left_associative() {
        let (_, shown) = assigned("~ temp x = 10 - 4 - 3\n");
        assert_eq!(shown, "((10 - 4) - 3)");
    }

    #[test]
    fn test_parentheses_override() {
        let (_, shown) = assigned("~ temp x = (2 + 3) * 4\n");
        assert_eq!(shown, "((2 + 3) * 4)");
    }

    #[test]
    fn test_word_operators() {
        let (_, shown) = assigned("~ temp x = a and not b or c mod 2\n");
        assert_eq!(shown, "((a && !b) || (c % 2))");
    }

    #[test]
    fn test_word_operator_needs_space() {
        let (_, shown) = assigned("~ temp x = orange\n");
        assert_eq!(shown, "orange");
    }

    #[test]
    fn test_list_operators() {
        let (_, shown) = assigned("~ temp x = inventory hasnt sword && (a, b) ? c\n");
        assert_eq!(shown, "((inventory !? sword) && ((a, b) ? c))");
    }

    #[test]
    fn test_negative_literal_folds() {
        let (story, shown) = assigned("~ temp x = -5\n");
        assert_eq!(shown, "-5");
        assert!(nodes_named(&story, "Unary").is_empty());
    }

    #[test]
    fn test_not_on_variable() {
        let (story, shown) = assigned("~ temp x = !visited\n");
        assert_eq!(shown, "!visited");
        assert_eq!(nodes_named(&story, "Unary").len(), 1);
    }

    #[test]
    fn test_float_and_bool_literals() {
        let (_, shown) = assigned("~ temp x = 1.5 == true\n");
        assert_eq!(shown, "(1.5 == true)");
    }

    #[test]
    fn test_function_call_and_dotted_name() {
        let (_, shown) = assigned("~ temp x = max(a.b, 3)\n");
        assert_eq!(shown, "max(a.b, 3)");
    }

    #[test]
    fn test_divert_target_value() {
        let (story, _) = assigned("~ temp x = -> somewhere\n");
        assert_eq!(nodes_named(&story, "DivertTarget").len(), 1);
    }

    #[test]
    fn test_string_with_logic() {
        let (story, _) = assigned("~ temp x = \"Hi {name}\"\n");
        let id = nodes_named(&story, "StringExpression")[0];
        let NodeKind::StringExpression { content } = story.kind(id) else {
            unreachable!()
        };
        assert_eq!(content.len(), 2);
    }

    #[test]
    fn test_missing_right_operand() {
        let (_, diagnostics) = parse_str("~ temp x = 1 +\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Expected right side of '+' expression but saw end of line"]
        );
    }

    #[test]
    fn test_postfix_increment() {
        let (story, diagnostics) = parse_str("~ count++\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "IncDec")[0];
        assert_eq!(describe(&story, id), "count++");
    }

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved_keyword("temp"));
        assert!(!is_reserved_keyword("temperature"));
    }

    #[test]
    fn test_int_overflow_reported() {
        let (_, diagnostics) = parse_str("~ temp x = 99999999999\n");
        assert!(messages(&diagnostics)[0].starts_with("Failed to read integer value: 99999999999"));
    }
}
