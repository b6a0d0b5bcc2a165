//! Whitespace, line structure and identifiers.

use std::any::Any;

use super::InkParser;
use crate::ast::{NodeId, NodeKind};
use crate::chars::{IDENTIFIER_CHARS, INLINE_WHITESPACE};
use crate::engine::Rules;

/// Wraps a rule so inline whitespace on either side is consumed with it.
pub(crate) fn spaced<'p, 'a, T, R>(rule: R) -> impl Fn(&mut InkParser<'p, 'a>) -> Option<T>
where
    'a: 'p,
    T: Any,
    R: Fn(&mut InkParser<'p, 'a>) -> Option<T>,
{
    move |p: &mut InkParser<'p, 'a>| {
        p.whitespace();
        let result = p.parse(&rule)?;
        p.whitespace();
        Some(result)
    }
}

impl InkParser<'_, '_> {
    /// Spaces and tabs. Fails if there are none.
    pub(crate) fn whitespace(&mut self) -> Option<()> {
        self.parse_chars_from_set(&INLINE_WHITESPACE).map(|_| ())
    }

    pub(crate) fn newline(&mut self) -> Option<()> {
        self.whitespace();
        self.parse_newline()
    }

    pub(crate) fn end_of_file(&mut self) -> Option<()> {
        self.whitespace();
        if self.end_of_input() {
            Some(())
        } else {
            None
        }
    }

    pub(crate) fn end_of_line(&mut self) -> Option<()> {
        let rules: [fn(&mut Self) -> Option<()>; 2] = [Self::newline, Self::end_of_file];
        self.one_of(&rules)
    }

    /// One or more blank lines.
    pub(crate) fn multiline_whitespace(&mut self) -> Option<()> {
        self.one_or_more(Self::newline).map(|_| ())
    }

    pub(crate) fn any_whitespace(&mut self) -> Option<()> {
        let rules: [fn(&mut Self) -> Option<()>; 2] = [Self::whitespace, Self::multiline_whitespace];
        let mut found = false;
        while self.one_of(&rules).is_some() {
            found = true;
        }
        found.then_some(())
    }

    /// Error recovery: drop the rest of the line, including its break.
    pub(crate) fn skip_to_next_line(&mut self) -> Option<()> {
        let _ = self.parser.parse_until_chars_from_str("\n\r");
        let _ = self.parse_newline();
        Some(())
    }

    /// Runs an inline rule that must be followed by the end of the line.
    pub(crate) fn line<T: Any>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let result = self.parse(rule)?;
        let _ = self.expect_or(Self::end_of_line, "end of line", Self::skip_to_next_line);
        Some(result)
    }

    // ========================================================================
    // IDENTIFIERS
    // ========================================================================

    /// A run of identifier characters that is not purely digits.
    pub(crate) fn identifier(&mut self) -> Option<String> {
        self.parse(|p| {
            let name = p.parse_chars_from_set(&IDENTIFIER_CHARS)?;
            if name.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(name)
        })
    }

    /// [`InkParser::identifier`] as a node carrying its own span.
    pub(crate) fn identifier_node(&mut self) -> Option<NodeId> {
        self.parse(|p| {
            let name = p.identifier()?;
            Some(p.alloc(NodeKind::Identifier { name }))
        })
    }

    /// Placeholder name for declarations whose name failed to parse.
    pub(crate) fn missing_identifier(&mut self) -> NodeId {
        self.alloc(NodeKind::Identifier {
            name: String::new(),
        })
    }

    pub(crate) fn identifier_name(&self, id: NodeId) -> &str {
        match self.kind(id) {
            NodeKind::Identifier { name } => name,
            _ => "",
        }
    }

    /// `(name)` labelling a choice or gather.
    pub(crate) fn bracketed_name(&mut self) -> Option<NodeId> {
        self.parse_string("(")?;
        self.whitespace();
        let name = self.identifier_node()?;
        self.whitespace();
        let _ = self.expect(|p| p.parse_string(")"), "closing ')' for bracketed name");
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    #[test]
    fn test_numeric_identifier_is_rejected() {
        let (story, diagnostics) = parse_str("~ temp 123 = 5\n");
        assert!(!diagnostics.is_empty());
        assert!(nodes_named(&story, "VariableAssignment").is_empty());
    }

    #[test]
    fn test_identifier_may_start_with_digit() {
        let (story, diagnostics) = parse_str("VAR 2b = 1\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let ids = nodes_named(&story, "Identifier");
        assert_eq!(story.identifier(ids[0]), Some("2b"));
    }

    #[test]
    fn test_crlf_lines() {
        let (story, diagnostics) = parse_str("One\r\nTwo\r\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let texts = texts(&story);
        assert_eq!(texts, vec!["One", "\n", "Two", "\n"]);
    }
}
