//! Statement dispatch by nesting level.
//!
//! The same statement loop runs at the top of a file, inside knots and
//! stitches, and inside multi-line `{ }` blocks. What is allowed, and what
//! ends the current block, depends on the level.

use super::InkParser;
use crate::ast::{NodeId, NodeKind};
use crate::engine::{optional_exclude, Rules, Step};

/// Where a run of statements sits. Ordered from innermost to outermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatementLevel {
    /// Inside a multi-line conditional or sequence branch.
    InnerBlock,
    Stitch,
    Knot,
    Top,
}

type StatementRule<'p, 'a> = fn(&mut InkParser<'p, 'a>) -> Option<Vec<NodeId>>;

impl<'p, 'a> InkParser<'p, 'a> {
    /// Statements until one of the level's break rules would match.
    pub(crate) fn statements_at_level(&mut self, level: StatementLevel) -> Option<Vec<NodeId>> {
        if level == StatementLevel::InnerBlock && self.parse(Self::gather_dashes).is_some() {
            self.error(
                "You can't use a gather (the dashes) within the { curly braces } context. For multi-line sequences and conditions, you should only use one dash.",
            );
        }

        self.interleave_until(
            optional_exclude(Self::multiline_whitespace),
            move |p: &mut Self| p.statement_at_level(level).map(Step::Many),
            move |p: &mut Self| p.statements_break_for_level(level),
        )
    }

    fn statement_at_level(&mut self, level: StatementLevel) -> Option<Vec<NodeId>> {
        let rules = Self::statement_rules(level);
        let statement = self.one_of(rules.as_slice())?;

        if level == StatementLevel::Top
            && statement
                .iter()
                .any(|id| matches!(self.kind(*id), NodeKind::Return { .. }))
        {
            self.error("should not have return statement outside of a knot");
        }
        Some(statement)
    }

    fn statements_break_for_level(&mut self, level: StatementLevel) -> Option<()> {
        self.whitespace();

        let mut rules: Vec<fn(&mut Self) -> Option<()>> = Vec::new();
        if level <= StatementLevel::Knot {
            rules.push(|p| p.knot_declaration().map(|_| ()));
        }
        if level <= StatementLevel::Stitch {
            rules.push(|p| p.stitch_declaration().map(|_| ()));
        }
        if level <= StatementLevel::InnerBlock {
            rules.push(Self::dash_not_arrow);
            rules.push(|p| p.parse_string("}"));
        }
        self.one_of(rules.as_slice())
    }

    fn statement_rules(level: StatementLevel) -> Vec<StatementRule<'p, 'a>> {
        let mut rules: Vec<StatementRule<'p, 'a>> = Vec::new();

        // Diverts can go anywhere.
        rules.push(|p| p.line(Self::multi_divert));

        if level >= StatementLevel::Top {
            rules.push(|p| p.knot_definition().map(|n| vec![n]));
        }

        rules.push(|p| p.line(Self::choice).map(|n| vec![n]));
        rules.push(|p| p.line(Self::author_warning).map(|n| vec![n]));

        // Dashes inside braces separate branches instead.
        if level > StatementLevel::InnerBlock {
            rules.push(|p| p.gather().map(|n| vec![n]));
        }

        if level >= StatementLevel::Knot {
            rules.push(|p| p.stitch_definition().map(|n| vec![n]));
        }

        rules.push(|p| p.line(Self::list_declaration).map(|n| vec![n]));
        rules.push(|p| p.line(Self::variable_declaration).map(|n| vec![n]));
        rules.push(|p| p.line(Self::const_declaration).map(|n| vec![n]));
        rules.push(|p| p.line(Self::external_declaration).map(|n| vec![n]));
        rules.push(|p| p.line(Self::include_statement).map(|n| vec![n]));

        rules.push(Self::logic_line);
        rules.push(Self::line_of_mixed_text_and_logic);
        rules
    }
}
