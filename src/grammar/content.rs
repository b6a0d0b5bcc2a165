//! Text lines: plain text, glue, tags and inline `{ }` logic.

use once_cell::sync::Lazy;

use super::{GrammarFlags, InkParser};
use crate::ast::{NodeId, NodeKind};
use crate::chars::CharacterSet;
use crate::engine::{optional, Rules};

/// Text scanning stops at these to see whether a divert, thread or glue
/// starts here.
static PAUSE_CHARS: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("-<"));

static END_CHARS: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("{}|\n\r\\#"));

static END_CHARS_IN_CHOICE: Lazy<CharacterSet> = Lazy::new(|| END_CHARS.union(&CharacterSet::from_chars("[]")));

static END_CHARS_IN_STRING: Lazy<CharacterSet> = Lazy::new(|| END_CHARS.union(&CharacterSet::from_chars("\"")));

impl InkParser<'_, '_> {
    /// A full line of content, terminated by a newline text node.
    pub(crate) fn line_of_mixed_text_and_logic(&mut self) -> Option<Vec<NodeId>> {
        let _ = self.parse(Self::whitespace);

        let mut result = self.parse(Self::mixed_text_and_logic)?;
        let first = *result.first()?;

        if matches!(self.kind(first), NodeKind::Text { text } if text.starts_with("return")) {
            self.warning(
                "Do you need a '~' before 'return'? If not, perhaps use a glue: <> (since it's lowercase) or rewrite somehow?",
            );
        }

        let ends_in_divert = result
            .last()
            .is_some_and(|id| matches!(self.kind(*id), NodeKind::Divert { .. }));
        if !ends_in_divert {
            self.trim_end_whitespace(&mut result, false);
        }

        self.end_tag_if_necessary(Some(&mut result));

        // A line holding only tags attaches them to the next line.
        let pure_tag = result
            .first()
            .is_some_and(|id| matches!(self.kind(*id), NodeKind::Tag { is_start: true }));
        if !pure_tag {
            let newline = self.text("\n");
            result.push(newline);
        }

        let _ = self.expect_or(Self::end_of_line, "end of line", Self::skip_to_next_line);
        Some(result)
    }

    /// Text interleaved with inline logic, glue and tags, then any diverts.
    pub(crate) fn mixed_text_and_logic(&mut self) -> Option<Vec<NodeId>> {
        let mut results = self.interleave(
            optional(Self::content_text),
            optional(Self::inline_logic_or_glue_or_start_tag),
        );

        // The divert that ends a choice line is handled by the choice itself.
        if !self.parsing_choice {
            if let Some(diverts) = self.parse(Self::multi_divert) {
                let mut list = results.unwrap_or_default();
                self.end_tag_if_necessary(Some(&mut list));
                self.trim_end_whitespace(&mut list, true);
                list.extend(diverts);
                results = Some(list);
            }
        }

        results
    }

    pub(crate) fn content_text(&mut self) -> Option<NodeId> {
        let mut text: Option<String> = None;
        loop {
            let chunk = self.parse(Self::content_text_no_escape);
            let escaped = self.parse_string("\\").is_some();
            if chunk.is_none() && !escaped {
                break;
            }
            let buffer = text.get_or_insert_with(String::new);
            if let Some(chunk) = chunk {
                buffer.push_str(&chunk);
            }
            if escaped {
                if let Some(c) = self.parse_single_char() {
                    buffer.push(c);
                }
            }
        }
        text.map(|text| self.text(text))
    }

    fn content_text_no_escape(&mut self) -> Option<String> {
        let end: &CharacterSet = if self.parsing_string() {
            &END_CHARS_IN_STRING
        } else if self.parsing_choice {
            &END_CHARS_IN_CHOICE
        } else {
            &END_CHARS
        };
        self.parse_until(Self::non_text, Some(&PAUSE_CHARS), Some(end))
    }

    /// Anything that ends a run of plain text at a pause character.
    fn non_text(&mut self) -> Option<()> {
        let rules: [fn(&mut Self) -> Option<()>; 4] = [
            |p| p.parse_string("->"),
            |p| p.parse_string("<-"),
            Self::end_of_line,
            |p| p.parse_string("<>"),
        ];
        self.one_of(&rules)
    }

    fn inline_logic_or_glue_or_start_tag(&mut self) -> Option<NodeId> {
        let rules: [fn(&mut Self) -> Option<NodeId>; 3] = [Self::inline_logic, Self::glue, Self::start_tag];
        self.one_of(&rules)
    }

    pub(crate) fn glue(&mut self) -> Option<NodeId> {
        self.parse_string("<>")?;
        Some(self.alloc(NodeKind::Glue))
    }

    // ========================================================================
    // TAGS
    // ========================================================================

    pub(crate) fn start_tag(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.parse_string("#")?;

        if self.parsing_string() {
            self.error("Tags aren't allowed inside of strings. Please use \\# if you want a hash symbol.");
        }

        let result = if self.tag_active() {
            let end = self.alloc(NodeKind::Tag { is_start: false });
            let start = self.alloc(NodeKind::Tag { is_start: true });
            self.content_list(vec![end, start])
        } else {
            self.alloc(NodeKind::Tag { is_start: true })
        };
        self.set_flag(GrammarFlags::TAG_ACTIVE, true);
        self.whitespace();
        Some(result)
    }

    /// Closes an open tag, appending the end marker to `out` if given.
    pub(crate) fn end_tag_if_necessary(&mut self, out: Option<&mut Vec<NodeId>>) {
        if !self.tag_active() {
            return;
        }
        if let Some(out) = out {
            let end = self.alloc(NodeKind::Tag { is_start: false });
            out.push(end);
        }
        self.set_flag(GrammarFlags::TAG_ACTIVE, false);
    }

    // ========================================================================
    // INLINE LOGIC
    // ========================================================================

    /// `{ ... }` inside a line of text.
    pub(crate) fn inline_logic(&mut self) -> Option<NodeId> {
        self.parse_string("{")?;

        let was_parsing_string = self.parsing_string();
        let was_tag_active = self.tag_active();

        self.whitespace();

        let Some(logic) = self.expect(
            Self::inner_logic,
            "some kind of logic, conditional or sequence within braces: { ... }",
        ) else {
            self.set_flag(GrammarFlags::PARSING_STRING, was_parsing_string);
            return None;
        };

        self.disallow_increment(logic);

        let list = if matches!(self.kind(logic), NodeKind::ContentList { .. }) {
            logic
        } else {
            self.content_list(vec![logic])
        };

        self.whitespace();
        let _ = self.expect(|p| p.parse_string("}"), "closing brace '}' for inline logic");

        // Strings and logic nest.
        self.set_flag(GrammarFlags::PARSING_STRING, was_parsing_string);

        // Tags opened inside the braces do not leak into the line.
        if !was_tag_active && self.tag_active() {
            let end = self.alloc(NodeKind::Tag { is_start: false });
            self.push_content(list, end);
            self.set_flag(GrammarFlags::TAG_ACTIVE, false);
        }

        Some(list)
    }

    /// The inside of `{ }`: a sequence, a conditional or an expression.
    pub(crate) fn inner_logic(&mut self) -> Option<NodeId> {
        self.whitespace();

        if let Some(sequence_type) = self.parse(Self::sequence_type_annotation) {
            let alternatives = self.expect(
                Self::inner_sequence_objects,
                "sequence elements (for cycle/stoping etc)",
            )?;
            return Some(self.alloc(NodeKind::Sequence {
                sequence_type,
                alternatives,
            }));
        }

        if let Some(initial) = self.parse(Self::condition_expression) {
            let branches = self.expect(
                |p| p.conditional_branches(Some(initial)),
                "conditional content following query",
            )?;
            return Some(self.alloc(NodeKind::Conditional {
                initial_condition: Some(initial),
                branches,
            }));
        }

        // Each candidate must cover everything up to the closing brace:
        // `{name}` is an expression, `{one|two}` a sequence.
        let rules: [fn(&mut Self) -> Option<NodeId>; 3] = [
            Self::inner_conditional_content,
            Self::inner_sequence,
            Self::inner_expression,
        ];
        for rule in rules {
            let id = self.begin_rule();
            match self.parse(rule) {
                Some(result) if self.peek(super::whitespace::spaced(|p: &mut Self| p.parse_string("}"))) => {
                    return self.succeed_rule(id, result);
                }
                _ => {
                    let _ = self.fail_rule::<()>(id);
                }
            }
        }
        None
    }

    fn inner_expression(&mut self) -> Option<NodeId> {
        self.expression()
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    pub(crate) fn content_list(&mut self, content: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::ContentList { content })
    }

    /// Appends to an already allocated content list.
    pub(crate) fn push_content(&mut self, list: NodeId, child: NodeId) {
        if let NodeKind::ContentList { content } = self.kind_mut(list) {
            content.push(child);
            self.arena.adopt(list, child);
        }
    }

    /// Trims trailing spaces from a final text node, dropping it if emptied.
    /// With `terminate_with_space`, a single space is put back instead.
    pub(crate) fn trim_end_whitespace(&mut self, list: &mut Vec<NodeId>, terminate_with_space: bool) {
        while let Some(&last) = list.last() {
            let NodeKind::Text { text } = self.kind_mut(last) else {
                return;
            };
            let trimmed = text.trim_end_matches([' ', '\t']).len();
            text.truncate(trimmed);
            if terminate_with_space {
                text.push(' ');
                return;
            }
            if !text.is_empty() {
                return;
            }
            list.pop();
        }
    }

    /// Trims spaces from the start of the first text node.
    pub(crate) fn trim_start_whitespace(&mut self, list: &mut Vec<NodeId>) {
        let Some(&first) = list.first() else {
            return;
        };
        if let NodeKind::Text { text } = self.kind_mut(first) {
            *text = text.trim_start_matches([' ', '\t']).to_string();
            if text.is_empty() {
                list.remove(0);
            }
        }
    }

    pub(crate) fn disallow_increment(&mut self, expression: NodeId) {
        if matches!(self.kind(expression), NodeKind::IncDec { .. }) {
            self.error("Can't use increment/decrement here. It can only be used on a ~ line");
        }
    }
}
