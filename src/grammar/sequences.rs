//! Sequences: `{a|b|c}`, `{&a|b}`, `{shuffle once: ...}` and their multiline
//! forms.

use once_cell::sync::Lazy;

use super::{InkParser, StatementLevel};
use crate::ast::pretty::sequence_type_words;
use crate::ast::{NodeId, NodeKind, SequenceType};
use crate::chars::CharacterSet;
use crate::engine::{exclude, one, optional, Rules};

static SEQUENCE_SYMBOLS: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("!&~$ "));

/// One piece of a `|`-separated run.
#[derive(Debug, Clone)]
enum Piece {
    Content(Vec<NodeId>),
    Pipe,
}

impl InkParser<'_, '_> {
    /// A symbol or word annotation, validated. Unsupported combinations are
    /// reported and read as stopping.
    pub(crate) fn sequence_type_annotation(&mut self) -> Option<SequenceType> {
        let annotation = match self.parse(Self::sequence_type_symbol_annotation) {
            Some(annotation) => annotation,
            None => self.parse(Self::sequence_type_word_annotation)?,
        };

        let supported = [
            SequenceType::ONCE,
            SequenceType::CYCLE,
            SequenceType::STOPPING,
            SequenceType::SHUFFLE,
            SequenceType::SHUFFLE | SequenceType::STOPPING,
            SequenceType::SHUFFLE | SequenceType::ONCE,
        ];
        if !supported.contains(&annotation) {
            self.error(format!(
                "Sequence type combination not supported: {}",
                sequence_type_words(annotation)
            ));
            return Some(SequenceType::STOPPING);
        }
        // Shuffle alone still needs an ending behaviour.
        if annotation == SequenceType::SHUFFLE {
            return Some(SequenceType::SHUFFLE | SequenceType::STOPPING);
        }
        Some(annotation)
    }

    fn sequence_type_symbol_annotation(&mut self) -> Option<SequenceType> {
        let symbols = self.parse_chars_from_set(&SEQUENCE_SYMBOLS)?;
        let sequence_type = symbols
            .chars()
            .fold(SequenceType::empty(), |acc, c| match c {
                '!' => acc | SequenceType::ONCE,
                '&' => acc | SequenceType::CYCLE,
                '~' => acc | SequenceType::SHUFFLE,
                '$' => acc | SequenceType::STOPPING,
                _ => acc,
            });
        (!sequence_type.is_empty()).then_some(sequence_type)
    }

    /// `shuffle once:` and friends.
    fn sequence_type_word_annotation(&mut self) -> Option<SequenceType> {
        let words = self.interleave(
            one(Self::sequence_type_single_word),
            exclude(Self::whitespace),
        )?;
        self.parse_string(":")?;
        Some(words.into_iter().fold(SequenceType::empty(), |acc, word| acc | word))
    }

    fn sequence_type_single_word(&mut self) -> Option<SequenceType> {
        match self.identifier()?.as_str() {
            "once" => Some(SequenceType::ONCE),
            "cycle" => Some(SequenceType::CYCLE),
            "shuffle" => Some(SequenceType::SHUFFLE),
            "stopping" => Some(SequenceType::STOPPING),
            _ => None,
        }
    }

    /// `{a|b}` with no annotation: a stopping sequence of two or more.
    pub(crate) fn inner_sequence(&mut self) -> Option<NodeId> {
        self.whitespace();
        let sequence_type = self
            .parse(Self::sequence_type_annotation)
            .unwrap_or(SequenceType::STOPPING);

        let alternatives = self.parse(Self::inner_sequence_objects)?;
        if alternatives.len() <= 1 {
            return None;
        }
        Some(self.alloc(NodeKind::Sequence {
            sequence_type,
            alternatives,
        }))
    }

    /// The alternatives, one content list each. A line break straight after
    /// the annotation selects the dashed multiline form.
    pub(crate) fn inner_sequence_objects(&mut self) -> Option<Vec<NodeId>> {
        if self.parse(Self::newline).is_some() {
            self.parse(Self::inner_multiline_sequence_objects)
        } else {
            self.parse(Self::inner_inline_sequence_objects)
        }
    }

    fn inner_inline_sequence_objects(&mut self) -> Option<Vec<NodeId>> {
        let alternatives = self.pipe_separated_content()?;
        let mut lists = Vec::with_capacity(alternatives.len());
        for mut content in alternatives {
            self.trim_start_whitespace(&mut content);
            self.trim_end_whitespace(&mut content, false);
            lists.push(self.content_list(content));
        }
        Some(lists)
    }

    /// Runs of content separated by `|`. Missing content between pipes, or
    /// at either end, gives an empty alternative.
    pub(crate) fn pipe_separated_content(&mut self) -> Option<Vec<Vec<NodeId>>> {
        let pieces = self.interleave(
            optional(|p: &mut Self| p.mixed_text_and_logic().map(Piece::Content)),
            one(|p: &mut Self| p.parse_string("|").map(|_| Piece::Pipe)),
        )?;

        let mut alternatives = Vec::new();
        let mut just_had_content = false;
        for piece in pieces {
            match piece {
                Piece::Pipe => {
                    if !just_had_content {
                        alternatives.push(Vec::new());
                    }
                    just_had_content = false;
                }
                Piece::Content(content) => {
                    alternatives.push(content);
                    just_had_content = true;
                }
            }
        }
        if !just_had_content {
            alternatives.push(Vec::new());
        }
        Some(alternatives)
    }

    fn inner_multiline_sequence_objects(&mut self) -> Option<Vec<NodeId>> {
        let _ = self.multiline_whitespace();
        self.one_or_more(Self::single_multiline_sequence_element)
    }

    /// `- content` up to the next dash or closing brace.
    fn single_multiline_sequence_element(&mut self) -> Option<NodeId> {
        self.whitespace();
        if self.parse_string("->").is_some() {
            return None;
        }
        self.parse_string("-")?;
        self.whitespace();

        let content = match self.statements_at_level(StatementLevel::InnerBlock) {
            Some(mut content) => {
                let newline = self.text("\n");
                content.insert(0, newline);
                content
            }
            None => {
                let _ = self.multiline_whitespace();
                Vec::new()
            }
        };
        Some(self.content_list(content))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::ast::pretty::describe;
    use crate::ast::{NodeKind, SequenceType, Story};

    fn sequence(story: &Story) -> (SequenceType, Vec<String>) {
        let id = nodes_named(story, "Sequence")[0];
        let NodeKind::Sequence {
            sequence_type,
            alternatives,
        } = story.kind(id)
        else {
            unreachable!()
        };
        (
            *sequence_type,
            alternatives.iter().map(|a| describe(story, *a)).collect(),
        )
    }

    #[test]
    fn test_once_sequence() {
        let (story, diagnostics) = parse_str("{ once: A | B }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            sequence(&story),
            (SequenceType::ONCE, vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_default_is_stopping() {
        let (story, diagnostics) = parse_str("{one|two|three}\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (sequence_type, alternatives) = sequence(&story);
        assert_eq!(sequence_type, SequenceType::STOPPING);
        assert_eq!(alternatives, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_symbol_annotations() {
        let cases = [
            ("{&a|b}", SequenceType::CYCLE),
            ("{!a|b}", SequenceType::ONCE),
            ("{~a|b}", SequenceType::SHUFFLE | SequenceType::STOPPING),
            ("{$a|b}", SequenceType::STOPPING),
            ("{~!a|b}", SequenceType::SHUFFLE | SequenceType::ONCE),
        ];
        for (source, expected) in cases {
            let (story, diagnostics) = parse_str(source);
            assert!(diagnostics.is_empty(), "{source}: {diagnostics:?}");
            assert_eq!(sequence(&story).0, expected, "{source}");
        }
    }

    #[test]
    fn test_shuffle_word_combinations() {
        let (story, diagnostics) = parse_str("{shuffle stopping: a|b}");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(sequence(&story).0, SequenceType::SHUFFLE | SequenceType::STOPPING);
    }

    #[test]
    fn test_bare_shuffle_stops_at_the_end() {
        for source in ["{~a|b}", "{shuffle: a|b}", "{shuffle:\n- a\n- b\n}\n"] {
            let (story, diagnostics) = parse_str(source);
            assert!(diagnostics.is_empty(), "{source}: {diagnostics:?}");
            let sequence_type = sequence(&story).0;
            assert!(sequence_type.contains(SequenceType::SHUFFLE), "{source}");
            assert!(sequence_type.contains(SequenceType::STOPPING), "{source}");
        }
    }

    #[test]
    fn test_unsupported_combination() {
        let (story, diagnostics) = parse_str("{once cycle: a|b}");
        assert_eq!(
            messages(&diagnostics),
            vec!["Sequence type combination not supported: once cycle"]
        );
        assert_eq!(sequence(&story).0, SequenceType::STOPPING);
    }

    #[test]
    fn test_empty_alternatives() {
        let (story, diagnostics) = parse_str("{&|tick|}");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(sequence(&story).1, vec!["", "tick", ""]);
    }

    #[test]
    fn test_single_annotated_alternative() {
        let (story, diagnostics) = parse_str("{once: only}");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(sequence(&story).1, vec!["only"]);
    }

    #[test]
    fn test_multiline_sequence() {
        let source = "{cycle:\n- Red\n- Green\n  -> shop\n- \n}\nAfter\n== shop ==\nShop\n";
        let (story, diagnostics) = parse_str(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (sequence_type, alternatives) = sequence(&story);
        assert_eq!(sequence_type, SequenceType::CYCLE);
        assert_eq!(alternatives.len(), 3);
        assert!(alternatives[0].starts_with("\nRed"));
        assert!(alternatives[1].contains("-> shop"));
        assert_eq!(alternatives[2], "");
        assert!(texts(&story).contains(&"After".to_string()));
    }

    #[test]
    fn test_sequence_with_divert() {
        let (story, diagnostics) = parse_str("{a -> x|b}\n== x ==\nX\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let (_, alternatives) = sequence(&story);
        assert_eq!(alternatives, vec!["a -> x", "b"]);
    }
}
