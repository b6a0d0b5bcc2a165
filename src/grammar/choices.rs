//! Choice and gather lines.

use super::InkParser;
use crate::ast::{NodeId, NodeKind};
use crate::engine::{exclude, one, optional_exclude, Rules};

impl InkParser<'_, '_> {
    /// `* (name) {cond} start [choice only] inner -> divert`
    pub(crate) fn choice(&mut self) -> Option<NodeId> {
        let mut once_only = true;
        let bullets = match self.choice_bullets("*") {
            Some(bullets) => bullets,
            None => {
                once_only = false;
                self.choice_bullets("+")?
            }
        };

        let name = self.parse(Self::bracketed_name);
        self.whitespace();
        let condition = self.parse(Self::choice_condition);
        self.whitespace();

        self.parsing_choice = true;

        let mut start = self.parse(Self::mixed_text_and_logic);
        let mut choice_only = None;
        let mut inner = None;

        let has_weave_style_brackets = self.parse_string("[").is_some();
        if has_weave_style_brackets {
            self.end_tag_if_necessary(start.as_mut());

            choice_only = self.parse(Self::mixed_text_and_logic);
            let _ = self.expect(|p| p.parse_string("]"), "closing ']' for weave-style option");
            self.end_tag_if_necessary(choice_only.as_mut());

            inner = self.parse(Self::mixed_text_and_logic);
        }

        self.whitespace();
        self.end_tag_if_necessary(inner.as_mut().or(start.as_mut()));

        let diverts = self.parse(Self::multi_divert);

        self.parsing_choice = false;
        self.whitespace();

        let empty_content = start.is_none() && inner.is_none() && choice_only.is_none();
        if empty_content && diverts.is_none() {
            self.warning(
                "Choice is completely empty. Interpreting as a default fallback choice. Add a divert arrow to remove this warning: * ->",
            );
        } else if start.is_none() && has_weave_style_brackets && choice_only.is_none() {
            self.warning("Blank choice - if you intended a default fallback choice, use the `* ->` syntax");
        }

        let mut inner = inner.unwrap_or_default();
        self.end_tag_if_necessary(Some(&mut inner));

        for divert in diverts.unwrap_or_default() {
            // The empty divert only marks the choice as a fallback.
            if matches!(self.kind(divert), NodeKind::Divert { is_empty: true, .. }) {
                continue;
            }
            inner.push(divert);
        }
        let newline = self.text("\n");
        inner.push(newline);

        let start_content = start.map(|content| self.content_list(content));
        let choice_only_content = choice_only.map(|content| self.content_list(content));
        let inner_content = Some(self.content_list(inner));

        Some(self.alloc(NodeKind::Choice {
            name,
            condition,
            start_content,
            choice_only_content,
            inner_content,
            indentation_depth: bullets,
            once_only,
            has_weave_style_brackets,
            is_invisible_default: empty_content,
        }))
    }

    /// A run of one bullet character, optionally spaced out (`* * *`).
    fn choice_bullets(&mut self, bullet: &'static str) -> Option<usize> {
        let bullets = self.interleave(
            optional_exclude(Self::whitespace),
            one(move |p: &mut Self| p.parse_string(bullet).map(|_| bullet)),
        )?;
        Some(bullets.len())
    }

    /// One or more `{cond}` guards, possibly on separate lines.
    fn choice_condition(&mut self) -> Option<NodeId> {
        let mut conditions = self.interleave(
            one(Self::choice_single_condition),
            exclude(Self::choice_conditions_space),
        )?;
        if conditions.len() == 1 {
            return conditions.pop();
        }
        Some(self.alloc(NodeKind::MultipleCondition { conditions }))
    }

    fn choice_conditions_space(&mut self) -> Option<()> {
        let _ = self.newline();
        self.whitespace();
        Some(())
    }

    fn choice_single_condition(&mut self) -> Option<NodeId> {
        self.parse_string("{")?;
        let condition = self.expect(Self::expression, "choice condition inside { }")?;
        self.disallow_increment(condition);
        let _ = self.expect(|p| p.parse_string("}"), "closing '}' for choice condition");
        Some(condition)
    }

    // ========================================================================
    // GATHERS
    // ========================================================================

    /// `- (name)` at the start of a line; the rest of the line is ordinary
    /// content.
    pub(crate) fn gather(&mut self) -> Option<NodeId> {
        let depth = self.parse(Self::gather_dashes)?;
        let name = self.parse(Self::bracketed_name);
        let _ = self.newline();
        Some(self.alloc(NodeKind::Gather {
            name,
            indentation_depth: depth,
            rejoins: Vec::new(),
        }))
    }

    pub(crate) fn gather_dashes(&mut self) -> Option<usize> {
        self.whitespace();
        let mut dashes = 0;
        while self.dash_not_arrow().is_some() {
            dashes += 1;
            self.whitespace();
        }
        (dashes > 0).then_some(dashes)
    }

    /// A `-` that does not begin `->`.
    pub(crate) fn dash_not_arrow(&mut self) -> Option<()> {
        self.parse(|p| {
            if p.peek(|p: &mut Self| p.parse_string("->")) {
                return None;
            }
            match p.parse_single_char() {
                Some('-') => Some(()),
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::ast::{NodeId, NodeKind, Story};

    fn choices(story: &Story) -> Vec<NodeId> {
        nodes_named(story, "Choice")
    }

    fn choice_fields(story: &Story, id: NodeId) -> (usize, bool, bool) {
        match story.kind(id) {
            NodeKind::Choice {
                indentation_depth,
                once_only,
                is_invisible_default,
                ..
            } => (*indentation_depth, *once_only, *is_invisible_default),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_choices_and_gather() {
        let (story, diagnostics) = parse_str("Hello\n* choice one\n* choice two\n- gather\nEnd");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let ids = choices(&story);
        assert_eq!(ids.len(), 2);
        for id in &ids {
            assert_eq!(choice_fields(&story, *id), (1, true, false));
        }
        let gathers = nodes_named(&story, "Gather");
        assert_eq!(gathers.len(), 1);
        let NodeKind::Gather { rejoins, .. } = story.kind(gathers[0]) else {
            unreachable!()
        };
        assert_eq!(rejoins, &ids);
        let texts = texts(&story);
        assert!(texts.contains(&"Hello".to_string()));
        assert!(texts.contains(&"End".to_string()));
    }

    #[test]
    fn test_sticky_and_nested_bullets() {
        let (story, diagnostics) = parse_str("+ sticky\n* * nested\n*  *   * deeper\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let fields: Vec<_> = choices(&story)
            .into_iter()
            .map(|id| choice_fields(&story, id))
            .collect();
        assert_eq!(fields, vec![(1, false, false), (2, true, false), (3, true, false)]);
    }

    #[test]
    fn test_weave_style_brackets() {
        let (story, diagnostics) = parse_str("* \"Hello[.\"],\" he said.\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = choices(&story)[0];
        let NodeKind::Choice {
            start_content,
            choice_only_content,
            inner_content,
            has_weave_style_brackets,
            ..
        } = story.kind(id)
        else {
            unreachable!()
        };
        assert!(has_weave_style_brackets);
        let render = |id: &Option<NodeId>| crate::ast::pretty::describe(&story, id.unwrap());
        assert_eq!(render(start_content), "\"Hello");
        assert_eq!(render(choice_only_content), ".\"");
        assert_eq!(render(inner_content), ",\" he said.\n");
    }

    #[test]
    fn test_divert_goes_to_inner_content() {
        let (story, diagnostics) = parse_str("* [Leave] -> outside\n== outside ==\nBye\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = choices(&story)[0];
        let NodeKind::Choice {
            inner_content: Some(inner),
            ..
        } = story.kind(id)
        else {
            unreachable!()
        };
        let NodeKind::ContentList { content } = story.kind(*inner) else {
            unreachable!()
        };
        let [.., divert, newline] = content.as_slice() else {
            panic!("inner content too short");
        };
        assert_eq!(story.kind(*divert).name(), "Divert");
        assert_eq!(story.text(*newline), Some("\n"));
    }

    #[test]
    fn test_conditions() {
        let (story, diagnostics) = parse_str("* {visited} {not tired}\n  Rest a while\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = choices(&story)[0];
        let NodeKind::Choice {
            condition: Some(condition),
            ..
        } = story.kind(id)
        else {
            unreachable!()
        };
        let NodeKind::MultipleCondition { conditions } = story.kind(*condition) else {
            panic!("expected multiple conditions");
        };
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_named_choice() {
        let (story, diagnostics) = parse_str("* (greet) Hello\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = choices(&story)[0];
        let NodeKind::Choice { name: Some(name), .. } = story.kind(id) else {
            unreachable!()
        };
        assert_eq!(story.identifier(*name), Some("greet"));
    }

    #[test]
    fn test_invisible_default() {
        let (story, diagnostics) = parse_str("* -> END\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(choice_fields(&story, choices(&story)[0]), (1, true, true));

        let (story, diagnostics) = parse_str("* ->\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert!(nodes_named(&story, "Divert").is_empty());
    }

    #[test]
    fn test_empty_choice_warns() {
        let (story, diagnostics) = parse_str("*\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Choice is completely empty"));
        assert!(choice_fields(&story, choices(&story)[0]).2);
    }

    #[test]
    fn test_blank_choice_warns() {
        let (_, diagnostics) = parse_str("* [] -> knot\n== knot ==\nK\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Blank choice - if you intended a default fallback choice, use the `* ->` syntax"]
        );
    }

    #[test]
    fn test_empty_brackets_without_divert_is_fallback() {
        let (story, diagnostics) = parse_str("* []\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Choice is completely empty"));
        assert!(choice_fields(&story, choices(&story)[0]).2);
    }

    #[test]
    fn test_increment_in_condition() {
        let (_, diagnostics) = parse_str("* {x++} Go\n");
        assert!(messages(&diagnostics)[0].starts_with("Can't use increment/decrement here"));
    }

    #[test]
    fn test_named_gather_with_content() {
        let (story, diagnostics) = parse_str("* A\n- - (join) Together\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "Gather")[0];
        let NodeKind::Gather {
            name: Some(name),
            indentation_depth,
            ..
        } = story.kind(id)
        else {
            unreachable!()
        };
        assert_eq!(*indentation_depth, 2);
        assert_eq!(story.identifier(*name), Some("join"));
        assert!(texts(&story).contains(&"Together".to_string()));
    }
}
