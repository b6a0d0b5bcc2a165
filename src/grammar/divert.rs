//! Diverts, tunnels and threads.

use super::whitespace::spaced;
use super::InkParser;
use crate::ast::{NodeId, NodeKind};
use crate::engine::{exclude, one, Rules, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrow {
    /// `->`
    Divert,
    /// `->->`
    TunnelOnwards,
}

#[derive(Debug, Clone, Copy)]
enum DivertPiece {
    Arrow(Arrow),
    Target(NodeId),
}

impl InkParser<'_, '_> {
    /// A thread start, or a chain such as `-> a -> b ->->`.
    ///
    /// Every target followed by another arrow is a tunnel. A lone `->` is the
    /// empty divert that marks an invisible default choice.
    pub(crate) fn multi_divert(&mut self) -> Option<Vec<NodeId>> {
        self.whitespace();

        if let Some(thread) = self.parse(Self::start_thread) {
            return Some(vec![thread]);
        }

        let pieces = self.interleave(
            |p: &mut Self| p.divert_arrow_or_tunnel_onwards().map(|a| Step::One(DivertPiece::Arrow(a))),
            |p: &mut Self| {
                p.parse(Self::divert_identifier_with_arguments)
                    .map(|d| Step::One(DivertPiece::Target(d)))
            },
        )?;

        let mut diverts = Vec::new();
        self.end_tag_if_necessary(Some(&mut diverts));
        let tag_markers = diverts.len();

        let count = pieces.len();
        for (index, piece) in pieces.iter().enumerate() {
            match *piece {
                DivertPiece::Arrow(Arrow::TunnelOnwards) => {
                    let valid = index == 0 || index + 1 == count || index + 2 == count;
                    if !valid {
                        self.error("Tunnel onwards '->->' must only come at the beginning or the end of a divert");
                    }
                    let divert_after = match pieces.get(index + 1) {
                        Some(DivertPiece::Target(target)) => Some(*target),
                        _ => None,
                    };
                    let onwards = self.alloc(NodeKind::TunnelOnwards { divert_after });
                    diverts.push(onwards);
                    // Nothing may follow a tunnel onwards.
                    break;
                }
                DivertPiece::Arrow(Arrow::Divert) => {}
                DivertPiece::Target(target) => {
                    if index + 1 < count {
                        if let NodeKind::Divert { is_tunnel, .. } = self.kind_mut(target) {
                            *is_tunnel = true;
                        }
                    }
                    diverts.push(target);
                }
            }
        }

        if diverts.len() == tag_markers && count == 1 {
            let empty = self.alloc(NodeKind::Divert {
                target: None,
                arguments: Vec::new(),
                is_tunnel: false,
                is_thread: false,
                is_empty: true,
            });
            diverts.push(empty);
            if !self.parsing_choice {
                self.error("Empty diverts (->) are only valid on choices");
            }
        }

        Some(diverts)
    }

    /// `<- target`
    fn start_thread(&mut self) -> Option<NodeId> {
        self.whitespace();
        self.parse_string("<-")?;
        self.whitespace();

        let divert = self.expect_or(
            Self::divert_identifier_with_arguments,
            "target for new thread",
            |p| {
                Some(p.alloc(NodeKind::Divert {
                    target: None,
                    arguments: Vec::new(),
                    is_tunnel: false,
                    is_thread: false,
                    is_empty: false,
                }))
            },
        )?;
        if let NodeKind::Divert { is_thread, .. } = self.kind_mut(divert) {
            *is_thread = true;
        }
        Some(divert)
    }

    /// `knot.stitch(args)` after an arrow.
    fn divert_identifier_with_arguments(&mut self) -> Option<NodeId> {
        self.whitespace();
        let components = self.parse(Self::dot_separated_divert_path_components)?;
        self.whitespace();
        let arguments = self
            .parse(Self::expression_function_call_arguments)
            .unwrap_or_default();
        self.whitespace();

        let path = self.arena.alloc_spanning(NodeKind::Path { components });
        Some(self.alloc(NodeKind::Divert {
            target: Some(path),
            arguments,
            is_tunnel: false,
            is_thread: false,
            is_empty: false,
        }))
    }

    fn dot_separated_divert_path_components(&mut self) -> Option<Vec<NodeId>> {
        self.interleave(
            one(spaced(Self::identifier_node)),
            exclude(|p: &mut Self| p.parse_string(".")),
        )
    }

    fn divert_arrow_or_tunnel_onwards(&mut self) -> Option<Arrow> {
        let mut arrows = 0;
        while self.parse_string("->").is_some() {
            arrows += 1;
        }
        match arrows {
            0 => None,
            1 => Some(Arrow::Divert),
            2 => Some(Arrow::TunnelOnwards),
            _ => {
                self.error("Unexpected number of arrows in divert. Should only have '->' or '->->'");
                Some(Arrow::TunnelOnwards)
            }
        }
    }

    /// Exactly one plain divert, for use as a value. Tunnels and chains
    /// are refused without complaint.
    pub(crate) fn single_divert(&mut self) -> Option<NodeId> {
        let diverts = self.parse(Self::multi_divert)?;
        let [divert] = diverts.as_slice() else {
            return None;
        };
        match self.kind(*divert) {
            NodeKind::Divert {
                is_tunnel: false, ..
            } => Some(*divert),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::ast::NodeKind;

    fn divert_flags(story: &crate::ast::Story) -> Vec<(Option<String>, bool, bool, bool)> {
        nodes_named(story, "Divert")
            .into_iter()
            .map(|id| match story.kind(id) {
                NodeKind::Divert {
                    target,
                    is_tunnel,
                    is_thread,
                    is_empty,
                    ..
                } => (
                    target.and_then(|t| story.dotted_name(t)),
                    *is_tunnel,
                    *is_thread,
                    *is_empty,
                ),
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_plain_divert() {
        let (story, diagnostics) = parse_str("-> knot.stitch\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            divert_flags(&story),
            vec![(Some("knot.stitch".to_string()), false, false, false)]
        );
    }

    #[test]
    fn test_divert_path_allows_spaces() {
        let (story, diagnostics) = parse_str("-> knot . stitch\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            divert_flags(&story),
            vec![(Some("knot.stitch".to_string()), false, false, false)]
        );
    }

    #[test]
    fn test_tunnel_chain() {
        let (story, diagnostics) = parse_str("-> a -> b ->\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let flags = divert_flags(&story);
        assert_eq!(flags.len(), 2);
        assert!(flags.iter().all(|(_, tunnel, _, _)| *tunnel));
    }

    #[test]
    fn test_tunnel_onwards_with_override() {
        let (story, diagnostics) = parse_str("->-> elsewhere\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let onwards = nodes_named(&story, "TunnelOnwards");
        assert_eq!(onwards.len(), 1);
        let NodeKind::TunnelOnwards { divert_after } = story.kind(onwards[0]) else {
            unreachable!()
        };
        assert!(divert_after.is_some());
    }

    #[test]
    fn test_thread() {
        let (story, diagnostics) = parse_str("<- background\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            divert_flags(&story),
            vec![(Some("background".to_string()), false, true, false)]
        );
    }

    #[test]
    fn test_divert_arguments() {
        let (story, diagnostics) = parse_str("-> meet(\"Bob\", 3)\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let id = nodes_named(&story, "Divert")[0];
        let NodeKind::Divert { arguments, .. } = story.kind(id) else {
            unreachable!()
        };
        assert_eq!(arguments.len(), 2);
    }

    #[test]
    fn test_empty_divert_outside_choice() {
        let (_, diagnostics) = parse_str("->\n");
        assert_eq!(
            messages(&diagnostics),
            vec!["Empty diverts (->) are only valid on choices"]
        );
    }

    #[test]
    fn test_too_many_arrows() {
        let (_, diagnostics) = parse_str("->->-> x\n");
        assert!(messages(&diagnostics)[0].starts_with("Unexpected number of arrows"));
    }
}
