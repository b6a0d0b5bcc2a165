//! Weave construction.
//!
//! Choices and gathers carry the number of bullets or dashes they were
//! written with. Content whose weave point is deeper than the current level is
//! folded into a nested `Weave`, recursively, and each gather is told which
//! choices at its own level lead into it.

use super::{Arena, NodeId, NodeKind, NodeLookup};

/// Wraps `content` in a weave whose base indentation index is `base_indentation`
/// (0 for the body of a story, knot or stitch).
pub(crate) fn build_weave(arena: &mut Arena, content: Vec<NodeId>, base_indentation: usize) -> NodeId {
    let mut nested = Vec::with_capacity(content.len());
    let mut index = 0;
    while index < content.len() {
        let id = content[index];
        let Some(depth) = arena.kind(id).weave_point_depth().filter(|d| d.saturating_sub(1) > base_indentation) else {
            nested.push(id);
            index += 1;
            continue;
        };

        let start = index;
        index += 1;
        while index < content.len() {
            let ends_here = arena
                .kind(content[index])
                .weave_point_depth()
                .is_some_and(|d| d.saturating_sub(1) <= base_indentation);
            if ends_here {
                break;
            }
            index += 1;
        }
        let inner = build_weave(arena, content[start..index].to_vec(), depth - 1);
        nested.push(inner);
    }

    let mut loose_choices = Vec::new();
    for id in &nested {
        match arena.kind_mut(*id) {
            NodeKind::Choice { .. } => loose_choices.push(*id),
            NodeKind::Gather { rejoins, .. } => *rejoins = std::mem::take(&mut loose_choices),
            _ => {}
        }
    }

    arena.alloc(NodeKind::Weave {
        content: nested,
        base_indentation,
    })
}

/// Splits flow content into the weave and the nested knots or stitches, and
/// returns the final content list: the weave first, then the sub-flows.
pub(crate) fn weave_and_sub_flows(arena: &mut Arena, content: Vec<NodeId>) -> Vec<NodeId> {
    let (sub_flows, weave_content): (Vec<NodeId>, Vec<NodeId>) =
        content.into_iter().partition(|id| arena.kind(*id).is_flow());
    let weave = build_weave(arena, weave_content, 0);
    let mut out = Vec::with_capacity(sub_flows.len() + 1);
    out.push(weave);
    out.extend(sub_flows);
    out
}
