//! Conditionals: `{x: a|b}`, `{x:\n - 1: ...}` and `{\n - x > 1: ...}`.

use super::{InkParser, StatementLevel};
use crate::ast::{NodeId, NodeKind};
use crate::engine::Rules;

/// The classification flags of one branch.
#[derive(Debug, Clone, Copy, Default)]
struct BranchRole {
    has_condition: bool,
    is_true_branch: bool,
    is_else: bool,
    matching_equality: bool,
}

impl InkParser<'_, '_> {
    /// A conditional whose braces hold no leading `expr:`, or whose
    /// condition was not already consumed by the caller.
    pub(crate) fn inner_conditional_content(&mut self) -> Option<NodeId> {
        let initial_condition = self.parse(Self::condition_expression);
        let branches = self.parse(|p| p.conditional_branches(initial_condition))?;
        Some(self.alloc(NodeKind::Conditional {
            initial_condition,
            branches,
        }))
    }

    /// The branches after an optional initial condition. Inline branches
    /// need the condition; multiline ones start on the next line.
    pub(crate) fn conditional_branches(&mut self, initial: Option<NodeId>) -> Option<Vec<NodeId>> {
        let is_inline = self.parse(Self::newline).is_none();
        if is_inline && initial.is_none() {
            return None;
        }

        let branches = if is_inline {
            self.inline_conditional_branches()?
        } else {
            let branches = self.multiline_branches_or_sole_content(initial)?;
            self.classify_branches(initial, &branches);
            branches
        };

        for branch in &branches {
            if let NodeKind::ConditionalBranch { is_inline: inline, .. } = self.kind_mut(*branch) {
                *inline = is_inline;
            }
        }
        Some(branches)
    }

    /// `true content | else content`. Either side may be empty.
    fn inline_conditional_branches(&mut self) -> Option<Vec<NodeId>> {
        let alternatives = self.pipe_separated_content()?;

        if alternatives.len() > 2 {
            self.error("Expected one or two alternatives separated by '|' in inline conditional");
            return Some(Vec::new());
        }

        let mut alternatives = alternatives.into_iter();
        let mut branches = Vec::with_capacity(2);
        if let Some(content) = alternatives.next() {
            let branch = self.branch(None, content, false);
            self.set_role(
                branch,
                BranchRole {
                    is_true_branch: true,
                    ..BranchRole::default()
                },
            );
            branches.push(branch);
        }
        if let Some(content) = alternatives.next() {
            branches.push(self.branch(None, content, true));
        }
        Some(branches)
    }

    fn multiline_branches_or_sole_content(&mut self, initial: Option<NodeId>) -> Option<Vec<NodeId>> {
        if let Some(mut branches) = self.parse(Self::multiline_conditional_branches) {
            // `{x: - else: ...}` still needs a (blank) true branch.
            let only_else = branches.len() == 1 && self.role(branches[0]).is_else;
            if only_else && initial.is_some() {
                let empty = self.branch(None, Vec::new(), false);
                self.set_role(
                    empty,
                    BranchRole {
                        is_true_branch: true,
                        ..BranchRole::default()
                    },
                );
                branches.insert(0, empty);
            }
            return Some(branches);
        }

        // `{x:\n content\n - else: other }` without a dash on the first branch.
        if initial.is_none() {
            return None;
        }
        let content = self.statements_at_level(StatementLevel::InnerBlock)?;
        let mut branches = vec![self.branch(None, content, false)];
        if let Some(else_branch) = self.parse(Self::single_multiline_condition) {
            let mut role = self.role(else_branch);
            if !role.is_else {
                self.error_at(
                    else_branch,
                    "Expected an '- else:' clause here rather than an extra condition",
                );
                role.is_else = true;
                self.set_role(else_branch, role);
            }
            branches.push(else_branch);
        }
        Some(branches)
    }

    /// Works out which branch is the true branch, the else branch, or a
    /// value to compare against the initial condition.
    fn classify_branches(&mut self, initial: Option<NodeId>, branches: &[NodeId]) {
        let count = branches.len();

        if initial.is_some() {
            let mut earlier_have_conditions = false;
            for (index, branch) in branches.iter().enumerate() {
                let mut role = self.role(*branch);
                let is_last = index + 1 == count;

                if role.has_condition {
                    role.matching_equality = true;
                    earlier_have_conditions = true;
                } else if earlier_have_conditions && is_last {
                    role.matching_equality = true;
                    role.is_else = true;
                } else if !is_last && count > 2 {
                    self.error_at(*branch, "Only final branch can be an 'else'. Did you miss a ':'?");
                } else if index == 0 {
                    role.is_true_branch = true;
                } else {
                    role.is_else = true;
                }
                self.set_role(*branch, role);
            }
            return;
        }

        for (index, branch) in branches.iter().enumerate() {
            let mut role = self.role(*branch);
            if role.has_condition {
                continue;
            }
            if index + 1 == count {
                role.is_else = true;
                self.set_role(*branch, role);
            } else if role.is_else {
                let last = branches[count - 1];
                if self.role(last).is_else {
                    self.error_at(last, "Multiple 'else' cases. Can have a maximum of one, at the end.");
                } else {
                    self.error_at(*branch, "'else' case in conditional should always be the final one");
                }
            } else {
                self.error_at(*branch, "Branch doesn't have condition. Are you missing a ':'? ");
            }
        }
    }

    fn multiline_conditional_branches(&mut self) -> Option<Vec<NodeId>> {
        let _ = self.multiline_whitespace();
        let branches = self.one_or_more(Self::single_multiline_condition)?;
        let _ = self.multiline_whitespace();
        Some(branches)
    }

    /// `- cond: content`, `- else: content` or `- content`.
    fn single_multiline_condition(&mut self) -> Option<NodeId> {
        self.whitespace();
        if self.parse_string("->").is_some() {
            return None;
        }
        self.parse_string("-")?;
        self.whitespace();

        let is_else = self.parse(Self::else_expression).is_some();
        let condition = if is_else {
            None
        } else {
            self.parse(Self::condition_expression)
        };

        let content = match self.statements_at_level(StatementLevel::InnerBlock) {
            Some(content) => content,
            None if condition.is_none() => {
                self.error("expected content for the conditional branch following '-'");
                vec![self.text("")]
            }
            None => Vec::new(),
        };

        // Blank branches leave their line breaks behind.
        let _ = self.multiline_whitespace();

        Some(self.branch(condition, content, is_else))
    }

    /// `expr:`
    pub(crate) fn condition_expression(&mut self) -> Option<NodeId> {
        let condition = self.parse(Self::expression)?;
        self.disallow_increment(condition);
        self.whitespace();
        self.parse_string(":")?;
        Some(condition)
    }

    fn else_expression(&mut self) -> Option<()> {
        self.parse_string("else")?;
        self.whitespace();
        self.parse_string(":")
    }

    // ========================================================================
    // BRANCH NODES
    // ========================================================================

    fn branch(&mut self, own_condition: Option<NodeId>, content: Vec<NodeId>, is_else: bool) -> NodeId {
        self.alloc(NodeKind::ConditionalBranch {
            own_condition,
            content,
            is_true_branch: false,
            is_else,
            matching_equality: false,
            is_inline: false,
        })
    }

    fn role(&self, branch: NodeId) -> BranchRole {
        match self.kind(branch) {
            NodeKind::ConditionalBranch {
                own_condition,
                is_true_branch,
                is_else,
                matching_equality,
                ..
            } => BranchRole {
                has_condition: own_condition.is_some(),
                is_true_branch: *is_true_branch,
                is_else: *is_else,
                matching_equality: *matching_equality,
            },
            _ => BranchRole::default(),
        }
    }

    fn set_role(&mut self, branch: NodeId, role: BranchRole) {
        if let NodeKind::ConditionalBranch {
            is_true_branch,
            is_else,
            matching_equality,
            ..
        } = self.kind_mut(branch)
        {
            *is_true_branch = role.is_true_branch;
            *is_else = role.is_else;
            *matching_equality = role.matching_equality;
        }
    }
}
