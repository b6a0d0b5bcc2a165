//! The checkpoint stack underneath every rule.
//!
//! Each rule invocation pushes a copy of the live cursor. On failure the copy
//! is discarded, restoring the cursor; on success it is squashed into its
//! parent so the advance persists. The stack depth is bounded: running out of
//! room means the grammar recursed without consuming input.

use crate::errors::InternalFault;

/// Default upper bound on nested rule scopes.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 200;

/// Identifies the checkpoint pushed by one `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuleId(u32);

impl RuleId {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// A snapshot of the cursor.
///
/// `line` and `column` are zero-based; `column` counts characters since the
/// last newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub flags: u32,
    pub error_reported_in_scope: bool,
    /// Host-defined allocation watermark recorded at `begin`.
    pub mark: usize,
    rule_id: RuleId,
}

impl Checkpoint {
    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }
}

#[derive(Debug, Clone)]
pub struct ParserState {
    stack: Vec<Checkpoint>,
    max_depth: usize,
    next_rule_id: u32,
}

impl ParserState {
    pub fn new(max_depth: usize) -> Self {
        let mut stack = Vec::with_capacity(max_depth.min(DEFAULT_MAX_STACK_DEPTH));
        stack.push(Checkpoint::default());
        Self {
            stack,
            max_depth: max_depth.max(1),
            next_rule_id: 0,
        }
    }

    /// Number of live checkpoints, including the base one.
    pub fn height(&self) -> usize {
        self.stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn current(&self) -> &Checkpoint {
        // The base checkpoint is never popped.
        &self.stack[self.stack.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Checkpoint {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Pushes a copy of the current checkpoint and returns its id.
    pub fn push(&mut self, mark: usize) -> RuleId {
        if self.stack.len() >= self.max_depth {
            InternalFault::StackOverflow {
                depth: self.stack.len(),
            }
            .raise();
        }
        self.next_rule_id = self.next_rule_id.wrapping_add(1);
        let id = RuleId(self.next_rule_id);
        let mut checkpoint = *self.current();
        checkpoint.rule_id = id;
        checkpoint.error_reported_in_scope = false;
        checkpoint.mark = mark;
        self.stack.push(checkpoint);
        id
    }

    /// Removes the top checkpoint, which must belong to `expected`.
    pub fn pop(&mut self, expected: RuleId) -> Checkpoint {
        if self.stack.len() <= 1 {
            InternalFault::StackUnderflow.raise();
        }
        let top = self.current().rule_id;
        if top != expected {
            InternalFault::MismatchedRule {
                expected: expected.0,
                found: top.0,
            }
            .raise();
        }
        self.stack.pop().unwrap_or_default()
    }

    /// Returns the top checkpoint after checking it belongs to `expected`.
    pub fn peek(&self, expected: RuleId) -> &Checkpoint {
        let top = self.current();
        if top.rule_id != expected {
            InternalFault::MismatchedRule {
                expected: expected.0,
                found: top.rule_id.0,
            }
            .raise();
        }
        top
    }

    /// The checkpoint below the top: the cursor as it was at the last `begin`.
    pub fn peek_penultimate(&self) -> Option<&Checkpoint> {
        self.stack.len().checked_sub(2).map(|i| &self.stack[i])
    }

    /// Folds the top checkpoint into its parent, keeping the advance.
    pub fn squash(&mut self) {
        if self.stack.len() < 2 {
            InternalFault::StackUnderflow.raise();
        }
        let top = self.stack.pop().unwrap_or_default();
        let parent = self.current_mut();
        parent.offset = top.offset;
        parent.line = top.line;
        parent.column = top.column;
        parent.flags = top.flags;
        parent.error_reported_in_scope = top.error_reported_in_scope;
    }

    /// Marks every live scope as having reported a diagnostic.
    pub fn note_error_reported(&mut self) {
        for checkpoint in &mut self.stack {
            checkpoint.error_reported_in_scope = true;
        }
    }

    pub fn error_reported_in_scope(&self) -> bool {
        self.current().error_reported_in_scope
    }
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STACK_DEPTH)
    }
}
