//! The backtracking rule engine.
//!
//! A grammar is any type implementing [`Rules`]: it hands the engine its
//! [`StringParser`] and receives a callback whenever a rule commits. Every
//! combinator here is built from the same four operations on the checkpoint
//! stack (`begin`, `fail`, `cancel`, `succeed`), so a rule that fails leaves
//! no trace behind: the cursor, the flags and any host allocations made inside
//! it are all rolled back.
//!
//! Rules are plain functions or closures of type `Fn(&mut G) -> Option<T>`.
//! `None` means "no match" and is never an error by itself; user-facing errors
//! come from [`Rules::expect`] or from explicit calls to [`Rules::error`].

pub mod scanner;
pub mod state;

use std::any::Any;

use crate::chars::CharacterSet;
use crate::diagnostics::Severity;
use crate::errors::InternalFault;

pub use scanner::StringParser;
pub use state::{Checkpoint, ParserState, RuleId};

// ============================================================================
// INTERLEAVE STEPS
// ============================================================================

/// What one side of an interleave produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// A single value to keep.
    One(T),
    /// Several values to splice into the output in order.
    Many(Vec<T>),
    /// Matched, but contributes nothing.
    Neutral,
}

impl<T> Step<T> {
    pub fn is_neutral(&self) -> bool {
        matches!(self, Step::Neutral)
    }

    pub fn append_to(self, out: &mut Vec<T>) {
        match self {
            Step::One(value) => out.push(value),
            Step::Many(values) => out.extend(values),
            Step::Neutral => {}
        }
    }
}

/// Never fails: yields the rule's value, or `Neutral` if it did not match.
pub fn optional<G, T, R>(rule: R) -> impl Fn(&mut G) -> Option<Step<T>>
where
    G: Rules,
    T: Any,
    R: Fn(&mut G) -> Option<T>,
{
    move |g: &mut G| Some(g.parse(&rule).map_or(Step::Neutral, Step::One))
}

/// Like [`optional`] for list-valued rules; the list is spliced in.
pub fn optional_many<G, T, R>(rule: R) -> impl Fn(&mut G) -> Option<Step<T>>
where
    G: Rules,
    T: Any,
    R: Fn(&mut G) -> Option<Vec<T>>,
{
    move |g: &mut G| Some(g.parse(&rule).map_or(Step::Neutral, Step::Many))
}

/// Requires the rule to match but drops its value.
pub fn exclude<G, T, U, R>(rule: R) -> impl Fn(&mut G) -> Option<Step<T>>
where
    G: Rules,
    U: Any,
    R: Fn(&mut G) -> Option<U>,
{
    move |g: &mut G| g.parse(&rule).map(|_| Step::Neutral)
}

/// Runs the rule if it matches and always yields `Neutral`.
pub fn optional_exclude<G, T, U, R>(rule: R) -> impl Fn(&mut G) -> Option<Step<T>>
where
    G: Rules,
    U: Any,
    R: Fn(&mut G) -> Option<U>,
{
    move |g: &mut G| {
        let _ = g.parse(&rule);
        Some(Step::Neutral)
    }
}

/// Requires the rule to match and keeps its value.
pub fn one<G, T, R>(rule: R) -> impl Fn(&mut G) -> Option<Step<T>>
where
    G: Rules,
    T: Any,
    R: Fn(&mut G) -> Option<T>,
{
    move |g: &mut G| g.parse(&rule).map(Step::One)
}

/// Requires a list-valued rule to match and splices its values in.
pub fn many<G, T, R>(rule: R) -> impl Fn(&mut G) -> Option<Step<T>>
where
    G: Rules,
    T: Any,
    R: Fn(&mut G) -> Option<Vec<T>>,
{
    move |g: &mut G| g.parse(&rule).map(Step::Many)
}

// ============================================================================
// RULE HOST
// ============================================================================

/// A grammar driving a [`StringParser`].
///
/// Only the first three methods are required. The hooks let a host attach
/// source spans to committed results and roll back its own allocations when a
/// rule scope is abandoned.
pub trait Rules: Sized {
    fn parser(&self) -> &StringParser;

    fn parser_mut(&mut self) -> &mut StringParser;

    /// Delivers a diagnostic. Called at most once per rule scope.
    fn report(&mut self, message: String, line: usize, severity: Severity);

    /// Called with the checkpoints at `begin` and at commit of a successful rule.
    fn rule_did_succeed(&mut self, _result: &dyn Any, _start: &Checkpoint, _end: &Checkpoint) {}

    /// A watermark recorded with each checkpoint.
    fn allocation_mark(&self) -> usize {
        0
    }

    /// Discards whatever was allocated after `mark`.
    fn rewind_allocations(&mut self, _mark: usize) {}

    // ========================================================================
    // RULE PROTOCOL
    // ========================================================================

    fn begin_rule(&mut self) -> RuleId {
        let mark = self.allocation_mark();
        self.parser_mut().state.push(mark)
    }

    fn fail_rule<T>(&mut self, id: RuleId) -> Option<T> {
        self.cancel_rule(id);
        None
    }

    fn cancel_rule(&mut self, id: RuleId) {
        let checkpoint = self.parser_mut().state.pop(id);
        self.rewind_allocations(checkpoint.mark);
    }

    fn succeed_rule<T: Any>(&mut self, id: RuleId, result: T) -> Option<T> {
        let (start, end) = {
            let state = &self.parser().state;
            let end = *state.peek(id);
            let start = state.peek_penultimate().copied().unwrap_or_default();
            (start, end)
        };
        self.rule_did_succeed(&result, &start, &end);
        self.parser_mut().state.squash();
        Some(result)
    }

    // ========================================================================
    // COMBINATORS
    // ========================================================================

    /// Runs one rule atomically in its own scope.
    fn parse<T: Any>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let id = self.begin_rule();
        let height = self.parser().state.height();
        let result = rule(self);
        check_balanced(height, self.parser().state.height());
        match result {
            Some(value) => self.succeed_rule(id, value),
            None => self.fail_rule(id),
        }
    }

    /// Tests whether a rule would match here, consuming nothing.
    fn peek<T>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> bool {
        let id = self.begin_rule();
        let height = self.parser().state.height();
        let matched = rule(self).is_some();
        check_balanced(height, self.parser().state.height());
        self.cancel_rule(id);
        matched
    }

    /// First matching rule wins; failures are silent.
    fn one_of<T: Any, R: Fn(&mut Self) -> Option<T>>(&mut self, rules: &[R]) -> Option<T> {
        let id = self.begin_rule();
        for rule in rules {
            if let Some(result) = self.parse(rule) {
                return self.succeed_rule(id, result);
            }
        }
        self.fail_rule(id)
    }

    /// Repeats a rule until it stops matching. Needs at least one match.
    fn one_or_more<T: Any>(&mut self, rule: impl Fn(&mut Self) -> Option<T>) -> Option<Vec<T>> {
        let mut results = Vec::new();
        while let Some(result) = self.parse(&rule) {
            results.push(result);
        }
        if results.is_empty() {
            None
        } else {
            Some(results)
        }
    }

    /// `item (separator item)*`. A trailing separator is left unconsumed.
    fn separated_list<T: Any, S: Any>(
        &mut self,
        item: impl Fn(&mut Self) -> Option<T>,
        separator: impl Fn(&mut Self) -> Option<S>,
    ) -> Option<Vec<T>> {
        let first = self.parse(&item)?;
        let mut results = vec![first];
        loop {
            let id = self.begin_rule();
            if self.parse(&separator).is_none() {
                self.cancel_rule(id);
                break;
            }
            match self.parse(&item) {
                Some(next) => {
                    self.succeed_rule(id, ());
                    results.push(next);
                }
                None => {
                    self.cancel_rule(id);
                    break;
                }
            }
        }
        Some(results)
    }

    /// `A (B A)*`, collecting every non-neutral value in order.
    fn interleave<T: Any>(
        &mut self,
        a: impl Fn(&mut Self) -> Option<Step<T>>,
        b: impl Fn(&mut Self) -> Option<Step<T>>,
    ) -> Option<Vec<T>> {
        self.interleave_until(a, b, |_: &mut Self| None::<()>)
    }

    /// [`Rules::interleave`] that also stops, before each `B`, wherever `until`
    /// would match. The terminator itself is not consumed.
    fn interleave_until<T: Any, U>(
        &mut self,
        a: impl Fn(&mut Self) -> Option<Step<T>>,
        b: impl Fn(&mut Self) -> Option<Step<T>>,
        until: impl Fn(&mut Self) -> Option<U>,
    ) -> Option<Vec<T>> {
        let id = self.begin_rule();
        let mut results = Vec::new();

        let Some(first) = self.parse(&a) else {
            return self.fail_rule(id);
        };
        first.append_to(&mut results);

        loop {
            if self.peek(&until) {
                break;
            }
            let Some(main) = self.parse(&b) else {
                break;
            };
            let main_neutral = main.is_neutral();
            main.append_to(&mut results);

            let Some(outer) = self.parse(&a) else {
                break;
            };
            let outer_neutral = outer.is_neutral();
            outer.append_to(&mut results);

            if (main_neutral && outer_neutral) || self.parser().remaining_length() == 0 {
                break;
            }
        }

        if results.is_empty() {
            return self.fail_rule(id);
        }
        self.succeed_rule(id, results)
    }

    /// Scans raw text until `stop` would match, input ends, or a character
    /// in `end` (or outside both sets) is reached. Characters in `pause` are
    /// consumed one at a time so `stop` gets a chance to match at them.
    fn parse_until<S>(
        &mut self,
        stop: impl Fn(&mut Self) -> Option<S>,
        pause: Option<&CharacterSet>,
        end: Option<&CharacterSet>,
    ) -> Option<String> {
        let id = self.begin_rule();

        let mut pause_and_end = CharacterSet::new();
        if let Some(pause) = pause {
            pause_and_end.union_with(pause);
        }
        if let Some(end) = end {
            pause_and_end.union_with(end);
        }

        let mut parsed = String::new();
        loop {
            if let Some(partial) = self.parser_mut().parse_until_chars_from_set(&pause_and_end) {
                parsed.push_str(&partial);
            }
            if self.peek(&stop) {
                break;
            }
            let Some(c) = self.parser().current_char() else {
                break;
            };
            if pause.is_some_and(|p| p.contains(c)) {
                parsed.push(c);
                self.parser_mut().advance(1);
                continue;
            }
            break;
        }

        if parsed.is_empty() {
            return self.fail_rule(id);
        }
        self.succeed_rule(id, parsed)
    }

    /// Runs a rule and reports an error naming `message` if it fails.
    fn expect<T: Any>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>, message: &str) -> Option<T> {
        if let Some(result) = self.parse(rule) {
            return Some(result);
        }
        self.report_expected(message);
        None
    }

    /// [`Rules::expect`] followed by a recovery rule when the rule fails.
    fn expect_or<T: Any>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Option<T>,
        message: &str,
        recovery: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        if let Some(result) = self.parse(rule) {
            return Some(result);
        }
        self.report_expected(message);
        recovery(self)
    }

    fn report_expected(&mut self, message: &str) {
        let remainder = self.parser().line_remainder();
        let saw = if remainder.is_empty() {
            "end of line".to_string()
        } else {
            format!("'{remainder}'")
        };
        self.error(format!("Expected {message} but saw {saw}"));
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let line = self.parser().line_index() + 1;
        self.report_on_line(message.into(), line, Severity::Error);
    }

    fn warning(&mut self, message: impl Into<String>) {
        let line = self.parser().line_index() + 1;
        self.report_on_line(message.into(), line, Severity::Warning);
    }

    /// Reports unless this scope already reported something.
    fn report_on_line(&mut self, message: String, line: usize, severity: Severity) {
        if !self.parser().state.error_reported_in_scope() {
            self.report(message, line, severity);
            self.parser_mut().state.note_error_reported();
        }
        if severity == Severity::Error {
            self.parser_mut().had_error = true;
        }
    }

    // ========================================================================
    // SCANNING
    // ========================================================================

    fn parse_string(&mut self, expected: &str) -> Option<()> {
        self.parser_mut().parse_string(expected)
    }

    fn parse_single_char(&mut self) -> Option<char> {
        self.parser_mut().parse_single_char()
    }

    fn parse_chars_from_set(&mut self, set: &CharacterSet) -> Option<String> {
        self.parser_mut().parse_chars_from_set(set)
    }

    fn parse_until_chars_from_set(&mut self, set: &CharacterSet) -> Option<String> {
        self.parser_mut().parse_until_chars_from_set(set)
    }

    fn parse_newline(&mut self) -> Option<()> {
        self.parser_mut().parse_newline()
    }

    fn parse_float(&mut self) -> Option<f32> {
        self.parser_mut().parse_float()
    }

    /// Parses a signed integer, reporting values that do not fit in `i32`.
    fn parse_int(&mut self) -> Option<i32> {
        let (negative, digits) = self.parser_mut().scan_int()?;
        match digits.parse::<i32>() {
            Ok(value) if negative => Some(-value),
            Ok(value) => Some(value),
            Err(_) => {
                self.error(format!(
                    "Failed to read integer value: {digits}. Perhaps it's out of the range of acceptable numbers ink supports? ({} to {})",
                    i32::MIN,
                    i32::MAX
                ));
                None
            }
        }
    }

    fn end_of_input(&self) -> bool {
        self.parser().end_of_input()
    }
}

fn check_balanced(before: usize, after: usize) {
    if before != after {
        InternalFault::UnbalancedRule { before, after }.raise();
    }
}
