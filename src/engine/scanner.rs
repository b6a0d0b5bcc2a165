//! Raw character scanning over the live cursor.
//!
//! These primitives never push a rule scope. A primitive that fails restores
//! the cursor itself, so callers can use them freely inside or outside rules.

use super::state::{Checkpoint, ParserState};
use crate::chars::CharacterSet;

/// Source text plus the checkpoint stack that tracks where we are in it.
#[derive(Debug, Clone)]
pub struct StringParser {
    chars: Vec<char>,
    pub(crate) state: ParserState,
    pub(crate) had_error: bool,
}

impl StringParser {
    pub fn new(text: &str, max_stack_depth: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            state: ParserState::new(max_stack_depth),
            had_error: false,
        }
    }

    // ========================================================================
    // CURSOR
    // ========================================================================

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Character offset of the cursor.
    pub fn index(&self) -> usize {
        self.state.current().offset
    }

    /// Zero-based line of the cursor.
    pub fn line_index(&self) -> usize {
        self.state.current().line
    }

    /// Zero-based column of the cursor.
    pub fn column(&self) -> usize {
        self.state.current().column
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn remaining_length(&self) -> usize {
        self.chars.len().saturating_sub(self.index())
    }

    pub fn end_of_input(&self) -> bool {
        self.index() >= self.chars.len()
    }

    pub fn current_char(&self) -> Option<char> {
        self.chars.get(self.index()).copied()
    }

    pub fn remaining_string(&self) -> String {
        self.chars[self.index().min(self.chars.len())..].iter().collect()
    }

    /// Text from the cursor up to, not including, the next line break.
    pub fn line_remainder(&self) -> String {
        self.chars[self.index().min(self.chars.len())..]
            .iter()
            .take_while(|c| **c != '\n' && **c != '\r')
            .collect()
    }

    /// Text between two checkpoints.
    pub fn slice(&self, start: &Checkpoint, end: &Checkpoint) -> String {
        let end = end.offset.min(self.chars.len());
        let start = start.offset.min(end);
        self.chars[start..end].iter().collect()
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.state.current().flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32, on: bool) {
        let current = self.state.current_mut();
        if on {
            current.flags |= flag;
        } else {
            current.flags &= !flag;
        }
    }

    fn save(&self) -> Checkpoint {
        *self.state.current()
    }

    fn restore(&mut self, saved: Checkpoint) {
        let current = self.state.current_mut();
        current.offset = saved.offset;
        current.line = saved.line;
        current.column = saved.column;
    }

    /// Moves the cursor forward by `count` characters, tracking line breaks.
    pub fn advance(&mut self, count: usize) {
        let start = self.index();
        let end = (start + count).min(self.chars.len());
        let (mut line, mut column) = {
            let current = self.state.current();
            (current.line, current.column)
        };
        for c in &self.chars[start..end] {
            if *c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        let current = self.state.current_mut();
        current.offset = end;
        current.line = line;
        current.column = column;
    }

    // ========================================================================
    // PRIMITIVES
    // ========================================================================

    /// Consumes `expected` exactly, or nothing.
    pub fn parse_string(&mut self, expected: &str) -> Option<()> {
        let start = self.index();
        let mut len = 0;
        for c in expected.chars() {
            if self.chars.get(start + len) != Some(&c) {
                return None;
            }
            len += 1;
        }
        self.advance(len);
        Some(())
    }

    pub fn parse_single_char(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.advance(1);
        Some(c)
    }

    /// Consumes the longest run of characters satisfying `accept`.
    fn parse_while(&mut self, accept: impl Fn(char) -> bool, max: Option<usize>) -> Option<String> {
        let start = self.index();
        let limit = max.unwrap_or(usize::MAX);
        let count = self.chars[start.min(self.chars.len())..]
            .iter()
            .take(limit)
            .take_while(|c| accept(**c))
            .count();
        if count == 0 {
            return None;
        }
        let text: String = self.chars[start..start + count].iter().collect();
        self.advance(count);
        Some(text)
    }

    pub fn parse_chars_from_set(&mut self, set: &CharacterSet) -> Option<String> {
        self.parse_while(|c| set.contains(c), None)
    }

    pub fn parse_chars_from_set_max(&mut self, set: &CharacterSet, max: usize) -> Option<String> {
        self.parse_while(|c| set.contains(c), Some(max))
    }

    pub fn parse_chars_from_str(&mut self, chars: &str) -> Option<String> {
        self.parse_while(|c| chars.contains(c), None)
    }

    pub fn parse_until_chars_from_set(&mut self, set: &CharacterSet) -> Option<String> {
        self.parse_while(|c| !set.contains(c), None)
    }

    pub fn parse_until_chars_from_str(&mut self, chars: &str) -> Option<String> {
        self.parse_while(|c| !chars.contains(c), None)
    }

    /// Consumes an optional `\r` then a mandatory `\n`.
    pub fn parse_newline(&mut self) -> Option<()> {
        let saved = self.save();
        let _ = self.parse_string("\r");
        if self.parse_string("\n").is_none() {
            self.restore(saved);
            return None;
        }
        Some(())
    }

    /// Scans `-? [ \t]* digits`, returning the sign and the digit run.
    pub(crate) fn scan_int(&mut self) -> Option<(bool, String)> {
        let saved = self.save();
        let negative = self.parse_string("-").is_some();
        let _ = self.parse_chars_from_str(" \t");
        match self.parse_while(|c| c.is_ascii_digit(), None) {
            Some(digits) => Some((negative, digits)),
            None => {
                self.restore(saved);
                None
            }
        }
    }

    /// Parses `int.digits`. A trailing `.` with no digits reads as `.0`.
    pub fn parse_float(&mut self) -> Option<f32> {
        let saved = self.save();
        let Some((negative, whole)) = self.scan_int() else {
            return None;
        };
        if self.parse_string(".").is_none() {
            self.restore(saved);
            return None;
        }
        let fraction = self
            .parse_while(|c| c.is_ascii_digit(), None)
            .unwrap_or_else(|| "0".to_string());
        let text = format!("{}{whole}.{fraction}", if negative { "-" } else { "" });
        match text.parse::<f32>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.restore(saved);
                None
            }
        }
    }
}
