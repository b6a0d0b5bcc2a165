//! Comment elimination.
//!
//! Runs before the grammar sees the text. `// line comments` are dropped up to
//! the line break; `/* block comments */` are replaced by as many newlines as
//! they spanned, so every line keeps its original number. `\r\n` pairs outside
//! comments collapse to `\n`.

use once_cell::sync::Lazy;

use crate::chars::CharacterSet;
use crate::diagnostics::Severity;
use crate::engine::{optional, Rules, StringParser};

static COMMENT_OR_NEWLINE_START: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("/\r\n"));
static COMMENT_BLOCK_END: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("*"));
static NEWLINES: Lazy<CharacterSet> = Lazy::new(|| CharacterSet::from_chars("\n\r"));

/// Strips comments from `source`, preserving line structure.
pub fn eliminate_comments(source: &str) -> String {
    CommentEliminator::new(source).process()
}

struct CommentEliminator {
    parser: StringParser,
}

impl CommentEliminator {
    fn new(source: &str) -> Self {
        // The rules here nest only a few scopes deep.
        Self {
            parser: StringParser::new(source, 64),
        }
    }

    fn process(mut self) -> String {
        let pieces = self
            .interleave(
                optional(Self::comments_and_newlines),
                optional(Self::main_ink),
            )
            .unwrap_or_default();
        let mut output = pieces.concat();
        if !self.parser.end_of_input() {
            output.push_str(&self.parser.remaining_string());
        }
        output
    }

    fn main_ink(&mut self) -> Option<String> {
        self.parse_until(Self::comments_and_newlines, Some(&COMMENT_OR_NEWLINE_START), None)
    }

    fn comments_and_newlines(&mut self) -> Option<String> {
        let pieces = self.interleave(
            optional(|p: &mut Self| p.parse_newline().map(|_| "\n".to_string())),
            optional(Self::single_comment),
        )?;
        Some(pieces.concat())
    }

    fn single_comment(&mut self) -> Option<String> {
        let rules: [fn(&mut Self) -> Option<String>; 2] = [Self::end_of_line_comment, Self::block_comment];
        self.one_of(&rules)
    }

    fn end_of_line_comment(&mut self) -> Option<String> {
        self.parse_string("//")?;
        let _ = self.parse_until_chars_from_set(&NEWLINES);
        Some(String::new())
    }

    fn block_comment(&mut self) -> Option<String> {
        self.parse_string("/*")?;
        let start_line = self.parser.line_index();
        let body = self.parse_until(
            |p: &mut Self| p.parse_string("*/"),
            Some(&COMMENT_BLOCK_END),
            None,
        );
        if !self.parser.end_of_input() {
            let _ = self.parse_string("*/");
        }
        match body {
            Some(_) => Some("\n".repeat(self.parser.line_index() - start_line)),
            None => Some(String::new()),
        }
    }
}

impl Rules for CommentEliminator {
    fn parser(&self) -> &StringParser {
        &self.parser
    }

    fn parser_mut(&mut self) -> &mut StringParser {
        &mut self.parser
    }

    fn report(&mut self, message: String, line: usize, _severity: Severity) {
        tracing::debug!(line, %message, "comment eliminator diagnostic");
    }
}
