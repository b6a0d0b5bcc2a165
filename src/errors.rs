//! Skein error handling
//!
//! Two classes of failure live here. `SkeinError` covers everything a caller
//! is expected to handle: unreadable files, bad configuration, and user
//! errors that had nowhere to go because no diagnostic sink was installed.
//! `InternalFault` covers broken grammar plumbing (an unbalanced rule scope or
//! a runaway recursion) and is raised as a panic, never returned.

use std::path::PathBuf;
use std::sync::Arc;

use miette::{NamedSource, SourceSpan};
use thiserror::Error;

use crate::diagnostics::Diagnostic;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// A named piece of source text that diagnostics can point into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// Byte span of a one-based line, without its line terminator.
    ///
    /// Lines past the end of the content map to an empty span at the end.
    pub fn line_span(&self, line: usize) -> SourceSpan {
        let mut start = 0;
        for (index, text) in self.content.split_inclusive('\n').enumerate() {
            if index + 1 == line {
                let trimmed = text.trim_end_matches(['\n', '\r']);
                return SourceSpan::new(start.into(), trimmed.len());
            }
            start += text.len();
        }
        SourceSpan::new(self.content.len().into(), 0)
    }
}

// ============================================================================
// LIBRARY ERRORS
// ============================================================================

#[derive(Debug, Error, miette::Diagnostic)]
pub enum SkeinError {
    #[error("failed to read '{}'", path.display())]
    #[diagnostic(
        code(skein::io),
        help("check that the file exists and is readable")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in '{}': {message}", path.display())]
    #[diagnostic(code(skein::config))]
    Config { path: PathBuf, message: String },

    #[error("{diagnostic}")]
    #[diagnostic(
        code(skein::unhandled),
        help("install a diagnostic sink to collect errors and keep parsing")
    )]
    Unhandled { diagnostic: Diagnostic },

    #[error("failed to serialize the syntax tree")]
    #[diagnostic(code(skein::json))]
    Json(#[from] serde_json::Error),
}

impl SkeinError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SkeinError::Io {
            path: path.into(),
            source,
        }
    }
}

// ============================================================================
// INTERNAL FAULTS
// ============================================================================

/// Violations of the checkpoint protocol. These indicate a grammar bug.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InternalFault {
    #[error("parser state stack overflow at depth {depth}: a rule recursed without consuming input")]
    StackOverflow { depth: usize },

    #[error("mismatched rule ids: expected {expected}, found {found}")]
    MismatchedRule { expected: u32, found: u32 },

    #[error("attempted to remove the base parser state")]
    StackUnderflow,

    #[error("rule left the parser stack at height {after}, expected {before}")]
    UnbalancedRule { before: usize, after: usize },
}

impl InternalFault {
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("internal parser fault: {self}")
    }
}

/// Prints any error through miette's graphical report handler.
pub fn print_error(error: impl miette::Diagnostic + Send + Sync + 'static) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_span() {
        let ctx = SourceContext::from_file("a.ink", "first\r\nsecond\nthird");
        let span = ctx.line_span(2);
        assert_eq!(span.offset(), 7);
        assert_eq!(span.len(), 6);
        let span = ctx.line_span(3);
        assert_eq!(span.offset(), 14);
        assert_eq!(span.len(), 5);
        assert_eq!(ctx.line_span(9).len(), 0);
    }

    #[test]
    fn test_fault_message() {
        let fault = InternalFault::MismatchedRule {
            expected: 3,
            found: 4,
        };
        assert_eq!(
            fault.to_string(),
            "mismatched rule ids: expected 3, found 4"
        );
    }
}
