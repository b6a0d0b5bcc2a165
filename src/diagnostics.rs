//! User-facing diagnostics.
//!
//! The grammar reports problems in the source as `Diagnostic` values: a
//! message, a severity and the one-based line in the original file. They are
//! delivered to a `DiagnosticSink`, which can be any closure taking a
//! diagnostic or the ready-made `CollectedDiagnostics`. `RenderedDiagnostic`
//! pairs a diagnostic with its source text so miette can draw it.

use std::fmt;
use std::sync::Arc;

use miette::{LabeledSpan, NamedSource, SourceCode, SourceSpan};
use serde::Serialize;

use crate::errors::SourceContext;

// ============================================================================
// DIAGNOSTIC VALUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// One-based line number in the original source.
    pub line: usize,
    /// The file being parsed, when it has a name.
    pub file: Option<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(
                f,
                "{}: '{}' line {}: {}",
                self.severity, file, self.line, self.message
            ),
            None => write!(f, "{}: line {}: {}", self.severity, self.line, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

// ============================================================================
// SINKS
// ============================================================================

/// Receives every diagnostic the parser emits, in order.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<F: FnMut(Diagnostic)> DiagnosticSink for F {
    fn report(&mut self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// A sink that simply keeps everything.
#[derive(Debug, Clone, Default)]
pub struct CollectedDiagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

impl DiagnosticSink for CollectedDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// A diagnostic bound to the source it refers to, ready for `miette::Report`.
#[derive(Debug)]
pub struct RenderedDiagnostic {
    pub diagnostic: Diagnostic,
    source: Arc<NamedSource<String>>,
    span: SourceSpan,
}

impl RenderedDiagnostic {
    pub fn new(diagnostic: Diagnostic, source: &SourceContext) -> Self {
        let span = source.line_span(diagnostic.line);
        Self {
            diagnostic,
            source: source.to_named_source(),
            span,
        }
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

impl fmt::Display for RenderedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)
    }
}

impl std::error::Error for RenderedDiagnostic {}

impl miette::Diagnostic for RenderedDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.diagnostic.severity {
            Severity::Error => "skein::parse::error",
            Severity::Warning => "skein::parse::warning",
        };
        Some(Box::new(code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.source.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = format!("line {}", self.diagnostic.line);
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label),
            self.span,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(severity: Severity) -> Diagnostic {
        Diagnostic {
            message: "Expected end of line but saw '}'".into(),
            severity,
            line: 2,
            file: Some("main.ink".into()),
        }
    }

    #[test]
    fn test_display_includes_file_and_line() {
        assert_eq!(
            diagnostic(Severity::Error).to_string(),
            "ERROR: 'main.ink' line 2: Expected end of line but saw '}'"
        );
    }

    #[test]
    fn test_collected_counts() {
        let mut sink = CollectedDiagnostics::new();
        sink.report(diagnostic(Severity::Warning));
        sink.report(diagnostic(Severity::Error));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.error_count(), 1);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |d: Diagnostic| seen.push(d.line);
            sink.report(diagnostic(Severity::Error));
        }
        assert_eq!(seen, vec![2]);
    }

    #[test]
    fn test_rendered_label_covers_line() {
        let source = SourceContext::from_file("main.ink", "Hello\n}\n");
        let rendered = RenderedDiagnostic::new(diagnostic(Severity::Error), &source);
        assert_eq!(rendered.span().offset(), 6);
        assert_eq!(rendered.span().len(), 1);
    }
}
