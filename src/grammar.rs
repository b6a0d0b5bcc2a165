//! The ink grammar.
//!
//! `InkParser` is the rule host for one source file. It owns the working
//! arena the rules allocate into and implements [`Rules`] so the engine can
//! attach spans on commit and roll allocations back on failure. Rules are
//! spread over the submodules by topic; each adds an `impl InkParser` block.
//!
//! Parsers for included files are created on demand and share one
//! [`Session`] with the root parser: the resolver, the diagnostic sink and
//! the set of files currently being parsed.

mod choices;
mod conditionals;
mod content;
mod divert;
mod expressions;
mod flow;
mod include;
mod logic;
mod sequences;
mod statements;
mod whitespace;

use std::any::Any;
use std::collections::HashSet;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::ast::{weave, Arena, NodeId, NodeKind, Span, Story};
use crate::comments::eliminate_comments;
use crate::config::ParseOptions;
use crate::diagnostics::{CollectedDiagnostics, Diagnostic, DiagnosticSink, Severity};
use crate::engine::{Checkpoint, Rules, Step, StringParser};
use crate::errors::SkeinError;
use crate::resolver::{FileResolver, IncludeResolver};

pub use statements::StatementLevel;

static DEFAULT_RESOLVER: Lazy<FileResolver> = Lazy::new(FileResolver::default);

bitflags::bitflags! {
    /// Grammar state that rides on the checkpoint stack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct GrammarFlags: u32 {
        /// Inside `"..."`: a quote ends text and tags are refused.
        const PARSING_STRING = 0b01;
        /// A `#` tag has been opened and not yet closed.
        const TAG_ACTIVE     = 0b10;
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Entry point: configure, then parse a source string into a [`Story`].
///
/// ```
/// use skein::{Compiler, CollectedDiagnostics};
///
/// let mut diagnostics = CollectedDiagnostics::new();
/// let story = Compiler::new()
///     .with_sink(&mut diagnostics)
///     .parse("Hello\n* Go on\n- Done", Some("main.ink"))
///     .unwrap();
/// assert!(!diagnostics.has_errors());
/// assert!(story.len() > 1);
/// ```
pub struct Compiler<'a> {
    options: ParseOptions,
    resolver: &'a dyn IncludeResolver,
    sink: Option<&'a mut dyn DiagnosticSink>,
}

impl<'a> Compiler<'a> {
    pub fn new() -> Self {
        Self {
            options: ParseOptions::default(),
            resolver: &*DEFAULT_RESOLVER,
            sink: None,
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_resolver(mut self, resolver: &'a dyn IncludeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Without a sink, the first error makes [`Compiler::parse`] fail.
    pub fn with_sink(mut self, sink: &'a mut dyn DiagnosticSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Parses `source`. `filename` names the file in diagnostics and seeds
    /// include cycle detection.
    pub fn parse(self, source: &str, filename: Option<&str>) -> Result<Story, SkeinError> {
        let mut session = Session {
            resolver: self.resolver,
            sink: self.sink,
            options: self.options,
            open_files: HashSet::new(),
            escalated: None,
        };
        if let Some(name) = filename {
            let path = session.resolver.resolve(name);
            session.open_files.insert(path);
        }

        let story = InkParser::new(source, filename.map(str::to_string), &mut session).parse_story();

        match session.escalated {
            Some(diagnostic) => Err(SkeinError::Unhandled { diagnostic }),
            None => Ok(story),
        }
    }
}

impl Default for Compiler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a standalone string; fails on the first error.
pub fn parse(source: &str) -> Result<Story, SkeinError> {
    Compiler::new().parse(source, None)
}

/// Parses with a resolver and collects every diagnostic.
pub fn parse_collecting(
    source: &str,
    filename: Option<&str>,
    resolver: &dyn IncludeResolver,
    options: ParseOptions,
) -> (Story, CollectedDiagnostics) {
    let mut diagnostics = CollectedDiagnostics::new();
    let result = Compiler::new()
        .with_options(options)
        .with_resolver(resolver)
        .with_sink(&mut diagnostics)
        .parse(source, filename);
    match result {
        Ok(story) => (story, diagnostics),
        // Unreachable with a sink installed; keep the diagnostic anyway.
        Err(SkeinError::Unhandled { diagnostic }) => {
            diagnostics.diagnostics.push(diagnostic);
            (empty_story(filename), diagnostics)
        }
        Err(_) => (empty_story(filename), diagnostics),
    }
}

fn empty_story(filename: Option<&str>) -> Story {
    let mut arena = Arena::default();
    let root = arena.alloc(NodeKind::Story {
        content: Vec::new(),
    });
    arena.into_story(root, Span::default(), filename.map(str::to_string))
}

// ============================================================================
// SESSION
// ============================================================================

/// State shared by the root parser and every include parser beneath it.
pub(crate) struct Session<'a> {
    resolver: &'a dyn IncludeResolver,
    sink: Option<&'a mut dyn DiagnosticSink>,
    options: ParseOptions,
    /// Files on the current include stack.
    open_files: HashSet<PathBuf>,
    escalated: Option<Diagnostic>,
}

impl Session<'_> {
    fn deliver(&mut self, mut diagnostic: Diagnostic) {
        if self.options.warnings_as_errors {
            diagnostic.severity = Severity::Error;
        }
        match self.sink.as_mut() {
            Some(sink) => sink.report(diagnostic),
            None if diagnostic.is_error() => {
                if self.escalated.is_none() {
                    self.escalated = Some(diagnostic);
                }
            }
            None => warn!("{diagnostic}"),
        }
    }
}

// ============================================================================
// RULE HOST
// ============================================================================

pub(crate) struct InkParser<'p, 'a> {
    parser: StringParser,
    session: &'p mut Session<'a>,
    filename: Option<String>,
    arena: Arena,
    /// Set while the content of a choice line is parsed. Choices never nest.
    parsing_choice: bool,
}

impl<'p, 'a> InkParser<'p, 'a> {
    pub(crate) fn new(source: &str, filename: Option<String>, session: &'p mut Session<'a>) -> Self {
        let text = eliminate_comments(source);
        let depth = session.options.max_stack_depth;
        Self {
            parser: StringParser::new(&text, depth),
            session,
            filename,
            arena: Arena::default(),
            parsing_choice: false,
        }
    }

    /// Parses the whole file into a story.
    pub(crate) fn parse_story(mut self) -> Story {
        debug!(file = self.filename.as_deref().unwrap_or("<string>"), "parsing");
        let start = *self.parser.state().current();

        let mut content = self
            .statements_at_level(StatementLevel::Top)
            .unwrap_or_default();
        loop {
            let _ = self.any_whitespace();
            if self.parser.end_of_input() {
                break;
            }
            let _ = self.parse(Self::unexpected_content);
            if let Some(more) = self.statements_at_level(StatementLevel::Top) {
                content.extend(more);
            }
        }

        let content = weave::weave_and_sub_flows(&mut self.arena, content);
        let root = self.arena.alloc(NodeKind::Story { content });
        let end = *self.parser.state().current();
        let had_error = self.parser.had_error();
        let story = self
            .arena
            .into_story(root, Span::between(&start, &end), self.filename);
        debug!(
            file = story.file().unwrap_or("<string>"),
            nodes = story.len(),
            had_error,
            "parsed"
        );
        story
    }

    /// Reports and skips a line nothing else could parse.
    fn unexpected_content(&mut self) -> Option<()> {
        let rest = self.parser.line_remainder();
        self.error(format!("Unexpected content: '{}'", rest.trim_end()));
        self.skip_to_next_line()
    }

    // ========================================================================
    // AST BUILDERS
    // ========================================================================

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.arena.alloc(kind)
    }

    pub(crate) fn text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.alloc(NodeKind::Text { text: text.into() })
    }

    pub(crate) fn kind(&self, id: NodeId) -> &NodeKind {
        crate::ast::NodeLookup::kind(&self.arena, id)
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        self.arena.kind_mut(id)
    }

    /// Reports at the first line of an already parsed node.
    pub(crate) fn error_at(&mut self, id: NodeId, message: impl Into<String>) {
        let line = match self.arena.span(id) {
            Some(span) => span.start.line,
            None => self.parser.line_index() + 1,
        };
        self.report_on_line(message.into(), line, Severity::Error);
    }

    // ========================================================================
    // FLAGS
    // ========================================================================

    pub(crate) fn flag(&self, flag: GrammarFlags) -> bool {
        self.parser.has_flag(flag.bits())
    }

    pub(crate) fn set_flag(&mut self, flag: GrammarFlags, on: bool) {
        self.parser.set_flag(flag.bits(), on);
    }

    pub(crate) fn parsing_string(&self) -> bool {
        self.flag(GrammarFlags::PARSING_STRING)
    }

    pub(crate) fn tag_active(&self) -> bool {
        self.flag(GrammarFlags::TAG_ACTIVE)
    }
}

impl Rules for InkParser<'_, '_> {
    fn parser(&self) -> &StringParser {
        &self.parser
    }

    fn parser_mut(&mut self) -> &mut StringParser {
        &mut self.parser
    }

    fn report(&mut self, message: String, line: usize, severity: Severity) {
        self.session.deliver(Diagnostic {
            message,
            severity,
            line,
            file: self.filename.clone(),
        });
    }

    fn rule_did_succeed(&mut self, result: &dyn Any, start: &Checkpoint, end: &Checkpoint) {
        let span = Span::between(start, end);
        if let Some(id) = result.downcast_ref::<NodeId>() {
            self.arena.set_span(*id, span);
        } else if let Some(ids) = result.downcast_ref::<Vec<NodeId>>() {
            for id in ids {
                self.arena.set_span(*id, span);
            }
        } else if let Some(step) = result.downcast_ref::<Step<NodeId>>() {
            match step {
                Step::One(id) => {
                    self.arena.set_span(*id, span);
                }
                Step::Many(ids) => {
                    for id in ids {
                        self.arena.set_span(*id, span);
                    }
                }
                Step::Neutral => {}
            }
        }
    }

    fn allocation_mark(&self) -> usize {
        self.arena.len()
    }

    fn rewind_allocations(&mut self, mark: usize) {
        self.arena.truncate(mark);
    }
}
