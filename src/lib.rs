//! Skein: a backtracking parser for the ink narrative scripting language.
//!
//! The pipeline is comment elimination, then the grammar, then weave
//! construction, producing a [`Story`] syntax tree. Problems in the source are
//! reported as [`Diagnostic`]s through a [`DiagnosticSink`].

pub use crate::ast::{NodeId, NodeKind, Story};
pub use crate::config::ParseOptions;
pub use crate::diagnostics::{CollectedDiagnostics, Diagnostic, DiagnosticSink, Severity};
pub use crate::errors::SkeinError;
pub use crate::grammar::{parse, parse_collecting, Compiler};
pub use crate::resolver::{FileResolver, IncludeResolver, MemoryResolver};

pub mod ast;
pub mod chars;
pub mod cli;
pub mod comments;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod grammar;
pub mod resolver;
