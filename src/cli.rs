//! The skein command line.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

pub mod args;
pub mod output;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use crate::ast::Story;
use crate::config::ParseOptions;
use crate::diagnostics::CollectedDiagnostics;
use crate::errors::{print_error, SkeinError, SourceContext};
use crate::grammar::Compiler;
use crate::resolver::{FileResolver, IncludeResolver};

use self::args::{Command, SkeinArgs};

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = SkeinArgs::parse();
    init_logging(args.verbose);

    let options = match &args.config {
        Some(path) => ParseOptions::load(path).unwrap_or_else(|e| {
            print_error(e);
            process::exit(2);
        }),
        None => ParseOptions::default(),
    };

    let result = match args.command {
        Command::Parse { file, json } => parse_command(&file, &options, json),
        Command::Check { path } => check_command(&path, &options),
        Command::Tree { file, spans } => tree_command(&file, &options, spans),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_error(e);
            process::exit(2);
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings, or debug output from skein itself
/// with `--verbose`.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,skein=debug" } else { "warn" })
    });
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Each command returns `Ok(false)` when the source had errors.
fn parse_command(file: &Path, options: &ParseOptions, json: bool) -> Result<bool, SkeinError> {
    let parsed = ParsedFile::load(file, options)?;
    parsed.print_diagnostics();
    if json {
        output::print_json(&parsed.story.to_json()?);
    } else {
        output::print_outline(&parsed.story, false);
    }
    Ok(!parsed.diagnostics.has_errors())
}

fn tree_command(file: &Path, options: &ParseOptions, spans: bool) -> Result<bool, SkeinError> {
    let parsed = ParsedFile::load(file, options)?;
    parsed.print_diagnostics();
    output::print_outline(&parsed.story, spans);
    Ok(!parsed.diagnostics.has_errors())
}

fn check_command(path: &Path, options: &ParseOptions) -> Result<bool, SkeinError> {
    let files = discover_ink_files(path)?;
    let mut failed = 0;

    for file in &files {
        let parsed = ParsedFile::load(file, options)?;
        parsed.print_diagnostics();
        let errors = parsed.diagnostics.error_count();
        let warnings = parsed.diagnostics.len() - errors;
        output::print_summary(file, errors, warnings);
        if errors > 0 {
            failed += 1;
        }
    }

    if files.len() > 1 {
        output::print_totals(files.len(), failed);
    }
    Ok(failed == 0)
}

/// A single file, or every `.ink` file below a directory in sorted order.
fn discover_ink_files(root: &Path) -> Result<Vec<PathBuf>, SkeinError> {
    if !root.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| SkeinError::io(root, e.into()))?;
        let is_ink = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ink"));
        if entry.file_type().is_file() && is_ink {
            files.push(entry.into_path());
        }
    }
    debug!(root = %root.display(), count = files.len(), "discovered ink files");
    Ok(files)
}

// ============================================================================
// PARSED FILES
// ============================================================================

struct ParsedFile {
    name: String,
    source: String,
    resolver: FileResolver,
    story: Story,
    diagnostics: CollectedDiagnostics,
}

impl ParsedFile {
    fn load(path: &Path, options: &ParseOptions) -> Result<Self, SkeinError> {
        let source = std::fs::read_to_string(path).map_err(|e| SkeinError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let resolver = FileResolver::beside(path);

        let mut diagnostics = CollectedDiagnostics::new();
        let story = Compiler::new()
            .with_options(options.clone())
            .with_resolver(&resolver)
            .with_sink(&mut diagnostics)
            .parse(&source, Some(&name))?;

        Ok(Self {
            name,
            source,
            resolver,
            story,
            diagnostics,
        })
    }

    /// Included files are re-read so their diagnostics can show source lines.
    fn print_diagnostics(&self) {
        output::print_diagnostics(&self.diagnostics.diagnostics, |file| match file {
            Some(file) if file != self.name => {
                let path = self.resolver.resolve(file);
                let text = self.resolver.load(&path).ok()?;
                Some(SourceContext::from_file(file, text))
            }
            _ => Some(SourceContext::from_file(&self.name, &self.source)),
        });
    }
}
