//! Handles all user-facing output for the CLI.
//!
//! Diagnostics go to stderr through miette, trees and summaries to stdout.

use std::path::Path;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::{pretty, Story};
use crate::diagnostics::{Diagnostic, RenderedDiagnostic};
use crate::errors::{print_error, SourceContext};

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Prints each diagnostic against its source, or as a plain line when the
/// source can't be found.
pub fn print_diagnostics<F>(diagnostics: &[Diagnostic], mut source_for: F)
where
    F: FnMut(Option<&str>) -> Option<SourceContext>,
{
    for diagnostic in diagnostics {
        match source_for(diagnostic.file.as_deref()) {
            Some(source) => print_error(RenderedDiagnostic::new(diagnostic.clone(), &source)),
            None => eprintln!("{diagnostic}"),
        }
    }
}

/// `ok` or `FAILED` for one checked file, with counts.
pub fn print_summary(path: &Path, errors: usize, warnings: usize) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let (color, status) = if errors == 0 {
        (Color::Green, "ok")
    } else {
        (Color::Red, "FAILED")
    };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    print!("{status:>6}");
    let _ = stdout.reset();
    println!(
        " {} ({errors} error(s), {warnings} warning(s))",
        path.display()
    );
}

/// Totals line after a multi-file check.
pub fn print_totals(files: usize, failed: usize) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let color = if failed == 0 { Color::Green } else { Color::Red };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    println!("\nChecked {files} file(s), {failed} with errors");
    let _ = stdout.reset();
}

// ============================================================================
// TREES
// ============================================================================

pub fn print_outline(story: &Story, with_spans: bool) {
    print!("{}", pretty::outline(story, with_spans));
}

pub fn print_json(json: &str) {
    println!("{json}");
}
