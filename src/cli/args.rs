//! Defines the command-line arguments and subcommands for the skein CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "skein",
    version,
    about = "Parse and check ink narrative scripts."
)]
pub struct SkeinArgs {
    /// Parser options file. `.json` files are read as JSON, anything else as YAML.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log parser activity at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a script, report diagnostics and print its syntax tree.
    Parse {
        /// The path to the ink file to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Print the tree as JSON instead of an outline.
        #[arg(long)]
        json: bool,
    },
    /// Report diagnostics for a file, or for every `.ink` file under a directory.
    Check {
        /// A file or directory to check.
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the syntax tree as an indented outline.
    Tree {
        /// The path to the ink file to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Show the source span of every node.
        #[arg(long)]
        spans: bool,
    },
}
