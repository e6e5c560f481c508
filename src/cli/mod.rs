//! cli
//!
//! Command-line interface layer for translineage.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! [`commands`], which load definitions through [`crate::core::definition`]
//! and resolve schemas through [`crate::lineage`].

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::Result;

use crate::ui::output::{self, Verbosity};

/// Settings shared by every command, taken from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub cwd: Option<PathBuf>,
    pub verbosity: Verbosity,
    pub shared: Option<PathBuf>,
    pub max_depth: Option<usize>,
    pub strict_merge: bool,
}

impl Context {
    /// Directory commands run in.
    pub fn working_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    output::init_tracing(verbosity);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        verbosity,
        shared: cli.shared.clone(),
        max_depth: cli.max_depth,
        strict_merge: cli.strict_merge,
    };

    commands::dispatch(cli.command, &ctx)
}
