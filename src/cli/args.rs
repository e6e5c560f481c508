//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--shared <file>`: Shared resource pool file
//! - `--max-depth <n>`: Composite nesting bound
//! - `--strict-merge`: Fail on duplicate field names where hops meet

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// translineage - Schema lineage for step graphs
#[derive(Parser, Debug)]
#[command(name = "tlg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if tlg was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Shared resource pool file (overrides config)
    #[arg(long, global = true, value_name = "FILE")]
    pub shared: Option<PathBuf>,

    /// Maximum composite nesting depth (overrides config)
    #[arg(long, global = true, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Fail on duplicate field names where several hops meet
    #[arg(long, global = true)]
    pub strict_merge: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the fields a step emits or receives
    #[command(
        name = "fields",
        long_about = "Show the resolved fields of a step.\n\n\
            Resolves the schema lineage of the named step in the root graph of the \
            definition file and prints its fields in order. Composite (mapping) steps \
            are resolved through their embedded graphs.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Fields emitted by a step
    tlg fields etl/orders.toml captor

    # Fields arriving at a step
    tlg fields etl/orders.toml captor --input

    # Machine-readable output
    tlg fields etl/orders.toml captor --json"
    )]
    Fields {
        /// Definition file
        file: PathBuf,

        /// Step name (case-insensitive)
        step: String,

        /// Show the input schema instead of the output schema
        #[arg(long)]
        input: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved resources
    #[command(
        name = "resources",
        long_about = "Show the resources of a definition after merging with the shared pool.\n\n\
            Lists database connections, partition schemas, cluster schemas and slave \
            servers. Entries declared by the definition itself are marked private.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Resources with the configured shared pool
    tlg resources etl/orders.toml

    # With an explicit pool
    tlg --shared shared.toml resources etl/orders.toml"
    )]
    Resources {
        /// Definition file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a definition
    #[command(
        name = "check",
        long_about = "Load a definition and resolve every step of its root graph.\n\n\
            Reports cycles over enabled hops and every step whose schema cannot be \
            resolved. Exits with a non-zero status if anything fails.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Validate before committing
    tlg check etl/orders.toml

    # Treat duplicate field names at merge points as errors
    tlg --strict-merge check etl/orders.toml"
    )]
    Check {
        /// Definition file
        file: PathBuf,
    },

    /// Get, set, or list configuration values
    #[command(
        name = "config",
        after_help = "\
WORKFLOW EXAMPLES:
    # See effective configuration
    tlg config list

    # Get a specific value
    tlg config get merge_policy

    # Set a project value
    tlg config set max_nesting_depth 16"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    tlg completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    tlg completion zsh >> ~/.zshrc

    # Fish
    tlg completion fish > ~/.config/fish/completions/tlg.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get an effective configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a project configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List effective configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_fields_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tlg",
            "fields",
            "t.toml",
            "captor",
            "--input",
            "--max-depth",
            "4",
            "--strict-merge",
        ])
        .unwrap();

        assert_eq!(cli.max_depth, Some(4));
        assert!(cli.strict_merge);
        match cli.command {
            Command::Fields {
                step, input, json, ..
            } => {
                assert_eq!(step, "captor");
                assert!(input);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
