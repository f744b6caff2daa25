//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// depprov - Find and pin the dependencies of a script.
#[derive(Debug, Parser)]
#[command(name = "depprov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides default .depprov/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find the dependencies of a script and pin their versions
    Find(FindArgs),

    /// Report the version of every package installed in site-packages
    Survey(SurveyArgs),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per package
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Interpreter selection shared by all subcommands.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ExecutableArgs {
    /// Kind of executable the script runs with (e.g. Python)
    #[arg(long, value_name = "NAME")]
    pub executable: Option<String>,

    /// Interpreter binary to inspect
    #[arg(long, value_name = "PATH", env = "DEPPROV_INTERPRETER")]
    pub interpreter: Option<PathBuf>,
}

/// Arguments for the `find` command.
#[derive(Debug, Clone, clap::Args)]
pub struct FindArgs {
    /// Script whose dependencies to find
    pub script: PathBuf,

    /// What to do with modified working copies: error or store-diff
    #[arg(long, value_name = "POLICY")]
    pub on_changed: Option<String>,

    #[command(flatten)]
    pub executable: ExecutableArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the `survey` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SurveyArgs {
    #[command(flatten)]
    pub executable: ExecutableArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
