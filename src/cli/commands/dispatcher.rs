//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::args::{Cli, Commands, ExecutableArgs};
use crate::config::{load_config, Settings};
use crate::error::{DepprovError, Result};
use crate::finder::ExecutableDescriptor;
use crate::module::PythonInterpreter;
use crate::report::Theme;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, writing results to `out`.
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self { exit_code: 0 }
    }
}

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub settings: Settings,
    pub theme: Theme,
}

impl CommandContext {
    /// The executable to inspect: configured values overridden by flags.
    pub fn executable(&self, args: &ExecutableArgs) -> ExecutableDescriptor {
        let mut exe = self.settings.executable_descriptor();
        if let Some(name) = &args.executable {
            exe.name = name.clone();
        }
        if let Some(path) = &args.interpreter {
            exe.path = path.clone();
        }
        exe
    }

    /// An interpreter adapter for `exe`, which must be a Python interpreter.
    pub fn interpreter(&self, exe: &ExecutableDescriptor) -> Result<PythonInterpreter> {
        if !exe.is_python() {
            return Err(DepprovError::UnsupportedExecutable {
                name: exe.name.clone(),
            });
        }
        Ok(PythonInterpreter::new(
            &exe.path,
            self.settings.interpreter_timeout(),
        ))
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
    config_override: Option<PathBuf>,
    colors: bool,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            config_override: None,
            colors: false,
        }
    }

    /// Load configuration from this file instead of the project's.
    pub fn with_config_override(mut self, path: Option<PathBuf>) -> Self {
        self.config_override = path;
        self
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Load configuration, then route the subcommand to its implementation.
    pub fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> Result<CommandResult> {
        let settings = load_config(&self.project_root, self.config_override.as_deref())?;
        debug!(?settings, "configuration loaded");
        let context = CommandContext {
            settings,
            theme: Theme::for_colors(self.colors),
        };

        match &cli.command {
            Commands::Find(args) => {
                super::find::FindCommand::new(context, args.clone()).execute(out)
            }
            Commands::Survey(args) => {
                super::survey::SurveyCommand::new(context, args.clone()).execute(out)
            }
        }
    }
}
