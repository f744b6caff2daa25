//! Survey command implementation.
//!
//! The `depprov survey` command reports the version the heuristics find for
//! every package in the interpreter's site-packages directory.

use std::io::Write;

use crate::cli::args::{OutputFormat, SurveyArgs};
use crate::error::Result;
use crate::heuristics::HeuristicChain;
use crate::report::render_survey;
use crate::survey::survey;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The survey command implementation.
pub struct SurveyCommand {
    context: CommandContext,
    args: SurveyArgs,
}

impl SurveyCommand {
    /// Create a new survey command.
    pub fn new(context: CommandContext, args: SurveyArgs) -> Self {
        Self { context, args }
    }
}

impl Command for SurveyCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let exe = self.context.executable(&self.args.executable);
        let interpreter = self.context.interpreter(&exe)?;
        let env = interpreter.environment()?;

        let chain = HeuristicChain::standard(self.context.settings.vcs_probe());
        let entries = survey(&env.purelib, &interpreter, &chain)?;

        match self.args.format {
            OutputFormat::Json => writeln!(
                out,
                "{}",
                serde_json::to_string_pretty(&entries).map_err(anyhow::Error::from)?
            )?,
            OutputFormat::Text => {
                if !entries.is_empty() {
                    writeln!(out, "{}", render_survey(&entries, &self.context.theme))?;
                }
            }
        }
        Ok(CommandResult::success())
    }
}
