//! Find command implementation.
//!
//! The `depprov find <script>` command pins the dependencies of a script.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::args::{FindArgs, OutputFormat};
use crate::dependency::ChangePolicy;
use crate::error::Result;
use crate::finder::DependencyFinder;
use crate::report::Report;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The find command implementation.
pub struct FindCommand {
    context: CommandContext,
    args: FindArgs,
}

impl FindCommand {
    /// Create a new find command.
    pub fn new(context: CommandContext, args: FindArgs) -> Self {
        Self { context, args }
    }

    /// Policy from the flag, falling back to configuration.
    fn on_changed(&self) -> &str {
        self.args
            .on_changed
            .as_deref()
            .unwrap_or(&self.context.settings.on_changed)
    }

    fn script(&self) -> PathBuf {
        absolute(&self.args.script)
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl Command for FindCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let on_changed = self.on_changed();
        on_changed.parse::<ChangePolicy>()?;

        let mut exe = self.context.executable(&self.args.executable);
        let interpreter = self.context.interpreter(&exe)?;
        let env = interpreter.environment()?;
        exe.version = Some(env.version);

        let script = self.script();
        debug!(script = %script.display(), on_changed, "finding dependencies");
        let finder =
            DependencyFinder::new(&interpreter, &interpreter, self.context.settings.vcs_probe(), env.stdlib)
                .with_search_path(env.sys_path);
        let dependencies = finder.find_dependencies(&script, &exe, on_changed)?;

        let report = Report::new(script, exe, dependencies);
        match self.args.format {
            OutputFormat::Json => writeln!(out, "{}", report.to_json()?)?,
            OutputFormat::Text => {
                if !report.dependencies.is_empty() {
                    writeln!(out, "{}", report.render_text(&self.context.theme))?;
                }
            }
        }
        Ok(CommandResult::success())
    }
}
