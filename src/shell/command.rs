//! External command execution.
//!
//! Every interpreter and version-control query goes through [`run`], which
//! captures both output streams and enforces a deadline so a hung tool
//! cannot stall a dependency-finding run.

use crate::error::{DepprovError, Result};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default deadline for a single external command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of executing an external command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal or by the timeout).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command was killed for exceeding its deadline.
    pub timed_out: bool,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

/// Options for command execution.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with the inherited environment).
    pub env: HashMap<String, OsString>,

    /// How long to wait before killing the child.
    pub timeout: Duration,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CommandOptions {
    /// Options with the given working directory and timeout.
    pub fn in_dir(cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            cwd: Some(cwd.into()),
            env: HashMap::new(),
            timeout,
        }
    }
}

/// Run `program` with `args`, capturing output.
///
/// A non-zero exit is reported through [`CommandResult::success`], not as an
/// error. Errors are reserved for commands that could not be started; a
/// missing binary surfaces as an [`std::io::ErrorKind::NotFound`] IO error so
/// callers can treat "tool not installed" differently from "tool failed".
pub fn run<P, I, S>(program: P, args: I, options: &CommandOptions) -> Result<CommandResult>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();
    let program = program.as_ref();
    let name = program.to_string_lossy();

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = %name, cwd = ?options.cwd, "spawning command");
    let mut child = cmd.spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_handle = thread::spawn(move || read_all(stdout));
    let stderr_handle = thread::spawn(move || read_all(stderr));

    let mut timed_out = false;
    let status = match child.wait_timeout(options.timeout)? {
        Some(status) => status,
        None => {
            warn!(
                program = %name,
                timeout_secs = options.timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill()?;
            child.wait()?
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    let duration = start.elapsed();

    debug!(program = %name, exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandResult {
        exit_code: if timed_out { None } else { status.code() },
        stdout,
        stderr,
        duration,
        timed_out,
        success: status.success() && !timed_out,
    })
}

/// Run a command and return its trimmed stdout, failing on a non-zero exit.
pub fn run_checked<P, I, S>(program: P, args: I, options: &CommandOptions) -> Result<String>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered = render(program.as_ref(), &args);
    let result = run(program, args, options)?;
    if !result.success {
        debug!(command = %rendered, stderr = %result.stderr.trim(), "command failed");
        return Err(DepprovError::CommandFailed {
            command: rendered,
            code: result.exit_code,
        });
    }
    Ok(result.stdout.trim().to_string())
}

fn read_all<R: Read>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = stream {
        let _ = reader.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn render<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> String {
    let mut rendered = program.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.as_ref().to_string_lossy());
    }
    rendered
}
