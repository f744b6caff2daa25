//! Git working copies.
//!
//! Thin wrapper around `git` subprocess calls. Only read-only plumbing
//! commands are issued.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{VersionControl, WorkingCopy};
use crate::error::{DepprovError, Result};
use crate::shell::{self, CommandOptions};

/// Git backend.
#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    timeout: Duration,
}

impl Git {
    /// Create a git backend whose commands are killed after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("git", timeout)
    }

    /// Use `program` instead of the `git` found on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl VersionControl for Git {
    fn name(&self) -> &'static str {
        "git"
    }

    fn locate(&self, path: &Path) -> Result<Option<Box<dyn WorkingCopy>>> {
        let dir = search_dir(path);
        let options = CommandOptions::in_dir(dir, self.timeout);

        let toplevel = match shell::run(
            &self.program,
            ["rev-parse", "--show-toplevel"],
            &options,
        ) {
            Ok(result) if result.timed_out => {
                return Err(DepprovError::VersionControl {
                    path: path.to_path_buf(),
                    message: "git rev-parse timed out".to_string(),
                })
            }
            Ok(result) if result.success => PathBuf::from(result.stdout.trim()),
            Ok(_) => return Ok(None),
            Err(DepprovError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("git not installed");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // A directory inside a checkout that git does not track (an ignored
        // virtualenv, say) is not versioned by that checkout. The pathspec is
        // relative to `dir` so a path reached through a symlink still matches.
        let spec = pathspec(path);
        let tracked = shell::run_checked(
            &self.program,
            [OsStr::new("ls-files"), OsStr::new("--"), spec],
            &options,
        )
        .map_err(|e| DepprovError::VersionControl {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if tracked.is_empty() {
            debug!(path = %path.display(), root = %toplevel.display(), "path not tracked by git");
            return Ok(None);
        }

        Ok(Some(Box::new(GitWorkingCopy {
            program: self.program.clone(),
            root: toplevel,
            timeout: self.timeout,
        })))
    }
}

/// A git checkout.
#[derive(Debug, Clone)]
pub struct GitWorkingCopy {
    program: PathBuf,
    root: PathBuf,
    timeout: Duration,
}

impl GitWorkingCopy {
    fn git(&self, args: &[&str]) -> Result<String> {
        shell::run_checked(
            &self.program,
            args,
            &CommandOptions::in_dir(&self.root, self.timeout),
        )
        .map_err(|e| DepprovError::VersionControl {
            path: self.root.clone(),
            message: e.to_string(),
        })
    }
}

impl WorkingCopy for GitWorkingCopy {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_dirty(&self) -> Result<bool> {
        let status = self.git(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!status.is_empty())
    }

    fn current_revision(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    fn diff(&self) -> Result<String> {
        self.git(&["diff", "HEAD"])
    }
}

/// Directory to start the search from: the path itself, or its parent for files.
pub(crate) fn search_dir(path: &Path) -> &Path {
    if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    }
}

/// Pathspec naming `path` from inside [`search_dir`].
fn pathspec(path: &Path) -> &OsStr {
    if path.is_dir() {
        OsStr::new(".")
    } else {
        path.file_name().unwrap_or(path.as_os_str())
    }
}
