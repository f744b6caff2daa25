//! Mercurial working copies.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::git::search_dir;
use super::{VersionControl, WorkingCopy};
use crate::error::{DepprovError, Result};
use crate::shell::{self, CommandOptions};

/// Mercurial backend.
#[derive(Debug, Clone)]
pub struct Mercurial {
    program: PathBuf,
    timeout: Duration,
}

impl Mercurial {
    /// Create a Mercurial backend whose commands are killed after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("hg", timeout)
    }

    /// Use `program` instead of the `hg` found on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl VersionControl for Mercurial {
    fn name(&self) -> &'static str {
        "mercurial"
    }

    fn locate(&self, path: &Path) -> Result<Option<Box<dyn WorkingCopy>>> {
        let options = CommandOptions::in_dir(search_dir(path), self.timeout);
        match shell::run(&self.program, ["root"], &options) {
            Ok(result) if result.success => Ok(Some(Box::new(MercurialWorkingCopy {
                program: self.program.clone(),
                root: PathBuf::from(result.stdout.trim()),
                timeout: self.timeout,
            }))),
            Ok(result) if result.timed_out => Err(DepprovError::VersionControl {
                path: path.to_path_buf(),
                message: "hg root timed out".to_string(),
            }),
            Ok(_) => Ok(None),
            Err(DepprovError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("hg not installed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// A Mercurial checkout.
#[derive(Debug, Clone)]
pub struct MercurialWorkingCopy {
    program: PathBuf,
    root: PathBuf,
    timeout: Duration,
}

impl MercurialWorkingCopy {
    fn hg(&self, args: &[&str]) -> Result<String> {
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

impl WorkingCopy for MercurialWorkingCopy {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_dirty(&self) -> Result<bool> {
        // modified, added, removed, deleted: tracked changes only
        let status = self.hg(&["status", "-mard"])?;
        Ok(!status.is_empty())
    }

    fn current_revision(&self) -> Result<String> {
        self.hg(&["log", "-r", ".", "--template", "{node}"])
    }

    fn diff(&self) -> Result<String> {
        self.hg(&["diff"])
    }
}
