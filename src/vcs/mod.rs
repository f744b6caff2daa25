//! Version-control probing.
//!
//! A [`VersionControl`] backend recognises working copies; a [`WorkingCopy`]
//! answers the three read-only questions the version heuristics need:
//! is it dirty, what is the last-commit revision, and what is the diff.
//!
//! [`VersionControlProbe`] tries each configured backend in order and folds
//! the answers into a [`ProbeOutcome`].
//!
//! # Modules
//!
//! - [`git`] - Git backend
//! - [`memory`] - In-memory backend for tests and embedding
//! - [`mercurial`] - Mercurial backend

pub mod git;
pub mod memory;
pub mod mercurial;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

pub use git::Git;
pub use memory::{InMemoryVcs, InMemoryWorkingCopy};
pub use mercurial::Mercurial;

/// A local checkout of a version-controlled source tree.
///
/// Implementations must never mutate the checkout.
pub trait WorkingCopy: fmt::Debug {
    /// Root directory of the checkout.
    fn root(&self) -> &Path;

    /// Whether any tracked file differs from the last commit.
    ///
    /// Untracked files never make a working copy dirty.
    fn is_dirty(&self) -> Result<bool>;

    /// Identifier of the last commit.
    fn current_revision(&self) -> Result<String>;

    /// Diff of the working changes against the last commit.
    fn diff(&self) -> Result<String>;
}

/// A version-control system that can recognise working copies.
pub trait VersionControl: fmt::Debug + Send + Sync {
    /// Short name of the system (e.g. "git").
    fn name(&self) -> &'static str;

    /// Find a working copy rooted at or above `path`.
    ///
    /// Returns `Ok(None)` when the path is not under this system's control,
    /// including when the tool itself is not installed.
    fn locate(&self, path: &Path) -> Result<Option<Box<dyn WorkingCopy>>>;
}

/// Supported version-control backends, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Git,
    Mercurial,
}

impl BackendKind {
    /// Instantiate the backend with the given command timeout.
    pub fn backend(self, timeout: Duration) -> Arc<dyn VersionControl> {
        match self {
            BackendKind::Git => Arc::new(Git::new(timeout)),
            BackendKind::Mercurial => Arc::new(Mercurial::new(timeout)),
        }
    }
}

/// State of the working copy (if any) that a path belongs to.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// No supported system recognises the path.
    Absent,

    /// A working copy with no local modifications.
    Clean { root: PathBuf, revision: String },

    /// A working copy with local modifications to tracked files.
    Dirty(DirtyWorkingCopy),
}

/// A dirty working copy.
///
/// Both the last-commit revision and the diff are computed on request. A
/// checkout with no commit yet is still dirty; asking it for a revision is
/// an error.
#[derive(Debug)]
pub struct DirtyWorkingCopy {
    working_copy: Box<dyn WorkingCopy>,
}

impl DirtyWorkingCopy {
    /// Identifier of the last commit.
    pub fn revision(&self) -> Result<String> {
        self.working_copy.current_revision()
    }

    /// Diff of the working changes against the last commit.
    pub fn diff(&self) -> Result<String> {
        self.working_copy.diff()
    }
}

/// Tries each backend in order to identify the working copy at a path.
#[derive(Debug, Clone)]
pub struct VersionControlProbe {
    backends: Vec<Arc<dyn VersionControl>>,
}

impl Default for VersionControlProbe {
    fn default() -> Self {
        Self::from_kinds(
            &[BackendKind::Git, BackendKind::Mercurial],
            crate::shell::DEFAULT_TIMEOUT,
        )
    }
}

impl VersionControlProbe {
    /// Create a probe over an explicit, ordered list of backends.
    pub fn new(backends: Vec<Arc<dyn VersionControl>>) -> Self {
        Self { backends }
    }

    /// Create a probe from configured backend kinds.
    pub fn from_kinds(kinds: &[BackendKind], timeout: Duration) -> Self {
        Self::new(kinds.iter().map(|k| k.backend(timeout)).collect())
    }

    /// The configured backends, in probing order.
    pub fn backends(&self) -> &[Arc<dyn VersionControl>] {
        &self.backends
    }

    /// Find the working copy at `path` using the first backend that recognises it.
    pub fn locate(&self, path: &Path) -> Result<Option<Box<dyn WorkingCopy>>> {
        for backend in &self.backends {
            if let Some(wc) = backend.locate(path)? {
                debug!(
                    backend = backend.name(),
                    path = %path.display(),
                    root = %wc.root().display(),
                    "working copy found"
                );
                return Ok(Some(wc));
            }
        }
        Ok(None)
    }

    /// Report the state of the working copy at `path`.
    pub fn probe(&self, path: &Path) -> Result<ProbeOutcome> {
        let Some(wc) = self.locate(path)? else {
            return Ok(ProbeOutcome::Absent);
        };

        if wc.is_dirty()? {
            return Ok(ProbeOutcome::Dirty(DirtyWorkingCopy { working_copy: wc }));
        }
        Ok(ProbeOutcome::Clean {
            root: wc.root().to_path_buf(),
            revision: wc.current_revision()?,
        })
    }
}
