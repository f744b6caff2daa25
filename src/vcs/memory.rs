//! In-memory version control.
//!
//! Lets callers describe checkouts directly instead of creating real
//! repositories. Used by the test suites and by embedders that already know
//! the state of their sources.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{VersionControl, WorkingCopy};
use crate::error::{DepprovError, Result};

/// A working copy whose answers are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryWorkingCopy {
    pub root: PathBuf,
    pub dirty: bool,
    /// `None` for a checkout with no commit yet.
    pub revision: Option<String>,
    pub diff: String,
    /// When set, every query fails with this message.
    pub failure: Option<String>,
}

impl InMemoryWorkingCopy {
    /// A checkout with no local modifications.
    pub fn clean(root: impl Into<PathBuf>, revision: &str) -> Self {
        Self {
            root: root.into(),
            dirty: false,
            revision: Some(revision.to_string()),
            diff: String::new(),
            failure: None,
        }
    }

    /// A checkout with local modifications described by `diff`.
    pub fn dirty(root: impl Into<PathBuf>, revision: &str, diff: &str) -> Self {
        Self {
            dirty: true,
            diff: diff.to_string(),
            ..Self::clean(root, revision)
        }
    }

    /// A freshly initialised checkout whose tracked files were never committed.
    pub fn uncommitted(root: impl Into<PathBuf>) -> Self {
        Self {
            dirty: true,
            revision: None,
            ..Self::clean(root, "")
        }
    }

    /// A checkout that is recognised but cannot be queried.
    pub fn broken(root: impl Into<PathBuf>, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::clean(root, "")
        }
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(DepprovError::VersionControl {
                path: self.root.clone(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl WorkingCopy for InMemoryWorkingCopy {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_dirty(&self) -> Result<bool> {
        self.check()?;
        Ok(self.dirty)
    }

    fn current_revision(&self) -> Result<String> {
        self.check()?;
        self.revision.clone().ok_or_else(|| DepprovError::VersionControl {
            path: self.root.clone(),
            message: "no commits yet".to_string(),
        })
    }

    fn diff(&self) -> Result<String> {
        self.check()?;
        Ok(self.diff.clone())
    }
}

/// A backend that recognises a fixed set of checkouts.
///
/// A path belongs to the first checkout whose root is a prefix of it.
/// Every lookup is recorded.
#[derive(Debug, Default)]
pub struct InMemoryVcs {
    copies: Vec<InMemoryWorkingCopy>,
    lookups: Mutex<Vec<PathBuf>>,
}

impl InMemoryVcs {
    pub fn new(copies: Vec<InMemoryWorkingCopy>) -> Self {
        Self {
            copies,
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a shareable backend, ready for a probe.
    pub fn shared(copies: Vec<InMemoryWorkingCopy>) -> Arc<dyn VersionControl> {
        Arc::new(Self::new(copies))
    }

    /// Paths looked up so far, in order.
    pub fn lookups(&self) -> Vec<PathBuf> {
        self.lookups
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

impl VersionControl for InMemoryVcs {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn locate(&self, path: &Path) -> Result<Option<Box<dyn WorkingCopy>>> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(path.to_path_buf());
        }
        Ok(self
            .copies
            .iter()
            .find(|wc| path.starts_with(&wc.root))
            .map(|wc| Box::new(wc.clone()) as Box<dyn WorkingCopy>))
    }
}
