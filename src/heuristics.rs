//! Version heuristics.
//!
//! A [`VersionHeuristic`] tries to name the version of a loaded module from
//! one kind of evidence. The [`HeuristicChain`] runs them in a fixed order
//! and commits to the first answer:
//!
//! 1. [`VersionControlHeuristic`] - revision of a clean working copy
//! 2. [`AttributeHeuristic`] - conventional version attributes
//! 3. [`PackagingMetadataHeuristic`] - embedded egg metadata
//!
//! Callers may append their own heuristics after these three for a single
//! resolution; the built-in order never changes.

use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::error::{DepprovError, Result};
use crate::module::{Attribute, LoadedModule, VERSION_ATTRIBUTES};
use crate::vcs::{ProbeOutcome, VersionControlProbe};

/// Version recorded when no heuristic succeeds.
pub const UNKNOWN_VERSION: &str = "unknown";

static PKG_INFO_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Version:[ \t]*(\S+)").unwrap());

/// Result of one heuristic attempt.
#[derive(Debug)]
pub enum Outcome {
    /// The heuristic identified the version.
    Resolved(String),

    /// The heuristic has nothing to say about this module.
    NotApplicable,

    /// Resolution must stop with this error.
    Fatal(DepprovError),
}

impl Outcome {
    /// `Resolved` unless `version` is the unknown sentinel.
    fn from_version(version: String) -> Self {
        if version == UNKNOWN_VERSION {
            Outcome::NotApplicable
        } else {
            Outcome::Resolved(version)
        }
    }
}

/// A strategy for finding the version of a loaded module.
pub trait VersionHeuristic: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Try to determine the version of `module`.
    fn attempt(&self, module: &LoadedModule) -> Outcome;
}

/// Uses the revision of the working copy the package lives in.
///
/// Only packages are probed. A dirty working copy is fatal: its code does
/// not correspond to any revision. So is any failure to query a working
/// copy, since its state is then unknown.
#[derive(Debug, Clone, Default)]
pub struct VersionControlHeuristic {
    probe: VersionControlProbe,
}

impl VersionControlHeuristic {
    pub fn new(probe: VersionControlProbe) -> Self {
        Self { probe }
    }
}

impl VersionHeuristic for VersionControlHeuristic {
    fn name(&self) -> &str {
        "version-control"
    }

    fn attempt(&self, module: &LoadedModule) -> Outcome {
        let Some(root) = &module.package_root else {
            return Outcome::NotApplicable;
        };
        match self.probe.probe(root) {
            Ok(ProbeOutcome::Absent) => Outcome::NotApplicable,
            Ok(ProbeOutcome::Clean { revision, .. }) => Outcome::Resolved(revision),
            Ok(ProbeOutcome::Dirty(_)) => Outcome::Fatal(DepprovError::UncommittedModifications {
                path: root.clone(),
            }),
            Err(e) => Outcome::Fatal(e),
        }
    }
}

/// Reads the conventional version attributes of a module.
///
/// The first attribute present wins, even if its value turns out to be
/// unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeHeuristic;

impl AttributeHeuristic {
    fn version_of(module: &LoadedModule) -> String {
        let Some(attribute) = VERSION_ATTRIBUTES
            .iter()
            .find_map(|name| module.attribute(name))
        else {
            return UNKNOWN_VERSION.to_string();
        };

        match attribute {
            Attribute::Null => UNKNOWN_VERSION.to_string(),
            Attribute::Value(value) => value.clone(),
            Attribute::Module(nested) => Self::version_of(nested),
            Attribute::Callable(callable) => match callable.call() {
                Ok(Some(value)) => value,
                Ok(None) => UNKNOWN_VERSION.to_string(),
                Err(e) => {
                    warn!(module = %module.name, error = %e, "version callable failed");
                    UNKNOWN_VERSION.to_string()
                }
            },
        }
    }
}

impl VersionHeuristic for AttributeHeuristic {
    fn name(&self) -> &str {
        "attribute"
    }

    fn attempt(&self, module: &LoadedModule) -> Outcome {
        Outcome::from_version(Self::version_of(module))
    }
}

/// Reads `EGG-INFO/PKG-INFO` next to the module's source file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagingMetadataHeuristic;

impl PackagingMetadataHeuristic {
    fn read_version(install_dir: &Path) -> Option<String> {
        let egg_info = install_dir.join("EGG-INFO");
        if !egg_info.is_dir() {
            return None;
        }
        let contents = match fs::read_to_string(egg_info.join("PKG-INFO")) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %egg_info.display(), error = %e, "unreadable egg metadata");
                return None;
            }
        };
        PKG_INFO_VERSION
            .captures(&contents)
            .map(|caps| caps[1].to_string())
    }
}

impl VersionHeuristic for PackagingMetadataHeuristic {
    fn name(&self) -> &str {
        "packaging-metadata"
    }

    fn attempt(&self, module: &LoadedModule) -> Outcome {
        match module.install_dir().and_then(Self::read_version) {
            Some(version) => Outcome::from_version(version),
            None => Outcome::NotApplicable,
        }
    }
}

/// The ordered list of built-in heuristics.
#[derive(Debug, Clone)]
pub struct HeuristicChain {
    heuristics: Vec<Arc<dyn VersionHeuristic>>,
}

impl HeuristicChain {
    /// The built-in chain, probing working copies with `probe`.
    pub fn standard(probe: VersionControlProbe) -> Self {
        Self {
            heuristics: vec![
                Arc::new(VersionControlHeuristic::new(probe)),
                Arc::new(AttributeHeuristic),
                Arc::new(PackagingMetadataHeuristic),
            ],
        }
    }

    /// Names of the built-in heuristics, in order.
    pub fn names(&self) -> Vec<&str> {
        self.heuristics.iter().map(|h| h.name()).collect()
    }

    /// Determine the version of `module`, trying `extra` after the built-ins.
    ///
    /// Returns [`UNKNOWN_VERSION`] when nothing applies. The only error is a
    /// fatal outcome, such as uncommitted modifications.
    pub fn resolve(
        &self,
        module: &LoadedModule,
        extra: &[Arc<dyn VersionHeuristic>],
    ) -> Result<String> {
        for heuristic in self.heuristics.iter().chain(extra) {
            match heuristic.attempt(module) {
                Outcome::Resolved(version) => {
                    debug!(
                        module = %module.name,
                        heuristic = heuristic.name(),
                        version = %version,
                        "version resolved"
                    );
                    return Ok(version);
                }
                Outcome::NotApplicable => {
                    debug!(module = %module.name, heuristic = heuristic.name(), "not applicable");
                }
                Outcome::Fatal(e) => return Err(e),
            }
        }
        Ok(UNKNOWN_VERSION.to_string())
    }
}

impl Default for HeuristicChain {
    fn default() -> Self {
        Self::standard(VersionControlProbe::default())
    }
}
