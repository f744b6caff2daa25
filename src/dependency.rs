//! Dependency records and their construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DepprovError, Result};
use crate::heuristics::{HeuristicChain, VersionHeuristic, UNKNOWN_VERSION};
use crate::module::{ImportError, ModuleLoader};
use crate::vcs::{ProbeOutcome, VersionControlProbe};

/// What to do when a dependency's working copy has uncommitted changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangePolicy {
    /// Abort with [`DepprovError::UncommittedModifications`].
    #[default]
    Error,

    /// Record the last-commit revision together with the working diff.
    StoreDiff,
}

impl FromStr for ChangePolicy {
    type Err = DepprovError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "error" => Ok(ChangePolicy::Error),
            "store-diff" => Ok(ChangePolicy::StoreDiff),
            other => Err(DepprovError::UnsupportedChangePolicy {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePolicy::Error => write!(f, "error"),
            ChangePolicy::StoreDiff => write!(f, "store-diff"),
        }
    }
}

/// A package a script depends on, pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Top-level package name.
    pub name: String,

    /// Package directory (or source file for single-file modules).
    pub path: PathBuf,

    /// Whether the package lives directly in the standard library root.
    pub in_stdlib: bool,

    /// Identified version, or `"unknown"`.
    pub version: String,

    /// Uncommitted changes recorded under [`ChangePolicy::StoreDiff`].
    pub diff: String,

    /// Why the package could not be imported, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_error: Option<ImportError>,
}

impl Dependency {
    /// Whether the recorded version came from a modified working copy.
    pub fn has_diff(&self) -> bool {
        !self.diff.is_empty()
    }

    pub fn is_unknown(&self) -> bool {
        self.version == UNKNOWN_VERSION
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) version={}",
            self.name,
            self.path.display(),
            self.version
        )?;
        if self.has_diff() {
            write!(f, "*\n{}", self.diff.trim_end())?;
        }
        Ok(())
    }
}

/// Builds [`Dependency`] records.
///
/// Holds everything a single record needs: the loader to locate and import
/// the package, the heuristic chain, and the standard-library root.
pub struct DependencyResolver<'a> {
    loader: &'a dyn ModuleLoader,
    probe: VersionControlProbe,
    chain: HeuristicChain,
    stdlib_root: PathBuf,
    extra: Vec<Arc<dyn VersionHeuristic>>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        loader: &'a dyn ModuleLoader,
        probe: VersionControlProbe,
        stdlib_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            loader,
            chain: HeuristicChain::standard(probe.clone()),
            probe,
            stdlib_root: stdlib_root.into(),
            extra: Vec::new(),
        }
    }

    /// Heuristics to try after the built-in chain.
    pub fn with_extra_heuristics(mut self, extra: Vec<Arc<dyn VersionHeuristic>>) -> Self {
        self.extra = extra;
        self
    }

    /// Whether `path` sits directly in the standard library root.
    pub fn is_stdlib(&self, path: &Path) -> bool {
        path.parent() == Some(self.stdlib_root.as_path())
    }

    /// Build the record for `name`.
    ///
    /// A missing `path` is looked up through the loader; a missing `version`
    /// is determined by importing the package and running the heuristic
    /// chain. Lookup failures and (under [`ChangePolicy::Error`]) dirty
    /// working copies are errors; import failures are recorded.
    pub fn resolve(
        &self,
        name: &str,
        path: Option<PathBuf>,
        version: Option<String>,
        policy: ChangePolicy,
    ) -> Result<Dependency> {
        let path = match path {
            Some(path) => path,
            None => self.loader.locate(name)?,
        };
        let in_stdlib = self.is_stdlib(&path);

        let mut dependency = Dependency {
            name: name.to_string(),
            path,
            in_stdlib,
            version: UNKNOWN_VERSION.to_string(),
            diff: String::new(),
            import_error: None,
        };

        if let Some(version) = version {
            dependency.version = version;
            return Ok(dependency);
        }

        let module = match self.loader.import(name) {
            Ok(module) => module,
            Err(e) => {
                warn!(dependency = name, error = %e, "import failed, version unknown");
                dependency.import_error = Some(e);
                return Ok(dependency);
            }
        };

        match self.chain.resolve(&module, &self.extra) {
            Ok(version) => dependency.version = version,
            Err(DepprovError::UncommittedModifications { path })
                if policy == ChangePolicy::StoreDiff =>
            {
                let (revision, diff) = self.revision_and_diff(&path)?;
                debug!(dependency = name, bytes = diff.len(), "storing working copy diff");
                dependency.version = revision;
                dependency.diff = diff;
            }
            Err(e) => return Err(e),
        }

        info!(
            dependency = %dependency.name,
            version = %dependency.version,
            in_stdlib = dependency.in_stdlib,
            "resolved dependency"
        );
        Ok(dependency)
    }

    fn revision_and_diff(&self, path: &Path) -> Result<(String, String)> {
        match self.probe.probe(path)? {
            ProbeOutcome::Dirty(wc) => Ok((wc.revision()?, wc.diff()?)),
            ProbeOutcome::Clean { revision, .. } => Ok((revision, String::new())),
            ProbeOutcome::Absent => Err(DepprovError::VersionControl {
                path: path.to_path_buf(),
                message: "working copy disappeared while resolving".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Attribute, InMemoryLoader, LoadedModule};
    use crate::vcs::{InMemoryVcs, InMemoryWorkingCopy};

    const STDLIB: &str = "/usr/lib/python3.12";

    fn probe(copies: Vec<InMemoryWorkingCopy>) -> VersionControlProbe {
        VersionControlProbe::new(vec![InMemoryVcs::shared(copies)])
    }

    fn versioned(name: &str, root: &str, version: &str) -> LoadedModule {
        LoadedModule::new(name)
            .with_file(format!("{root}/__init__.py"))
            .with_package_root(root)
            .with_attribute("__version__", Attribute::Value(version.into()))
    }

    #[test]
    fn change_policy_parses_supported_values() {
        assert_eq!("error".parse::<ChangePolicy>().unwrap(), ChangePolicy::Error);
        assert_eq!(
            "store-diff".parse::<ChangePolicy>().unwrap(),
            ChangePolicy::StoreDiff
        );
        assert_eq!(ChangePolicy::default(), ChangePolicy::Error);
    }

    #[test]
    fn change_policy_rejects_anything_else() {
        let err = "ignore".parse::<ChangePolicy>().unwrap_err();
        assert!(matches!(err, DepprovError::UnsupportedChangePolicy { ref value } if value == "ignore"));
        assert!("Error".parse::<ChangePolicy>().is_err());
    }

    #[test]
    fn change_policy_display_round_trips() {
        for policy in [ChangePolicy::Error, ChangePolicy::StoreDiff] {
            assert_eq!(policy.to_string().parse::<ChangePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn located_and_imported_dependency_gets_attribute_version() {
        let loader = InMemoryLoader::new().with_module("/site/a", versioned("a", "/site/a", "1.2.3"));
        let resolver = DependencyResolver::new(&loader, probe(vec![]), STDLIB);

        let dep = resolver.resolve("a", None, None, ChangePolicy::Error).unwrap();

        assert_eq!(dep.path, PathBuf::from("/site/a"));
        assert_eq!(dep.version, "1.2.3");
        assert!(!dep.in_stdlib);
        assert!(dep.diff.is_empty());
        assert!(dep.import_error.is_none());
    }

    #[test]
    fn lookup_failure_is_fatal() {
        let loader = InMemoryLoader::new();
        let resolver = DependencyResolver::new(&loader, probe(vec![]), STDLIB);

        let err = resolver.resolve("missing", None, None, ChangePolicy::Error).unwrap_err();

        assert!(matches!(err, DepprovError::LookupFailed { .. }));
    }

    #[test]
    fn import_failure_is_recorded_with_unknown_version() {
        let loader = InMemoryLoader::new().broken("b", "/site/b", "ImportError: needs c");
        let resolver = DependencyResolver::new(&loader, probe(vec![]), STDLIB);

        let dep = resolver.resolve("b", None, None, ChangePolicy::Error).unwrap();

        assert!(dep.is_unknown());
        assert_eq!(dep.import_error.unwrap().message, "ImportError: needs c");
    }

    #[test]
    fn explicit_path_and_version_skip_loader() {
        let loader = InMemoryLoader::new();
        let resolver = DependencyResolver::new(&loader, probe(vec![]), STDLIB);

        let dep = resolver
            .resolve("a", Some("/opt/a".into()), Some("7.0".into()), ChangePolicy::Error)
            .unwrap();

        assert_eq!(dep.version, "7.0");
        assert!(loader.imports().is_empty());
    }

    #[test]
    fn in_stdlib_requires_exact_parent() {
        let loader = InMemoryLoader::new();
        let resolver = DependencyResolver::new(&loader, probe(vec![]), STDLIB);

        assert!(resolver.is_stdlib(Path::new("/usr/lib/python3.12/json")));
        assert!(!resolver.is_stdlib(Path::new("/usr/lib/python3.12/site-packages/a")));
        assert!(!resolver.is_stdlib(Path::new("/usr/lib/python3.12")));
    }

    #[test]
    fn dirty_working_copy_with_error_policy_aborts() {
        let loader = InMemoryLoader::new().with_module("/src/a/a", versioned("a", "/src/a/a", "1.0"));
        let resolver = DependencyResolver::new(
            &loader,
            probe(vec![InMemoryWorkingCopy::dirty("/src/a", "abc123", "+x\n")]),
            STDLIB,
        );

        let err = resolver.resolve("a", None, None, ChangePolicy::Error).unwrap_err();

        assert!(matches!(err, DepprovError::UncommittedModifications { .. }));
    }

    #[test]
    fn dirty_working_copy_with_store_diff_records_revision_and_diff() {
        let loader = InMemoryLoader::new().with_module("/src/a/a", versioned("a", "/src/a/a", "1.0"));
        let resolver = DependencyResolver::new(
            &loader,
            probe(vec![InMemoryWorkingCopy::dirty("/src/a", "abc123", "+x\n")]),
            STDLIB,
        );

        let dep = resolver.resolve("a", None, None, ChangePolicy::StoreDiff).unwrap();

        assert_eq!(dep.version, "abc123");
        assert_eq!(dep.diff, "+x\n");
        assert!(dep.has_diff());
    }

    #[test]
    fn store_diff_without_any_commit_is_an_error() {
        let loader = InMemoryLoader::new().with_module("/src/a/a", versioned("a", "/src/a/a", "1.0"));
        let resolver = DependencyResolver::new(
            &loader,
            probe(vec![InMemoryWorkingCopy::uncommitted("/src/a")]),
            STDLIB,
        );

        let err = resolver.resolve("a", None, None, ChangePolicy::StoreDiff).unwrap_err();

        assert!(matches!(err, DepprovError::VersionControl { .. }));
    }

    #[test]
    fn display_marks_diff() {
        let mut dep = Dependency {
            name: "a".into(),
            path: "/src/a".into(),
            in_stdlib: false,
            version: "abc123".into(),
            diff: String::new(),
            import_error: None,
        };
        assert_eq!(dep.to_string(), "a (/src/a) version=abc123");

        dep.diff = "+x\n".into();
        assert_eq!(dep.to_string(), "a (/src/a) version=abc123*\n+x");
    }

    #[test]
    fn import_error_is_omitted_from_json_when_absent() {
        let dep = Dependency {
            name: "a".into(),
            path: "/site/a".into(),
            in_stdlib: false,
            version: "1".into(),
            diff: String::new(),
            import_error: None,
        };
        let json = serde_json::to_value(&dep).unwrap();
        assert!(json.get("import_error").is_none());
        assert_eq!(json["version"], "1");
    }
}
