//! Dependency finding for a whole script.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::dependency::{ChangePolicy, Dependency, DependencyResolver};
use crate::discovery::{discover, ImportAnalyzer};
use crate::error::{DepprovError, Result};
use crate::heuristics::VersionHeuristic;
use crate::module::ModuleLoader;
use crate::vcs::VersionControlProbe;

/// The program that will run a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableDescriptor {
    /// Kind of executable, e.g. `Python`.
    pub name: String,

    /// Path (or command name) of the binary.
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ExecutableDescriptor {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            version: None,
        }
    }

    /// A Python interpreter at `path`.
    pub fn python(path: impl Into<PathBuf>) -> Self {
        Self::new("Python", path)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether this names a Python interpreter.
    pub fn is_python(&self) -> bool {
        self.name.eq_ignore_ascii_case("python")
    }
}

/// Finds and pins the dependencies of scripts.
///
/// All collaborators are injected: the import analyzer, the module loader,
/// and the version-control probe. The standard-library root and search path
/// describe the environment the script will run in.
pub struct DependencyFinder<'a> {
    analyzer: &'a dyn ImportAnalyzer,
    loader: &'a dyn ModuleLoader,
    probe: VersionControlProbe,
    stdlib_root: PathBuf,
    search_path: Vec<PathBuf>,
}

impl<'a> DependencyFinder<'a> {
    pub fn new(
        analyzer: &'a dyn ImportAnalyzer,
        loader: &'a dyn ModuleLoader,
        probe: VersionControlProbe,
        stdlib_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            analyzer,
            loader,
            probe,
            stdlib_root: stdlib_root.into(),
            search_path: Vec::new(),
        }
    }

    /// Library search path handed to the import analyzer.
    pub fn with_search_path(mut self, search_path: Vec<PathBuf>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Pin every non-standard-library package that `script` imports.
    ///
    /// `on_changed` is validated before anything else happens. The result is
    /// ordered by package name; the first fatal error aborts the run.
    pub fn find_dependencies(
        &self,
        script: &Path,
        executable: &ExecutableDescriptor,
        on_changed: &str,
    ) -> Result<Vec<Dependency>> {
        self.find_dependencies_with(script, executable, on_changed, &[])
    }

    /// Like [`find_dependencies`](Self::find_dependencies), trying `extra`
    /// after the built-in heuristics for this run only.
    pub fn find_dependencies_with(
        &self,
        script: &Path,
        executable: &ExecutableDescriptor,
        on_changed: &str,
        extra: &[Arc<dyn VersionHeuristic>],
    ) -> Result<Vec<Dependency>> {
        let policy: ChangePolicy = on_changed.parse()?;

        if !executable.is_python() {
            return Err(DepprovError::UnsupportedExecutable {
                name: executable.name.clone(),
            });
        }
        self.find_python(script, policy, extra)
    }

    fn find_python(
        &self,
        script: &Path,
        policy: ChangePolicy,
        extra: &[Arc<dyn VersionHeuristic>],
    ) -> Result<Vec<Dependency>> {
        let packages = discover(self.analyzer, script, &self.search_path)?;
        let resolver = DependencyResolver::new(self.loader, self.probe.clone(), &self.stdlib_root)
            .with_extra_heuristics(extra.to_vec());

        let mut dependencies = Vec::with_capacity(packages.len());
        for name in packages.keys() {
            dependencies.push(resolver.resolve(name, None, None, policy)?);
        }

        let total = dependencies.len();
        dependencies.retain(|d| !d.in_stdlib);
        info!(
            script = %script.display(),
            found = dependencies.len(),
            stdlib = total - dependencies.len(),
            policy = %policy,
            "dependencies found"
        );
        Ok(dependencies)
    }
}
