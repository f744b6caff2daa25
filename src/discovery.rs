//! Package discovery.
//!
//! Turns the raw output of an import-graph analyzer into the set of
//! top-level packages a script depends on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DepprovError, Result};

/// A module reported by the import-graph analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedModule {
    /// Package directory for packages, source file otherwise.
    pub path: Option<PathBuf>,

    /// Whether the module is a package.
    pub is_package: bool,
}

impl AnalyzedModule {
    pub fn package(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            is_package: true,
        }
    }

    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            is_package: false,
        }
    }
}

/// Static import-graph analysis.
pub trait ImportAnalyzer {
    /// Every module reachable from `script`, keyed by dotted name.
    ///
    /// Resolution uses `search_path` only. An analyzer that cannot process
    /// the script returns [`DepprovError::DiscoveryFailed`].
    fn analyze(&self, script: &Path, search_path: &[PathBuf])
        -> Result<BTreeMap<String, AnalyzedModule>>;
}

/// Top-level packages imported by `script`.
///
/// Submodules (names containing `.`) and single-file modules are dropped.
pub fn discover(
    analyzer: &dyn ImportAnalyzer,
    script: &Path,
    search_path: &[PathBuf],
) -> Result<BTreeMap<String, AnalyzedModule>> {
    if !script.is_file() {
        return Err(DepprovError::DiscoveryFailed {
            script: script.to_path_buf(),
            message: "script not found".to_string(),
        });
    }

    let modules = analyzer.analyze(script, search_path)?;
    let packages: BTreeMap<_, _> = modules
        .into_iter()
        .filter(|(name, module)| !name.contains('.') && module.is_package)
        .collect();

    debug!(
        script = %script.display(),
        packages = ?packages.keys().collect::<Vec<_>>(),
        "discovered packages"
    );
    Ok(packages)
}

/// An analyzer that returns a fixed answer.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAnalyzer {
    modules: BTreeMap<String, AnalyzedModule>,
    failure: Option<String>,
}

impl InMemoryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, module: AnalyzedModule) -> Self {
        self.modules.insert(name.to_string(), module);
        self
    }

    /// An analyzer that rejects every script with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            modules: BTreeMap::new(),
            failure: Some(message.to_string()),
        }
    }
}

impl ImportAnalyzer for InMemoryAnalyzer {
    fn analyze(
        &self,
        script: &Path,
        _search_path: &[PathBuf],
    ) -> Result<BTreeMap<String, AnalyzedModule>> {
        match &self.failure {
            Some(message) => Err(DepprovError::DiscoveryFailed {
                script: script.to_path_buf(),
                message: message.clone(),
            }),
            None => Ok(self.modules.clone()),
        }
    }
}
