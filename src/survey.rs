//! Survey of installed packages.
//!
//! Walks a site-packages directory and reports the version the heuristic
//! chain finds for each importable top-level package. Useful for checking
//! which heuristics cover an environment before pinning real scripts.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{DepprovError, Result};
use crate::heuristics::HeuristicChain;
use crate::module::ModuleLoader;

/// Version found for one installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyEntry {
    pub name: String,
    pub version: String,
}

impl fmt::Display for SurveyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Candidate package name for a site-packages entry.
///
/// Only extensionless entries and `.egg` bundles qualify; the name ends at
/// the first `-`.
pub fn candidate_name(entry: &str) -> Option<&str> {
    let stem_len = match entry.rfind('.') {
        Some(0) | None => entry.len(),
        Some(dot) if &entry[dot..] == ".egg" => dot,
        Some(_) => return None,
    };
    let name = entry[..stem_len].split('-').next().unwrap_or_default();
    (!name.is_empty()).then_some(name)
}

/// Resolve the version of every importable package in `site_dir`.
///
/// Entries that fail to import, and packages in modified or unreadable
/// working copies, are left out. Results are ordered by name.
pub fn survey(
    site_dir: &Path,
    loader: &dyn ModuleLoader,
    chain: &HeuristicChain,
) -> Result<Vec<SurveyEntry>> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(site_dir)? {
        let file_name = entry?.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(name) = candidate_name(file_name) {
            names.push(name.to_string());
        }
    }
    names.sort();
    names.dedup();
    debug!(site_dir = %site_dir.display(), candidates = names.len(), "surveying");

    let mut found = BTreeMap::new();
    for name in names {
        let module = match loader.import(&name) {
            Ok(module) => module,
            Err(e) => {
                debug!(package = %name, error = %e, "skipping unimportable entry");
                continue;
            }
        };
        match chain.resolve(&module, &[]) {
            Ok(version) => {
                found.insert(name.clone(), SurveyEntry { name, version });
            }
            Err(e @ DepprovError::UncommittedModifications { .. }) => {
                warn!(package = %name, error = %e, "skipping modified working copy");
            }
            Err(e @ DepprovError::VersionControl { .. }) => {
                warn!(package = %name, error = %e, "skipping unreadable working copy");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(found.into_values().collect())
}
