//! Configuration file discovery and loading.

use crate::config::merger::merge_configs;
use crate::config::schema::Settings;
use crate::error::{DepprovError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding configuration, relative to the project root.
pub const CONFIG_DIR: &str = ".depprov";

/// Paths to configuration files in merge order (later overrides earlier).
///
/// 1. Project config (`.depprov/config.yml`)
/// 2. Local overrides (`.depprov/config.local.yml`)
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: .depprov/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .depprov/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        let dir = project_root.join(CONFIG_DIR);
        Self {
            project: existing(dir.join("config.yml")),
            project_local: existing(dir.join("config.local.yml")),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(&self.project_local).collect()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.exists().then_some(path)
}

/// Find the project root by walking up from `start`.
///
/// A `.depprov` directory marks the root; failing that, a `.git` or `.hg`
/// directory does.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Some(current);
        }
        if current.join(".git").exists() || current.join(".hg").is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load a config file as a raw YAML value (for merging).
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DepprovError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DepprovError::Io(e)
        }
    })?;

    serde_yaml::from_str(&content).map_err(|e| DepprovError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn settings_from_value(value: serde_yaml::Value, source: &Path) -> Result<Settings> {
    if value.is_null() {
        return Ok(Settings::default());
    }
    serde_yaml::from_value(value).map_err(|e| DepprovError::ConfigParseError {
        path: source.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file, without merging.
pub fn load_config_file(path: &Path) -> Result<Settings> {
    settings_from_value(load_config_value(path)?, path)
}

/// Load and merge the project's config files.
///
/// Missing files are not an error: with no config at all the defaults apply.
pub fn load_merged_config(project_root: &Path) -> Result<Settings> {
    let paths = ConfigPaths::discover(project_root);
    let existing = paths.all_existing();
    if existing.is_empty() {
        debug!(root = %project_root.display(), "no config files, using defaults");
        return Ok(Settings::default());
    }

    let mut configs = Vec::with_capacity(existing.len());
    for path in existing {
        debug!(path = %path.display(), "loading config");
        configs.push(load_config_value(path)?);
    }

    settings_from_value(
        merge_configs(&configs),
        &project_root.join(CONFIG_DIR).join("config.yml"),
    )
}

/// Load config with optional path override.
///
/// If `config_override` is provided, loads only that file without merging.
/// Otherwise, discovers and merges the project's config files.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<Settings> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(root: &Path, name: &str, content: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn discover_finds_project_and_local_config() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yml", "on_changed: error");
        write_config(temp.path(), "config.local.yml", "on_changed: store-diff");

        let paths = ConfigPaths::discover(temp.path());

        assert!(paths.project.is_some());
        assert!(paths.project_local.is_some());
        assert_eq!(paths.all_existing().len(), 2);
    }

    #[test]
    fn missing_config_yields_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_merged_config(temp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn local_overrides_project() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.yml",
            "on_changed: error\nexecutable:\n  path: python3.11\n",
        );
        write_config(temp.path(), "config.local.yml", "on_changed: store-diff\n");

        let settings = load_merged_config(temp.path()).unwrap();

        assert_eq!(settings.on_changed, "store-diff");
        assert_eq!(settings.executable.path, PathBuf::from("python3.11"));
    }

    #[test]
    fn empty_local_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yml", "interpreter_timeout_secs: 5\n");
        write_config(temp.path(), "config.local.yml", "");

        let settings = load_merged_config(temp.path()).unwrap();

        assert_eq!(settings.interpreter_timeout_secs, 5);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yml", "on_changed: [unterminated\n");

        let err = load_merged_config(temp.path()).unwrap_err();

        assert!(matches!(err, DepprovError::ConfigParseError { .. }));
    }

    #[test]
    fn wrong_types_are_a_parse_error() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yml", "interpreter_timeout_secs: soon\n");

        let err = load_merged_config(temp.path()).unwrap_err();

        assert!(matches!(err, DepprovError::ConfigParseError { .. }));
    }

    #[test]
    fn override_loads_only_that_file() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yml", "on_changed: store-diff\n");
        let other = temp.path().join("other.yml");
        fs::write(&other, "interpreter_timeout_secs: 9\n").unwrap();

        let settings = load_config(temp.path(), Some(&other)).unwrap();

        assert_eq!(settings.on_changed, "error");
        assert_eq!(settings.interpreter_timeout_secs, 9);
    }

    #[test]
    fn missing_override_is_config_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path(), Some(&temp.path().join("nope.yml"))).unwrap_err();
        assert!(matches!(err, DepprovError::ConfigNotFound { .. }));
    }

    #[test]
    fn find_project_root_walks_up_to_config_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(CONFIG_DIR)).unwrap();
        let nested = temp.path().join("scripts").join("analysis");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(temp.path().to_path_buf()));
    }
}
