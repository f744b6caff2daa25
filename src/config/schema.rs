//! Configuration schema.
//!
//! These structs map to `.depprov/config.yml`. Every field has a default,
//! so an empty or missing file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::dependency::ChangePolicy;
use crate::error::Result;
use crate::finder::ExecutableDescriptor;
use crate::vcs::{BackendKind, VersionControlProbe};

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Policy for dependencies in modified working copies: `error` or
    /// `store-diff`. Kept as a string so that an invalid value is reported
    /// when a run starts, like any other caller-supplied policy.
    #[serde(default = "default_on_changed")]
    pub on_changed: String,

    /// The interpreter scripts are run with.
    pub executable: ExecutableConfig,

    /// Deadline for each interpreter subprocess, in seconds.
    #[serde(default = "default_interpreter_timeout")]
    pub interpreter_timeout_secs: u64,

    /// Version-control probing.
    pub vcs: VcsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            on_changed: default_on_changed(),
            executable: ExecutableConfig::default(),
            interpreter_timeout_secs: default_interpreter_timeout(),
            vcs: VcsConfig::default(),
        }
    }
}

impl Settings {
    /// The configured change policy.
    pub fn change_policy(&self) -> Result<ChangePolicy> {
        self.on_changed.parse()
    }

    pub fn interpreter_timeout(&self) -> Duration {
        Duration::from_secs(self.interpreter_timeout_secs)
    }

    /// Descriptor for the configured executable.
    pub fn executable_descriptor(&self) -> ExecutableDescriptor {
        ExecutableDescriptor::new(&self.executable.name, &self.executable.path)
    }

    /// Probe over the configured backends.
    pub fn vcs_probe(&self) -> VersionControlProbe {
        VersionControlProbe::from_kinds(
            &self.vcs.backends,
            Duration::from_secs(self.vcs.timeout_secs),
        )
    }
}

fn default_on_changed() -> String {
    ChangePolicy::default().to_string()
}

fn default_interpreter_timeout() -> u64 {
    60
}

/// The program scripts are run with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutableConfig {
    /// Kind of executable; only `Python` is supported.
    pub name: String,

    /// Interpreter binary, looked up on `PATH` when relative.
    pub path: PathBuf,
}

impl Default for ExecutableConfig {
    fn default() -> Self {
        Self {
            name: "Python".to_string(),
            path: PathBuf::from("python3"),
        }
    }
}

/// Version-control settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    /// Backends to try, in order.
    pub backends: Vec<BackendKind>,

    /// Deadline for each version-control command, in seconds.
    pub timeout_secs: u64,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendKind::Git, BackendKind::Mercurial],
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DepprovError;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.on_changed, "error");
        assert_eq!(settings.executable.name, "Python");
        assert_eq!(settings.executable.path, PathBuf::from("python3"));
        assert_eq!(settings.interpreter_timeout_secs, 60);
        assert_eq!(settings.vcs.backends, vec![BackendKind::Git, BackendKind::Mercurial]);
        assert_eq!(settings.vcs.timeout_secs, 30);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: Settings = serde_yaml::from_str(
            r#"
executable:
  path: /opt/venv/bin/python
vcs:
  backends: [mercurial]
"#,
        )
        .unwrap();

        assert_eq!(settings.executable.name, "Python");
        assert_eq!(settings.executable.path, PathBuf::from("/opt/venv/bin/python"));
        assert_eq!(settings.vcs.backends, vec![BackendKind::Mercurial]);
        assert_eq!(settings.vcs.timeout_secs, 30);
    }

    #[test]
    fn change_policy_is_validated_on_use() {
        let settings: Settings = serde_yaml::from_str("on_changed: ignore").unwrap();

        let err = settings.change_policy().unwrap_err();

        assert!(matches!(err, DepprovError::UnsupportedChangePolicy { .. }));
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        let result: std::result::Result<Settings, _> =
            serde_yaml::from_str("vcs:\n  backends: [svn]");
        assert!(result.is_err());
    }

    #[test]
    fn probe_follows_backend_order() {
        let settings: Settings = serde_yaml::from_str("vcs:\n  backends: [mercurial, git]").unwrap();

        let names: Vec<_> = settings.vcs_probe().backends().iter().map(|b| b.name()).collect();

        assert_eq!(names, vec!["mercurial", "git"]);
    }

    #[test]
    fn executable_descriptor_uses_configured_values() {
        let exe = Settings::default().executable_descriptor();
        assert!(exe.is_python());
        assert_eq!(exe.path, PathBuf::from("python3"));
    }
}
