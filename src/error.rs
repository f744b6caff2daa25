//! Error types for depprov operations.
//!
//! This module defines [`DepprovError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Every variant except [`DepprovError::Io`] and [`DepprovError::Other`]
//!   aborts a whole dependency-finding run
//! - A module that is found but fails to import is *not* an error here; it is
//!   recorded on the dependency as an [`ImportError`](crate::module::ImportError)
//! - Adapters that shell out use `anyhow` internally and convert at the boundary

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for depprov operations.
#[derive(Debug, Error)]
pub enum DepprovError {
    /// A declared dependency could not be located at all.
    #[error("Could not locate module '{name}': {message}")]
    LookupFailed { name: String, message: String },

    /// The version-control working copy backing a dependency has local changes.
    #[error(
        "Working copy at {} has uncommitted modifications. It is therefore not possible \
         to determine the code version. Please commit your modifications.",
        .path.display()
    )]
    UncommittedModifications { path: PathBuf },

    /// The requested change policy is not one of the supported values.
    #[error("Unsupported change policy '{value}': only 'error' and 'store-diff' are supported")]
    UnsupportedChangePolicy { value: String },

    /// No dependency-finding strategy exists for this interpreter kind.
    #[error("Finding dependencies is not yet implemented for {name}")]
    UnsupportedExecutable { name: String },

    /// The import-graph analyzer could not process the script.
    #[error("Failed to analyze imports of {}: {message}", .script.display())]
    DiscoveryFailed { script: PathBuf, message: String },

    /// A version-control query on a located working copy failed.
    #[error("Version control query failed at {}: {message}", .path.display())]
    VersionControl { path: PathBuf, message: String },

    /// An external command failed or could not be started.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {}: {message}", .path.display())]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for depprov operations.
pub type Result<T> = std::result::Result<T, DepprovError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failed_displays_name_and_message() {
        let err = DepprovError::LookupFailed {
            name: "numpy".into(),
            message: "No module named 'numpy'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("numpy"));
        assert!(msg.contains("No module named"));
    }

    #[test]
    fn uncommitted_modifications_names_path_and_asks_for_commit() {
        let err = DepprovError::UncommittedModifications {
            path: PathBuf::from("/src/mylib"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/src/mylib"));
        assert!(msg.contains("Please commit your modifications"));
    }

    #[test]
    fn unsupported_change_policy_lists_supported_values() {
        let err = DepprovError::UnsupportedChangePolicy {
            value: "ignore".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ignore"));
        assert!(msg.contains("'error'"));
        assert!(msg.contains("'store-diff'"));
    }

    #[test]
    fn unsupported_executable_says_not_yet_implemented() {
        let err = DepprovError::UnsupportedExecutable {
            name: "Matlab".into(),
        };
        assert_eq!(
            err.to_string(),
            "Finding dependencies is not yet implemented for Matlab"
        );
    }

    #[test]
    fn discovery_failed_displays_script() {
        let err = DepprovError::DiscoveryFailed {
            script: PathBuf::from("main.py"),
            message: "SyntaxError".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("main.py"));
        assert!(msg.contains("SyntaxError"));
    }

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = DepprovError::CommandFailed {
            command: "git status".into(),
            code: Some(128),
        };
        let msg = err.to_string();
        assert!(msg.contains("git status"));
        assert!(msg.contains("128"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: DepprovError = io_err.into();
        assert!(matches!(err, DepprovError::Io(_)));
    }

    #[test]
    fn anyhow_error_converts_to_other() {
        let err: DepprovError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, DepprovError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
