//! depprov - Find the packages a script depends on and pin their versions.
//!
//! Before a script runs, depprov works out which external packages it
//! imports and records an unambiguous version for each, so that a later
//! re-run can be checked against the same code. Versions come from a fixed
//! chain of heuristics: the revision of a clean version-control checkout,
//! then conventional version attributes, then packaging metadata.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and merging
//! - [`dependency`] - Dependency records and the change policy
//! - [`discovery`] - Import analysis and package discovery
//! - [`error`] - Error types and result aliases
//! - [`finder`] - Dependency finding for a whole script
//! - [`heuristics`] - Version heuristics and their chain
//! - [`module`] - Loaded modules and module loaders
//! - [`report`] - Text and JSON rendering
//! - [`shell`] - External command execution
//! - [`survey`] - Survey of installed packages
//! - [`vcs`] - Version-control probing
//!
//! # Example
//!
//! ```
//! use depprov::discovery::{AnalyzedModule, InMemoryAnalyzer};
//! use depprov::finder::{DependencyFinder, ExecutableDescriptor};
//! use depprov::module::{Attribute, InMemoryLoader, LoadedModule};
//! use depprov::vcs::VersionControlProbe;
//! use tempfile::TempDir;
//!
//! let temp = TempDir::new().unwrap();
//! let script = temp.path().join("main.py");
//! std::fs::write(&script, "import requests\n").unwrap();
//!
//! let analyzer = InMemoryAnalyzer::new()
//!     .with_module("requests", AnalyzedModule::package("/site/requests"));
//! let loader = InMemoryLoader::new().with_module(
//!     "/site/requests",
//!     LoadedModule::new("requests")
//!         .with_attribute("__version__", Attribute::Value("2.31.0".into())),
//! );
//! let finder = DependencyFinder::new(
//!     &analyzer,
//!     &loader,
//!     VersionControlProbe::new(Vec::new()),
//!     "/usr/lib/python3.12",
//! );
//!
//! let deps = finder
//!     .find_dependencies(&script, &ExecutableDescriptor::python("python3"), "error")
//!     .unwrap();
//! assert_eq!(deps[0].to_string(), "requests (/site/requests) version=2.31.0");
//! ```

pub mod cli;
pub mod config;
pub mod dependency;
pub mod discovery;
pub mod error;
pub mod finder;
pub mod heuristics;
pub mod module;
pub mod report;
pub mod shell;
pub mod survey;
pub mod vcs;

pub use dependency::{ChangePolicy, Dependency};
pub use error::{DepprovError, Result};
pub use finder::{DependencyFinder, ExecutableDescriptor};
