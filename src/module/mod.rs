//! Loaded modules and the loader capability.
//!
//! Importing a module is modelled as an injected [`ModuleLoader`] rather
//! than a hidden global, so the version heuristics only ever see a
//! [`LoadedModule`] snapshot: where it lives and what its conventional
//! version attributes hold.
//!
//! # Modules
//!
//! - [`memory`] - In-memory loader for tests and embedding
//! - [`python`] - Loader backed by a real Python interpreter

pub mod memory;
pub mod python;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::error::Result;

pub use memory::InMemoryLoader;
pub use python::PythonInterpreter;

/// Attribute names that conventionally expose a version, in priority order.
pub const VERSION_ATTRIBUTES: [&str; 4] = ["version", "get_version", "__version__", "VERSION"];

/// A module that was found but could not be imported.
///
/// This is recorded on the dependency, not raised: an unimportable
/// dependency still gets a record, with an unknown version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("cannot import '{module}': {message}")]
pub struct ImportError {
    pub module: String,
    pub message: String,
}

impl ImportError {
    pub fn new(module: &str, message: impl Into<String>) -> Self {
        Self {
            module: module.to_string(),
            message: message.into(),
        }
    }
}

type CallFn = dyn Fn() -> anyhow::Result<Option<String>> + Send + Sync;

/// A zero-argument callable attribute.
///
/// Calling it yields the stringified return value, or `None` for a null
/// return.
#[derive(Clone)]
pub struct Callable(Arc<CallFn>);

impl Callable {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> anyhow::Result<Option<String>> {
        (self.0)()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// Value of a module attribute, as far as version detection cares.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// The attribute exists but holds a null value.
    Null,

    /// Any plain value, already stringified.
    Value(String),

    /// Something that can be called with no arguments.
    Callable(Callable),

    /// A nested module.
    Module(LoadedModule),
}

/// Snapshot of an imported module.
#[derive(Debug, Clone, Default)]
pub struct LoadedModule {
    /// Fully qualified module name.
    pub name: String,

    /// Source file the module was loaded from, if any.
    pub file: Option<PathBuf>,

    /// First entry of the package search path; `None` for plain modules.
    pub package_root: Option<PathBuf>,

    attributes: BTreeMap<String, Attribute>,
}

impl LoadedModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the source file.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Mark this module as a package rooted at `root`.
    pub fn with_package_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.package_root = Some(root.into());
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Directory containing the module's source file.
    pub fn install_dir(&self) -> Option<&Path> {
        self.file.as_deref().and_then(Path::parent)
    }
}

/// Locates and imports modules by name.
///
/// Implementations may mutate process-wide import state, so a loader must
/// not be driven by two dependency-finding runs at once.
pub trait ModuleLoader {
    /// Filesystem location of the named top-level module: the package
    /// directory for packages, the source file otherwise.
    ///
    /// Failure to locate is a [`DepprovError::LookupFailed`](crate::DepprovError::LookupFailed).
    fn locate(&self, name: &str) -> Result<PathBuf>;

    /// Import the named module.
    fn import(&self, name: &str) -> std::result::Result<LoadedModule, ImportError>;
}
