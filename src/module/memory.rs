//! In-memory module loader.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{ImportError, LoadedModule, ModuleLoader};
use crate::error::{DepprovError, Result};

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    module: std::result::Result<LoadedModule, String>,
}

/// A loader serving pre-built module snapshots.
///
/// Modules that are registered with [`InMemoryLoader::broken`] can be located
/// but fail to import; unregistered names cannot be located at all.
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    entries: BTreeMap<String, Entry>,
    imports: RefCell<Vec<String>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an importable module located at `path`.
    pub fn with_module(mut self, path: impl Into<PathBuf>, module: LoadedModule) -> Self {
        self.entries.insert(
            module.name.clone(),
            Entry {
                path: path.into(),
                module: Ok(module),
            },
        );
        self
    }

    /// Register a module at `path` whose import fails with `message`.
    pub fn broken(mut self, name: &str, path: impl Into<PathBuf>, message: &str) -> Self {
        self.entries.insert(
            name.to_string(),
            Entry {
                path: path.into(),
                module: Err(message.to_string()),
            },
        );
        self
    }

    /// Names imported so far, in order.
    pub fn imports(&self) -> Vec<String> {
        self.imports.borrow().clone()
    }
}

impl ModuleLoader for InMemoryLoader {
    fn locate(&self, name: &str) -> Result<PathBuf> {
        self.entries
            .get(name)
            .map(|e| e.path.clone())
            .ok_or_else(|| DepprovError::LookupFailed {
                name: name.to_string(),
                message: format!("No module named '{name}'"),
            })
    }

    fn import(&self, name: &str) -> std::result::Result<LoadedModule, ImportError> {
        self.imports.borrow_mut().push(name.to_string());
        match self.entries.get(name) {
            Some(Entry { module: Ok(m), .. }) => Ok(m.clone()),
            Some(Entry {
                module: Err(message),
                ..
            }) => Err(ImportError::new(name, message.clone())),
            None => Err(ImportError::new(name, format!("No module named '{name}'"))),
        }
    }
}
