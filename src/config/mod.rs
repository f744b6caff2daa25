//! Configuration loading.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//!
//! # Example
//!
//! ```
//! use depprov::config::load_merged_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".depprov");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "on_changed: store-diff").unwrap();
//!
//! let settings = load_merged_config(temp.path()).unwrap();
//! assert_eq!(settings.on_changed, "store-diff");
//! ```
//!
//! # Configuration File Locations
//!
//! Merged in this order, later files winning:
//! 1. Project config (`.depprov/config.yml`)
//! 2. Local overrides (`.depprov/config.local.yml`)

pub mod loader;
pub mod merger;
pub mod schema;

pub use loader::{
    find_project_root, load_config, load_config_file, load_config_value, load_merged_config,
    ConfigPaths, CONFIG_DIR,
};
pub use merger::{deep_merge, merge_configs};
pub use schema::{ExecutableConfig, Settings, VcsConfig};
