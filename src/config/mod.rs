// src/config/mod.rs

//! Configuration loading and validation for execdesk.
//!
//! - `model.rs`: the TOML-backed data model and its defaults.
//! - `loader.rs`: reading (or creating) the file through [`crate::fs`].
//! - `validate.rs`: `TryFrom<RawConfigFile> for ConfigFile`.
//!
//! The loaded [`ConfigFile`] is read-only for the rest of the application.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path, load_or_init};
pub use model::{
    AppSection, ConfigFile, ExecutableSection, InterpreterSection, LogsSection, RawConfigFile,
    ShellSection, StagingSection,
};
