// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Environment variable that overrides the default config location.
pub const CONFIG_ENV: &str = "EXECDESK_CONFIG";

/// Load a configuration file and return the raw, unvalidated document.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(fs, path)?;
    ConfigFile::try_from(raw_config)
}

/// Load the config at `path`, or write a default one there if it is missing.
///
/// Failing to write the default file is not fatal: the defaults are still
/// returned so the application can start from a read-only location.
pub fn load_or_init(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if fs.exists(path) {
        let cfg = load_and_validate(fs, path)?;
        info!(path = %path.display(), "configuration loaded");
        return Ok(cfg);
    }

    let cfg = ConfigFile::default();
    let rendered = toml::to_string_pretty(&cfg)?;
    match fs.write(path, rendered.as_bytes()) {
        Ok(()) => info!(path = %path.display(), "config file not found, wrote defaults"),
        Err(err) => warn!(
            path = %path.display(),
            error = %err,
            "config file not found and defaults could not be written"
        ),
    }
    Ok(cfg)
}

/// `EXECDESK_CONFIG` if set, otherwise `Execdesk.toml` in the working
/// directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Execdesk.toml"))
}

/// Directory relative paths in the config are anchored at.
///
/// A bare file name like `Execdesk.toml` has an empty parent, in which case
/// the current working directory is used.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
