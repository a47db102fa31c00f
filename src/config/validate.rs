// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExecdeskError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ExecdeskError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&mut raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &mut RawConfigFile) -> Result<()> {
    normalize_extensions("interpreter.script_extensions", &mut cfg.interpreter.script_extensions)?;
    normalize_extensions("executable.extensions", &mut cfg.executable.extensions)?;
    validate_logs(cfg)?;
    validate_programs(cfg)?;
    Ok(())
}

/// Strip leading dots, lowercase, and reject empty lists or entries.
fn normalize_extensions(field: &str, exts: &mut Vec<String>) -> Result<()> {
    if exts.is_empty() {
        return Err(ExecdeskError::ConfigError(format!(
            "{field} must list at least one extension"
        )));
    }
    for ext in exts.iter_mut() {
        let normalized = ext.trim().trim_start_matches('.').to_lowercase();
        if normalized.is_empty() {
            return Err(ExecdeskError::ConfigError(format!(
                "{field} contains an empty extension"
            )));
        }
        *ext = normalized;
    }
    let mut seen: Vec<String> = Vec::with_capacity(exts.len());
    exts.retain(|ext| {
        if seen.contains(ext) {
            false
        } else {
            seen.push(ext.clone());
            true
        }
    });
    Ok(())
}

fn validate_logs(cfg: &RawConfigFile) -> Result<()> {
    let logs = &cfg.logs;
    for (field, name) in [("logs.text_file", &logs.text_file), ("logs.table_file", &logs.table_file)] {
        if name.trim().is_empty() {
            return Err(ExecdeskError::ConfigError(format!("{field} must not be empty")));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(ExecdeskError::ConfigError(format!(
                "{field} must be a bare file name, got '{name}'"
            )));
        }
    }
    if logs.text_file == logs.table_file {
        return Err(ExecdeskError::ConfigError(format!(
            "logs.text_file and logs.table_file must differ (both '{}')",
            logs.text_file
        )));
    }
    Ok(())
}

fn validate_programs(cfg: &RawConfigFile) -> Result<()> {
    for (field, program) in [
        ("interpreter.program", &cfg.interpreter.program),
        ("shell.program", &cfg.shell.program),
    ] {
        if program.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ExecdeskError::ConfigError(format!(
                "{field} must not be empty when set"
            )));
        }
    }
    Ok(())
}
