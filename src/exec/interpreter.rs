// src/exec/interpreter.rs

//! Platform-specific program names for the interpreter and the shell.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ProcessRunner;

/// The interpreter binary when none is configured.
pub fn default_interpreter() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

/// The shell binary when none is configured.
pub fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}

/// Configured interpreter, or the platform default.
pub fn resolve_interpreter(configured: Option<&str>) -> String {
    configured.unwrap_or(default_interpreter()).to_string()
}

/// Configured shell, or the platform default.
pub fn resolve_shell(configured: Option<&str>) -> String {
    configured.unwrap_or(default_shell()).to_string()
}

/// Suffix for a staged shell command file.
pub fn command_file_suffix() -> &'static str {
    if cfg!(windows) { ".bat" } else { ".sh" }
}

/// Body of a staged command file. Batch files would otherwise echo each
/// command into the captured output.
pub fn command_file_body(command: &str) -> String {
    if cfg!(windows) {
        format!("@echo off\r\n{command}\r\n")
    } else {
        format!("{command}\n")
    }
}

/// Arguments that make the shell run a staged command file; the file path
/// is appended after these.
pub fn shell_file_args() -> Vec<String> {
    if cfg!(windows) {
        vec!["/C".to_string()]
    } else {
        Vec::new()
    }
}

/// Arguments that make the shell run `command` inline.
pub fn shell_inline_args(command: &str) -> Vec<String> {
    let flag = if cfg!(windows) { "/C" } else { "-c" };
    vec![flag.to_string(), command.to_string()]
}

/// Answer to `checkInterpreterInstalled`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStatus {
    pub installed: bool,
    pub version: String,
}

/// Run `program version_args...` and report whether it worked.
///
/// Older interpreters print their version on stderr, so stderr is used when
/// stdout is empty.
pub async fn check_installed(
    runner: &dyn ProcessRunner,
    program: &str,
    version_args: &[String],
) -> InstallStatus {
    match runner.capture(program, version_args).await {
        Ok(out) if out.success => {
            let version = match out.stdout.trim() {
                "" => out.stderr.trim().to_string(),
                stdout => stdout.to_string(),
            };
            info!(program, %version, "interpreter found");
            InstallStatus {
                installed: true,
                version,
            }
        }
        Ok(out) => {
            let error = out.stderr.lines().next().unwrap_or_default();
            warn!(program, %error, "interpreter check failed");
            InstallStatus::default()
        }
        Err(err) => {
            warn!(program, error = %err, "interpreter check failed");
            InstallStatus::default()
        }
    }
}
