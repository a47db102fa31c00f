// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration exactly as read from `Execdesk.toml`, before validation.
///
/// ```toml
/// [app]
/// title = "Execdesk"
///
/// [logs]
/// dir = "logs"
///
/// [interpreter]
/// program = "python3.12"
///
/// [executable]
/// extensions = ["exe", "com"]
///
/// [shell]
/// stage_commands = false
/// ```
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub logs: LogsSection,
    #[serde(default)]
    pub interpreter: InterpreterSection,
    #[serde(default)]
    pub executable: ExecutableSection,
    #[serde(default)]
    pub shell: ShellSection,
    #[serde(default)]
    pub staging: StagingSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// (or `Default`), so extension lists are normalised and log names sane.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigFile {
    pub app: AppSection,
    pub logs: LogsSection,
    pub interpreter: InterpreterSection,
    pub executable: ExecutableSection,
    pub shell: ShellSection,
    pub staging: StagingSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            app: raw.app,
            logs: raw.logs,
            interpreter: raw.interpreter,
            executable: raw.executable,
            shell: raw.shell,
            staging: raw.staging,
        }
    }

    /// Look up a dot-separated key path such as `app.title`.
    ///
    /// Returns the whole document for an empty path and `None` for unknown
    /// keys.
    pub fn value_at(&self, key_path: &str) -> Option<serde_json::Value> {
        let mut value = serde_json::to_value(self).ok()?;
        for key in key_path.split('.').filter(|k| !k.is_empty()) {
            value = value.get_mut(key)?.take();
        }
        Some(value)
    }

    /// Logs directory, with relative paths anchored at `base` (normally the
    /// directory holding the config file).
    pub fn logs_dir(&self, base: &Path) -> PathBuf {
        if self.logs.dir.is_absolute() {
            self.logs.dir.clone()
        } else {
            base.join(&self.logs.dir)
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[app]`: user-facing settings handed to the shell as read-only data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_folder")]
    pub default_folder: PathBuf,
    #[serde(default)]
    pub show_hidden_files: bool,
    #[serde(default = "default_true")]
    pub open_last_folder: bool,
    #[serde(default)]
    pub maximize_on_startup: bool,
}

fn default_title() -> String {
    "Execdesk".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_folder() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\Users")
    } else {
        PathBuf::from("/home")
    }
}

fn default_true() -> bool {
    true
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
            default_folder: default_folder(),
            show_hidden_files: false,
            open_last_folder: true,
            maximize_on_startup: false,
        }
    }
}

/// `[logs]`: where the audit logs live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsSection {
    #[serde(default = "default_logs_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_text_file")]
    pub text_file: String,
    #[serde(default = "default_table_file")]
    pub table_file: String,
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_text_file() -> String {
    "app.log".to_string()
}

fn default_table_file() -> String {
    "data.csv".to_string()
}

impl Default for LogsSection {
    fn default() -> Self {
        Self {
            dir: default_logs_dir(),
            text_file: default_text_file(),
            table_file: default_table_file(),
        }
    }
}

/// `[interpreter]`: the script interpreter used for code and script files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterSection {
    /// Explicit binary; when unset the platform default is used
    /// (`python` on Windows, `python3` elsewhere).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    /// Extension used for staged code and required of script files.
    #[serde(default = "default_script_extensions")]
    pub script_extensions: Vec<String>,
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

fn default_script_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

impl Default for InterpreterSection {
    fn default() -> Self {
        Self {
            program: None,
            version_args: default_version_args(),
            script_extensions: default_script_extensions(),
        }
    }
}

/// `[executable]`: which files `runExecutable` accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutableSection {
    #[serde(default = "default_executable_extensions")]
    pub extensions: Vec<String>,
}

fn default_executable_extensions() -> Vec<String> {
    vec!["exe".to_string()]
}

impl Default for ExecutableSection {
    fn default() -> Self {
        Self {
            extensions: default_executable_extensions(),
        }
    }
}

/// `[shell]`: how `runShellCommand` is carried out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellSection {
    /// Explicit shell; defaults to `cmd` on Windows and `sh` elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Write the command to a temporary `.bat`/`.sh` file and run that,
    /// instead of passing it inline with `/C` / `-c`.
    #[serde(default = "default_true")]
    pub stage_commands: bool,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            program: None,
            stage_commands: true,
        }
    }
}

/// `[staging]`: where transient scripts are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingSection {
    /// Defaults to the platform temporary directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}
