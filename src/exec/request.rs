// src/exec/request.rs

//! Execution requests and their resolution to `(program, args)`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ConfigFile;
use crate::fs::FileSystem;

use super::interpreter;

/// One of the four ways an external program is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRequest {
    /// Interpreter source supplied as text; staged to a temporary script.
    RunCode { source: String },
    /// An existing script file, run with the interpreter.
    RunFile { path: PathBuf },
    /// An executable file run directly with `args`.
    RunExecutable { path: PathBuf, args: Vec<String> },
    /// A single shell command line.
    RunShellCommand { command_text: String },
}

impl ExecutionRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ExecutionRequest::RunCode { .. } => RequestKind::RunCode,
            ExecutionRequest::RunFile { .. } => RequestKind::RunFile,
            ExecutionRequest::RunExecutable { .. } => RequestKind::RunExecutable,
            ExecutionRequest::RunShellCommand { .. } => RequestKind::RunShellCommand,
        }
    }

    /// What the request points at, for log lines and telemetry.
    pub fn target(&self) -> String {
        match self {
            ExecutionRequest::RunCode { source } => format!("<inline code, {} bytes>", source.len()),
            ExecutionRequest::RunFile { path } => path.display().to_string(),
            ExecutionRequest::RunExecutable { path, .. } => path.display().to_string(),
            ExecutionRequest::RunShellCommand { command_text } => command_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    RunCode,
    RunFile,
    RunExecutable,
    RunShellCommand,
}

impl RequestKind {
    /// Name used on the request boundary and in telemetry.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::RunCode => "runCode",
            RequestKind::RunFile => "runScriptFile",
            RequestKind::RunExecutable => "runExecutable",
            RequestKind::RunShellCommand => "runShellCommand",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The settings resolution depends on, extracted from the config.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub interpreter: String,
    pub version_args: Vec<String>,
    /// Lowercase, without dots. The first entry names staged code files.
    pub script_extensions: Vec<String>,
    pub executable_extensions: Vec<String>,
    pub shell: String,
    pub stage_commands: bool,
}

impl ExecutionSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            interpreter: interpreter::resolve_interpreter(cfg.interpreter.program.as_deref()),
            version_args: cfg.interpreter.version_args.clone(),
            script_extensions: cfg.interpreter.script_extensions.clone(),
            executable_extensions: cfg.executable.extensions.clone(),
            shell: interpreter::resolve_shell(cfg.shell.program.as_deref()),
            stage_commands: cfg.shell.stage_commands,
        }
    }

    /// Validate `request` and decide how to run it.
    ///
    /// `Err` carries the validation message returned to the caller; nothing
    /// has been staged or spawned at that point.
    pub fn plan(&self, request: &ExecutionRequest, fs: &dyn FileSystem) -> Result<Plan, String> {
        match request {
            ExecutionRequest::RunCode { source } => Ok(Plan::Staged {
                content: source.clone(),
                suffix: format!(".{}", self.staged_code_extension()),
                program: self.interpreter.clone(),
                leading_args: Vec::new(),
            }),

            ExecutionRequest::RunFile { path } => {
                if !fs.exists(path) {
                    return Err(format!("script file not found: {}", path.display()));
                }
                if !fs.is_file(path) {
                    return Err(format!("not a file: {}", path.display()));
                }
                if !has_extension(path, &self.script_extensions) {
                    return Err(invalid_extension_message("script", &self.script_extensions));
                }
                Ok(Plan::Direct {
                    program: self.interpreter.clone(),
                    args: vec![path.to_string_lossy().into_owned()],
                })
            }

            ExecutionRequest::RunExecutable { path, args } => {
                if !has_extension(path, &self.executable_extensions) {
                    return Err(invalid_extension_message("executable", &self.executable_extensions));
                }
                Ok(Plan::Direct {
                    program: path.to_string_lossy().into_owned(),
                    args: args.clone(),
                })
            }

            ExecutionRequest::RunShellCommand { command_text } => {
                if command_text.trim().is_empty() {
                    return Err("command must not be empty".to_string());
                }
                if self.stage_commands {
                    Ok(Plan::Staged {
                        content: interpreter::command_file_body(command_text),
                        suffix: interpreter::command_file_suffix().to_string(),
                        program: self.shell.clone(),
                        leading_args: interpreter::shell_file_args(),
                    })
                } else {
                    Ok(Plan::Direct {
                        program: self.shell.clone(),
                        args: interpreter::shell_inline_args(command_text),
                    })
                }
            }
        }
    }

    fn staged_code_extension(&self) -> &str {
        self.script_extensions.first().map_or("py", String::as_str)
    }
}

/// How a validated request is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run `program args...` as is.
    Direct { program: String, args: Vec<String> },
    /// Stage `content` first, then run `program leading_args... <artifact>`.
    Staged {
        content: String,
        suffix: String,
        program: String,
        leading_args: Vec<String>,
    },
}

/// Case-insensitive extension check against a normalised list.
fn has_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| allowed.iter().any(|a| *a == ext))
}

/// e.g. `invalid executable file. Must be an .exe file.`
pub fn invalid_extension_message(noun: &str, allowed: &[String]) -> String {
    let dotted: Vec<String> = allowed.iter().map(|e| format!(".{e}")).collect();
    let list = match dotted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    };
    let article = match allowed.first().and_then(|e| e.chars().next()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    };
    format!("invalid {noun} file. Must be {article} {list} file.")
}
