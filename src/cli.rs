// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::telemetry::{LogLevel, ScalarValue};

/// Command-line arguments for `execdesk`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execdesk",
    version,
    about = "Run Python code, scripts, executables and shell commands with an audit trail.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$EXECDESK_CONFIG`, else `Execdesk.toml` in the current
    /// working directory. Written with defaults if it does not exist.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the audit logs. Overrides `[logs].dir`.
    #[arg(long, value_name = "DIR", global = true)]
    pub logs_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECDESK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Print results as JSON instead of raw output.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Report whether the configured interpreter is installed.
    Check,

    /// Run inline interpreter source. Reads stdin when CODE is omitted.
    RunCode {
        #[arg(value_name = "CODE")]
        code: Option<String>,
    },

    /// Run an interpreter script file.
    RunFile {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Run a native executable with optional arguments.
    RunExe {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a shell command line.
    RunCmd {
        #[arg(value_name = "COMMAND")]
        command: String,
    },

    /// Append a line to the text audit log.
    Log {
        message: String,
        #[arg(long, default_value = "info")]
        level: LogLevel,
    },

    /// Append a row to the tabular audit log.
    Record {
        #[arg(value_name = "KEY=VALUE", required = true, value_parser = parse_field)]
        fields: Vec<(String, ScalarValue)>,
    },

    /// Print the loaded config, or the value at a dotted key.
    Config {
        #[arg(value_name = "KEY")]
        key: Option<String>,
    },

    /// Answer JSON requests on stdin, one per line, until EOF.
    Serve,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Parse `key=value`, typing the value as integer, float, bool or text.
pub fn parse_field(raw: &str) -> Result<(String, ScalarValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }

    let value = if let Ok(n) = value.parse::<i64>() {
        ScalarValue::Integer(n)
    } else if let Some(f) = value
        .parse::<f64>()
        .ok()
        .filter(|_| value.bytes().any(|b| b.is_ascii_digit()))
    {
        ScalarValue::Float(f)
    } else {
        match value {
            "true" => ScalarValue::Bool(true),
            "false" => ScalarValue::Bool(false),
            "" => ScalarValue::Null,
            other => ScalarValue::Text(other.to_string()),
        }
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_typed() {
        assert_eq!(parse_field("count=0").unwrap(), ("count".into(), ScalarValue::Integer(0)));
        assert_eq!(parse_field("ratio=0.5").unwrap(), ("ratio".into(), ScalarValue::Float(0.5)));
        assert_eq!(parse_field("ok=false").unwrap(), ("ok".into(), ScalarValue::Bool(false)));
        assert_eq!(parse_field("note=a=b").unwrap(), ("note".into(), ScalarValue::Text("a=b".into())));
        assert_eq!(parse_field("empty=").unwrap(), ("empty".into(), ScalarValue::Null));
        assert_eq!(parse_field("word=inf").unwrap(), ("word".into(), ScalarValue::Text("inf".into())));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=1").is_err());
    }

    #[test]
    fn run_exe_keeps_hyphenated_args() {
        let args = CliArgs::try_parse_from(["execdesk", "run-exe", "tool.exe", "--flag", "-x"]).unwrap();
        match args.command {
            Command::RunExe { path, args } => {
                assert_eq!(path, PathBuf::from("tool.exe"));
                assert_eq!(args, vec!["--flag".to_string(), "-x".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let args = CliArgs::try_parse_from(["execdesk", "check", "--json", "--log-level", "debug"]).unwrap();
        assert!(args.json);
        assert!(matches!(args.log_level, Some(LogLevelArg::Debug)));
        assert!(matches!(args.command, Command::Check));
    }
}
