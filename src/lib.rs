// src/lib.rs

pub mod app;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod rpc;
pub mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::app::AppContext;
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, config_root_dir, default_config_path, load_or_init};
use crate::exec::{ExecutionResult, InstallStatus};
use crate::fs::RealFileSystem;
use crate::telemetry::TelemetryRow;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (writing defaults on first run)
/// - the audit logs and the execution coordinator
/// - the selected command or the JSON request loop
/// - Ctrl-C handling and shutdown
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_or_init(&RealFileSystem, &config_path)?;

    if let Command::Config { key } = &args.command {
        return print_config(&cfg, key.as_deref());
    }

    let logs_dir = args
        .logs_dir
        .clone()
        .unwrap_or_else(|| cfg.logs_dir(&config_root_dir(&config_path)));
    let app = Arc::new(
        AppContext::open(cfg, &logs_dir)
            .with_context(|| format!("failed to open audit logs in {}", logs_dir.display()))?,
    );

    let outcome = run_command(&app, &args).await;
    let closed = app.shutdown();
    let code = outcome?;
    closed?;
    Ok(code)
}

async fn run_command(app: &Arc<AppContext>, args: &CliArgs) -> Result<ExitCode> {
    let coordinator = app.coordinator();
    match &args.command {
        Command::Check => {
            let status = coordinator.check_interpreter().await;
            print_status(&status, args.json)?;
            Ok(exit_code(status.installed))
        }
        Command::RunCode { code } => {
            let source = match code {
                Some(code) => code.clone(),
                None => read_stdin().await?,
            };
            let result = coordinator.run_code(source).await;
            print_result(&result, args.json)
        }
        Command::RunFile { path } => {
            let result = coordinator.run_file(path.clone()).await;
            print_result(&result, args.json)
        }
        Command::RunExe { path, args: exe_args } => {
            let result = coordinator.run_executable(path.clone(), exe_args.clone()).await;
            print_result(&result, args.json)
        }
        Command::RunCmd { command } => {
            let result = coordinator.run_shell_command(command.clone()).await;
            print_result(&result, args.json)
        }
        Command::Log { message, level } => {
            app.sink().log(message, *level)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Record { fields } => {
            let row: TelemetryRow = fields.iter().cloned().collect();
            let report = app.sink().record(row)?;
            if !report.dropped.is_empty() {
                eprintln!("not in table header, dropped: {}", report.dropped.join(", "));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { key } => print_config(app.config(), key.as_deref()),
        Command::Serve => {
            let stdin = BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            tokio::select! {
                served = rpc::serve(Arc::clone(app), stdin, stdout) => served?,
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => info!("interrupted, shutting down"),
                    Err(err) => warn!(error = %err, "failed to listen for Ctrl+C"),
                },
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn read_stdin() -> Result<String> {
    let mut source = String::new();
    tokio::io::stdin()
        .read_to_string(&mut source)
        .await
        .context("failed to read code from stdin")?;
    debug!(bytes = source.len(), "read code from stdin");
    Ok(source)
}

/// Raw mode: child stdout to our stdout, the error text to stderr.
fn print_result(result: &ExecutionResult, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", result.output);
        if !result.error.is_empty() {
            eprint!("{}", result.error);
            if !result.error.ends_with('\n') {
                eprintln!();
            }
        }
    }
    Ok(exit_code(result.success))
}

fn print_status(status: &InstallStatus, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else if status.installed {
        println!("installed: {}", status.version);
    } else {
        println!("not installed");
    }
    Ok(())
}

fn print_config(cfg: &ConfigFile, key: Option<&str>) -> Result<ExitCode> {
    match cfg.value_at(key.unwrap_or_default()) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("unknown config key: {}", key.unwrap_or_default());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
