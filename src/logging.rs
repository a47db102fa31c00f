// src/logging.rs

//! Diagnostic logging setup for `execdesk` using `tracing` +
//! `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `EXECDESK_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Diagnostics go to STDERR. STDOUT carries execution output and the JSON
//! request loop, so nothing else may write there. The durable audit logs
//! live in [`crate::telemetry`] and are unrelated to this subscriber.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevelArg;

/// Initialise the global tracing subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevelArg>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_arg(lvl),
        None => std::env::var("EXECDESK_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_arg(lvl: LogLevelArg) -> tracing::Level {
    match lvl {
        LogLevelArg::Error => tracing::Level::ERROR,
        LogLevelArg::Warn => tracing::Level::WARN,
        LogLevelArg::Info => tracing::Level::INFO,
        LogLevelArg::Debug => tracing::Level::DEBUG,
        LogLevelArg::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
