// src/telemetry/mod.rs

//! Durable, append-only audit logs.
//!
//! Two files live side by side in the logs directory:
//! - a free-text log, one `[timestamp] [LEVEL] message` line per event;
//! - a tabular (CSV) log of [`TelemetryRow`]s whose header is fixed by the
//!   first row ever written to the file.
//!
//! Components receive the sink as an `Arc<dyn EventSink>` at construction
//! time. It is created once at startup and closed once at shutdown.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod append;
pub mod csv;
pub mod row;

pub use append::AppendLogSink;
pub use row::{STANDARD_COLUMNS, ScalarValue, TelemetryRow};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("log write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("log sink is closed")]
    Closed,
}

/// Severity of a free-text log event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_upper(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "invalid log level: {other} (expected \"info\", \"warn\" or \"error\")"
            )),
        }
    }
}

/// What happened to a row handed to [`EventSink::record`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordReport {
    /// This call wrote the header line (first row of a new file).
    pub header_written: bool,
    /// Row fields with no column in the established header, not written.
    pub dropped: Vec<String>,
}

/// The audit log handle shared by every component.
pub trait EventSink: Send + Sync {
    /// Append one line to the free-text log before returning.
    fn log(&self, message: &str, level: LogLevel) -> Result<(), TelemetryError>;

    /// Append one row to the tabular log, adding `timestamp` if absent.
    fn record(&self, row: TelemetryRow) -> Result<RecordReport, TelemetryError>;

    /// Flush and release the underlying files. Later calls fail with
    /// [`TelemetryError::Closed`].
    fn close(&self) -> Result<(), TelemetryError>;
}

/// Current time in the format used by both logs, e.g.
/// `2024-05-01T09:30:00.123Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Log through the sink; a failing sink is reported to tracing only.
pub fn emit(sink: &dyn EventSink, level: LogLevel, message: &str) {
    if let Err(err) = sink.log(message, level) {
        warn!(error = %err, %level, message, "failed to append to text log");
    }
}

/// Record through the sink; a failing sink is reported to tracing only.
pub fn emit_row(sink: &dyn EventSink, row: TelemetryRow) {
    match sink.record(row) {
        Ok(report) if !report.dropped.is_empty() => {
            debug!(dropped = ?report.dropped, "telemetry row fields outside header were dropped");
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "failed to append to tabular log"),
    }
}
