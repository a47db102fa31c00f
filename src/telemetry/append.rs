// src/telemetry/append.rs

//! File-backed [`EventSink`].

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{error, info, warn};

use super::csv::{encode_line, parse_line};
use super::row::TelemetryRow;
use super::{EventSink, LogLevel, RecordReport, TelemetryError, now_timestamp};

/// Append-only text + CSV logs under one directory.
///
/// Writes from concurrent requests are serialised by an internal mutex; each
/// call issues a single `write_all`, so lines never interleave.
#[derive(Debug)]
pub struct AppendLogSink {
    text_path: PathBuf,
    table_path: PathBuf,
    state: Mutex<SinkState>,
}

#[derive(Debug)]
struct SinkState {
    text: Option<File>,
    /// Opened on the first `record`.
    table: Option<File>,
    /// Fixed column order: read back from an existing file, or taken from
    /// the first recorded row.
    header: Option<Vec<String>>,
    closed: bool,
}

impl AppendLogSink {
    /// Open (creating if necessary) `dir/text_name` and prepare
    /// `dir/table_name` for lazy opening.
    ///
    /// Neither file is ever truncated.
    pub fn open(dir: impl AsRef<Path>, text_name: &str, table_name: &str) -> Result<Self, TelemetryError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let text_path = dir.join(text_name);
        let table_path = dir.join(table_name);

        let text = OpenOptions::new().create(true).append(true).open(&text_path)?;
        let header = read_existing_header(&table_path)?;

        info!(
            text_log = %text_path.display(),
            table_log = %table_path.display(),
            existing_header = header.is_some(),
            "audit logs opened"
        );

        Ok(Self {
            text_path,
            table_path,
            state: Mutex::new(SinkState {
                text: Some(text),
                table: None,
                header,
                closed: false,
            }),
        })
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    /// Current tabular header, if one has been established.
    pub fn header(&self) -> Option<Vec<String>> {
        self.lock().header.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // Every write is a single `write_all`; a poisoned guard holds no
        // half-applied state worth refusing.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// First line of a non-empty tabular file, parsed as the header.
fn read_existing_header(path: &Path) -> Result<Option<Vec<String>>, TelemetryError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first)?;
    if first.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_line(&first)))
}

impl EventSink for AppendLogSink {
    fn log(&self, message: &str, level: LogLevel) -> Result<(), TelemetryError> {
        let line = format!("[{}] [{}] {}\n", now_timestamp(), level.as_upper(), message);

        match level {
            LogLevel::Info => info!(target: "execdesk::audit", "{message}"),
            LogLevel::Warn => warn!(target: "execdesk::audit", "{message}"),
            LogLevel::Error => error!(target: "execdesk::audit", "{message}"),
        }

        let mut state = self.lock();
        if state.closed {
            return Err(TelemetryError::Closed);
        }
        if let Some(file) = state.text.as_mut() {
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    fn record(&self, mut row: TelemetryRow) -> Result<RecordReport, TelemetryError> {
        row.ensure_timestamp(now_timestamp);

        let mut state = self.lock();
        if state.closed {
            return Err(TelemetryError::Closed);
        }

        let mut report = RecordReport::default();
        let mut chunk = String::new();

        let header = match &state.header {
            Some(header) => header.clone(),
            None => {
                let header: Vec<String> = row.keys().map(str::to_string).collect();
                chunk.push_str(&encode_line(&header));
                chunk.push('\n');
                report.header_written = true;
                header
            }
        };

        let cells = header
            .iter()
            .map(|column| row.get(column).map(|v| v.to_cell()).unwrap_or_default());
        chunk.push_str(&encode_line(cells));
        chunk.push('\n');

        report.dropped = row
            .keys()
            .filter(|key| !header.iter().any(|column| column == key))
            .map(str::to_string)
            .collect();

        if state.table.is_none() {
            state.table = Some(OpenOptions::new().create(true).append(true).open(&self.table_path)?);
        }
        if let Some(file) = state.table.as_mut() {
            file.write_all(chunk.as_bytes())?;
        }
        if report.header_written {
            state.header = Some(header);
        }
        drop(state);

        if !report.dropped.is_empty() {
            warn!(
                dropped = ?report.dropped,
                table_log = %self.table_path.display(),
                "telemetry row has fields outside the established header; they were not written"
            );
        }

        Ok(report)
    }

    fn close(&self) -> Result<(), TelemetryError> {
        let mut state = self.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        if let Some(mut table) = state.table.take() {
            table.flush()?;
            table.sync_all()?;
        }
        if let Some(mut text) = state.text.take() {
            text.flush()?;
            text.sync_all()?;
        }
        info!(table_log = %self.table_path.display(), "audit logs closed");
        Ok(())
    }
}
