use std::sync::Mutex;

use execdesk::telemetry::{EventSink, LogLevel, RecordReport, TelemetryError, TelemetryRow};

#[derive(Default)]
struct State {
    lines: Vec<(LogLevel, String)>,
    rows: Vec<TelemetryRow>,
    closed: bool,
}

/// An in-memory [`EventSink`] for asserting on what was logged.
///
/// A `broken` sink fails every call, for checking that callers survive a
/// failing audit log.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<State>,
    broken: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        Self {
            state: Mutex::default(),
            broken: true,
        }
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.state.lock().unwrap().lines.clone()
    }

    /// Messages logged at exactly `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn rows(&self) -> Vec<TelemetryRow> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn check(&self, closed: bool) -> Result<(), TelemetryError> {
        if self.broken {
            return Err(TelemetryError::Io(std::io::Error::other("sink is broken")));
        }
        if closed {
            return Err(TelemetryError::Closed);
        }
        Ok(())
    }
}

impl EventSink for MemorySink {
    fn log(&self, message: &str, level: LogLevel) -> Result<(), TelemetryError> {
        let mut state = self.state.lock().unwrap();
        self.check(state.closed)?;
        state.lines.push((level, message.to_string()));
        Ok(())
    }

    fn record(&self, row: TelemetryRow) -> Result<RecordReport, TelemetryError> {
        let mut state = self.state.lock().unwrap();
        self.check(state.closed)?;
        let header_written = state.rows.is_empty();
        state.rows.push(row);
        Ok(RecordReport {
            header_written,
            dropped: Vec::new(),
        })
    }

    fn close(&self) -> Result<(), TelemetryError> {
        let mut state = self.state.lock().unwrap();
        if self.broken {
            return Err(TelemetryError::Io(std::io::Error::other("sink is broken")));
        }
        state.closed = true;
        Ok(())
    }
}
