// src/app.rs

//! Application lifetime: the audit sink, the coordinator, the read-only
//! config and the session clock.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::ExecutionCoordinator;
use crate::telemetry::{AppendLogSink, EventSink, LogLevel, TelemetryRow, emit, emit_row};

/// Everything a request handler needs. Built once at startup, shut down
/// once at exit.
pub struct AppContext {
    config: ConfigFile,
    sink: Arc<dyn EventSink>,
    coordinator: ExecutionCoordinator,
    started: Instant,
}

impl AppContext {
    /// Open the audit logs under `logs_dir` and wire the production
    /// coordinator.
    pub fn open(config: ConfigFile, logs_dir: &Path) -> Result<Self> {
        let sink: Arc<dyn EventSink> = Arc::new(AppendLogSink::open(
            logs_dir,
            &config.logs.text_file,
            &config.logs.table_file,
        )?);
        let coordinator = ExecutionCoordinator::from_config(&config, Arc::clone(&sink));
        Ok(Self::start(config, sink, coordinator))
    }

    /// Record the start of the session and return the context.
    pub fn start(config: ConfigFile, sink: Arc<dyn EventSink>, coordinator: ExecutionCoordinator) -> Self {
        emit(sink.as_ref(), LogLevel::Info, "Application started");
        emit_row(sink.as_ref(), TelemetryRow::standard("application_start"));
        info!(title = %config.app.title, "application started");

        Self {
            config,
            sink,
            coordinator,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub fn coordinator(&self) -> &ExecutionCoordinator {
        &self.coordinator
    }

    /// Time since [`AppContext::start`].
    pub fn session_time(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the end of the session and close the audit logs.
    pub fn shutdown(&self) -> Result<()> {
        emit(self.sink.as_ref(), LogLevel::Info, "Application closing");
        emit_row(
            self.sink.as_ref(),
            TelemetryRow::standard("application_exit")
                .with("duration_ms", u64::try_from(self.session_time().as_millis()).unwrap_or(u64::MAX)),
        );
        self.sink.close()?;
        info!("application closed");
        Ok(())
    }
}
