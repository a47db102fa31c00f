// src/exec/coordinator.rs

//! The boundary every execution request goes through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::fs::{FileSystem, RealFileSystem};
use crate::telemetry::{EventSink, LogLevel, TelemetryRow, emit, emit_row};

use super::interpreter::{self, InstallStatus};
use super::request::{ExecutionRequest, ExecutionSettings, Plan, RequestKind};
use super::runner::{ProcessRunner, TokioProcessRunner};
use super::staging::ScriptStager;
use super::ExecutionResult;

/// How a request ended, before it is flattened into an [`ExecutionResult`].
#[derive(Debug)]
enum Outcome {
    /// The process ran (successfully or not).
    Completed(ExecutionResult),
    /// Validation failed; nothing was staged or spawned.
    Rejected(String),
    /// The script could not be written; nothing was spawned.
    StagingFailed(String),
    /// The runner itself failed after spawning.
    RunnerFailed(String),
}

impl Outcome {
    fn level(&self) -> LogLevel {
        match self {
            Outcome::Completed(r) if r.success => LogLevel::Info,
            Outcome::Completed(_) | Outcome::Rejected(_) => LogLevel::Warn,
            Outcome::StagingFailed(_) | Outcome::RunnerFailed(_) => LogLevel::Error,
        }
    }

    fn into_result(self) -> ExecutionResult {
        match self {
            Outcome::Completed(result) => result,
            Outcome::Rejected(msg) | Outcome::StagingFailed(msg) | Outcome::RunnerFailed(msg) => {
                ExecutionResult::rejected(msg)
            }
        }
    }
}

/// Validates, stages, runs and reports execution requests.
///
/// `execute` never fails: every error becomes a failed [`ExecutionResult`].
/// Requests share nothing mutable except the sink, so any number may be in
/// flight at once.
#[derive(Clone)]
pub struct ExecutionCoordinator {
    settings: ExecutionSettings,
    runner: Arc<dyn ProcessRunner>,
    stager: ScriptStager,
    sink: Arc<dyn EventSink>,
    fs: Arc<dyn FileSystem>,
}

impl ExecutionCoordinator {
    pub fn new(
        settings: ExecutionSettings,
        runner: Arc<dyn ProcessRunner>,
        stager: ScriptStager,
        sink: Arc<dyn EventSink>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            settings,
            runner,
            stager,
            sink,
            fs,
        }
    }

    /// Production wiring: real processes, real filesystem, staging in the
    /// configured directory or the platform temp dir.
    pub fn from_config(cfg: &ConfigFile, sink: Arc<dyn EventSink>) -> Self {
        let stager = match &cfg.staging.dir {
            Some(dir) => ScriptStager::new(dir.clone(), Arc::clone(&sink)),
            None => ScriptStager::in_temp_dir(Arc::clone(&sink)),
        };
        Self::new(
            ExecutionSettings::from_config(cfg),
            Arc::new(TokioProcessRunner::new()),
            stager,
            sink,
            Arc::new(RealFileSystem),
        )
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let kind = request.kind();
        let target = request.target();
        let started = Instant::now();

        let outcome = self.execute_inner(&request).await;
        let level = outcome.level();
        let result = outcome.into_result();

        self.report(kind, &target, &result, level, started.elapsed());
        result
    }

    pub async fn run_code(&self, source: impl Into<String>) -> ExecutionResult {
        self.execute(ExecutionRequest::RunCode {
            source: source.into(),
        })
        .await
    }

    pub async fn run_file(&self, path: impl Into<std::path::PathBuf>) -> ExecutionResult {
        self.execute(ExecutionRequest::RunFile { path: path.into() }).await
    }

    pub async fn run_executable(
        &self,
        path: impl Into<std::path::PathBuf>,
        args: Vec<String>,
    ) -> ExecutionResult {
        self.execute(ExecutionRequest::RunExecutable {
            path: path.into(),
            args,
        })
        .await
    }

    pub async fn run_shell_command(&self, command_text: impl Into<String>) -> ExecutionResult {
        self.execute(ExecutionRequest::RunShellCommand {
            command_text: command_text.into(),
        })
        .await
    }

    /// Whether the configured interpreter can be started, and its version.
    pub async fn check_interpreter(&self) -> InstallStatus {
        interpreter::check_installed(
            self.runner.as_ref(),
            &self.settings.interpreter,
            &self.settings.version_args,
        )
        .await
    }

    async fn execute_inner(&self, request: &ExecutionRequest) -> Outcome {
        let plan = match self.settings.plan(request, self.fs.as_ref()) {
            Ok(plan) => plan,
            Err(msg) => return Outcome::Rejected(msg),
        };

        match plan {
            Plan::Direct { program, args } => self.run(&program, &args).await,
            Plan::Staged {
                content,
                suffix,
                program,
                mut leading_args,
            } => {
                let artifact = match self.stager.stage(&content, &suffix) {
                    Ok(artifact) => artifact,
                    Err(err) => {
                        return Outcome::StagingFailed(format!("failed to stage script: {err}"));
                    }
                };
                leading_args.push(artifact.path().to_string_lossy().into_owned());

                let outcome = self.run(&program, &leading_args).await;
                self.stager.release(artifact);
                outcome
            }
        }
    }

    async fn run(&self, program: &str, args: &[String]) -> Outcome {
        match self.runner.run(program, args).await {
            Ok(result) => Outcome::Completed(result),
            Err(err) => Outcome::RunnerFailed(err.to_string()),
        }
    }

    fn report(
        &self,
        kind: RequestKind,
        target: &str,
        result: &ExecutionResult,
        level: LogLevel,
        elapsed: Duration,
    ) {
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let message = if result.success {
            format!("{kind} succeeded: {target}")
        } else {
            format!("{kind} failed: {target}: {}", result.error_summary())
        };

        match level {
            LogLevel::Info => info!(%kind, request_target = target, duration_ms, "execution finished"),
            LogLevel::Warn => warn!(
                %kind,
                request_target = target,
                duration_ms,
                error = %result.error_summary(),
                "execution failed"
            ),
            LogLevel::Error => error!(
                %kind,
                request_target = target,
                duration_ms,
                error = %result.error_summary(),
                "execution error"
            ),
        }

        emit(self.sink.as_ref(), level, &message);
        emit_row(
            self.sink.as_ref(),
            TelemetryRow::standard("execution")
                .with("kind", kind.as_str())
                .with("target", target)
                .with("success", result.success)
                .with("duration_ms", duration_ms),
        );
    }
}
