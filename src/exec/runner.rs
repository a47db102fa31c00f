// src/exec/runner.rs

//! Spawning a process and reducing it to an [`ExecutionResult`].

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::errors::Result;

use super::ExecutionResult;

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + 'a>>;
pub type CaptureFuture<'a> = Pin<Box<dyn Future<Output = Result<CapturedOutput>> + Send + 'a>>;

/// Trait abstracting how a `(program, args)` pair is executed.
///
/// Production code uses [`TokioProcessRunner`]; tests substitute a spy that
/// records invocations without spawning anything.
///
/// Spawn failures and non-zero exits are *results*, not errors. `Err` is
/// reserved for failures after the process was created (e.g. waiting on it
/// failed).
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> RunFuture<'a>;

    /// Run and return both streams as written, without reducing them to an
    /// [`ExecutionResult`]. A spawn failure gives `success = false` with the
    /// OS error in `stderr`.
    ///
    /// The default goes through [`ProcessRunner::run`], so on success
    /// `stderr` is empty.
    fn capture<'a>(&'a self, program: &'a str, args: &'a [String]) -> CaptureFuture<'a> {
        Box::pin(async move { self.run(program, args).await.map(CapturedOutput::from) })
    }
}

/// Unreduced output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<ExecutionResult> for CapturedOutput {
    fn from(result: ExecutionResult) -> Self {
        Self {
            success: result.success,
            stdout: result.output,
            stderr: result.error,
        }
    }
}

/// Runs processes with `tokio::process`, stdin closed, stdout and stderr
/// captured into separate buffers.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    working_dir: Option<PathBuf>,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every process from `dir` instead of the current directory.
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    /// Spawn `program` and wait for it with both pipes drained.
    async fn collect(&self, program: &str, args: &[String]) -> Result<Collected> {
        debug!(program, ?args, "starting process");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(program, error = %err, "failed to spawn process");
                return Ok(Collected::SpawnFailed(err));
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes must be drained while waiting, or a chatty child can
        // block on a full pipe and never exit.
        let (status, stdout, stderr) = tokio::try_join!(
            async {
                child
                    .wait()
                    .await
                    .with_context(|| format!("waiting for process '{program}'"))
            },
            drain(stdout, "stdout"),
            drain(stderr, "stderr"),
        )?;

        debug!(
            program,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "process exited"
        );

        Ok(Collected::Exited { status, stdout, stderr })
    }

    async fn run_process(&self, program: &str, args: &[String]) -> Result<ExecutionResult> {
        Ok(match self.collect(program, args).await? {
            Collected::SpawnFailed(err) => ExecutionResult::rejected(err.to_string()),
            Collected::Exited { status, stdout, stderr } => reduce(status, &stdout, &stderr),
        })
    }

    async fn capture_process(&self, program: &str, args: &[String]) -> Result<CapturedOutput> {
        Ok(match self.collect(program, args).await? {
            Collected::SpawnFailed(err) => CapturedOutput {
                success: false,
                stdout: String::new(),
                stderr: err.to_string(),
            },
            Collected::Exited { status, stdout, stderr } => CapturedOutput {
                success: status.success(),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            },
        })
    }
}

enum Collected {
    SpawnFailed(std::io::Error),
    Exited {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
}

impl ProcessRunner for TokioProcessRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> RunFuture<'a> {
        Box::pin(self.run_process(program, args))
    }

    fn capture<'a>(&'a self, program: &'a str, args: &'a [String]) -> CaptureFuture<'a> {
        Box::pin(self.capture_process(program, args))
    }
}

/// Read a child pipe to EOF, chunk by chunk, into one buffer.
async fn drain<R>(stream: Option<R>, name: &'static str) -> anyhow::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let Some(mut stream) = stream else {
        return Ok(buf);
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .with_context(|| format!("reading child {name}"))?;
        if n == 0 {
            break;
        }
        trace!(stream = name, bytes = n, "chunk received");
        buf.extend_from_slice(&chunk[..n]);
    }
    debug!(stream = name, total = buf.len(), "stream closed");
    Ok(buf)
}

/// Map an exit status plus captured streams to the result contract.
///
/// Bytes are decoded only here, so a multi-byte character split across two
/// reads is never mangled.
pub fn reduce(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> ExecutionResult {
    let output = String::from_utf8_lossy(stdout).into_owned();
    if status.success() {
        return ExecutionResult::succeeded(output);
    }

    let stderr = String::from_utf8_lossy(stderr).into_owned();
    let error = if stderr.is_empty() {
        exit_message(status)
    } else {
        stderr
    };
    ExecutionResult::failed(output, error)
}

/// `process exited with code N`, or the terminating signal on Unix.
pub fn exit_message(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("process exited with code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("process terminated by signal {signal}");
        }
    }
    "process exited without an exit code".to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    // Raw wait(2) statuses: exit code N is encoded as N << 8.
    fn exited(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn success_keeps_stdout_and_clears_error() {
        let r = reduce(exited(0), b"hi\n", b"ignored warning");
        assert_eq!(r, ExecutionResult::succeeded("hi\n"));
    }

    #[test]
    fn failure_prefers_stderr() {
        let r = reduce(exited(2), b"partial", b"boom\n");
        assert!(!r.success);
        assert_eq!(r.output, "partial");
        assert_eq!(r.error, "boom\n");
    }

    #[test]
    fn silent_failure_synthesizes_message() {
        let r = reduce(exited(3), b"", b"");
        assert_eq!(r.error, "process exited with code 3");
    }

    #[test]
    fn signal_is_reported() {
        let r = reduce(ExitStatus::from_raw(9), b"", b"");
        assert_eq!(r.error, "process terminated by signal 9");
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let r = reduce(exited(0), &[b'o', b'k', 0xff], b"");
        assert!(r.output.starts_with("ok"));
    }
}
