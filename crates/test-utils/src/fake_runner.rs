use std::path::Path;
use std::sync::Mutex;

use execdesk::errors::ExecdeskError;
use execdesk::exec::{ExecutionResult, ProcessRunner, RunFuture};

/// One invocation seen by a [`FakeRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    /// Contents of the file named by the last argument, read while the call
    /// was in progress. `None` if there was no such file.
    pub last_arg_contents: Option<String>,
}

enum Response {
    Result(ExecutionResult),
    Error(String),
}

/// A process runner that never spawns anything:
/// - records every `(program, args)` it is asked to run
/// - answers with a canned result (or a runner error).
pub struct FakeRunner {
    calls: Mutex<Vec<RecordedCall>>,
    response: Response,
}

impl FakeRunner {
    pub fn returning(result: ExecutionResult) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: Response::Result(result),
        }
    }

    pub fn succeeding(output: &str) -> Self {
        Self::returning(ExecutionResult::succeeded(output))
    }

    /// Every call fails with `Err`, as if waiting on the process broke.
    pub fn erroring(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: Response::Error(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> RunFuture<'a> {
        Box::pin(async move {
            let last_arg_contents = args
                .last()
                .map(Path::new)
                .filter(|p| p.is_file())
                .and_then(|p| std::fs::read_to_string(p).ok());

            self.calls.lock().unwrap().push(RecordedCall {
                program: program.to_string(),
                args: args.to_vec(),
                last_arg_contents,
            });

            match &self.response {
                Response::Result(result) => Ok(result.clone()),
                Response::Error(msg) => Err(ExecdeskError::Other(anyhow::anyhow!(msg.clone()))),
            }
        })
    }
}
