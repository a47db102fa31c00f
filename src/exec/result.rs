// src/exec/result.rs

use serde::{Deserialize, Serialize};

/// Uniform outcome of every execution request.
///
/// `success` implies an empty `error`; a failure always carries a non-empty
/// `error`. The constructors below are the only way this crate builds one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: String,
}

impl ExecutionResult {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: String::new(),
        }
    }

    /// A failure that still carries whatever the process printed.
    pub fn failed(output: impl Into<String>, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error.push_str("execution failed");
        }
        Self {
            success: false,
            output: output.into(),
            error,
        }
    }

    /// A failure where no process produced any output (validation, staging
    /// or spawn errors).
    pub fn rejected(error: impl Into<String>) -> Self {
        Self::failed(String::new(), error)
    }

    /// First line of `error`, for one-line log messages.
    pub fn error_summary(&self) -> &str {
        self.error.lines().next().unwrap_or_default().trim_end()
    }
}
