// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`request`] turns an [`ExecutionRequest`] into a validated [`Plan`].
//! - [`staging`] writes code supplied as text to a temporary file and
//!   removes it again.
//! - [`runner`] provides the [`ProcessRunner`] trait and the
//!   `tokio::process` implementation used in production, which tests replace
//!   with a spy.
//! - [`interpreter`] knows the platform's interpreter and shell names.
//! - [`coordinator`] ties these together and writes telemetry for every
//!   request.

pub mod coordinator;
pub mod interpreter;
pub mod request;
pub mod result;
pub mod runner;
pub mod staging;

pub use coordinator::ExecutionCoordinator;
pub use interpreter::InstallStatus;
pub use request::{ExecutionRequest, ExecutionSettings, Plan, RequestKind};
pub use result::ExecutionResult;
pub use runner::{CaptureFuture, CapturedOutput, ProcessRunner, RunFuture, TokioProcessRunner};
pub use staging::{ScriptStager, TransientArtifact};
