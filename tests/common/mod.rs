#![allow(dead_code)]

pub use execdesk_test_utils::builders::ConfigFileBuilder;
pub use execdesk_test_utils::{init_tracing, with_timeout};

use std::path::Path;
use std::sync::Arc;

use execdesk::config::ConfigFile;
use execdesk::exec::{ExecutionCoordinator, ExecutionSettings, ProcessRunner, ScriptStager};
use execdesk::fs::FileSystem;
use execdesk::telemetry::EventSink;

/// Coordinator over arbitrary collaborators, staging into `staging_dir`.
pub fn coordinator_with(
    cfg: &ConfigFile,
    runner: Arc<dyn ProcessRunner>,
    sink: Arc<dyn EventSink>,
    fs: Arc<dyn FileSystem>,
    staging_dir: &Path,
) -> ExecutionCoordinator {
    ExecutionCoordinator::new(
        ExecutionSettings::from_config(cfg),
        runner,
        ScriptStager::new(staging_dir, Arc::clone(&sink)),
        sink,
        fs,
    )
}

/// Number of entries in `dir`.
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
}
