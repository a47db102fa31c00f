// tests/staging.rs

mod common;
use crate::common::{entries_in, init_tracing};

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use tempfile::TempDir;

use execdesk::exec::ScriptStager;
use execdesk::telemetry::LogLevel;
use execdesk_test_utils::MemorySink;

type TestResult = Result<(), Box<dyn Error>>;

fn stager() -> (ScriptStager, Arc<MemorySink>, TempDir) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    (ScriptStager::new(dir.path(), sink.clone()), sink, dir)
}

#[test]
fn staged_files_never_collide() -> TestResult {
    let (stager, _sink, dir) = stager();

    let artifacts = (0..64)
        .map(|i| stager.stage(&format!("print({i})"), ".py"))
        .collect::<Result<Vec<_>, _>>()?;

    let names: HashSet<_> = artifacts.iter().map(|a| a.path().to_path_buf()).collect();
    assert_eq!(names.len(), 64);
    assert_eq!(entries_in(dir.path()), 64);

    for artifact in &artifacts {
        let name = artifact.path().file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("execdesk_"), "{name}");
        assert!(name.ends_with(".py"), "{name}");
    }
    Ok(())
}

#[test]
fn staged_content_is_written_verbatim() -> TestResult {
    let (stager, _sink, _dir) = stager();
    let source = "import sys\nprint('ünïcode', file=sys.stderr)\n";

    let artifact = stager.stage(source, ".py")?;

    assert_eq!(std::fs::read_to_string(artifact.path())?, source);
    Ok(())
}

#[test]
fn release_removes_only_its_own_artifact() -> TestResult {
    let (stager, sink, dir) = stager();

    let first = stager.stage("a", ".py")?;
    let second = stager.stage("b", ".py")?;
    let second_path = second.path().to_path_buf();

    stager.release(first);

    assert_eq!(entries_in(dir.path()), 1);
    assert!(second_path.exists());
    assert!(sink.lines().is_empty());

    stager.release(second);
    assert_eq!(entries_in(dir.path()), 0);
    Ok(())
}

#[test]
fn failed_release_is_logged_as_a_warning() -> TestResult {
    let (stager, sink, _dir) = stager();

    let artifact = stager.stage("print(1)", ".py")?;
    let shown = artifact.path().display().to_string();
    std::fs::remove_file(artifact.path())?;

    stager.release(artifact);

    let warnings = sink.messages_at(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(
        warnings[0].starts_with(&format!("failed to clean up temporary file {shown}:")),
        "{}",
        warnings[0]
    );
    Ok(())
}

#[test]
fn dropped_artifacts_are_still_removed() -> TestResult {
    let (stager, sink, dir) = stager();

    let artifact = stager.stage("print(1)", ".py")?;
    assert!(artifact.created_at() <= chrono::Utc::now());
    drop(artifact);

    assert_eq!(entries_in(dir.path()), 0);
    assert!(sink.lines().is_empty());
    Ok(())
}

#[test]
fn staging_into_a_missing_directory_fails() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let stager = ScriptStager::new(dir.path().join("nope"), Arc::new(MemorySink::new()));

    assert!(stager.stage("print(1)", ".py").is_err());
}
