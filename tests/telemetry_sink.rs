// tests/telemetry_sink.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;

use tempfile::TempDir;

use execdesk::telemetry::csv::parse_line;
use execdesk::telemetry::{AppendLogSink, EventSink, LogLevel, TelemetryRow};

type TestResult = Result<(), Box<dyn Error>>;

fn open(dir: &TempDir) -> AppendLogSink {
    init_tracing();
    AppendLogSink::open(dir.path(), "app.log", "data.csv").unwrap()
}

fn table_lines(sink: &AppendLogSink) -> Vec<Vec<String>> {
    std::fs::read_to_string(sink.table_path())
        .unwrap()
        .lines()
        .map(parse_line)
        .collect()
}

#[test]
fn first_row_fixes_the_header() -> TestResult {
    let dir = TempDir::new()?;
    let sink = open(&dir);

    let first = sink.record(TelemetryRow::new().with("a", 1).with("b", 2))?;
    assert!(first.header_written);
    assert!(first.dropped.is_empty());

    let second = sink.record(TelemetryRow::new().with("a", 3).with("c", 4))?;
    assert!(!second.header_written);
    assert_eq!(second.dropped, vec!["c".to_string()]);

    let lines = table_lines(&sink);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], vec!["a", "b", "timestamp"]);
    assert_eq!(&lines[1][..2], &["1".to_string(), "2".to_string()]);
    assert_eq!(&lines[2][..2], &["3".to_string(), String::new()]);
    assert!(!lines[2][2].is_empty(), "timestamp filled in");
    Ok(())
}

#[test]
fn caller_supplied_timestamp_is_kept() -> TestResult {
    let dir = TempDir::new()?;
    let sink = open(&dir);

    sink.record(TelemetryRow::new().with("timestamp", "2024-01-01T00:00:00Z").with("x", 1))?;

    let lines = table_lines(&sink);
    assert_eq!(lines[0], vec!["timestamp", "x"]);
    assert_eq!(lines[1], vec!["2024-01-01T00:00:00Z", "1"]);
    Ok(())
}

#[test]
fn zero_and_false_are_written_literally() -> TestResult {
    let dir = TempDir::new()?;
    let sink = open(&dir);

    sink.record(
        TelemetryRow::new()
            .with("count", 0)
            .with("ok", false)
            .with("note", "")
            .with("missing", None::<i64>),
    )?;

    let lines = table_lines(&sink);
    assert_eq!(&lines[1][..4], &["0", "false", "", ""].map(String::from));
    Ok(())
}

#[test]
fn cells_with_separators_are_quoted() -> TestResult {
    let dir = TempDir::new()?;
    let sink = open(&dir);

    sink.record(TelemetryRow::new().with("target", "echo \"a, b\"\nnext"))?;

    let raw = std::fs::read_to_string(sink.table_path())?;
    assert!(raw.contains("\"echo \"\"a, b\"\"\nnext\""), "{raw}");
    Ok(())
}

#[test]
fn existing_header_is_reused_after_reopening() -> TestResult {
    let dir = TempDir::new()?;
    {
        let sink = open(&dir);
        sink.record(TelemetryRow::new().with("a", 1).with("b", 2))?;
        sink.close()?;
    }

    let sink = open(&dir);
    assert_eq!(
        sink.header(),
        Some(vec!["a".to_string(), "b".to_string(), "timestamp".to_string()])
    );

    let report = sink.record(TelemetryRow::new().with("b", 5).with("z", 9))?;
    assert!(!report.header_written);
    assert_eq!(report.dropped, vec!["z".to_string()]);

    let lines = table_lines(&sink);
    assert_eq!(lines.len(), 3, "no second header line");
    assert_eq!(&lines[2][..2], &[String::new(), "5".to_string()]);
    Ok(())
}

#[test]
fn text_log_is_appended_across_sessions() -> TestResult {
    let dir = TempDir::new()?;
    {
        let sink = open(&dir);
        sink.log("first session", LogLevel::Info)?;
        sink.close()?;
    }
    let sink = open(&dir);
    sink.log("second session", LogLevel::Error)?;
    sink.close()?;

    let text = std::fs::read_to_string(dir.path().join("app.log"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[INFO] first session"));
    assert!(lines[1].ends_with("[ERROR] second session"));
    Ok(())
}

#[test]
fn concurrent_writers_never_interleave() -> TestResult {
    let dir = TempDir::new()?;
    let sink = Arc::new(open(&dir));
    sink.record(TelemetryRow::new().with("worker", 0).with("seq", 0))?;

    let handles: Vec<_> = (1..=8)
        .map(|worker| {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || {
                for seq in 0..50 {
                    sink.record(TelemetryRow::new().with("worker", worker).with("seq", seq))
                        .unwrap();
                    sink.log(&format!("worker {worker} step {seq}"), LogLevel::Info)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }
    sink.close()?;

    let lines = table_lines(&sink);
    assert_eq!(lines.len(), 1 + 1 + 8 * 50);
    assert!(lines.iter().all(|cells| cells.len() == 3));

    let text = std::fs::read_to_string(sink.text_path())?;
    assert_eq!(text.lines().count(), 8 * 50);
    assert!(text.lines().all(|l| l.contains("] [INFO] worker ")));
    Ok(())
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn row_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
        proptest::collection::vec(("[a-e]", any::<i64>()), 0..6)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn every_line_has_the_header_width(rows in proptest::collection::vec(row_strategy(), 1..12)) {
            let dir = TempDir::new().unwrap();
            let sink = AppendLogSink::open(dir.path(), "app.log", "data.csv").unwrap();

            for fields in rows {
                let row: TelemetryRow = fields.into_iter().collect();
                sink.record(row).unwrap();
            }

            let lines = table_lines(&sink);
            let width = lines[0].len();
            prop_assert!(lines[0].iter().any(|c| c == "timestamp"));
            for line in &lines {
                prop_assert_eq!(line.len(), width);
            }
        }
    }
}
