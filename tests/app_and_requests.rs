// tests/app_and_requests.rs

mod common;
use crate::common::{ConfigFileBuilder, coordinator_with, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use execdesk::app::AppContext;
use execdesk::exec::ExecutionResult;
use execdesk::fs::RealFileSystem;
use execdesk::rpc::{self, RpcCall, dispatch};
use execdesk::telemetry::{LogLevel, ScalarValue, TelemetryRow};
use execdesk_test_utils::{FakeRunner, MemorySink};

type TestResult = Result<(), Box<dyn Error>>;

struct Fixture {
    app: Arc<AppContext>,
    runner: Arc<FakeRunner>,
    sink: Arc<MemorySink>,
    _staging: TempDir,
}

fn fixture(runner: FakeRunner) -> Fixture {
    init_tracing();
    let staging = TempDir::new().unwrap();
    let cfg = ConfigFileBuilder::new().with_title("Bench").build();
    let runner = Arc::new(runner);
    let sink = Arc::new(MemorySink::new());
    let coordinator = coordinator_with(
        &cfg,
        runner.clone(),
        sink.clone(),
        Arc::new(RealFileSystem),
        staging.path(),
    );
    let app = Arc::new(AppContext::start(cfg, sink.clone(), coordinator));
    Fixture {
        app,
        runner,
        sink,
        _staging: staging,
    }
}

fn event_of(row: &TelemetryRow) -> Option<&ScalarValue> {
    row.get("event")
}

#[tokio::test]
async fn session_start_and_end_are_recorded() -> TestResult {
    let f = fixture(FakeRunner::succeeding(""));

    assert_eq!(
        f.sink.messages_at(LogLevel::Info),
        vec!["Application started".to_string()]
    );

    f.app.shutdown()?;

    let infos = f.sink.messages_at(LogLevel::Info);
    assert_eq!(infos.last().map(String::as_str), Some("Application closing"));

    let rows = f.sink.rows();
    assert_eq!(event_of(&rows[0]), Some(&ScalarValue::from("application_start")));
    assert_eq!(event_of(&rows[1]), Some(&ScalarValue::from("application_exit")));
    assert!(f.sink.is_closed());
    Ok(())
}

#[tokio::test]
async fn dispatch_covers_every_call() -> TestResult {
    let f = fixture(FakeRunner::succeeding("Python 3.11.4"));

    let status = dispatch(&f.app, RpcCall::CheckInterpreterInstalled {}).await;
    assert_eq!(status, json!({"installed": true, "version": "Python 3.11.4"}));

    let run = dispatch(&f.app, RpcCall::RunCode { source: "print(1)".into() }).await;
    assert_eq!(run, json!({"success": true, "output": "Python 3.11.4", "error": ""}));

    let rejected = dispatch(
        &f.app,
        RpcCall::RunExecutable {
            path: "notes.txt".into(),
            args: vec![],
        },
    )
    .await;
    assert_eq!(rejected["success"], json!(false));
    assert_eq!(rejected["error"], json!("invalid executable file. Must be an .exe file."));

    let logged = dispatch(
        &f.app,
        RpcCall::LogEvent {
            message: "user clicked run".into(),
            level: LogLevel::Warn,
        },
    )
    .await;
    assert_eq!(logged, json!(true));
    assert!(f.sink.messages_at(LogLevel::Warn).contains(&"user clicked run".to_string()));

    let mut row = serde_json::Map::new();
    row.insert("event".into(), json!("custom"));
    row.insert("score".into(), json!(0));
    let recorded = dispatch(&f.app, RpcCall::LogData { row }).await;
    assert_eq!(recorded, json!(true));
    let last = f.sink.rows().pop().unwrap();
    assert_eq!(last.get("score"), Some(&ScalarValue::Integer(0)));

    let elapsed = dispatch(&f.app, RpcCall::GetSessionTime {}).await;
    assert!(elapsed.is_u64());

    let title = dispatch(&f.app, RpcCall::GetConfigData { key: Some("app.title".into()) }).await;
    assert_eq!(title, json!("Bench"));
    let unknown = dispatch(&f.app, RpcCall::GetConfigData { key: Some("app.nope".into()) }).await;
    assert_eq!(unknown, Value::Null);
    let whole = dispatch(&f.app, RpcCall::GetConfigData { key: None }).await;
    assert_eq!(whole["app"]["title"], json!("Bench"));

    assert_eq!(f.runner.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn log_calls_report_false_after_shutdown() -> TestResult {
    let f = fixture(FakeRunner::succeeding(""));
    f.app.shutdown()?;

    let logged = dispatch(
        &f.app,
        RpcCall::LogEvent {
            message: "too late".into(),
            level: LogLevel::Info,
        },
    )
    .await;
    assert_eq!(logged, json!(false));
    Ok(())
}

#[tokio::test]
async fn serve_answers_every_line() -> TestResult {
    let f = fixture(FakeRunner::returning(ExecutionResult::failed("", "exit 2")));

    let input = concat!(
        r#"{"id": 1, "method": "runShellCommand", "params": {"command": "false"}}"#,
        "\n",
        "\n",
        r#"{"id": 2, "method": "getConfigData", "params": {"key": "app.title"}}"#,
        "\n",
        r#"{"id": 3, "method": "noSuchMethod"}"#,
        "\n",
        "this is not json\n",
    );
    let mut output = Vec::new();

    with_timeout(rpc::serve(Arc::clone(&f.app), input.as_bytes(), &mut output)).await?;

    let mut responses: Vec<Value> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(responses.len(), 4);

    let by_id = |id: Value| {
        responses
            .iter()
            .find(|r| r["id"] == id)
            .cloned()
            .unwrap_or(Value::Null)
    };
    assert_eq!(by_id(json!(1))["result"]["error"], json!("exit 2"));
    assert_eq!(by_id(json!(2))["result"], json!("Bench"));
    assert!(by_id(json!(3))["error"].as_str().unwrap().contains("noSuchMethod"));

    responses.retain(|r| r["id"].is_null());
    assert_eq!(responses.len(), 1);
    assert!(responses[0]["error"].as_str().unwrap().starts_with("invalid request"));
    Ok(())
}

#[tokio::test]
async fn non_utf8_line_is_answered_and_the_loop_continues() -> TestResult {
    let f = fixture(FakeRunner::succeeding(""));

    let mut input = Vec::new();
    input.extend_from_slice(br#"{"id": 1, "method": "getSessionTime"}"#);
    input.extend_from_slice(b"\n\xff\xfe\n");
    input.extend_from_slice(br#"{"id": 2, "method": "getConfigData", "params": {"key": "app.title"}}"#);
    input.extend_from_slice(b"\r\n");
    let mut output = Vec::new();

    with_timeout(rpc::serve(Arc::clone(&f.app), input.as_slice(), &mut output)).await?;

    let responses: Vec<Value> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(responses.len(), 3);

    let first = responses.iter().find(|r| r["id"] == json!(1)).ok_or("no answer for id 1")?;
    assert!(first["result"].is_u64());

    let second = responses.iter().find(|r| r["id"] == json!(2)).ok_or("no answer for id 2")?;
    assert_eq!(second["result"], json!("Bench"));

    let rejected = responses.iter().find(|r| r["id"].is_null()).ok_or("no error answer")?;
    assert!(rejected["error"].as_str().unwrap_or_default().starts_with("invalid request"));
    assert!(rejected.get("result").is_none());
    Ok(())
}

#[tokio::test]
async fn serve_on_empty_input_returns_immediately() -> TestResult {
    let f = fixture(FakeRunner::succeeding(""));
    let mut output = Vec::new();

    with_timeout(rpc::serve(Arc::clone(&f.app), &b""[..], &mut output)).await?;

    assert!(output.is_empty());
    Ok(())
}

#[tokio::test]
async fn app_open_writes_real_log_files() -> TestResult {
    init_tracing();
    let logs = TempDir::new()?;
    let cfg = ConfigFileBuilder::new().build();

    let app = AppContext::open(cfg, logs.path())?;
    app.shutdown()?;

    let text = std::fs::read_to_string(logs.path().join("app.log"))?;
    assert!(text.contains("[INFO] Application started"));
    assert!(text.contains("[INFO] Application closing"));

    let table = std::fs::read_to_string(logs.path().join("data.csv"))?;
    let mut lines = table.lines();
    assert_eq!(
        lines.next(),
        Some("event,kind,target,success,duration_ms,timestamp")
    );
    assert!(lines.next().is_some_and(|l| l.starts_with("application_start,")));
    assert!(lines.next().is_some_and(|l| l.starts_with("application_exit,")));
    Ok(())
}
