// src/rpc.rs

//! JSON request/response boundary.
//!
//! One request per line:
//!
//! ```text
//! {"id": 1, "method": "runCode", "params": {"source": "print('hi')"}}
//! ```
//!
//! answered by one line per request, in completion order:
//!
//! ```text
//! {"id":1,"result":{"success":true,"output":"hi\n","error":""}}
//! ```
//!
//! Requests are dispatched concurrently; clients match answers by `id`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::app::AppContext;
use crate::telemetry::{LogLevel, TelemetryRow};

/// A call on the boundary, tagged by `method` with arguments in `params`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum RpcCall {
    CheckInterpreterInstalled {},
    RunCode {
        source: String,
    },
    RunScriptFile {
        path: PathBuf,
    },
    RunExecutable {
        path: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
    RunShellCommand {
        command: String,
    },
    LogEvent {
        message: String,
        #[serde(default)]
        level: LogLevel,
    },
    LogData {
        row: serde_json::Map<String, Value>,
    },
    GetSessionTime {},
    GetConfigData {
        #[serde(default)]
        key: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse one request line into its id and call.
///
/// The id is recovered whenever the line is valid JSON, so even a bad call
/// can be answered.
pub fn parse_request(line: &str) -> (Value, Result<RpcCall, String>) {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(err) => return (Value::Null, Err(format!("invalid request: {err}"))),
    };
    let params = if request.params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        request.params
    };
    let tagged = serde_json::json!({ "method": request.method, "params": params });
    let call = serde_json::from_value::<RpcCall>(tagged)
        .map_err(|err| format!("invalid call '{}': {err}", request.method));
    (request.id, call)
}

/// Run one call against the application.
pub async fn dispatch(app: &AppContext, call: RpcCall) -> Value {
    let coordinator = app.coordinator();
    match call {
        RpcCall::CheckInterpreterInstalled {} => to_json(coordinator.check_interpreter().await),
        RpcCall::RunCode { source } => to_json(coordinator.run_code(source).await),
        RpcCall::RunScriptFile { path } => to_json(coordinator.run_file(path).await),
        RpcCall::RunExecutable { path, args } => to_json(coordinator.run_executable(path, args).await),
        RpcCall::RunShellCommand { command } => to_json(coordinator.run_shell_command(command).await),
        RpcCall::LogEvent { message, level } => match app.sink().log(&message, level) {
            Ok(()) => Value::Bool(true),
            Err(err) => {
                warn!(error = %err, "logEvent failed");
                Value::Bool(false)
            }
        },
        RpcCall::LogData { row } => match app.sink().record(TelemetryRow::from(row)) {
            Ok(_) => Value::Bool(true),
            Err(err) => {
                warn!(error = %err, "logData failed");
                Value::Bool(false)
            }
        },
        RpcCall::GetSessionTime {} => {
            Value::from(u64::try_from(app.session_time().as_millis()).unwrap_or(u64::MAX))
        }
        RpcCall::GetConfigData { key } => app
            .config()
            .value_at(key.as_deref().unwrap_or_default())
            .unwrap_or(Value::Null),
    }
}

/// Parse, dispatch and encode one request line.
pub async fn handle_line(app: &AppContext, line: &str) -> String {
    let (id, call) = parse_request(line);
    match call {
        Ok(call) => encode(&RpcResponse {
            id,
            result: Some(dispatch(app, call).await),
            error: None,
        }),
        Err(msg) => error_response(id, msg),
    }
}

fn error_response(id: Value, msg: String) -> String {
    warn!(error = %msg, "rejected request");
    encode(&RpcResponse {
        id,
        result: None,
        error: Some(msg),
    })
}

fn encode(response: &RpcResponse) -> String {
    serde_json::to_string(response)
        .unwrap_or_else(|err| format!("{{\"id\":null,\"error\":\"response encoding failed: {err}\"}}"))
}

/// Serve requests from `reader` until EOF, writing answers to `writer`.
///
/// Each request runs on its own task. A line that is not UTF-8 or not a
/// valid request is answered with an error and the loop carries on. Returns
/// once every in-flight request has been answered; a read error stops
/// reading and is returned after that.
pub async fn serve<R, W>(app: Arc<AppContext>, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let mut in_flight = JoinSet::new();
    let mut buf = Vec::new();
    let mut reading = true;
    let mut read_error = None;

    info!("request loop started");
    loop {
        if !reading && in_flight.is_empty() && rx.is_empty() {
            break;
        }

        tokio::select! {
            raw = read_raw_line(&mut reader, &mut buf), if reading => match raw {
                Ok(Some(bytes)) => match String::from_utf8(bytes) {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => {
                        let app = Arc::clone(&app);
                        let tx = tx.clone();
                        in_flight.spawn(async move {
                            let response = handle_line(&app, &line).await;
                            let _ = tx.send(response).await;
                        });
                    }
                    Err(err) => {
                        let response = error_response(Value::Null, format!("invalid request: {err}"));
                        write_line(&mut writer, &response).await?;
                    }
                },
                Ok(None) => {
                    debug!("request stream closed");
                    reading = false;
                }
                Err(err) => {
                    warn!(error = %err, "failed to read requests, finishing in-flight ones");
                    read_error = Some(err);
                    reading = false;
                }
            },
            Some(response) = rx.recv() => {
                write_line(&mut writer, &response).await?;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    warn!(error = %err, "request task failed");
                }
            }
        }
    }
    info!("request loop finished");

    match read_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Next line without its terminator, as raw bytes. `None` at EOF.
///
/// Bytes of a read interrupted by another `select!` branch stay in `buf`
/// and are picked up by the next call.
async fn read_raw_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let n = reader.read_until(b'\n', buf).await?;
    if n == 0 && buf.is_empty() {
        return Ok(None);
    }
    let mut line = std::mem::take(buf);
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

async fn write_line<W>(writer: &mut W, response: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(response.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

fn to_json<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
