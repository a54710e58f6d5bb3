//! JSON-RPC transport adapters (C8): a stdio newline-delimited loop and an
//! axum HTTP server, both parsing into `JsonRpcRequest` and dispatching
//! through [`crate::rpc::methods::dispatch`]. Grounded in the teacher's
//! `StdioServer::run`/`handle_message` and `http_server::start_*_server`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::domain::ids::SessionId;
use crate::domain::models::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::rpc::{methods, Coordinator};

/// Maximum accepted frame size on either transport. A frame over this
/// bound is rejected with `-32600` before it is even parsed, since a
/// single oversize line would otherwise stall the stdio reader.
const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Runs the newline-delimited JSON-RPC loop over stdin/stdout.
///
/// Each line is one request, each response is written back as one line.
/// A stdio transport carries exactly one session for its lifetime, minted
/// on the first `initialize` call and reused for every later line.
pub async fn run_stdio(coordinator: Arc<Coordinator>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();
    let mut session_id: Option<SessionId> = None;

    eprintln!("[usc] stdio server started");

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_line(&coordinator, &mut session_id, line).await;
        let mut bytes = serde_json::to_vec(&response).context("failed to serialize JSON-RPC response")?;
        bytes.push(b'\n');
        stdout.write_all(&bytes).await?;
        stdout.flush().await?;
    }

    eprintln!("[usc] stdio server stopped");
    Ok(())
}

async fn handle_line(coordinator: &Arc<Coordinator>, session_id: &mut Option<SessionId>, line: &str) -> JsonRpcResponse {
    if line.len() > MAX_FRAME_BYTES {
        warn!(bytes = line.len(), max = MAX_FRAME_BYTES, "rejecting oversize stdio frame");
        return too_large();
    }

    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => return parse_failure(&err),
    };

    if request.method == "initialize" && session_id.is_none() {
        let response = methods::dispatch(coordinator, None, request.clone()).await;
        if let Some(result) = &response.result {
            if let Some(id) = result.get("sessionId").and_then(Value::as_str) {
                *session_id = id.parse().ok();
            }
        }
        return response;
    }

    methods::dispatch(coordinator, *session_id, request).await
}

fn too_large() -> JsonRpcResponse {
    JsonRpcResponse::failure(
        None,
        JsonRpcError {
            code: -32600,
            message: format!("message exceeds maximum size of {MAX_FRAME_BYTES} bytes"),
            data: None,
        },
    )
}

fn parse_failure(err: &serde_json::Error) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        None,
        JsonRpcError {
            code: -32700,
            message: format!("parse error: {err}"),
            data: None,
        },
    )
}

#[derive(Clone)]
struct HttpState {
    coordinator: Arc<Coordinator>,
}

/// Starts the axum HTTP adapter. Every request carries its session id in
/// the `X-USC-Session-Id` header, set by the client after `initialize`
/// returns one; `initialize` itself needs no header.
pub async fn run_http(coordinator: Arc<Coordinator>, port: u16) -> Result<()> {
    let state = HttpState { coordinator };
    let app = Router::new().route("/", post(handle_http_request)).with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind HTTP listener")?;
    info!(%addr, "JSON-RPC HTTP server listening");

    axum::serve(listener, app).await.context("HTTP server terminated")?;
    Ok(())
}

async fn handle_http_request(
    State(state): State<HttpState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Json<JsonRpcResponse> {
    if body.len() > MAX_FRAME_BYTES {
        return Json(too_large());
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return Json(parse_failure(&err)),
    };

    let session_id = headers
        .get("x-usc-session-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let response = if request.method == "initialize" {
        methods::dispatch(&state.coordinator, None, request).await
    } else {
        methods::dispatch(&state.coordinator, session_id, request).await
    };

    Json(response)
}
