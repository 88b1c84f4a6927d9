//! Plugin HTTP endpoints.
//!
//! Script execution and output ingestion both block for their full
//! duration, so each request body is handed to `spawn_blocking` and the
//! handler awaits the result.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use showreel_plugin::StreamReader;
use showreel_script::{ExecutionOptions, ScriptError};

use crate::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, message: String) -> ApiError {
    (status, Json(json!({ "error": message })))
}

#[derive(Debug, Deserialize)]
pub struct RunScriptRequest {
    /// Plugin identity; names the compiled program and tags its output.
    pub name: String,
    /// Guest source to compile and run.
    pub source: String,
    /// Session cookie replayed with the plugin's GQL calls.
    #[serde(default)]
    pub session_cookie: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunScriptResponse {
    pub output: serde_json::Value,
}

/// POST /api/plugins/run — compile (or fetch from cache) and execute a
/// plugin script, returning its final value as JSON.
pub async fn run_script(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunScriptRequest>,
) -> Result<Json<RunScriptResponse>, ApiError> {
    let plugin_name = request.name.clone();

    let result = tokio::task::spawn_blocking(move || {
        let program = state.script_host.compile(&request.source, &request.name)?;
        let context = state.script_host.execution(ExecutionOptions {
            plugin_name: request.name,
            sink: state.log_sink.clone(),
            progress: Some(state.progress.clone()),
            handler: Some(state.request_handler.clone()),
            session_cookie: request.session_cookie,
        })?;
        context.run(&program)
    })
    .await;

    match result {
        Ok(Ok(value)) => Ok(Json(RunScriptResponse {
            output: value.to_json(),
        })),
        Ok(Err(e)) => {
            tracing::error!(plugin = %plugin_name, "plugin run failed: {e}");
            let status = match e {
                ScriptError::Compile { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            Err(error_response(status, e.to_string()))
        }
        Err(e) => {
            tracing::error!(plugin = %plugin_name, "plugin task panicked: {e}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "plugin task panicked".to_string(),
            ))
        }
    }
}

/// POST /api/plugins/{name}/output — decode a subprocess output stream,
/// dispatching leveled lines to the log sink and progress updates to the
/// progress channel.
pub async fn ingest_output(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let result = tokio::task::spawn_blocking(move || {
        StreamReader::new(name, state.log_sink.clone())
            .with_progress(state.progress.clone())
            .with_default_level(state.default_log_level)
            .consume(Cursor::new(body))
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(StatusCode::NO_CONTENT),
        Ok(Err(e)) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
        Err(e) => {
            tracing::error!("ingest task panicked: {e}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ingest task panicked".to_string(),
            ))
        }
    }
}
