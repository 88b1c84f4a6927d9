//! End-to-end plugin runtime tests: HTTP endpoints, the script bridge,
//! and in-process GraphQL replay wired together the way `main` wires
//! them, with a recording sink in place of tracing.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::mpsc;
use tower::ServiceExt;

use showreel_plugin::{LogLevel, LogSink};
use showreel_script::{ScriptHost, GRAPHQL_PATH};
use showreel_server::graphql::RouterHandler;
use showreel_server::AppState;

struct RecordingSink {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl LogSink for RecordingSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

fn test_state(gql_router: Router) -> (Arc<AppState>, Arc<RecordingSink>, mpsc::Receiver<f64>) {
    let sink = Arc::new(RecordingSink {
        entries: Mutex::new(Vec::new()),
    });
    let (progress_tx, progress_rx) = mpsc::channel(16);
    let state = Arc::new(AppState {
        script_host: Arc::new(ScriptHost::new()),
        request_handler: Arc::new(RouterHandler::new(gql_router)),
        log_sink: sink.clone(),
        progress: progress_tx,
        default_log_level: LogLevel::Info,
    });
    (state, sink, progress_rx)
}

async fn version_graphql(Json(_): Json<serde_json::Value>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "data": { "version": "5.1" } }))
}

async fn cookie_echo_graphql(
    headers: HeaderMap,
    Json(_): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    Json(serde_json::json!({ "data": { "cookie": cookie } }))
}

async fn denied_graphql(Json(_): Json<serde_json::Value>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "data": { "version": "5.1" },
        "errors": [{ "message": "access denied" }],
    }))
}

async fn run_plugin(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/plugins/run")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_script_with_gql_round_trip() {
    let (state, _sink, _progress) =
        test_state(Router::new().route(GRAPHQL_PATH, post(version_graphql)));
    let app = showreel_server::router(state);

    let (status, body) = run_plugin(
        app,
        serde_json::json!({
            "name": "versioner",
            "source": "local d = gql.Do('{ version }') return d.version",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "5.1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_cookie_reaches_gql_handler() {
    let (state, _sink, _progress) =
        test_state(Router::new().route(GRAPHQL_PATH, post(cookie_echo_graphql)));
    let app = showreel_server::router(state);

    let (status, body) = run_plugin(
        app,
        serde_json::json!({
            "name": "whoami",
            "source": "return gql.Do('{ me }').cookie",
            "session_cookie": "tok-9",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "session=tok-9");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gql_errors_fail_the_run_even_with_data() {
    let (state, _sink, _progress) =
        test_state(Router::new().route(GRAPHQL_PATH, post(denied_graphql)));
    let app = showreel_server::router(state);

    let (status, body) = run_plugin(
        app,
        serde_json::json!({
            "name": "denied",
            "source": "return gql.Do('{ version }')",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("access denied"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_compile_error_is_bad_request() {
    let (state, _sink, _progress) = test_state(Router::new());
    let app = showreel_server::router(state);

    let (status, body) = run_plugin(
        app,
        serde_json::json!({
            "name": "broken",
            "source": "return ((",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("compile error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_script_logging_reaches_sink() {
    let (state, sink, _progress) = test_state(Router::new());
    let app = showreel_server::router(state);

    let (status, _body) = run_plugin(
        app,
        serde_json::json!({
            "name": "talker",
            "source": "console.warn('careful') log.Debug('detail') return true",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let entries = sink.entries.lock().unwrap().clone();
    assert!(entries.contains(&(LogLevel::Warning, "[Plugin] careful".to_string())));
    assert!(entries.contains(&(LogLevel::Debug, "[Plugin] detail".to_string())));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_script_progress_reaches_channel() {
    let (state, _sink, mut progress) = test_state(Router::new());
    let app = showreel_server::router(state);

    let (status, _body) = run_plugin(
        app,
        serde_json::json!({
            "name": "worker",
            "source": "log.Progress(0.5) return true",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress.try_recv().unwrap(), 0.5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ingest_output_stream() {
    let (state, sink, mut progress) = test_state(Router::new());
    let app = showreel_server::router(state);

    let payload: Vec<u8> = b"\x01w\x02careful\nplain line\n\x01p\x020.25\n".to_vec();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/plugins/demo/output")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let entries = sink.entries.lock().unwrap().clone();
    assert!(entries.contains(&(LogLevel::Warning, "[Plugin / demo] careful".to_string())));
    assert!(entries.contains(&(LogLevel::Info, "[Plugin / demo] plain line".to_string())));
    assert_eq!(progress.try_recv().unwrap(), 0.25);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_placeholder_graphql_fails_scripts_loudly() {
    let (state, _sink, _progress) = test_state(
        showreel_server::graphql::placeholder_router(),
    );
    let app = showreel_server::router(state);

    let (status, body) = run_plugin(
        app,
        serde_json::json!({
            "name": "orphan",
            "source": "return gql.Do('{ version }')",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no GraphQL schema mounted"));
}
