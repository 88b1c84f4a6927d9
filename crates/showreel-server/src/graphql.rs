//! In-process GraphQL replay.
//!
//! `RouterHandler` satisfies the script runtime's [`RequestHandler`]
//! contract by replaying requests against an axum [`Router`] held in
//! memory. No listener or socket is involved; the request travels the
//! same middleware and extractor path a network request would.

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::routing::post;
use axum::{Json, Router};
use tokio::runtime::Handle;
use tower::ServiceExt;

use showreel_script::{ApiRequest, ApiResponse, RequestHandler, ScriptError, GRAPHQL_PATH};

/// Replayed responses larger than this are treated as handler failures.
const MAX_REPLAY_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Replays API requests against an in-memory router.
///
/// `handle` is called from blocking script threads, so the replay is
/// spawned onto the captured runtime and awaited over a synchronous
/// channel rather than blocking a runtime worker.
pub struct RouterHandler {
    router: Router,
    handle: Handle,
}

impl RouterHandler {
    /// Capture the current runtime. Must be called from within one.
    pub fn new(router: Router) -> Self {
        Self::with_handle(router, Handle::current())
    }

    pub fn with_handle(router: Router, handle: Handle) -> Self {
        Self { router, handle }
    }
}

impl RequestHandler for RouterHandler {
    fn handle(&self, request: ApiRequest) -> Result<ApiResponse, ScriptError> {
        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(&request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let http_request = builder
            .body(Body::from(request.body))
            .map_err(|e| ScriptError::Handler(format!("invalid replay request: {e}")))?;

        let router = self.router.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        self.handle.spawn(async move {
            let _ = tx.send(replay(router, http_request).await);
        });
        rx.recv()
            .map_err(|_| ScriptError::Handler("replay task exited before responding".into()))?
    }
}

async fn replay(router: Router, request: Request<Body>) -> Result<ApiResponse, ScriptError> {
    let response = router
        .oneshot(request)
        .await
        .map_err(|e| ScriptError::Handler(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = to_bytes(response.into_body(), MAX_REPLAY_BODY_BYTES)
        .await
        .map_err(|e| ScriptError::Handler(format!("failed to read replay body: {e}")))?;

    Ok(ApiResponse {
        status,
        headers,
        body: body.to_vec(),
    })
}

/// Router mounted when no real GraphQL schema is wired in. Responds to
/// every query with a GraphQL error so `gql.Do` fails loudly instead of
/// returning empty data.
pub fn placeholder_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route(GRAPHQL_PATH, post(placeholder_graphql))
}

async fn placeholder_graphql(Json(request): Json<serde_json::Value>) -> Json<serde_json::Value> {
    let query = request.get("query").and_then(|q| q.as_str()).unwrap_or("");
    tracing::warn!(query = %query, "graphql request hit the placeholder handler");
    Json(serde_json::json!({
        "data": null,
        "errors": [{ "message": "no GraphQL schema mounted" }],
    }))
}
