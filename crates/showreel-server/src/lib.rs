//! Showreel host glue.
//!
//! Wires the plugin runtime into the running application: a tracing-backed
//! log sink, an in-process replay adapter over the server's own axum
//! router, and the HTTP endpoints that trigger plugin execution and ingest
//! subprocess output streams.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use showreel_plugin::{LogLevel, LogSink};
use showreel_script::{RequestHandler, ScriptHost};

pub mod api;
pub mod config;
pub mod graphql;
pub mod logger;

/// Shared application state.
pub struct AppState {
    pub script_host: Arc<ScriptHost>,
    /// Replay target for `gql.Do` calls made by plugins.
    pub request_handler: Arc<dyn RequestHandler>,
    /// Destination for all plugin log output.
    pub log_sink: Arc<dyn LogSink>,
    /// Progress channel shared by all invocations; sends are non-blocking.
    pub progress: mpsc::Sender<f64>,
    /// Level attributed to unleveled subprocess output.
    pub default_log_level: LogLevel,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/plugins/run", post(api::run_script))
        .route("/api/plugins/{name}/output", post(api::ingest_output))
        .merge(graphql::placeholder_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
