use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use showreel_script::ScriptHost;
use showreel_server::config::ServerConfig;
use showreel_server::graphql::{placeholder_router, RouterHandler};
use showreel_server::logger::TracingLog;
use showreel_server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();

    let (progress_tx, mut progress_rx) = mpsc::channel::<f64>(config.progress_buffer);
    tokio::spawn(async move {
        while let Some(fraction) = progress_rx.recv().await {
            tracing::debug!(progress = fraction, "plugin progress");
        }
    });

    let state = Arc::new(AppState {
        script_host: Arc::new(ScriptHost::new()),
        request_handler: Arc::new(RouterHandler::new(placeholder_router())),
        log_sink: Arc::new(TracingLog),
        progress: progress_tx,
        default_log_level: config.plugin_log_level,
    });

    let app = showreel_server::router(state);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "showreel server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
