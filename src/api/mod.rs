//! Web front-end: routing and server startup

pub mod handler;
pub mod helpers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handler::{AppState, SharedState};

use crate::core::config::AppConfig;
use crate::errors::SummarizeError;
use crate::worker::SummarizeService;

/// Routes for the summarizer page, JSON API, and health check.
pub fn router(service: SummarizeService) -> Router {
    let state: SharedState = Arc::new(AppState { service });
    Router::new()
        .route("/", get(handler::index).post(handler::submit_form))
        .route("/api/summarize", post(handler::summarize_json))
        .route("/healthz", get(handler::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `HOST:PORT` and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: &AppConfig, service: SummarizeService) -> Result<(), SummarizeError> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Summarizer listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(helpers::shutdown_signal())
        .await?;
    info!("Summarizer shut down");
    Ok(())
}
