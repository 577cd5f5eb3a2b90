//! Common helper functions for HTTP handlers.
//!
//! Request normalization, response builders, and server lifecycle.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;
use tracing::{info, warn};

use crate::core::models::{SummarizeOutcome, SummarizeRequest};
use crate::views::{MAX_TOKENS_RANGE, MIN_TOKENS_RANGE, clamp_to_range, render_page};

// ============================================================================
// Request normalization
// ============================================================================

/// Keep form slider values inside the ranges the page offers.
#[must_use]
pub fn clamp_form(mut form: SummarizeRequest) -> SummarizeRequest {
    form.max_tokens = clamp_to_range(form.max_tokens, MAX_TOKENS_RANGE);
    form.min_tokens = clamp_to_range(form.min_tokens, MIN_TOKENS_RANGE);
    form
}

// ============================================================================
// Response Builders
// ============================================================================

/// Returns the rendered summarizer page.
#[must_use]
pub fn page_response(form: &SummarizeRequest, outcome: &SummarizeOutcome) -> Html<String> {
    Html(render_page(form, outcome))
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}

// ============================================================================
// Server lifecycle
// ============================================================================

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
