//! HTTP handlers for the summarizer page and JSON API.

use std::sync::Arc;

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::{info, warn};
use uuid::Uuid;

use super::helpers;
use crate::core::models::{SummarizeOutcome, SummarizeRequest};
use crate::worker::SummarizeService;

/// Shared state for every request.
pub struct AppState {
    pub service: SummarizeService,
}

pub type SharedState = Arc<AppState>;

/// `GET /`: empty form with default settings.
pub async fn index(State(state): State<SharedState>) -> Html<String> {
    let form = SummarizeRequest {
        model: state.service.defaults().model_name.clone(),
        ..SummarizeRequest::default()
    };
    helpers::page_response(&form, &SummarizeOutcome::default())
}

/// `POST /`: summarize the submitted form and re-render the page.
#[tracing::instrument(level = "info", skip_all, fields(correlation_id = %Uuid::new_v4()))]
pub async fn submit_form(
    State(state): State<SharedState>,
    Form(form): Form<SummarizeRequest>,
) -> Html<String> {
    let form = helpers::clamp_form(form);
    info!(
        model = %form.model,
        max_tokens = form.max_tokens,
        min_tokens = form.min_tokens,
        "Form submitted"
    );
    let outcome = state.service.do_summarize(&form).await;
    helpers::page_response(&form, &outcome)
}

/// `POST /api/summarize`: JSON in, `{summary, notice}` out.
#[tracing::instrument(level = "info", skip_all, fields(correlation_id = %Uuid::new_v4()))]
pub async fn summarize_json(
    State(state): State<SharedState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected JSON payload");
            return helpers::err_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };
    info!(model = %request.model, "API summarize request");
    Json(state.service.do_summarize(&request).await).into_response()
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}
