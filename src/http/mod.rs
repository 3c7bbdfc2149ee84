//! HTTP router and handlers.

use crate::app::AppState;
use crate::errors::LinkError;
use axum::{
  Json, Router,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use serde_json::json;

pub mod accounts;
pub mod auth;
pub mod events;
pub mod threads;
pub mod webhook;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
  Router::new()
    .route("/auth/:provider", get(auth::authorize))
    .route("/auth/:provider/callback", get(auth::callback))
    .route("/webhooks/nylas", post(webhook::nylas_webhook))
    .route("/accounts", get(accounts::list_accounts))
    .route("/threads", get(threads::list_threads))
    .route("/threads/:id/emails", get(threads::list_thread_emails))
    .route("/events", get(events::list_events))
    .with_state(state)
}

/// JSON error body with the status the taxonomy assigns.
pub(crate) fn error_response(e: &LinkError) -> Response {
  (e.status(), Json(json!({ "error": e.to_string() }))).into_response()
}
