//! Thread and email read APIs.

use crate::{
  app::AppState,
  models::{email::api_email::ApiEmail, thread::db_thread::DbThread},
};
use axum::{
  Json,
  extract::{Path as AxumPath, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

pub async fn list_threads(
  State(state): State<AppState>,
  Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
  let Some(account_id) = params.get("account_id").filter(|v| !v.is_empty()) else {
    return (StatusCode::BAD_REQUEST, "missing account_id").into_response();
  };
  let rows: Result<Vec<DbThread>, _> = sqlx::query_as(
    "SELECT id, account_id, subject, last_message_date FROM threads \
     WHERE account_id = ? ORDER BY last_message_date DESC",
  )
  .bind(account_id)
  .fetch_all(&state.db)
  .await;
  match rows {
    Ok(threads) => Json(threads).into_response(),
    Err(e) => {
      error!("list_threads error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

pub async fn list_thread_emails(
  State(state): State<AppState>,
  AxumPath(id): AxumPath<Uuid>,
) -> impl IntoResponse {
  let rows: Result<Vec<ApiEmail>, _> = sqlx::query_as(
    "SELECT e.id, e.thread_id, e.subject, e.body, e.body_snippet, e.internet_message_id, \
     a.address AS from_address, a.name AS from_name, e.sent_at, e.received_at, e.has_attachments \
     FROM emails e JOIN email_addresses a ON e.from_id = a.id \
     WHERE e.thread_id = ? ORDER BY e.sent_at",
  )
  .bind(id)
  .fetch_all(&state.db)
  .await;
  match rows {
    Ok(emails) => Json(emails).into_response(),
    Err(e) => {
      error!("list_thread_emails error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}
