//! Link/sync event feed and DB helper.

use crate::{app::AppState, models::event::event_entry::EventEntry};
use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::error;

pub async fn list_events(State(state): State<AppState>) -> impl IntoResponse {
  let rows: Result<Vec<EventEntry>, _> =
    sqlx::query_as("SELECT id, ts, kind, message FROM events ORDER BY id DESC LIMIT 200")
      .fetch_all(&state.db)
      .await;
  match rows {
    Ok(mut events) => {
      events.reverse();
      Json(events).into_response()
    }
    Err(e) => {
      error!("list_events error: {e}");
      (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

pub async fn record_event(state: &AppState, kind: &str, message: &str) -> Result<(), sqlx::Error> {
  sqlx::query("INSERT INTO events (ts, kind, message) VALUES (?, ?, ?)")
    .bind(Utc::now())
    .bind(kind)
    .bind(message)
    .execute(&state.db)
    .await?;
  Ok(())
}
