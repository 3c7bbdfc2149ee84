//! Link/sync event stored in SQLite and exposed via API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
pub struct EventEntry {
  pub id: i64,
  pub ts: DateTime<Utc>,
  pub kind: String,
  pub message: String,
}
