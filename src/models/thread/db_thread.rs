//! Conversation grouping for emails.
//!
//! During the initial backfill every ingested message gets its own thread;
//! no subject/participant matching is attempted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct DbThread {
  pub id: Uuid,
  pub account_id: String,
  pub subject: Option<String>,
  pub last_message_date: DateTime<Utc>,
}
