//! API representation of an email with its sender joined in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Flat row produced by joining `emails` to `email_addresses`.
#[derive(Debug, Serialize, FromRow)]
pub struct ApiEmail {
  pub id: Uuid,
  pub thread_id: Uuid,
  pub subject: Option<String>,
  pub body: Option<String>,
  pub body_snippet: Option<String>,
  pub internet_message_id: String,
  pub from_address: String,
  pub from_name: Option<String>,
  pub sent_at: DateTime<Utc>,
  pub received_at: DateTime<Utc>,
  pub has_attachments: bool,
}
