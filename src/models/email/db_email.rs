//! Database row for an ingested email.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// The provider supplies a single send timestamp during the initial sync,
/// so all four timestamp fields carry the same instant at ingestion time.
#[derive(Debug, FromRow)]
pub struct DbEmail {
  pub id: Uuid,
  pub thread_id: Uuid,
  pub from_id: Uuid,
  pub subject: Option<String>,
  pub body: Option<String>,
  pub body_snippet: Option<String>,
  pub internet_message_id: String,
  pub sent_at: DateTime<Utc>,
  pub created_time: DateTime<Utc>,
  pub received_at: DateTime<Utc>,
  pub last_modified_time: DateTime<Utc>,
  pub has_attachments: bool,
}
