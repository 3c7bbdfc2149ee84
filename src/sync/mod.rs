//! Ingestion coordinator: account upsert, one-time backfill and webhook
//! re-sync.
//!
//! Execution is request-scoped and fully sequential: exchange, upsert, guard,
//! list, then one message at a time. There is no fan-out and no transactional
//! rollback across a batch; a mid-batch failure leaves earlier rows committed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{LinkError, LinkResult};
use crate::models::account::db_account::DbAccount;
use crate::models::email_address::db_email_address::DbEmailAddress;
use crate::providers::{MailProvider, ProviderMessage, RECENT_PAGE_SIZE};

/// Per-account single-flight. Two simultaneous callbacks for the same grant
/// id would otherwise race the backfill guard and double-ingest.
#[derive(Clone, Default)]
pub struct AccountLocks {
  inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
  pub async fn acquire(&self, account_id: &str) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = self.inner.lock().await;
      // A strong count of 1 means no guard or acquirer still holds the
      // entry, so the map does not grow with every account ever seen.
      map.retain(|_, lock| Arc::strong_count(lock) > 1);
      map
        .entry(account_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
    };
    lock.lock_owned().await
  }
}

/// Result of a completed link callback.
#[derive(Debug)]
pub struct LinkOutcome {
  pub account_id: String,
  /// Messages materialized by the initial backfill; zero when the guard
  /// skipped it.
  pub backfilled: u32,
}

/// Full callback sequence: exchange the code, upsert the account, then run
/// the one-time backfill unless the account already has threads.
pub async fn link_account(
  db: &SqlitePool,
  locks: &AccountLocks,
  provider: &dyn MailProvider,
  code: &str,
  user_id: &str,
) -> LinkResult<LinkOutcome> {
  let grant = provider.exchange_code(code).await?;
  let details = provider.account_details(&grant.access_token).await?;

  let _guard = locks.acquire(&grant.grant_id).await;

  let email = grant
    .email
    .clone()
    .or(details.email)
    .unwrap_or_default();
  upsert_account(db, &grant.grant_id, user_id, grant.provider, &grant.access_token, &email, details.name.as_deref())
    .await?;

  if account_has_threads(db, &grant.grant_id).await? {
    debug!(account = %grant.grant_id, "account already backfilled, skipping");
    return Ok(LinkOutcome {
      account_id: grant.grant_id,
      backfilled: 0,
    });
  }

  let messages = provider
    .recent_messages(&grant.access_token, RECENT_PAGE_SIZE)
    .await?;
  let backfilled = ingest_messages(db, &grant.grant_id, &messages).await?;
  info!(account = %grant.grant_id, backfilled, "initial backfill complete");
  Ok(LinkOutcome {
    account_id: grant.grant_id,
    backfilled,
  })
}

/// Webhook-triggered re-sync: list the recent page again and ingest anything
/// not yet seen. Runs repeatedly over an account's lifetime, so it relies on
/// the message-id dedup inside [`ingest_messages`] instead of a guard.
pub async fn sync_account(
  db: &SqlitePool,
  locks: &AccountLocks,
  provider: &dyn MailProvider,
  account: &DbAccount,
) -> LinkResult<u32> {
  let _guard = locks.acquire(&account.id).await;
  let messages = provider
    .recent_messages(&account.access_token, RECENT_PAGE_SIZE)
    .await?;
  let ingested = ingest_messages(db, &account.id, &messages).await?;
  info!(account = %account.id, ingested, "webhook sync complete");
  Ok(ingested)
}

/// Materialize listed messages in order. Each message gets its own thread
/// (no subject/participant matching), a sender address resolved per account
/// with a last-write-wins name, and an email row carrying one derived
/// instant in all four timestamp fields. A malformed message aborts the
/// remainder of the batch; rows already written stay.
pub async fn ingest_messages(
  db: &SqlitePool,
  account_id: &str,
  messages: &[ProviderMessage],
) -> LinkResult<u32> {
  let mut ingested = 0u32;
  for msg in messages {
    let message_id = msg
      .id
      .as_deref()
      .ok_or_else(|| LinkError::MalformedMessage("message without provider id".to_string()))?;
    if email_exists(db, account_id, message_id).await? {
      debug!(account = %account_id, message = %message_id, "already ingested, skipping");
      continue;
    }
    let sender = msg.from.as_ref().ok_or_else(|| {
      LinkError::MalformedMessage(format!("message {message_id} has no sender address"))
    })?;
    let epoch = msg.date.ok_or_else(|| {
      LinkError::MalformedMessage(format!("message {message_id} has no timestamp"))
    })?;
    let instant = DateTime::from_timestamp(epoch, 0).ok_or_else(|| {
      LinkError::MalformedMessage(format!("message {message_id} timestamp out of range"))
    })?;

    let thread_id = create_thread(db, account_id, msg.subject.as_deref(), instant).await?;
    let from_id = resolve_address(db, account_id, &sender.address, sender.name.as_deref()).await?;
    insert_email(db, thread_id, from_id, message_id, msg, instant).await?;
    ingested += 1;
  }
  Ok(ingested)
}

/// Insert the account or, when the grant id is already linked, refresh only
/// the stored credential. Linking twice never creates a second row.
async fn upsert_account(
  db: &SqlitePool,
  grant_id: &str,
  user_id: &str,
  provider: &str,
  access_token: &str,
  email_address: &str,
  name: Option<&str>,
) -> LinkResult<()> {
  sqlx::query(
    "INSERT INTO accounts (id, user_id, provider, access_token, email_address, name) \
     VALUES (?, ?, ?, ?, ?, ?) \
     ON CONFLICT(id) DO UPDATE SET access_token = excluded.access_token",
  )
  .bind(grant_id)
  .bind(user_id)
  .bind(provider)
  .bind(access_token)
  .bind(email_address)
  .bind(name)
  .execute(db)
  .await?;
  Ok(())
}

async fn account_has_threads(db: &SqlitePool, account_id: &str) -> LinkResult<bool> {
  let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM threads WHERE account_id = ?")
    .bind(account_id)
    .fetch_one(db)
    .await?;
  Ok(count > 0)
}

async fn email_exists(db: &SqlitePool, account_id: &str, message_id: &str) -> LinkResult<bool> {
  let count: i64 = sqlx::query_scalar(
    "SELECT COUNT(1) FROM emails e JOIN threads t ON e.thread_id = t.id \
     WHERE t.account_id = ? AND e.internet_message_id = ?",
  )
  .bind(account_id)
  .bind(message_id)
  .fetch_one(db)
  .await?;
  Ok(count > 0)
}

async fn create_thread(
  db: &SqlitePool,
  account_id: &str,
  subject: Option<&str>,
  last_message_date: DateTime<Utc>,
) -> LinkResult<Uuid> {
  let id = Uuid::new_v4();
  sqlx::query("INSERT INTO threads (id, account_id, subject, last_message_date) VALUES (?, ?, ?, ?)")
    .bind(id)
    .bind(account_id)
    .bind(subject)
    .bind(last_message_date)
    .execute(db)
    .await?;
  Ok(id)
}

/// Look the sender up by (account, address). Found rows get their display
/// name updated in place so the most recently processed message wins.
async fn resolve_address(
  db: &SqlitePool,
  account_id: &str,
  address: &str,
  name: Option<&str>,
) -> LinkResult<Uuid> {
  let existing: Option<DbEmailAddress> = sqlx::query_as(
    "SELECT id, account_id, address, name FROM email_addresses WHERE account_id = ? AND address = ?",
  )
  .bind(account_id)
  .bind(address)
  .fetch_optional(db)
  .await?;

  if let Some(found) = existing {
    sqlx::query("UPDATE email_addresses SET name = ? WHERE id = ?")
      .bind(name)
      .bind(found.id)
      .execute(db)
      .await?;
    return Ok(found.id);
  }

  let id = Uuid::new_v4();
  sqlx::query("INSERT INTO email_addresses (id, account_id, address, name) VALUES (?, ?, ?, ?)")
    .bind(id)
    .bind(account_id)
    .bind(address)
    .bind(name)
    .execute(db)
    .await?;
  Ok(id)
}

async fn insert_email(
  db: &SqlitePool,
  thread_id: Uuid,
  from_id: Uuid,
  message_id: &str,
  msg: &ProviderMessage,
  instant: DateTime<Utc>,
) -> LinkResult<()> {
  sqlx::query(
    "INSERT INTO emails (id, thread_id, from_id, subject, body, body_snippet, \
     internet_message_id, sent_at, created_time, received_at, last_modified_time, has_attachments) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
  )
  .bind(Uuid::new_v4())
  .bind(thread_id)
  .bind(from_id)
  .bind(&msg.subject)
  .bind(&msg.body)
  .bind(&msg.snippet)
  .bind(message_id)
  .bind(instant)
  .bind(instant)
  .bind(instant)
  .bind(instant)
  .bind(msg.has_attachments)
  .execute(db)
  .await?;
  Ok(())
}
