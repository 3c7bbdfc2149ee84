//! Database helpers: migrations and path handling.

use sqlx::SqlitePool;
use std::path::Path;

/// Run SQLite migrations to create the mail schema if absent.
///
/// `accounts.id` is the provider grant/account id. Threads and addresses are
/// scoped to one account; emails reference a thread and a sender address.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            access_token TEXT NOT NULL,
            email_address TEXT NOT NULL,
            name TEXT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS threads (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            subject TEXT NULL,
            last_message_date TEXT NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS email_addresses (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            address TEXT NOT NULL,
            name TEXT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS emails (
            id TEXT PRIMARY KEY,
            thread_id TEXT NOT NULL REFERENCES threads(id),
            from_id TEXT NOT NULL REFERENCES email_addresses(id),
            subject TEXT NULL,
            body TEXT NULL,
            body_snippet TEXT NULL,
            internet_message_id TEXT NOT NULL,
            sent_at TEXT NOT NULL,
            created_time TEXT NOT NULL,
            received_at TEXT NOT NULL,
            last_modified_time TEXT NOT NULL,
            has_attachments BOOLEAN NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query("CREATE INDEX IF NOT EXISTS idx_threads_account ON threads(account_id)")
    .execute(pool)
    .await?;
  sqlx::query(
    "CREATE INDEX IF NOT EXISTS idx_addresses_account_address ON email_addresses(account_id, address)",
  )
  .execute(pool)
  .await?;
  sqlx::query("CREATE INDEX IF NOT EXISTS idx_emails_message_id ON emails(internet_message_id)")
    .execute(pool)
    .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT NOT NULL,
            kind TEXT NOT NULL,
            message TEXT NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;
  Ok(())
}

/// Ensure SQLite file and parent folder exist for a given sqlx URL.
pub fn ensure_sqlite_path(db_url: &str) -> String {
  if !db_url.starts_with("sqlite:") {
    return db_url.to_string();
  }
  let path_part = db_url.trim_start_matches("sqlite://");
  if path_part == ":memory:" {
    return db_url.to_string();
  }
  let (path_only, query) = match path_part.split_once('?') {
    Some((p, q)) => (p, Some(q)),
    None => (path_part, None),
  };
  let path = Path::new(path_only);
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      let _ = std::fs::create_dir_all(parent);
    }
  }
  if !path.exists() {
    let _ = std::fs::File::create(path);
  }
  match query {
    Some(q) => format!("sqlite://{}?{}", path_only, q),
    None => format!("sqlite://{}", path_only),
  }
}
