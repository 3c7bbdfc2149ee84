//! Application setup and runtime.

use crate::{config::Config, db, http, sync::AccountLocks};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
  pub db: SqlitePool,
  pub config: Arc<Config>,
  pub http: reqwest::Client,
  pub locks: AccountLocks,
}

/// Start the HTTP server with configured environment.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();
  dotenvy::dotenv().ok();

  let config = Arc::new(Config::from_env());

  let db_url =
    std::env::var("MAILBRIDGE_DATABASE").unwrap_or_else(|_| "sqlite://mailbridge.db".to_string());
  let db_url = db::ensure_sqlite_path(&db_url);
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;
  db::run_migrations(&pool).await?;

  let state = AppState {
    db: pool,
    config,
    http: reqwest::Client::new(),
    locks: AccountLocks::default(),
  };

  let app = http::build_router(state);

  let addr: SocketAddr = std::env::var("MAILBRIDGE_ADDR")
    .unwrap_or_else(|_| "127.0.0.1:8030".to_string())
    .parse()?;

  info!("nylas consent:    GET http://{}/auth/nylas?user_id=...", addr);
  info!("aurinko consent:  GET http://{}/auth/aurinko?user_id=...", addr);
  info!("webhook intake:   POST http://{}/webhooks/nylas", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;
  Ok(())
}
