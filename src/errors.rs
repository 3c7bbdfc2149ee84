//! Error taxonomy for the linking and sync pipeline.

use axum::http::StatusCode;
use thiserror::Error;

pub type LinkResult<T> = Result<T, LinkError>;

/// Failures surfaced by the provider calls and the ingestion sequence.
///
/// None of these are retried automatically; a transient provider failure
/// requires the user to restart the OAuth flow.
#[derive(Error, Debug)]
pub enum LinkError {
  /// A required credential or URL is absent from configuration. Fatal to
  /// the request before any network call is made.
  #[error("missing configuration: {0}")]
  Config(&'static str),

  /// The provider rejected the authorization code (expired, reused,
  /// mismatched redirect URI).
  #[error("authorization code exchange failed: {0}")]
  AuthExchange(String),

  /// Mailbox metadata lookup returned a non-2xx response.
  #[error("account lookup failed: {0}")]
  AccountLookup(String),

  /// The message list call failed on transport or auth. Fatal to the
  /// ingestion attempt; rows already written stay committed.
  #[error("message list failed: {0}")]
  MessageList(String),

  /// A listed message is missing a required field (provider id, sender
  /// address, timestamp). Aborts the remaining per-message loop.
  #[error("malformed message: {0}")]
  MalformedMessage(String),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

impl LinkError {
  /// HTTP status the boundary maps this error to.
  pub fn status(&self) -> StatusCode {
    match self {
      LinkError::Config(_) | LinkError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
      LinkError::AuthExchange(_)
      | LinkError::AccountLookup(_)
      | LinkError::MessageList(_)
      | LinkError::MalformedMessage(_) => StatusCode::BAD_GATEWAY,
    }
  }
}
