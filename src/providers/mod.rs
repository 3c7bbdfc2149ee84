//! Mail provider abstraction.
//!
//! Two interchangeable OAuth providers (Nylas, Aurinko) implement
//! [`MailProvider`]. Each call is a single outbound HTTP request; nothing
//! here persists state. Response bodies are deserialized into per-provider
//! serde schemas and normalized to the shared shapes below. Required-field
//! validation (sender address, provider message id) happens in the ingest
//! loop so a malformed message only aborts the remainder of its batch.

use crate::config::Config;
use crate::errors::{LinkError, LinkResult};
use async_trait::async_trait;

pub mod aurinko;
pub mod nylas;

pub use aurinko::Aurinko;
pub use nylas::Nylas;

/// Fixed page bound for the initial backfill and each webhook re-sync.
pub const RECENT_PAGE_SIZE: u32 = 5;

/// Normalized result of exchanging an authorization code.
#[derive(Debug, Clone)]
pub struct TokenGrant {
  /// Provider-assigned grant/account id, the natural key for the account.
  pub grant_id: String,
  pub access_token: String,
  pub email: Option<String>,
  pub provider: &'static str,
}

/// Mailbox metadata fetched with a bearer token.
#[derive(Debug, Clone)]
pub struct AccountDetails {
  pub email: Option<String>,
  pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Sender {
  pub address: String,
  pub name: Option<String>,
}

/// One listed message, fields as-observed. `id`, `from` and `date` stay
/// optional here; the ingest loop rejects messages missing any of them.
#[derive(Debug, Clone, Default)]
pub struct ProviderMessage {
  pub id: Option<String>,
  pub subject: Option<String>,
  pub from: Option<Sender>,
  pub body: Option<String>,
  pub snippet: Option<String>,
  /// Seconds since epoch.
  pub date: Option<i64>,
  pub has_attachments: bool,
}

#[async_trait]
pub trait MailProvider: Send + Sync {
  fn name(&self) -> &'static str;

  /// Consent URL the user is redirected to. `state` carries the caller's
  /// user id through the OAuth round trip.
  fn authorize_url(&self, state: &str) -> String;

  /// Exchange an authorization code for a grant. Provider rejection maps to
  /// [`LinkError::AuthExchange`].
  async fn exchange_code(&self, code: &str) -> LinkResult<TokenGrant>;

  /// Fetch mailbox metadata. Non-2xx maps to [`LinkError::AccountLookup`].
  async fn account_details(&self, access_token: &str) -> LinkResult<AccountDetails>;

  /// Most recent `limit` messages in provider-native recency order.
  async fn recent_messages(&self, access_token: &str, limit: u32)
    -> LinkResult<Vec<ProviderMessage>>;
}

/// Construct the provider a stored account was linked through.
pub fn by_name(
  name: &str,
  config: &Config,
  http: &reqwest::Client,
) -> LinkResult<Box<dyn MailProvider>> {
  match name {
    nylas::PROVIDER_NAME => Ok(Box::new(Nylas::from_config(config, http.clone())?)),
    aurinko::PROVIDER_NAME => Ok(Box::new(Aurinko::from_config(config, http.clone())?)),
    _ => Err(LinkError::Config("unknown provider name")),
  }
}
