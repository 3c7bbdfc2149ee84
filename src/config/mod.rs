//! Process configuration, read once at startup.

use crate::errors::{LinkError, LinkResult};
use std::env;

/// OAuth client credentials for one provider.
#[derive(Debug, Clone)]
pub struct OauthCreds {
  pub client_id: String,
  pub client_secret: String,
}

/// Everything the service reads from the environment, captured in one place
/// and threaded through `AppState`. Nothing reads env vars mid-request.
#[derive(Debug, Clone)]
pub struct Config {
  /// Public base URL used to build OAuth redirect URIs.
  pub public_url: String,
  pub nylas: Option<OauthCreds>,
  pub nylas_scopes: String,
  /// Overridable so tests can point the client at a local mock server.
  pub nylas_base: String,
  pub nylas_webhook_secret: Option<String>,
  pub aurinko: Option<OauthCreds>,
  pub aurinko_scopes: String,
  pub aurinko_base: String,
}

impl Config {
  /// Build from the environment. Provider credentials are optional here;
  /// a request touching an unconfigured provider fails with a config error
  /// before any network call.
  pub fn from_env() -> Self {
    Config {
      public_url: env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8030".to_string()),
      nylas: creds_from_env("NYLAS_CLIENT_ID", "NYLAS_CLIENT_SECRET"),
      nylas_scopes: env::var("NYLAS_SCOPES")
        .unwrap_or_else(|_| "email.read_only email.send email.modify".to_string()),
      nylas_base: env::var("NYLAS_API_BASE")
        .unwrap_or_else(|_| "https://api.nylas.com".to_string()),
      nylas_webhook_secret: env::var("NYLAS_WEBHOOK_SECRET").ok(),
      aurinko: creds_from_env("AURINKO_CLIENT_ID", "AURINKO_CLIENT_SECRET"),
      aurinko_scopes: env::var("AURINKO_SCOPES")
        .unwrap_or_else(|_| "Mail.Read Mail.ReadWrite Mail.Send Mail.Drafts Mail.All".to_string()),
      aurinko_base: env::var("AURINKO_API_BASE")
        .unwrap_or_else(|_| "https://api.aurinko.io".to_string()),
    }
  }

  pub fn nylas_creds(&self) -> LinkResult<&OauthCreds> {
    self
      .nylas
      .as_ref()
      .ok_or(LinkError::Config("NYLAS_CLIENT_ID / NYLAS_CLIENT_SECRET"))
  }

  pub fn aurinko_creds(&self) -> LinkResult<&OauthCreds> {
    self
      .aurinko
      .as_ref()
      .ok_or(LinkError::Config("AURINKO_CLIENT_ID / AURINKO_CLIENT_SECRET"))
  }
}

fn creds_from_env(id_var: &str, secret_var: &str) -> Option<OauthCreds> {
  match (env::var(id_var), env::var(secret_var)) {
    (Ok(client_id), Ok(client_secret)) => Some(OauthCreds {
      client_id,
      client_secret,
    }),
    _ => None,
  }
}
