//! Nylas provider implementation.
//!
//! Endpoints used:
//! - `POST /oauth/token` to exchange the authorization code
//! - `GET /account` for mailbox metadata
//! - `GET /messages?limit=N` for the recent-message page

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{AccountDetails, MailProvider, ProviderMessage, Sender, TokenGrant};
use crate::config::{Config, OauthCreds};
use crate::errors::{LinkError, LinkResult};

pub const PROVIDER_NAME: &str = "nylas";

pub struct Nylas {
  http: reqwest::Client,
  base: String,
  creds: OauthCreds,
  redirect_uri: String,
  scopes: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  account_id: String,
  email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
  email_address: Option<String>,
  name: Option<String>,
  #[allow(dead_code)]
  sync_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Participant {
  email: Option<String>,
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileStub {
  #[allow(dead_code)]
  id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
  id: Option<String>,
  subject: Option<String>,
  snippet: Option<String>,
  body: Option<String>,
  /// Epoch seconds.
  date: Option<i64>,
  #[serde(default)]
  from: Vec<Participant>,
  #[serde(default)]
  files: Vec<FileStub>,
}

impl Nylas {
  pub fn from_config(config: &Config, http: reqwest::Client) -> LinkResult<Self> {
    let creds = config.nylas_creds()?.clone();
    Ok(Nylas {
      http,
      base: config.nylas_base.clone(),
      creds,
      redirect_uri: format!("{}/auth/nylas/callback", config.public_url),
      scopes: config.nylas_scopes.clone(),
    })
  }

  fn normalize(msg: Message) -> ProviderMessage {
    let from = msg.from.into_iter().next().and_then(|p| {
      p.email.map(|address| Sender {
        address,
        name: p.name,
      })
    });
    ProviderMessage {
      id: msg.id,
      subject: msg.subject,
      from,
      body: msg.body,
      snippet: msg.snippet,
      date: msg.date,
      has_attachments: !msg.files.is_empty(),
    }
  }
}

#[async_trait]
impl MailProvider for Nylas {
  fn name(&self) -> &'static str {
    PROVIDER_NAME
  }

  fn authorize_url(&self, state: &str) -> String {
    let mut url = Url::parse(&self.base)
      .map(|mut u| {
        u.set_path("/oauth/authorize");
        u
      })
      .unwrap_or_else(|_| Url::parse("https://api.nylas.com/oauth/authorize").unwrap());
    url
      .query_pairs_mut()
      .append_pair("client_id", &self.creds.client_id)
      .append_pair("redirect_uri", &self.redirect_uri)
      .append_pair("response_type", "code")
      .append_pair("scopes", &self.scopes)
      .append_pair("state", state);
    url.to_string()
  }

  async fn exchange_code(&self, code: &str) -> LinkResult<TokenGrant> {
    let res = self
      .http
      .post(format!("{}/oauth/token", self.base))
      .json(&serde_json::json!({
        "client_id": self.creds.client_id,
        "client_secret": self.creds.client_secret,
        "grant_type": "authorization_code",
        "code": code,
      }))
      .send()
      .await
      .map_err(|e| LinkError::AuthExchange(format!("token request failed: {e}")))?;
    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      warn!(%status, %body, "nylas rejected authorization code");
      return Err(LinkError::AuthExchange(format!(
        "token endpoint returned {status}"
      )));
    }
    let token: TokenResponse = res
      .json()
      .await
      .map_err(|e| LinkError::AuthExchange(format!("malformed token response: {e}")))?;
    Ok(TokenGrant {
      grant_id: token.account_id,
      access_token: token.access_token,
      email: token.email_address,
      provider: PROVIDER_NAME,
    })
  }

  async fn account_details(&self, access_token: &str) -> LinkResult<AccountDetails> {
    let res = self
      .http
      .get(format!("{}/account", self.base))
      .bearer_auth(access_token)
      .send()
      .await
      .map_err(|e| LinkError::AccountLookup(format!("account request failed: {e}")))?;
    if !res.status().is_success() {
      return Err(LinkError::AccountLookup(format!(
        "account endpoint returned {}",
        res.status()
      )));
    }
    let account: AccountResponse = res
      .json()
      .await
      .map_err(|e| LinkError::AccountLookup(format!("malformed account response: {e}")))?;
    Ok(AccountDetails {
      email: account.email_address,
      name: account.name,
    })
  }

  async fn recent_messages(
    &self,
    access_token: &str,
    limit: u32,
  ) -> LinkResult<Vec<ProviderMessage>> {
    let res = self
      .http
      .get(format!("{}/messages", self.base))
      .query(&[("limit", limit)])
      .bearer_auth(access_token)
      .send()
      .await
      .map_err(|e| LinkError::MessageList(format!("message list request failed: {e}")))?;
    if !res.status().is_success() {
      return Err(LinkError::MessageList(format!(
        "message list endpoint returned {}",
        res.status()
      )));
    }
    let messages: Vec<Message> = res
      .json()
      .await
      .map_err(|e| LinkError::MessageList(format!("malformed message list: {e}")))?;
    Ok(messages.into_iter().map(Self::normalize).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_takes_first_sender_and_attachment_flag() {
    let msg: Message = serde_json::from_value(serde_json::json!({
      "id": "m1",
      "subject": "Hello",
      "snippet": "Hello there",
      "body": "<p>Hello there</p>",
      "date": 1_700_000_000,
      "from": [{"email": "a@example.test", "name": "Ann"}, {"email": "b@example.test"}],
      "files": [{"id": "f1"}]
    }))
    .unwrap();
    let norm = Nylas::normalize(msg);
    assert_eq!(norm.id.as_deref(), Some("m1"));
    let from = norm.from.unwrap();
    assert_eq!(from.address, "a@example.test");
    assert_eq!(from.name.as_deref(), Some("Ann"));
    assert!(norm.has_attachments);
  }

  #[test]
  fn normalize_tolerates_missing_sender() {
    let msg: Message = serde_json::from_value(serde_json::json!({"id": "m2"})).unwrap();
    let norm = Nylas::normalize(msg);
    assert!(norm.from.is_none());
    assert!(!norm.has_attachments);
    assert!(norm.date.is_none());
  }
}
