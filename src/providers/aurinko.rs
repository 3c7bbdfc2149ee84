//! Aurinko provider implementation.
//!
//! Endpoints used:
//! - `POST /v1/auth/token/{code}` (basic auth) to exchange the code
//! - `GET /v1/account` for mailbox metadata
//! - `GET /v1/email/messages?limit=N` for the recent-message page

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{AccountDetails, MailProvider, ProviderMessage, Sender, TokenGrant};
use crate::config::{Config, OauthCreds};
use crate::errors::{LinkError, LinkResult};

pub const PROVIDER_NAME: &str = "aurinko";

pub struct Aurinko {
  http: reqwest::Client,
  base: String,
  creds: OauthCreds,
  return_url: String,
  scopes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
  /// Aurinko account ids are numeric on the wire.
  account_id: i64,
  access_token: String,
  #[allow(dead_code)]
  user_id: Option<String>,
  #[allow(dead_code)]
  user_session: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
  email: Option<String>,
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Participant {
  address: Option<String>,
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
  id: Option<String>,
  subject: Option<String>,
  body: Option<String>,
  body_snippet: Option<String>,
  from: Option<Participant>,
  received_on: Option<DateTime<Utc>>,
  #[serde(default)]
  has_attachments: bool,
}

#[derive(Debug, Deserialize)]
struct MessageList {
  #[serde(default)]
  records: Vec<Message>,
}

impl Aurinko {
  pub fn from_config(config: &Config, http: reqwest::Client) -> LinkResult<Self> {
    let creds = config.aurinko_creds()?.clone();
    Ok(Aurinko {
      http,
      base: config.aurinko_base.clone(),
      creds,
      return_url: format!("{}/auth/aurinko/callback", config.public_url),
      scopes: config.aurinko_scopes.clone(),
    })
  }

  fn normalize(msg: Message) -> ProviderMessage {
    let from = msg.from.and_then(|p| {
      p.address.map(|address| Sender {
        address,
        name: p.name,
      })
    });
    ProviderMessage {
      id: msg.id,
      subject: msg.subject,
      from,
      body: msg.body,
      snippet: msg.body_snippet,
      date: msg.received_on.map(|t| t.timestamp()),
      has_attachments: msg.has_attachments,
    }
  }
}

#[async_trait]
impl MailProvider for Aurinko {
  fn name(&self) -> &'static str {
    PROVIDER_NAME
  }

  fn authorize_url(&self, state: &str) -> String {
    let mut url = Url::parse(&self.base)
      .map(|mut u| {
        u.set_path("/v1/auth/authorize");
        u
      })
      .unwrap_or_else(|_| Url::parse("https://api.aurinko.io/v1/auth/authorize").unwrap());
    url
      .query_pairs_mut()
      .append_pair("clientId", &self.creds.client_id)
      .append_pair("serviceType", "Google")
      .append_pair("scopes", &self.scopes)
      .append_pair("responseType", "code")
      .append_pair("returnUrl", &self.return_url)
      .append_pair("state", state);
    url.to_string()
  }

  async fn exchange_code(&self, code: &str) -> LinkResult<TokenGrant> {
    let res = self
      .http
      .post(format!("{}/v1/auth/token/{}", self.base, code))
      .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
      .send()
      .await
      .map_err(|e| LinkError::AuthExchange(format!("token request failed: {e}")))?;
    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      warn!(%status, %body, "aurinko rejected authorization code");
      return Err(LinkError::AuthExchange(format!(
        "token endpoint returned {status}"
      )));
    }
    let token: TokenResponse = res
      .json()
      .await
      .map_err(|e| LinkError::AuthExchange(format!("malformed token response: {e}")))?;
    Ok(TokenGrant {
      grant_id: token.account_id.to_string(),
      access_token: token.access_token,
      email: None,
      provider: PROVIDER_NAME,
    })
  }

  async fn account_details(&self, access_token: &str) -> LinkResult<AccountDetails> {
    let res = self
      .http
      .get(format!("{}/v1/account", self.base))
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
      email: account.email,
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
      .get(format!("{}/v1/email/messages", self.base))
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
    let list: MessageList = res
      .json()
      .await
      .map_err(|e| LinkError::MessageList(format!("malformed message list: {e}")))?;
    Ok(list.records.into_iter().map(Self::normalize).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_converts_received_on_to_epoch_seconds() {
    let msg: Message = serde_json::from_value(serde_json::json!({
      "id": "a1",
      "subject": "Quarterly report",
      "bodySnippet": "Attached is the",
      "from": {"address": "cfo@example.test", "name": "CFO"},
      "receivedOn": "2023-11-14T22:13:20Z",
      "hasAttachments": true
    }))
    .unwrap();
    let norm = Aurinko::normalize(msg);
    assert_eq!(norm.date, Some(1_700_000_000));
    assert_eq!(norm.from.unwrap().address, "cfo@example.test");
    assert!(norm.has_attachments);
    assert_eq!(norm.snippet.as_deref(), Some("Attached is the"));
  }
}
