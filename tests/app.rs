use axum::{
  Json, Router,
  extract::State,
  routing::{get, post},
};
use mailbridge::{
  app::AppState,
  config::{Config, OauthCreds},
  db, http,
  sync::AccountLocks,
  util::hex_lower,
};
use ring::hmac;
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::{
  Arc, Mutex,
  atomic::{AtomicU32, Ordering},
};

const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Stand-in for the Nylas API: token exchange, account metadata and the
/// recent-message page. Message fixtures are mutable so tests can simulate
/// new mail arriving between syncs.
#[derive(Clone)]
struct MockProvider {
  tokens: Arc<AtomicU32>,
  messages: Arc<Mutex<Vec<Value>>>,
}

async fn start_mock_provider(messages: Vec<Value>) -> (String, MockProvider) {
  let mock = MockProvider {
    tokens: Arc::new(AtomicU32::new(0)),
    messages: Arc::new(Mutex::new(messages)),
  };

  async fn token(State(m): State<MockProvider>) -> Json<Value> {
    let n = m.tokens.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
      "access_token": format!("tok-{n}"),
      "account_id": "acct-1",
      "provider": "gmail",
      "email_address": "me@example.test",
    }))
  }
  async fn account() -> Json<Value> {
    Json(json!({
      "email_address": "me@example.test",
      "name": "Mock User",
      "sync_state": "running",
    }))
  }
  async fn list_messages(State(m): State<MockProvider>) -> Json<Value> {
    Json(Value::Array(m.messages.lock().unwrap().clone()))
  }

  let app = Router::new()
    .route("/oauth/token", post(token))
    .route("/account", get(account))
    .route("/messages", get(list_messages))
    .with_state(mock.clone());
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  (format!("http://{}", addr), mock)
}

async fn start_app(provider_base: &str) -> (String, SqlitePool) {
  // One connection: each sqlite :memory: connection is its own database.
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("connect memory sqlite");
  db::run_migrations(&pool).await.expect("migrate");

  let config = Config {
    public_url: "http://localhost:8030".to_string(),
    nylas: Some(OauthCreds {
      client_id: "test-client".to_string(),
      client_secret: "test-secret".to_string(),
    }),
    nylas_scopes: "email.read_only email.send email.modify".to_string(),
    nylas_base: provider_base.to_string(),
    nylas_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    aurinko: None,
    aurinko_scopes: "Mail.Read".to_string(),
    aurinko_base: provider_base.to_string(),
  };
  let state = AppState {
    db: pool.clone(),
    config: Arc::new(config),
    http: reqwest::Client::new(),
    locks: AccountLocks::default(),
  };
  let app: Router = http::build_router(state);

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  (format!("http://{}", addr), pool)
}

fn no_redirect_client() -> reqwest::Client {
  reqwest::Client::builder()
    .redirect(reqwest::redirect::Policy::none())
    .build()
    .unwrap()
}

fn nylas_message(id: &str, email: &str, name: &str, date: i64) -> Value {
  json!({
    "id": id,
    "subject": format!("Subject {id}"),
    "snippet": format!("Snippet {id}"),
    "body": format!("<p>Body {id}</p>"),
    "date": date,
    "from": [{"email": email, "name": name}],
    "files": [],
  })
}

fn five_messages() -> Vec<Value> {
  (1..=5)
    .map(|n| {
      nylas_message(
        &format!("m{n}"),
        &format!("sender{n}@example.test"),
        &format!("Sender {n}"),
        1_700_000_000 + n,
      )
    })
    .collect()
}

fn sign(timestamp: &str, body: &str) -> String {
  let key = hmac::Key::new(hmac::HMAC_SHA256, WEBHOOK_SECRET.as_bytes());
  let tag = hmac::sign(&key, format!("v0:{timestamp}:{body}").as_bytes());
  hex_lower(tag.as_ref())
}

#[tokio::test]
async fn link_callback_backfills_and_redirects() {
  let (provider_base, _mock) = start_mock_provider(five_messages()).await;
  let (base, pool) = start_app(&provider_base).await;
  let client = no_redirect_client();

  let res = client
    .get(format!("{}/auth/nylas/callback?code=abc&state=user-1", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::SEE_OTHER);
  assert_eq!(res.headers()["location"], "/mail");

  let accounts: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM accounts")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(accounts, 1);
  let threads: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM threads")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(threads, 5);
  let emails: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM emails")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(emails, 5);

  // Thread list over the API, newest first.
  let res = client
    .get(format!("{}/threads?account_id=acct-1", base))
    .send()
    .await
    .unwrap();
  assert!(res.status().is_success());
  let threads: Value = res.json().await.unwrap();
  let threads = threads.as_array().unwrap();
  assert_eq!(threads.len(), 5);
  assert_eq!(threads[0]["subject"], "Subject m5");

  // Emails carry their joined sender.
  let thread_id = threads[0]["id"].as_str().unwrap();
  let res = client
    .get(format!("{}/threads/{}/emails", base, thread_id))
    .send()
    .await
    .unwrap();
  let emails: Value = res.json().await.unwrap();
  let emails = emails.as_array().unwrap();
  assert_eq!(emails.len(), 1);
  assert_eq!(emails[0]["from_address"], "sender5@example.test");
  assert_eq!(emails[0]["internet_message_id"], "m5");

  // The stored credential never leaks through the accounts API.
  let res = client
    .get(format!("{}/accounts", base))
    .send()
    .await
    .unwrap();
  let accounts: Value = res.json().await.unwrap();
  let account = &accounts.as_array().unwrap()[0];
  assert_eq!(account["id"], "acct-1");
  assert_eq!(account["email_address"], "me@example.test");
  assert!(account.get("access_token").is_none());
}

#[tokio::test]
async fn relinking_updates_token_without_duplicate_rows() {
  let (provider_base, _mock) = start_mock_provider(five_messages()).await;
  let (base, pool) = start_app(&provider_base).await;
  let client = no_redirect_client();

  for _ in 0..2 {
    let res = client
      .get(format!("{}/auth/nylas/callback?code=abc&state=user-1", base))
      .send()
      .await
      .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::SEE_OTHER);
  }

  let accounts: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM accounts")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(accounts, 1);
  let token: String = sqlx::query_scalar("SELECT access_token FROM accounts WHERE id = 'acct-1'")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(token, "tok-2", "second link must refresh the credential");
  let threads: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM threads")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(threads, 5, "backfill runs once per account");
}

#[tokio::test]
async fn callback_requires_code_and_known_provider() {
  let (provider_base, _mock) = start_mock_provider(vec![]).await;
  let (base, _pool) = start_app(&provider_base).await;
  let client = no_redirect_client();

  let res = client
    .get(format!("{}/auth/nylas/callback?state=user-1", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

  let res = client
    .get(format!("{}/auth/pigeonpost/callback?code=abc&state=u", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

  // Aurinko credentials are not configured in the test environment.
  let res = client
    .get(format!("{}/auth/aurinko/callback?code=abc&state=u", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn authorize_redirects_to_consent_url() {
  let (provider_base, _mock) = start_mock_provider(vec![]).await;
  let (base, _pool) = start_app(&provider_base).await;
  let client = no_redirect_client();

  let res = client
    .get(format!("{}/auth/nylas?user_id=user-1", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::TEMPORARY_REDIRECT);
  let location = res.headers()["location"].to_str().unwrap();
  assert!(location.contains("client_id=test-client"));
  assert!(location.contains("state=user-1"));

  let res = client
    .get(format!("{}/auth/nylas", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_validation_token_is_echoed() {
  let (provider_base, _mock) = start_mock_provider(vec![]).await;
  let (base, _pool) = start_app(&provider_base).await;
  let client = reqwest::Client::new();

  let res = client
    .post(format!("{}/webhooks/nylas?validationToken=XYZ", base))
    .body("ignored")
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::OK);
  assert_eq!(res.text().await.unwrap(), "XYZ");
}

#[tokio::test]
async fn webhook_signature_matrix() {
  let (provider_base, _mock) = start_mock_provider(vec![]).await;
  let (base, _pool) = start_app(&provider_base).await;
  let client = reqwest::Client::new();
  let body = json!({"deltas": []}).to_string();

  // Correct signature is accepted.
  let res = client
    .post(format!("{}/webhooks/nylas", base))
    .header("X-Nylas-Request-Timestamp", "1700000000")
    .header("X-Nylas-Signature", sign("1700000000", &body))
    .body(body.clone())
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::OK);

  // Any other signature value is rejected.
  let res = client
    .post(format!("{}/webhooks/nylas", base))
    .header("X-Nylas-Request-Timestamp", "1700000000")
    .header("X-Nylas-Signature", "deadbeef")
    .body(body.clone())
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);

  // Missing header material with a non-empty body is a bad request.
  let res = client
    .post(format!("{}/webhooks/nylas", base))
    .header("X-Nylas-Request-Timestamp", "1700000000")
    .body(body)
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_sync_ingests_new_mail_once() {
  let (provider_base, mock) = start_mock_provider(five_messages()).await;
  let (base, pool) = start_app(&provider_base).await;
  let client = no_redirect_client();

  let res = client
    .get(format!("{}/auth/nylas/callback?code=abc&state=user-1", base))
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::SEE_OTHER);

  // A sixth message arrives on the provider side.
  mock.messages.lock().unwrap().push(nylas_message(
    "m6",
    "sender6@example.test",
    "Sender 6",
    1_700_000_060,
  ));

  let body = json!({
    "deltas": [{
      "type": "message.created",
      "object_data": {"id": "m6", "account_id": "acct-1"},
    }]
  })
  .to_string();
  let deliver = |body: String| {
    let client = client.clone();
    let base = base.clone();
    async move {
      client
        .post(format!("{}/webhooks/nylas", base))
        .header("X-Nylas-Request-Timestamp", "1700000100")
        .header("X-Nylas-Signature", sign("1700000100", &body))
        .body(body)
        .send()
        .await
        .unwrap()
    }
  };

  let res = deliver(body.clone()).await;
  assert_eq!(res.status(), reqwest::StatusCode::OK);
  let emails: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM emails")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(emails, 6);

  // Redelivery of the same notification does not duplicate rows.
  let res = deliver(body).await;
  assert_eq!(res.status(), reqwest::StatusCode::OK);
  let emails: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM emails")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(emails, 6);

  // The event feed records the sync.
  let res = client
    .get(format!("{}/events", base))
    .send()
    .await
    .unwrap();
  let events: Value = res.json().await.unwrap();
  let found = events
    .as_array()
    .unwrap()
    .iter()
    .any(|e| e["message"].as_str().unwrap_or("").contains("synced 1 new messages"));
  assert!(found, "expected a sync event for account acct-1");
}

#[tokio::test]
async fn unhandled_delta_types_are_ignored() {
  let (provider_base, _mock) = start_mock_provider(vec![]).await;
  let (base, pool) = start_app(&provider_base).await;
  let client = reqwest::Client::new();

  let body = json!({
    "deltas": [{
      "type": "message.opened",
      "object_data": {"id": "m1", "account_id": "acct-1"},
    }]
  })
  .to_string();
  let res = client
    .post(format!("{}/webhooks/nylas", base))
    .header("X-Nylas-Request-Timestamp", "1700000100")
    .header("X-Nylas-Signature", sign("1700000100", &body))
    .body(body)
    .send()
    .await
    .unwrap();
  assert_eq!(res.status(), reqwest::StatusCode::OK);

  let emails: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM emails")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(emails, 0);
}
