//! Linked-accounts API.

use crate::{
  app::AppState,
  models::account::{api_account::ApiAccount, db_account::DbAccount},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

pub async fn list_accounts(State(state): State<AppState>) -> impl IntoResponse {
  let rows: Result<Vec<DbAccount>, _> = sqlx::query_as(
    "SELECT id, user_id, provider, access_token, email_address, name FROM accounts ORDER BY id",
  )
  .fetch_all(&state.db)
  .await;
  match rows {
    Ok(rows) => {
      let out: Vec<ApiAccount> = rows.into_iter().map(ApiAccount::from).collect();
      Json(out).into_response()
    }
    Err(e) => {
      error!("list_accounts error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}
