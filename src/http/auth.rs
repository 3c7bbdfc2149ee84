//! OAuth consent redirect and callback handlers.

use crate::{
  app::AppState,
  errors::LinkResult,
  http::{error_response, events::record_event},
  providers::{self, MailProvider},
  sync,
};
use axum::{
  Json,
  extract::{Path as AxumPath, Query, State},
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
  pub code: Option<String>,
  /// Carries the caller's user id through the OAuth round trip. Session
  /// auth itself lives in an external identity provider.
  pub state: Option<String>,
}

fn provider_for(name: &str, state: &AppState) -> Option<LinkResult<Box<dyn MailProvider>>> {
  match name {
    providers::nylas::PROVIDER_NAME | providers::aurinko::PROVIDER_NAME => {
      Some(providers::by_name(name, &state.config, &state.http))
    }
    _ => None,
  }
}

/// `GET /auth/:provider?user_id=…` — redirect the browser to the provider's
/// consent page.
pub async fn authorize(
  State(state): State<AppState>,
  AxumPath(name): AxumPath<String>,
  Query(params): Query<HashMap<String, String>>,
) -> Response {
  let Some(user_id) = params.get("user_id").filter(|v| !v.is_empty()) else {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({ "error": "missing user_id" })),
    )
      .into_response();
  };
  match provider_for(&name, &state) {
    None => (StatusCode::NOT_FOUND, "unknown provider").into_response(),
    Some(Err(e)) => {
      error!("authorize config error: {e}");
      error_response(&e)
    }
    Some(Ok(provider)) => Redirect::temporary(&provider.authorize_url(user_id)).into_response(),
  }
}

/// `GET /auth/:provider/callback?code=…&state=…` — run the full exchange →
/// upsert → backfill sequence, then send the user to the mail view.
pub async fn callback(
  State(state): State<AppState>,
  AxumPath(name): AxumPath<String>,
  Query(params): Query<CallbackParams>,
) -> Response {
  let Some(code) = params.code.filter(|c| !c.is_empty()) else {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({ "error": "missing authorization code" })),
    )
      .into_response();
  };
  let Some(user_id) = params.state.filter(|s| !s.is_empty()) else {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({ "error": "missing state" })),
    )
      .into_response();
  };

  let provider = match provider_for(&name, &state) {
    None => return (StatusCode::NOT_FOUND, "unknown provider").into_response(),
    Some(Err(e)) => {
      error!("callback config error: {e}");
      return error_response(&e);
    }
    Some(Ok(p)) => p,
  };

  match sync::link_account(&state.db, &state.locks, provider.as_ref(), &code, &user_id).await {
    Ok(outcome) => {
      record_event(
        &state,
        "link",
        &format!(
          "linked account {} via {name}, backfilled {} messages",
          outcome.account_id, outcome.backfilled
        ),
      )
      .await
      .ok();
      Redirect::to("/mail").into_response()
    }
    Err(e) => {
      error!("link callback failed: {e}");
      error_response(&e)
    }
  }
}
