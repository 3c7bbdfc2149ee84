//! Sender address, deduplicated per account.
//!
//! `address` is unique per account by lookup, not by a store-level
//! constraint. Repeat sightings update `name` in place.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct DbEmailAddress {
  pub id: Uuid,
  pub account_id: String,
  pub address: String,
  pub name: Option<String>,
}
