//! Database row for a linked mailbox account.

use sqlx::FromRow;

/// One linked mailbox. `id` is the provider-assigned grant/account id and
/// serves as the natural key: re-linking the same mailbox updates the stored
/// credential instead of inserting a second row.
#[derive(Debug, Clone, FromRow)]
pub struct DbAccount {
  pub id: String,
  pub user_id: String,
  pub provider: String,
  pub access_token: String,
  pub email_address: String,
  pub name: Option<String>,
}
