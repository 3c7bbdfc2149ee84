//! API representation of an account. The stored credential is never serialized.

use super::db_account::DbAccount;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiAccount {
  pub id: String,
  pub user_id: String,
  pub provider: String,
  pub email_address: String,
  pub name: Option<String>,
}

impl From<DbAccount> for ApiAccount {
  fn from(d: DbAccount) -> Self {
    ApiAccount {
      id: d.id,
      user_id: d.user_id,
      provider: d.provider,
      email_address: d.email_address,
      name: d.name,
    }
  }
}
