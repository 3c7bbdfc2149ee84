pub mod api_account;
pub mod db_account;
