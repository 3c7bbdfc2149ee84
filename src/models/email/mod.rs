pub mod api_email;
pub mod db_email;
