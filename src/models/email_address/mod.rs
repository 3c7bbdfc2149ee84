pub mod db_email_address;
