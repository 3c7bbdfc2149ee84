pub mod db_thread;
