pub mod event_entry;
