//! mailbridge library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration, shared state
//! - `config`: env-derived process configuration
//! - `http`: Axum router and handlers
//! - `providers`: OAuth mail providers (Nylas, Aurinko)
//! - `sync`: account linking and message ingestion
//! - `db`: migrations and SQLite helpers
//! - `models`: typed records used across layers
//! - `errors`: pipeline error taxonomy
//! - `util`: tracing and hex helpers

pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod http;
pub mod models;
pub mod providers;
pub mod sync;
pub mod util;
