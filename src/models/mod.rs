//! Typed records used across layers.

pub mod account;
pub mod email;
pub mod email_address;
pub mod event;
pub mod thread;
