//! Utility functions: tracing setup and hex encoding.

use std::fmt::Write as _;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize pretty CLI logging.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt()
    .with_env_filter(filter)
    .with_target(false)
    .pretty()
    .init();
}

/// Lowercase hex encoding of a digest or MAC tag.
pub fn hex_lower(bytes: &[u8]) -> String {
  bytes
    .iter()
    .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
      let _ = write!(s, "{b:02x}");
      s
    })
}

#[cfg(test)]
mod tests {
  use super::hex_lower;

  #[test]
  fn hex_lower_encodes_bytes() {
    assert_eq!(hex_lower(&[0x00, 0xab, 0xff]), "00abff");
    assert_eq!(hex_lower(&[]), "");
  }
}
