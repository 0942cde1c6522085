//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub default_base_url: String,

  // Notifications and download affordances
  pub notification_lifetime_ms: u64,
  pub in_flight_marker_ms: u64,
  pub dispatch_throttle_ms: u64,

  // Recent channels
  pub history_capacity: usize,

  // Pagination
  pub page_size_options: Vec<usize>,
  pub default_page_size: usize,
  pub page_window: usize,

  // Player
  pub default_quality: String,
  pub default_resolution: String,

  // HTTP timeouts
  pub connectivity_timeout_secs: u64,
  pub fetch_timeout_secs: u64,
  pub player_timeout_secs: u64,
}

impl Constants {
  pub fn notification_lifetime(&self) -> Duration {
    Duration::from_millis(self.notification_lifetime_ms)
  }

  pub fn in_flight_marker(&self) -> Duration {
    Duration::from_millis(self.in_flight_marker_ms)
  }

  pub fn dispatch_throttle(&self) -> Duration {
    Duration::from_millis(self.dispatch_throttle_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.notification_lifetime(), Duration::from_secs(5));
    assert_eq!(c.in_flight_marker(), Duration::from_secs(2));
    assert_eq!(c.dispatch_throttle(), Duration::from_secs(1));
    assert_eq!(c.history_capacity, 10);
    assert!(c.page_size_options.contains(&c.default_page_size));
  }
}
