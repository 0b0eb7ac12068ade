//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file I/O.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // YouTube Data API
  pub api_base_url: String,
  pub page_size: u32,
  pub watch_url_prefix: String,
  pub placeholder_thumbnail: String,
  /// Titles the API uses for entries whose video is gone.
  pub skipped_titles: Vec<String>,

  // Retry / pacing
  pub max_attempts: u32,
  pub retry_step_ms: u64,
  pub page_delay_ms: u64,

  // Input debounce
  pub url_debounce_ms: u64,
  pub keyword_debounce_ms: u64,

  // Event loop
  pub poll_interval_ms: u64,
}

impl Constants {
  pub fn url_debounce(&self) -> Duration {
    Duration::from_millis(self.url_debounce_ms)
  }

  pub fn keyword_debounce(&self) -> Duration {
    Duration::from_millis(self.keyword_debounce_ms)
  }

  pub fn page_delay(&self) -> Duration {
    Duration::from_millis(self.page_delay_ms)
  }

  /// Wait before the attempt following failed attempt number `attempt` (1-based).
  pub fn retry_delay(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.retry_step_ms * u64::from(attempt))
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed the tests below catch it.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
