use std::time::{Duration, Instant};

/// Coalesces bursts of input events into a single firing after a quiet period.
///
/// Every `schedule` pushes the deadline out again; `fire` reports true exactly once
/// when the deadline has passed.
#[derive(Debug, Clone)]
pub struct Debouncer {
  delay: Duration,
  deadline: Option<Instant>,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self { delay, deadline: None }
  }

  /// Record an event, cancelling any pending firing.
  pub fn schedule(&mut self, now: Instant) {
    self.deadline = Some(now + self.delay);
  }

  pub fn cancel(&mut self) {
    self.deadline = None;
  }

  /// Time left before the pending firing, if any.
  pub fn remaining(&self, now: Instant) -> Option<Duration> {
    self.deadline.map(|d| d.saturating_duration_since(now))
  }

  pub fn fire(&mut self, now: Instant) -> bool {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        self.deadline = None;
        true
      }
      _ => false,
    }
  }
}
