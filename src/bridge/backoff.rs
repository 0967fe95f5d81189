//! Exponential backoff for reconnect attempts.
//!
//! The delay after `n` consecutive failures is `first × factor^n`, clamped
//! to `max`. It is derived from the failure count alone.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Backoff {
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = i32::try_from(failures).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max.max(self.first);
        }
        Duration::from_secs_f64(secs)
    }
}
