use std::time::Duration;

use crate::config::RetryConfig;

/// Capped exponential backoff without jitter.
///
/// Yields `initial`, `initial * m`, `initial * m^2`, ... and stays at
/// `max` once reached. The sequence never ends: the engine has no attempt cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    current_ms: f64,
    max_ms: f64,
    multiplier: f64,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            current_ms: config.initial_delay_ms as f64,
            max_ms: config.max_delay_ms as f64,
            multiplier: config.backoff_multiplier,
        }
    }

    /// Delay to wait before the next attempt; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms.min(self.max_ms);
        self.current_ms = (self.current_ms * self.multiplier).min(self.max_ms);
        Duration::from_millis(delay.round() as u64)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
