//! Retry configuration
//!
//! Defaults follow the portal frontend: start at one second, grow by 1.3x,
//! never wait longer than ten seconds, give each attempt a minute.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Status value the proxy uses for a successful call.
pub const SUCCESS_STATUS: &str = "success";

/// Retry configuration, shared by every operation of one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// First backoff delay
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff ceiling
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth per failed attempt, must be > 1
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Hard cap on a single attempt
    #[serde(default = "default_per_attempt_timeout_ms")]
    pub per_attempt_timeout_ms: u64,

    /// Values of the response `status` field that count as success
    #[serde(default = "default_success_status_values")]
    pub success_status_values: BTreeSet<String>,

    /// Attempt number at which the progress UI is first surfaced.
    /// `1` shows it immediately, `2` keeps a first-try success silent.
    #[serde(default = "default_show_progress_after_attempt")]
    pub show_progress_after_attempt: u32,

    /// Granularity of the countdown between attempts
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_backoff_multiplier() -> f64 {
    1.3
}
fn default_per_attempt_timeout_ms() -> u64 {
    60_000
}
fn default_success_status_values() -> BTreeSet<String> {
    BTreeSet::from([SUCCESS_STATUS.to_string()])
}
fn default_show_progress_after_attempt() -> u32 {
    2
}
fn default_countdown_tick_ms() -> u64 {
    1_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            per_attempt_timeout_ms: default_per_attempt_timeout_ms(),
            success_status_values: default_success_status_values(),
            show_progress_after_attempt: default_show_progress_after_attempt(),
            countdown_tick_ms: default_countdown_tick_ms(),
        }
    }
}

/// A configuration value that the engine cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid retry configuration: {0}")]
pub struct InvalidConfig(pub String);

impl RetryConfig {
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.per_attempt_timeout_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn is_success_status(&self, status: &str) -> bool {
        self.success_status_values.contains(status)
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.initial_delay_ms == 0 {
            return Err(InvalidConfig("initial_delay_ms must be > 0".into()));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(InvalidConfig(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier > 1.0) {
            return Err(InvalidConfig(format!(
                "backoff_multiplier must be > 1, got {}",
                self.backoff_multiplier
            )));
        }
        if self.per_attempt_timeout_ms == 0 {
            return Err(InvalidConfig("per_attempt_timeout_ms must be > 0".into()));
        }
        if self.success_status_values.is_empty() {
            return Err(InvalidConfig(
                "success_status_values must name at least one status".into(),
            ));
        }
        if self.show_progress_after_attempt == 0 {
            return Err(InvalidConfig(
                "show_progress_after_attempt must be >= 1".into(),
            ));
        }
        if self.countdown_tick_ms == 0 {
            return Err(InvalidConfig("countdown_tick_ms must be > 0".into()));
        }
        Ok(())
    }
}
