//! Scheduler configuration.
//!
//! Embedded as the `[scheduler]` table of the host configuration.
//!
//! ```toml
//! [scheduler]
//! max_pending_requests = 64
//! tick_budget_us = 5000
//! ```

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use talon_common::config::{ConfigError, Validate};
use talon_common::consts::DEFAULT_MAX_PENDING_REQUESTS;

/// Upper bound accepted for `max_pending_requests`.
pub const MAX_PENDING_REQUESTS_LIMIT: usize = 4096;

const_assert!(DEFAULT_MAX_PENDING_REQUESTS <= MAX_PENDING_REQUESTS_LIMIT);

fn default_max_pending_requests() -> usize {
    DEFAULT_MAX_PENDING_REQUESTS
}

/// Tunables for one scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Start/cancel requests that may be queued between two ticks.
    #[serde(default = "default_max_pending_requests")]
    pub max_pending_requests: usize,

    /// Tick duration above which an overrun is counted and logged [µs].
    /// `0` disables the check.
    #[serde(default)]
    pub tick_budget_us: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
            tick_budget_us: 0,
        }
    }
}

impl Validate for SchedulerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pending_requests == 0 || self.max_pending_requests > MAX_PENDING_REQUESTS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_pending_requests must be in 1..={MAX_PENDING_REQUESTS_LIMIT}, got {}",
                self.max_pending_requests
            )));
        }
        Ok(())
    }
}
