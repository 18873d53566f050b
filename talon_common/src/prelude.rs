//! Prelude module for common re-exports.
//!
//! ```rust
//! use talon_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig, Validate};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{
    DEFAULT_CONFIG_PATH, DEFAULT_TICK_PERIOD_US, MAX_REQUIREMENTS, MAX_SUBSYSTEMS,
};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::config::ServoConfig;
pub use crate::hal::driver::{HalError, Servo, SharedServo};

/// Default host tick period as Duration.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_micros(DEFAULT_TICK_PERIOD_US);
