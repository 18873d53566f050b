//! System-wide constants for the Talon workspace.
//!
//! Single source of truth for all numeric limits and default paths.

use static_assertions::const_assert;

/// Maximum number of subsystems a single scheduler can register.
pub const MAX_SUBSYSTEMS: usize = 64;

/// Maximum number of subsystems a single command may require.
pub const MAX_REQUIREMENTS: usize = 16;

/// Default bound on start/cancel requests queued between two ticks.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 64;

/// Default host tick period in microseconds (50 Hz control loop).
pub const DEFAULT_TICK_PERIOD_US: u64 = 20_000;

/// Default configuration file path for the host opmode.
pub const DEFAULT_CONFIG_PATH: &str = "config/opmode.toml";

const_assert!(MAX_REQUIREMENTS <= MAX_SUBSYSTEMS);
const_assert!(MAX_SUBSYSTEMS <= u16::MAX as usize);
