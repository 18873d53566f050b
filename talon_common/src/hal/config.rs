//! Device configuration types.
//!
//! `ServoConfig` entries come from the `[[servos]]` array of the host
//! configuration and populate the hardware map at startup.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, Validate};
use crate::hal::driver::check_servo_range;

fn default_initial_position() -> f64 {
    0.5
}

fn default_slew_rate() -> f64 {
    2.0
}

/// One positional servo in the hardware map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    /// Hardware map name (e.g. `"claw_servo"`).
    pub name: String,

    /// Position at power-on, normalised `[0.0, 1.0]`.
    #[serde(default = "default_initial_position")]
    pub initial_position: f64,

    /// Simulated travel speed [range/s]. `0.0` moves instantly.
    #[serde(default = "default_slew_rate")]
    pub slew_rate: f64,
}

impl Validate for ServoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "servo name cannot be empty".to_string(),
            ));
        }
        check_servo_range(&self.name, self.initial_position)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        if !self.slew_rate.is_finite() || self.slew_rate < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "servo '{}': slew_rate must be >= 0, got {}",
                self.name, self.slew_rate
            )));
        }
        Ok(())
    }
}
