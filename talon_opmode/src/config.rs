//! Op mode configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "talon-opmode"
//!
//! [loop]
//! tick_period_us = 20000
//! max_ticks = 500
//!
//! [scheduler]
//! max_pending_requests = 16
//!
//! [[servos]]
//! name = "claw_servo"
//! initial_position = 0.2
//!
//! [claw]
//! servo = "claw_servo"
//! hold_closed = true
//!
//! [[script]]
//! at_tick = 10
//! action = "open"
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use talon_common::config::{ConfigError, SharedConfig, Validate};
use talon_common::consts::DEFAULT_TICK_PERIOD_US;
use talon_common::hal::config::ServoConfig;
use talon_common::hal::driver::check_servo_range;
use talon_scheduler::config::SchedulerConfig;

fn default_tick_period_us() -> u64 {
    DEFAULT_TICK_PERIOD_US
}

fn default_cpu_core() -> usize {
    1
}

fn default_rt_priority() -> i32 {
    80
}

fn default_open_position() -> f64 {
    0.9
}

fn default_close_position() -> f64 {
    0.2
}

/// Tick loop pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopConfig {
    /// Tick period [µs].
    #[serde(default = "default_tick_period_us")]
    pub tick_period_us: u64,

    /// Stop after this many ticks; `0` runs until interrupted.
    #[serde(default)]
    pub max_ticks: u64,

    /// CPU core the loop thread is pinned to (`rt` feature only).
    #[serde(default = "default_cpu_core")]
    pub cpu_core: usize,

    /// SCHED_FIFO priority (`rt` feature only).
    #[serde(default = "default_rt_priority")]
    pub rt_priority: i32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_period_us: DEFAULT_TICK_PERIOD_US,
            max_ticks: 0,
            cpu_core: default_cpu_core(),
            rt_priority: default_rt_priority(),
        }
    }
}

/// Claw binding: one servo, two preset positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClawConfig {
    /// Servo name in `[[servos]]`; also the subsystem name.
    pub servo: String,

    #[serde(default = "default_open_position")]
    pub open_position: f64,

    #[serde(default = "default_close_position")]
    pub close_position: f64,

    /// Install "close" as the subsystem's default command.
    #[serde(default)]
    pub hold_closed: bool,

    /// Wait for the servo to arrive within this distance before finishing.
    /// Absent: moves finish on the first tick after they start.
    #[serde(default)]
    pub settle_tolerance: Option<f64>,
}

/// Scripted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptAction {
    Open,
    Close,
    CancelAll,
}

/// One scripted request, issued just before tick `at_tick` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    pub at_tick: u64,
    pub action: ScriptAction,
}

/// Complete host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpModeConfig {
    pub shared: SharedConfig,

    #[serde(default, rename = "loop")]
    pub loop_config: LoopConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub servos: Vec<ServoConfig>,

    pub claw: ClawConfig,

    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

impl Validate for OpModeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.scheduler.validate()?;

        if self.loop_config.tick_period_us == 0 {
            return Err(ConfigError::ValidationError(
                "loop.tick_period_us must be greater than 0".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for servo in &self.servos {
            servo.validate()?;
            if !names.insert(servo.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate servo name '{}'",
                    servo.name
                )));
            }
        }

        let claw = &self.claw;
        if !names.contains(claw.servo.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "claw.servo '{}' is not declared in [[servos]]",
                claw.servo
            )));
        }
        for position in [claw.open_position, claw.close_position] {
            check_servo_range(&claw.servo, position)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        if let Some(tolerance) = claw.settle_tolerance {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "claw.settle_tolerance must be positive, got {tolerance}"
                )));
            }
        }

        if let Some(step) = self.script.iter().find(|s| s.at_tick == 0) {
            return Err(ConfigError::ValidationError(format!(
                "script step {:?} has at_tick = 0; ticks start at 1",
                step.action
            )));
        }

        Ok(())
    }
}
