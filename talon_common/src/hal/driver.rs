//! Servo driver trait and error types.
//!
//! This module defines:
//! - `Servo` trait - Interface for positional servo devices
//! - `HalError` enum - Error types for device operations
//! - `SharedServo` - Handle shared between a subsystem binding and its commands

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Lower bound of the normalised servo range.
pub const SERVO_MIN_POSITION: f64 = 0.0;

/// Upper bound of the normalised servo range.
pub const SERVO_MAX_POSITION: f64 = 1.0;

/// Error types for device operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// No device with this name in the hardware map.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Commanded value outside the device range.
    #[error("Position {position} out of range [0, 1] for '{name}'")]
    OutOfRange {
        /// Device name.
        name: String,
        /// Rejected position.
        position: f64,
    },

    /// Device did not respond.
    #[error("Hardware communication error: {0}")]
    Communication(String),
}

/// Trait defining the interface for positional servos.
///
/// Positions are normalised to `[0.0, 1.0]`. Calls are expected to be
/// fast and non-blocking: they run inside a scheduler tick.
pub trait Servo {
    /// Device name as registered in the hardware map.
    fn name(&self) -> &str;

    /// Command the servo toward `position`.
    ///
    /// # Errors
    /// `HalError::OutOfRange` if `position` is outside `[0.0, 1.0]`.
    fn set_position(&mut self, position: f64) -> Result<(), HalError>;

    /// Last commanded position.
    fn target_position(&self) -> f64;

    /// Current measured position.
    fn position(&self) -> Result<f64, HalError>;

    /// Advance device state by `dt` (simulated devices only).
    fn update(&mut self, _dt: std::time::Duration) {}
}

/// Servo handle shared by a binding and the commands it builds.
///
/// The scheduler is single-threaded, so `Rc<RefCell<_>>` is sufficient.
pub type SharedServo = Rc<RefCell<dyn Servo>>;

/// Validate a commanded position against the normalised servo range.
pub fn check_servo_range(name: &str, position: f64) -> Result<(), HalError> {
    if (SERVO_MIN_POSITION..=SERVO_MAX_POSITION).contains(&position) {
        Ok(())
    } else {
        Err(HalError::OutOfRange {
            name: name.to_string(),
            position,
        })
    }
}
