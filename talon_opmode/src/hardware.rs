//! Hardware map and simulated servos.
//!
//! The map is built once at startup from `[[servos]]` and handed to
//! subsystem bindings, which look devices up by name.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use talon_common::hal::config::ServoConfig;
use talon_common::hal::driver::{HalError, Servo, SharedServo, check_servo_range};
use tracing::debug;

/// Positional servo model that slews toward its target at a fixed rate.
#[derive(Debug, Clone)]
pub struct SimServo {
    name: String,
    position: f64,
    target: f64,
    slew_rate: f64,
    connected: bool,
}

impl SimServo {
    /// Build from configuration; starts at rest on `initial_position`.
    pub fn new(config: &ServoConfig) -> Self {
        Self {
            name: config.name.clone(),
            position: config.initial_position,
            target: config.initial_position,
            slew_rate: config.slew_rate,
            connected: true,
        }
    }

    /// Simulate a lost connection (`false`) or its recovery.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn check_link(&self) -> Result<(), HalError> {
        if self.connected {
            Ok(())
        } else {
            Err(HalError::Communication(format!("'{}' not responding", self.name)))
        }
    }
}

impl Servo for SimServo {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_position(&mut self, position: f64) -> Result<(), HalError> {
        self.check_link()?;
        check_servo_range(&self.name, position)?;
        self.target = position;
        Ok(())
    }

    fn target_position(&self) -> f64 {
        self.target
    }

    fn position(&self) -> Result<f64, HalError> {
        self.check_link()?;
        Ok(self.position)
    }

    fn update(&mut self, dt: Duration) {
        let error = self.target - self.position;
        if self.slew_rate <= 0.0 {
            self.position = self.target;
            return;
        }
        let max_step = self.slew_rate * dt.as_secs_f64();
        self.position += error.clamp(-max_step, max_step);
    }
}

/// Name → device lookup.
#[derive(Default)]
pub struct HardwareMap {
    servos: BTreeMap<String, SharedServo>,
}

impl HardwareMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate with one `SimServo` per entry.
    pub fn from_config(servos: &[ServoConfig]) -> Self {
        let mut map = Self::new();
        for config in servos {
            map.add_servo(Rc::new(RefCell::new(SimServo::new(config))));
        }
        map
    }

    /// Add or replace a servo under its own name.
    pub fn add_servo(&mut self, servo: SharedServo) {
        let name = servo.borrow().name().to_string();
        debug!("Hardware map: servo '{name}'");
        self.servos.insert(name, servo);
    }

    /// Look up a servo.
    ///
    /// # Errors
    /// `DeviceNotFound` if no servo has this name.
    pub fn servo(&self, name: &str) -> Result<SharedServo, HalError> {
        self.servos
            .get(name)
            .cloned()
            .ok_or_else(|| HalError::DeviceNotFound(name.to_string()))
    }

    /// Advance every device model by `dt`.
    pub fn update(&self, dt: Duration) {
        for servo in self.servos.values() {
            servo.borrow_mut().update(dt);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servos.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.servos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servos.is_empty()
    }
}
