//! Claw subsystem binding.
//!
//! A single servo registered as a subsystem under the servo's own name,
//! with `open` and `close` commands built from [`ServoToPosition`].

use talon_common::hal::driver::SharedServo;
use talon_scheduler::{Scheduler, SubsystemId};
use tracing::info;

use crate::config::ClawConfig;
use crate::error::OpModeError;
use crate::hardware::HardwareMap;
use crate::servo::ServoToPosition;

pub struct Claw {
    id: SubsystemId,
    servo: SharedServo,
    open_position: f64,
    close_position: f64,
    settle_tolerance: Option<f64>,
}

impl Claw {
    /// Look up the claw servo and register the subsystem.
    ///
    /// With `hold_closed`, a holding close command becomes the default.
    ///
    /// # Errors
    /// `DeviceNotFound` for a missing servo, `DuplicateRegistration` if the
    /// name is already taken.
    pub fn register(
        scheduler: &mut Scheduler,
        hardware: &HardwareMap,
        config: &ClawConfig,
    ) -> Result<Self, OpModeError> {
        let servo = hardware.servo(&config.servo)?;

        let id = if config.hold_closed {
            let default_servo = servo.clone();
            let position = config.close_position;
            scheduler.register_with_default(&config.servo, move |id| {
                ServoToPosition::new(default_servo, position, id).holding()
            })?
        } else {
            scheduler.register(&config.servo)?
        };
        info!(
            "Claw registered on '{}' (open={}, close={}, hold_closed={})",
            config.servo, config.open_position, config.close_position, config.hold_closed
        );

        Ok(Self {
            id,
            servo,
            open_position: config.open_position,
            close_position: config.close_position,
            settle_tolerance: config.settle_tolerance,
        })
    }

    pub fn id(&self) -> SubsystemId {
        self.id
    }

    pub fn open(&self) -> ServoToPosition {
        self.move_to(self.open_position)
    }

    pub fn close(&self) -> ServoToPosition {
        self.move_to(self.close_position)
    }

    fn move_to(&self, position: f64) -> ServoToPosition {
        let command = ServoToPosition::new(self.servo.clone(), position, self.id);
        match self.settle_tolerance {
            Some(tolerance) => command.settle_within(tolerance),
            None => command,
        }
    }
}
