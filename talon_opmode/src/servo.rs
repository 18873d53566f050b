//! Servo position command.

use talon_common::hal::driver::{Servo, SharedServo};
use talon_scheduler::command::Requirements;
use talon_scheduler::{Command, CommandFault, SubsystemId, TickContext};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Completion {
    Immediate,
    Settle(f64),
    Hold,
}

/// Commands a servo to a position.
///
/// The target is written once in `initialize`. By default the command
/// finishes on its first tick; with [`settle_within`](Self::settle_within)
/// it waits until the servo reports arrival, and [`holding`](Self::holding)
/// keeps the subsystem until pre-empted.
pub struct ServoToPosition {
    servo: SharedServo,
    position: f64,
    completion: Completion,
    requirements: Requirements,
}

impl ServoToPosition {
    pub fn new(servo: SharedServo, position: f64, subsystem: SubsystemId) -> Self {
        Self {
            servo,
            position,
            completion: Completion::Immediate,
            requirements: Requirements::single(subsystem),
        }
    }

    /// Finish only once the servo is within `tolerance` of the target.
    pub fn settle_within(mut self, tolerance: f64) -> Self {
        self.completion = Completion::Settle(tolerance);
        self
    }

    /// Never finish; suited to default commands.
    pub fn holding(mut self) -> Self {
        self.completion = Completion::Hold;
        self
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

impl Command for ServoToPosition {
    fn name(&self) -> &str {
        "ServoToPosition"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn initialize(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        self.servo.borrow_mut().set_position(self.position)?;
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        match self.completion {
            Completion::Immediate => Ok(true),
            Completion::Hold => Ok(false),
            Completion::Settle(tolerance) => {
                let actual = self.servo.borrow().position()?;
                Ok((actual - self.position).abs() <= tolerance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimServo;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use talon_common::hal::config::ServoConfig;
    use talon_scheduler::Scheduler;

    fn sim(slew_rate: f64) -> Rc<RefCell<SimServo>> {
        Rc::new(RefCell::new(SimServo::new(&ServoConfig {
            name: "claw_servo".to_string(),
            initial_position: 0.2,
            slew_rate,
        })))
    }

    fn claw_id() -> SubsystemId {
        let mut scheduler = Scheduler::default();
        scheduler.register("claw_servo").unwrap()
    }

    fn ctx() -> TickContext {
        TickContext {
            tick: 1,
            now: Duration::ZERO,
        }
    }

    #[test]
    fn sets_target_and_finishes_immediately() {
        let servo = sim(1.0);
        let mut cmd = ServoToPosition::new(servo.clone(), 0.9, claw_id());

        cmd.initialize(&ctx()).unwrap();
        assert_eq!(servo.borrow().target_position(), 0.9);
        assert_eq!(cmd.is_finished(&ctx()), Ok(true));
    }

    #[test]
    fn settle_waits_for_arrival() {
        let servo = sim(1.0);
        let mut cmd = ServoToPosition::new(servo.clone(), 0.9, claw_id()).settle_within(0.01);

        cmd.initialize(&ctx()).unwrap();
        assert_eq!(cmd.is_finished(&ctx()), Ok(false));
        servo.borrow_mut().update(Duration::from_secs(1));
        assert_eq!(cmd.is_finished(&ctx()), Ok(true));
    }

    #[test]
    fn holding_never_finishes() {
        let servo = sim(0.0);
        let mut cmd = ServoToPosition::new(servo.clone(), 0.2, claw_id()).holding();
        cmd.initialize(&ctx()).unwrap();
        servo.borrow_mut().update(Duration::from_secs(1));
        assert_eq!(cmd.is_finished(&ctx()), Ok(false));
    }

    #[test]
    fn hardware_errors_become_faults() {
        let servo = sim(1.0);
        let mut cmd = ServoToPosition::new(servo.clone(), 1.4, claw_id());
        let fault = cmd.initialize(&ctx()).unwrap_err();
        assert!(fault.message().contains("out of range"));

        let mut cmd = ServoToPosition::new(servo.clone(), 0.5, claw_id()).settle_within(0.01);
        cmd.initialize(&ctx()).unwrap();
        servo.borrow_mut().set_connected(false);
        assert!(cmd.is_finished(&ctx()).is_err());
    }
}
