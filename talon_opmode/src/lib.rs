//! # Talon OpMode
//!
//! Host side of the scheduler: owns the hardware map, registers subsystem
//! bindings, paces the tick loop and forwards scripted requests.
//!
//! ```text
//! OpModeRunner::step():
//!   issue script steps due this tick → Scheduler::tick() → HardwareMap::update()
//! ```

pub mod claw;
pub mod config;
pub mod error;
pub mod hardware;
pub mod runner;
pub mod servo;

pub use crate::claw::Claw;
pub use crate::config::OpModeConfig;
pub use crate::error::OpModeError;
pub use crate::hardware::{HardwareMap, SimServo};
pub use crate::runner::{OpModeRunner, RunSummary};
pub use crate::servo::ServoToPosition;
