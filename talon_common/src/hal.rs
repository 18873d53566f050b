//! Hardware seam shared by command authors and the host loop.
//!
//! The scheduler never touches hardware; commands call into devices
//! through the [`driver::Servo`] trait defined here.

pub mod config;
pub mod driver;
