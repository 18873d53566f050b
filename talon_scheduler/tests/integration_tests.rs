//! Integration tests for the Talon scheduler.
//!
//! These drive the public `Scheduler` API through multi-tick scenarios
//! covering arbitration, default commands, faults and composite commands.

mod integration;
