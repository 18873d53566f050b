//! # Talon Scheduler
//!
//! Command-based subsystem scheduling core. Arbitrates which command may
//! drive which subsystem at any instant, runs commands to completion or
//! interruption, and restores default commands on idle subsystems.
//!
//! ## Building Blocks
//!
//! 1. **Subsystem**: exclusively-ownable hardware handle ([`subsystem`])
//! 2. **Command**: unit of work over a set of required subsystems ([`command`])
//! 3. **Scheduler**: single-threaded tick loop and conflict resolution ([`scheduler`])
//!
//! ## Tick Order
//!
//! ```text
//! tick():
//!   snapshot active set
//!   (a) drain queued start/cancel requests  → conflict resolution
//!   (b) execute + is_finished for snapshot  → Finished path
//!   (c) start default commands on idle subsystems
//! ```
//!
//! External callers only *request* starts and cancels; every ownership
//! mutation happens inside `tick()`, so no locking is needed.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod stats;
pub mod subsystem;

pub use crate::command::{Command, CommandExt, CommandFault, CommandHandle, TickContext};
pub use crate::error::SchedulerError;
pub use crate::scheduler::{Scheduler, TickReport};
pub use crate::subsystem::SubsystemId;
