//! Scheduler error taxonomy.
//!
//! - `DuplicateRegistration`: programmer error at startup, fatal for the caller.
//! - `Conflict`: expected runtime outcome, reported to the requester.
//! - `CommandFault`: a hook failed; the command is retired as if finished.
//!
//! None of these terminate the scheduling loop.

use thiserror::Error;

use crate::command::{CommandFault, CommandHandle, Hook};
use crate::subsystem::SubsystemId;

/// Errors returned by registration, `request_start` and `tick`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// A subsystem with this name is already registered.
    #[error("subsystem '{name}' is already registered")]
    DuplicateRegistration {
        /// Rejected name; the first registration is kept.
        name: String,
    },

    /// The registry reached `MAX_SUBSYSTEMS`.
    #[error("subsystem registry full ({capacity} entries)")]
    RegistryFull {
        /// Registry capacity.
        capacity: usize,
    },

    /// A command requires a subsystem this scheduler never registered.
    #[error("unknown {0}")]
    UnknownSubsystem(SubsystemId),

    /// Start rejected: a required subsystem is held by a command that
    /// cannot be pre-empted (non-interruptible, or accepted earlier this tick).
    #[error("{subsystem} is held by {incumbent}")]
    Conflict {
        /// First contested subsystem.
        subsystem: SubsystemId,
        /// Command that kept the subsystem.
        incumbent: CommandHandle,
    },

    /// A command hook returned an error.
    #[error("{handle} '{command}' faulted in {hook}: {source}")]
    CommandFault {
        /// Faulting command.
        handle: CommandHandle,
        /// Command name at the time of the fault.
        command: String,
        /// Hook that failed.
        hook: Hook,
        /// Error returned by the hook.
        #[source]
        source: CommandFault,
    },

    /// Requirement set exceeds `MAX_REQUIREMENTS`.
    #[error("command requires more than {capacity} subsystems")]
    TooManyRequirements {
        /// Requirement capacity.
        capacity: usize,
    },

    /// Two children of a parallel group require the same subsystem.
    #[error("parallel group children both require {subsystem}")]
    OverlappingRequirements {
        /// Shared subsystem.
        subsystem: SubsystemId,
    },

    /// A default command does not require the subsystem it is installed on.
    #[error("default command for {subsystem} must require it")]
    DefaultCommandRequirement {
        /// Target subsystem.
        subsystem: SubsystemId,
    },

    /// More requests queued than `max_pending_requests` allows.
    #[error("request queue full ({capacity} pending)")]
    RequestQueueFull {
        /// Queue capacity.
        capacity: usize,
    },
}

impl SchedulerError {
    /// Returns true for the expected runtime conflict outcome.
    #[inline]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns true if a command hook failed.
    #[inline]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::CommandFault { .. })
    }
}
