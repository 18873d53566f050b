//! Commands: stateful units of work over a set of required subsystems.
//!
//! A command exposes five hooks to the scheduler:
//!
//! | Hook           | When                                         |
//! |----------------|----------------------------------------------|
//! | `initialize`   | once, in the tick the command is accepted    |
//! | `execute`      | every later tick while active                |
//! | `is_finished`  | right after each `execute`                   |
//! | `end`          | once, `interrupted = true` on cancel/pre-empt |
//!
//! Built-in variants live in [`basic`], composites in [`group`] and
//! wrappers in [`decorator`].

pub mod basic;
pub mod decorator;
pub mod group;
pub mod lifecycle;
pub mod requirements;

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use talon_common::hal::driver::HalError;
use thiserror::Error;

use crate::error::SchedulerError;
use crate::subsystem::SubsystemId;

pub use decorator::{Named, Uninterruptible, WithTimeout};
pub use group::{DeadlineGroup, ParallelGroup, RaceGroup, SequentialGroup};
pub use lifecycle::{CommandState, Lifecycle, LifecycleEvent, TransitionResult};
pub use requirements::Requirements;

/// Scheduler-assigned command handle, unique for the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommandHandle(u64);

impl CommandHandle {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command#{}", self.0)
    }
}

/// Error returned by a command hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandFault {
    message: String,
}

impl CommandFault {
    /// Create a fault with a human-readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Fault reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<HalError> for CommandFault {
    fn from(e: HalError) -> Self {
        Self::new(e.to_string())
    }
}

/// Command hook identifier, used in fault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    /// One-time setup.
    Initialize,
    /// Per-tick update.
    Execute,
    /// Completion predicate.
    IsFinished,
    /// One-time teardown.
    End,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialize => "initialize",
            Self::Execute => "execute",
            Self::IsFinished => "is_finished",
            Self::End => "end",
        })
    }
}

/// Per-tick information handed to command hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    /// Index of the current tick (first tick is 1).
    pub tick: u64,
    /// Session time sampled at tick start.
    pub now: Duration,
}

/// A unit of work driven by the scheduler.
///
/// Hooks must be fast and non-blocking: a blocking hook stalls every
/// subsystem. Any failure is returned as [`CommandFault`].
pub trait Command {
    /// Name used in logs, reports and snapshots.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Subsystems this command needs exclusive control of.
    fn requirements(&self) -> &[SubsystemId];

    /// Whether a newly requested conflicting command may pre-empt this one.
    fn is_interruptible(&self) -> bool {
        true
    }

    /// One-time setup, called in the tick the command is accepted.
    fn initialize(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        Ok(())
    }

    /// Per-tick update.
    fn execute(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        Ok(())
    }

    /// Completion predicate, evaluated after every `execute`.
    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault>;

    /// One-time teardown. `interrupted` is true on cancel or pre-emption.
    fn end(&mut self, _interrupted: bool) -> Result<(), CommandFault> {
        Ok(())
    }
}

impl<C: Command + ?Sized> Command for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn requirements(&self) -> &[SubsystemId] {
        (**self).requirements()
    }

    fn is_interruptible(&self) -> bool {
        (**self).is_interruptible()
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        (**self).initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        (**self).execute(ctx)
    }

    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault> {
        (**self).is_finished(ctx)
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        (**self).end(interrupted)
    }
}

/// Builder methods available on every command.
pub trait CommandExt: Command + Sized + 'static {
    /// Finish after `timeout` if the command has not finished by itself.
    fn with_timeout(self, timeout: Duration) -> WithTimeout<Self> {
        WithTimeout::new(self, timeout)
    }

    /// Refuse pre-emption by conflicting requests.
    fn uninterruptible(self) -> Uninterruptible<Self> {
        Uninterruptible::new(self)
    }

    /// Override the reported name.
    fn named(self, name: impl Into<String>) -> Named<Self> {
        Named::new(self, name)
    }

    /// Run `next` after this command finishes.
    fn and_then(self, next: impl Command + 'static) -> Result<SequentialGroup, SchedulerError> {
        SequentialGroup::new(vec![Box::new(self), Box::new(next)])
    }

    /// Run alongside `other`; finish when both have finished.
    fn alongside(self, other: impl Command + 'static) -> Result<ParallelGroup, SchedulerError> {
        ParallelGroup::new(vec![Box::new(self), Box::new(other)])
    }

    /// Run alongside `other`; finish when either finishes.
    fn race_with(self, other: impl Command + 'static) -> Result<RaceGroup, SchedulerError> {
        RaceGroup::new(vec![Box::new(self), Box::new(other)])
    }

    /// Erase the concrete type.
    fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }
}

impl<C: Command + 'static> CommandExt for C {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        requirements: Requirements,
    }

    impl Command for Probe {
        fn requirements(&self) -> &[SubsystemId] {
            self.requirements.as_slice()
        }

        fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
            Ok(true)
        }
    }

    #[test]
    fn default_name_is_type_name() {
        let probe = Probe {
            requirements: Requirements::new(),
        };
        assert!(probe.name().ends_with("Probe"));
        assert!(probe.is_interruptible());
    }

    #[test]
    fn boxed_forwards_hooks() {
        let mut cmd = Probe {
            requirements: Requirements::single(SubsystemId::new(3)),
        }
        .named("probe")
        .boxed();
        let ctx = TickContext {
            tick: 1,
            now: Duration::ZERO,
        };

        assert_eq!(cmd.name(), "probe");
        assert_eq!(cmd.requirements(), &[SubsystemId::new(3)]);
        assert_eq!(cmd.is_finished(&ctx), Ok(true));
    }

    #[test]
    fn hal_error_converts_to_fault() {
        let fault: CommandFault = HalError::DeviceNotFound("claw_servo".to_string()).into();
        assert!(fault.message().contains("claw_servo"));
    }

    #[test]
    fn handle_display() {
        assert_eq!(CommandHandle::new(12).to_string(), "command#12");
        assert_eq!(Hook::IsFinished.to_string(), "is_finished");
    }
}
