//! Leaf command variants.
//!
//! - [`InstantCommand`]: one action in `initialize`, finished on the next tick
//! - [`RunCommand`]: one action per tick, never finishes by itself
//! - [`WaitCommand`]: finishes after a session-time delay
//! - [`WaitUntilCommand`]: finishes once a predicate holds

use std::time::Duration;

use super::{Command, CommandFault, Requirements, TickContext};
use crate::subsystem::SubsystemId;

/// Fire-and-forget command.
///
/// The action runs once during `initialize`; the completion predicate is
/// always true, so the command finishes on its first tick after acceptance.
pub struct InstantCommand<F> {
    requirements: Requirements,
    action: F,
}

impl<F> InstantCommand<F>
where
    F: FnMut() -> Result<(), CommandFault>,
{
    /// Create an instant command over `requirements`.
    pub fn new(requirements: Requirements, action: F) -> Self {
        Self {
            requirements,
            action,
        }
    }
}

impl<F> Command for InstantCommand<F>
where
    F: FnMut() -> Result<(), CommandFault>,
{
    fn name(&self) -> &str {
        "InstantCommand"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn initialize(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        (self.action)()
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(true)
    }
}

/// Runs an action every tick until cancelled.
///
/// Typical default command (e.g. "hold position").
pub struct RunCommand<F> {
    requirements: Requirements,
    action: F,
}

impl<F> RunCommand<F>
where
    F: FnMut(&TickContext) -> Result<(), CommandFault>,
{
    /// Create a perpetual command over `requirements`.
    pub fn new(requirements: Requirements, action: F) -> Self {
        Self {
            requirements,
            action,
        }
    }
}

impl<F> Command for RunCommand<F>
where
    F: FnMut(&TickContext) -> Result<(), CommandFault>,
{
    fn name(&self) -> &str {
        "RunCommand"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        (self.action)(ctx)
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(false)
    }
}

/// Finishes once `duration` of session time has elapsed since `initialize`.
#[derive(Debug, Clone)]
pub struct WaitCommand {
    duration: Duration,
    started_at: Duration,
}

impl WaitCommand {
    /// Wait for `duration`.
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            started_at: Duration::ZERO,
        }
    }
}

impl Command for WaitCommand {
    fn name(&self) -> &str {
        "WaitCommand"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &[]
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.started_at = ctx.now;
        Ok(())
    }

    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(ctx.now.saturating_sub(self.started_at) >= self.duration)
    }
}

/// Finishes once `condition` returns true.
pub struct WaitUntilCommand<P> {
    condition: P,
}

impl<P> WaitUntilCommand<P>
where
    P: FnMut(&TickContext) -> bool,
{
    /// Wait for `condition`.
    pub fn new(condition: P) -> Self {
        Self { condition }
    }
}

impl<P> Command for WaitUntilCommand<P>
where
    P: FnMut(&TickContext) -> bool,
{
    fn name(&self) -> &str {
        "WaitUntilCommand"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &[]
    }

    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok((self.condition)(ctx))
    }
}
