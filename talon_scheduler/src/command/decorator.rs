//! Wrappers that change one aspect of a command and forward the rest.

use std::time::Duration;

use super::{Command, CommandFault, TickContext};
use crate::subsystem::SubsystemId;

/// Finishes the inner command once `timeout` has elapsed since it was
/// initialized. A timed-out inner command is ended as interrupted.
pub struct WithTimeout<C> {
    inner: C,
    timeout: Duration,
    started_at: Duration,
    timed_out: bool,
}

impl<C: Command> WithTimeout<C> {
    /// Wrap `inner` with a timeout.
    pub const fn new(inner: C, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            started_at: Duration::ZERO,
            timed_out: false,
        }
    }

    /// Returns true if the last run ended because of the timeout.
    pub const fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl<C: Command> Command for WithTimeout<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn requirements(&self) -> &[SubsystemId] {
        self.inner.requirements()
    }

    fn is_interruptible(&self) -> bool {
        self.inner.is_interruptible()
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.started_at = ctx.now;
        self.timed_out = false;
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.inner.execute(ctx)
    }

    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault> {
        if self.inner.is_finished(ctx)? {
            return Ok(true);
        }
        if ctx.now.saturating_sub(self.started_at) >= self.timeout {
            self.timed_out = true;
            return Ok(true);
        }
        Ok(false)
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.inner.end(interrupted || self.timed_out)
    }
}

/// Refuses pre-emption by conflicting requests.
///
/// Explicit cancels still apply.
pub struct Uninterruptible<C> {
    inner: C,
}

impl<C: Command> Uninterruptible<C> {
    pub const fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Command> Command for Uninterruptible<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn requirements(&self) -> &[SubsystemId] {
        self.inner.requirements()
    }

    fn is_interruptible(&self) -> bool {
        false
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.inner.execute(ctx)
    }

    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault> {
        self.inner.is_finished(ctx)
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.inner.end(interrupted)
    }
}

/// Overrides the name reported in logs and snapshots.
pub struct Named<C> {
    inner: C,
    name: String,
}

impl<C: Command> Named<C> {
    pub fn new(inner: C, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }
}

impl<C: Command> Command for Named<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &[SubsystemId] {
        self.inner.requirements()
    }

    fn is_interruptible(&self) -> bool {
        self.inner.is_interruptible()
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.inner.execute(ctx)
    }

    fn is_finished(&mut self, ctx: &TickContext) -> Result<bool, CommandFault> {
        self.inner.is_finished(ctx)
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.inner.end(interrupted)
    }
}
