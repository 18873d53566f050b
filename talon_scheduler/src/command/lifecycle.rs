//! Command lifecycle state machine.
//!
//! `Pending → Initialized → Running → {Finished, Cancelled}`.
//! `Finished` and `Cancelled` are terminal.

use serde::Serialize;

/// Lifecycle state of a scheduled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    /// Requested, not yet accepted by the scheduler.
    #[default]
    Pending,
    /// Accepted; `initialize` ran this tick.
    Initialized,
    /// Advanced at least once by `execute`.
    Running,
    /// Completion predicate held (or a hook faulted).
    Finished,
    /// Pre-empted or explicitly cancelled.
    Cancelled,
}

impl CommandState {
    /// Returns true for `Finished` and `Cancelled`.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Returns true while the command holds its subsystems.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Initialized | Self::Running)
    }
}

/// Event driving a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Scheduler accepted the start request and ran `initialize`.
    Accept,
    /// Scheduler ran `execute` for a tick.
    Advance,
    /// Completion predicate returned true, or a hook faulted.
    Complete,
    /// Cancelled or pre-empted.
    Interrupt,
}

/// Result of a lifecycle transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded: new state.
    Ok(CommandState),
    /// Transition rejected: reason.
    Rejected(&'static str),
}

/// Lifecycle holder for one command.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: CommandState,
}

impl Lifecycle {
    /// New lifecycle in `Pending`.
    pub const fn new() -> Self {
        Self {
            state: CommandState::Pending,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> CommandState {
        self.state
    }

    /// Apply an event.
    pub fn handle_event(&mut self, event: LifecycleEvent) -> TransitionResult {
        use CommandState::*;
        use LifecycleEvent::*;

        let next = match (self.state, event) {
            (Pending, Accept) => Initialized,
            (Initialized | Running, Advance) => Running,
            (Initialized | Running, Complete) => Finished,
            // A queued request dropped at shutdown never ran a hook.
            (Pending | Initialized | Running, Interrupt) => Cancelled,
            (Finished | Cancelled, _) => {
                return TransitionResult::Rejected("terminal state: no further transitions");
            }
            (Pending, _) => {
                return TransitionResult::Rejected("Pending: only Accept or Interrupt allowed");
            }
            (Initialized | Running, Accept) => {
                return TransitionResult::Rejected("already accepted");
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}
