//! The scheduler: conflict resolution and the tick loop.
//!
//! One `Scheduler` is constructed per control session and owned by whoever
//! drives the tick loop. Callers queue start and cancel requests; every
//! change of ownership happens inside [`Scheduler::tick`].

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use serde::Serialize;
use talon_common::config::{ConfigError, Validate};
use talon_common::consts::MAX_REQUIREMENTS;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{
    Command, CommandFault, CommandHandle, CommandState, Hook, Lifecycle, LifecycleEvent,
    Requirements, TickContext, TransitionResult,
};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::stats::TickStats;
use crate::subsystem::{SubsystemId, SubsystemRegistry};

/// Terminal states kept for `state()` queries after a command retires.
const RETIRED_HISTORY: usize = 256;

enum Request {
    Start {
        handle: CommandHandle,
        command: Box<dyn Command>,
    },
    Cancel(CommandHandle),
    CancelAll,
}

struct ActiveCommand {
    command: Box<dyn Command>,
    lifecycle: Lifecycle,
    name: String,
    requirements: Requirements,
    /// Subsystem whose default slot this command came from.
    default_for: Option<SubsystemId>,
    accepted_tick: u64,
}

impl ActiveCommand {
    /// Whether a new request may pre-empt this command during `tick`.
    ///
    /// Defaults always yield. Anything accepted earlier in the same tick
    /// keeps its subsystems (first request wins).
    fn yields_to_request(&self, tick: u64) -> bool {
        self.default_for.is_some() || (self.command.is_interruptible() && self.accepted_tick != tick)
    }
}

/// Outcome of one [`Scheduler::tick`] (or of a teardown).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick index the report belongs to.
    pub tick: u64,
    /// Commands accepted and initialized, default commands included.
    pub started: Vec<CommandHandle>,
    /// Commands that completed, faulted ones included.
    pub finished: Vec<CommandHandle>,
    /// Commands ended with `interrupted = true`.
    pub cancelled: Vec<CommandHandle>,
    /// Start requests that were refused.
    pub rejected: Vec<(CommandHandle, SchedulerError)>,
    /// Hook failures.
    pub faults: Vec<SchedulerError>,
}

impl TickReport {
    fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Returns true if nothing changed during the tick.
    pub fn is_quiet(&self) -> bool {
        self.started.is_empty()
            && self.finished.is_empty()
            && self.cancelled.is_empty()
            && self.rejected.is_empty()
            && self.faults.is_empty()
    }

    /// Why the start request `handle` was refused, if it was.
    pub fn rejection(&self, handle: CommandHandle) -> Option<&SchedulerError> {
        self.rejected
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, e)| e)
    }

    /// Returns true if any hook failed.
    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }
}

/// Serializable view of one subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsystemSnapshot {
    pub id: SubsystemId,
    pub name: String,
    pub owner: Option<CommandHandle>,
    pub has_default: bool,
    pub default_running: bool,
}

/// Serializable view of one active command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSnapshot {
    pub handle: CommandHandle,
    pub name: String,
    pub state: CommandState,
    pub requirements: Vec<SubsystemId>,
    pub interruptible: bool,
    pub is_default: bool,
}

/// Point-in-time view of the scheduler, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerSnapshot {
    pub tick: u64,
    pub subsystems: Vec<SubsystemSnapshot>,
    pub commands: Vec<CommandSnapshot>,
    pub pending_requests: usize,
    pub stats: TickStats,
}

impl SchedulerSnapshot {
    /// Returns true if no subsystem is required by two active commands.
    pub fn is_exclusive(&self) -> bool {
        let mut seen = Vec::new();
        for id in self.commands.iter().flat_map(|c| c.requirements.iter()) {
            if seen.contains(id) {
                return false;
            }
            seen.push(*id);
        }
        true
    }
}

/// Command-based subsystem scheduler.
///
/// Single-threaded: hooks run synchronously inside [`tick`](Self::tick),
/// which must never be called concurrently. Dropping the scheduler cancels
/// every active command.
pub struct Scheduler {
    registry: SubsystemRegistry,
    active: BTreeMap<CommandHandle, ActiveCommand>,
    pending: VecDeque<Request>,
    retired: VecDeque<(CommandHandle, CommandState)>,
    /// Reused per-tick copy of the active handles.
    snapshot: Vec<CommandHandle>,
    config: SchedulerConfig,
    clock: Box<dyn Clock>,
    next_handle: u64,
    tick_count: u64,
    stats: TickStats,
}

impl Scheduler {
    /// Create a scheduler driven by the system clock.
    ///
    /// # Errors
    /// `ValidationError` if `config` is out of range.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    /// Create a scheduler reading session time from `clock`.
    pub fn with_clock(config: SchedulerConfig, clock: Box<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: SubsystemRegistry::new(),
            active: BTreeMap::new(),
            pending: VecDeque::with_capacity(config.max_pending_requests),
            retired: VecDeque::with_capacity(RETIRED_HISTORY),
            snapshot: Vec::new(),
            config,
            clock,
            next_handle: 1,
            tick_count: 0,
            stats: TickStats::new(),
        })
    }

    // ─── Registration ───────────────────────────────────────────────

    /// Declare a subsystem with no default command.
    ///
    /// # Errors
    /// `DuplicateRegistration` if `name` is taken; the first one is kept.
    pub fn register(&mut self, name: &str) -> Result<SubsystemId, SchedulerError> {
        let id = self.registry.register(name)?;
        debug!("Registered subsystem '{name}' as {id}");
        Ok(id)
    }

    /// Declare a subsystem and its default command.
    ///
    /// `factory` receives the id the subsystem is about to get; the command
    /// it returns must require that id.
    pub fn register_with_default<F, C>(
        &mut self,
        name: &str,
        factory: F,
    ) -> Result<SubsystemId, SchedulerError>
    where
        F: FnOnce(SubsystemId) -> C,
        C: Command + 'static,
    {
        let id = self
            .registry
            .register_with_default(name, |id| -> Box<dyn Command> { Box::new(factory(id)) })?;
        debug!("Registered subsystem '{name}' as {id} with default command");
        Ok(id)
    }

    /// Install or replace the default command of `id`.
    pub fn set_default_command(
        &mut self,
        id: SubsystemId,
        command: impl Command + 'static,
    ) -> Result<(), SchedulerError> {
        self.registry.set_default(id, Box::new(command))
    }

    /// Read-only registry access.
    pub fn registry(&self) -> &SubsystemRegistry {
        &self.registry
    }

    // ─── Requests ───────────────────────────────────────────────────

    /// Queue `command` to start at the next tick.
    ///
    /// The returned handle identifies the command from now on. Conflicts
    /// are resolved during the tick and reported in [`TickReport::rejected`].
    ///
    /// # Errors
    /// `RequestQueueFull`, `TooManyRequirements` or `UnknownSubsystem`.
    pub fn request_start(
        &mut self,
        command: impl Command + 'static,
    ) -> Result<CommandHandle, SchedulerError> {
        self.request_start_boxed(Box::new(command))
    }

    /// [`request_start`](Self::request_start) for an already boxed command.
    pub fn request_start_boxed(
        &mut self,
        command: Box<dyn Command>,
    ) -> Result<CommandHandle, SchedulerError> {
        self.check_queue()?;
        let requirements = Requirements::from_ids(command.requirements())?;
        if let Some(&unknown) = requirements.iter().find(|id| !self.registry.contains(**id)) {
            return Err(SchedulerError::UnknownSubsystem(unknown));
        }

        let handle = self.allocate_handle();
        trace!("Queued start of {handle} '{}'", command.name());
        self.pending.push_back(Request::Start { handle, command });
        Ok(handle)
    }

    /// Queue a cancel of `handle` for the next tick.
    ///
    /// Cancelling a command that already retired is a no-op.
    pub fn request_cancel(&mut self, handle: CommandHandle) -> Result<(), SchedulerError> {
        self.check_queue()?;
        self.pending.push_back(Request::Cancel(handle));
        Ok(())
    }

    /// Queue a cancel of every command active when the request is applied.
    ///
    /// Starts queued after this request are unaffected.
    pub fn request_cancel_all(&mut self) -> Result<(), SchedulerError> {
        self.check_queue()?;
        self.pending.push_back(Request::CancelAll);
        Ok(())
    }

    fn check_queue(&self) -> Result<(), SchedulerError> {
        if self.pending.len() >= self.config.max_pending_requests {
            return Err(SchedulerError::RequestQueueFull {
                capacity: self.config.max_pending_requests,
            });
        }
        Ok(())
    }

    fn allocate_handle(&mut self) -> CommandHandle {
        let handle = CommandHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Run one scheduling step.
    ///
    /// 1. Apply queued requests in arrival order.
    /// 2. Advance every command that was active when the tick began.
    /// 3. Start default commands on idle subsystems.
    pub fn tick(&mut self) -> TickReport {
        let tick_start = Instant::now();
        self.tick_count += 1;
        let ctx = TickContext {
            tick: self.tick_count,
            now: self.clock.now(),
        };
        let mut report = TickReport::new(self.tick_count);

        let mut snapshot = std::mem::take(&mut self.snapshot);
        snapshot.clear();
        snapshot.extend(self.active.keys().copied());

        self.process_requests(&ctx, &mut report);
        self.advance(&snapshot, &ctx, &mut report);
        self.start_defaults(&ctx, &mut report);

        self.snapshot = snapshot;

        let elapsed_ns = tick_start.elapsed().as_nanos() as u64;
        let budget_ns = self.config.tick_budget_us.saturating_mul(1000);
        if self.stats.record(elapsed_ns, budget_ns) {
            warn!(
                "Tick {} overran budget: {} µs > {} µs",
                self.tick_count,
                elapsed_ns / 1000,
                self.config.tick_budget_us
            );
        }
        for fault in &report.faults {
            warn!("{fault}");
        }
        report
    }

    fn process_requests(&mut self, ctx: &TickContext, report: &mut TickReport) {
        while let Some(request) = self.pending.pop_front() {
            match request {
                Request::Start { handle, command } => {
                    if let Err((err, command)) = self.try_start(handle, command, None, ctx, report) {
                        debug!("Rejected {handle} '{}': {err}", command.name());
                        self.remember(handle, CommandState::Cancelled);
                        report.rejected.push((handle, err));
                    }
                }
                Request::Cancel(handle) => self.cancel(handle, report),
                Request::CancelAll => {
                    debug!("Cancelling all {} active commands", self.active.len());
                    self.retire_all(report);
                }
            }
        }
    }

    fn cancel(&mut self, handle: CommandHandle, report: &mut TickReport) {
        if self.active.contains_key(&handle) {
            self.retire(handle, true, report);
        } else {
            trace!("Cancel of inactive {handle} ignored");
        }
    }

    /// Conflict resolution plus acceptance.
    ///
    /// Either every required subsystem is claimed or none is. On rejection
    /// the command is handed back untouched.
    fn try_start(
        &mut self,
        handle: CommandHandle,
        command: Box<dyn Command>,
        default_for: Option<SubsystemId>,
        ctx: &TickContext,
        report: &mut TickReport,
    ) -> Result<(), (SchedulerError, Box<dyn Command>)> {
        let requirements = match Requirements::from_ids(command.requirements()) {
            Ok(reqs) => reqs,
            Err(err) => return Err((err, command)),
        };

        let mut incumbents: heapless::Vec<CommandHandle, MAX_REQUIREMENTS> = heapless::Vec::new();
        for &id in requirements.iter() {
            if !self.registry.contains(id) {
                return Err((SchedulerError::UnknownSubsystem(id), command));
            }
            let Some(owner) = self.registry.current_owner(id) else {
                continue;
            };
            if incumbents.contains(&owner) {
                continue;
            }
            let yields = self
                .active
                .get(&owner)
                .is_none_or(|a| a.yields_to_request(self.tick_count));
            if !yields {
                let err = SchedulerError::Conflict {
                    subsystem: id,
                    incumbent: owner,
                };
                return Err((err, command));
            }
            // At most one incumbent per requirement.
            let _ = incumbents.push(owner);
        }

        for incumbent in incumbents {
            debug!("{handle} pre-empts {incumbent}");
            self.retire(incumbent, true, report);
        }

        for &id in requirements.iter() {
            self.registry.set_owner(id, handle);
        }
        if let Some(id) = default_for {
            self.registry.mark_default_running(id, handle);
        }

        let mut lifecycle = Lifecycle::new();
        lifecycle.handle_event(LifecycleEvent::Accept);
        let name = command.name().to_string();
        debug!("Starting {handle} '{name}'");
        self.active.insert(
            handle,
            ActiveCommand {
                command,
                lifecycle,
                name,
                requirements,
                default_for,
                accepted_tick: self.tick_count,
            },
        );
        report.started.push(handle);

        let init = self
            .active
            .get_mut(&handle)
            .map_or(Ok(()), |a| a.command.initialize(ctx));
        if let Err(fault) = init {
            self.record_fault(handle, Hook::Initialize, fault, report);
            self.retire(handle, false, report);
        }
        Ok(())
    }

    fn advance(&mut self, snapshot: &[CommandHandle], ctx: &TickContext, report: &mut TickReport) {
        for &handle in snapshot {
            // Retired while processing requests.
            let Some(active) = self.active.get_mut(&handle) else {
                continue;
            };
            active.lifecycle.handle_event(LifecycleEvent::Advance);

            let outcome = active
                .command
                .execute(ctx)
                .map_err(|f| (Hook::Execute, f))
                .and_then(|()| {
                    active
                        .command
                        .is_finished(ctx)
                        .map_err(|f| (Hook::IsFinished, f))
                });

            match outcome {
                Ok(false) => {}
                Ok(true) => self.retire(handle, false, report),
                Err((hook, fault)) => {
                    self.record_fault(handle, hook, fault, report);
                    self.retire(handle, false, report);
                }
            }
        }
    }

    fn start_defaults(&mut self, ctx: &TickContext, report: &mut TickReport) {
        for index in 0..self.registry.len() {
            let id = SubsystemId::new(index as u16);
            let Some(command) = self.registry.take_idle_default(id) else {
                continue;
            };

            // Defaults never pre-empt; wait until every requirement is idle.
            let busy = command
                .requirements()
                .iter()
                .any(|r| self.registry.current_owner(*r).is_some());
            if busy {
                self.registry.restore_default(id, command);
                continue;
            }

            let handle = self.allocate_handle();
            if let Err((err, command)) = self.try_start(handle, command, Some(id), ctx, report) {
                trace!("Default command for {id} not started: {err}");
                self.registry.restore_default(id, command);
            }
        }
    }

    /// Run the end hook, release ownership and drop from the active set.
    fn retire(&mut self, handle: CommandHandle, interrupted: bool, report: &mut TickReport) {
        let Some(mut active) = self.active.remove(&handle) else {
            return;
        };

        let event = if interrupted {
            LifecycleEvent::Interrupt
        } else {
            LifecycleEvent::Complete
        };
        let state = match active.lifecycle.handle_event(event) {
            TransitionResult::Ok(state) => state,
            TransitionResult::Rejected(reason) => {
                warn!("{handle} '{}': {reason}", active.name);
                active.lifecycle.state()
            }
        };

        if let Err(source) = active.command.end(interrupted) {
            report.faults.push(SchedulerError::CommandFault {
                handle,
                command: active.name.clone(),
                hook: Hook::End,
                source,
            });
        }

        for &id in active.requirements.iter() {
            self.registry.clear_owner(id, handle);
        }
        if let Some(id) = active.default_for {
            self.registry.return_default(id, handle, active.command);
        }

        debug!("{handle} '{}' {state:?}", active.name);
        self.remember(handle, state);
        if interrupted {
            report.cancelled.push(handle);
        } else {
            report.finished.push(handle);
        }
    }

    fn record_fault(
        &self,
        handle: CommandHandle,
        hook: Hook,
        source: CommandFault,
        report: &mut TickReport,
    ) {
        let command = self
            .active
            .get(&handle)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        report.faults.push(SchedulerError::CommandFault {
            handle,
            command,
            hook,
            source,
        });
    }

    fn remember(&mut self, handle: CommandHandle, state: CommandState) {
        if self.retired.len() == RETIRED_HISTORY {
            self.retired.pop_front();
        }
        self.retired.push_back((handle, state));
    }

    // ─── Teardown ───────────────────────────────────────────────────

    /// End every active command as interrupted and drop queued requests.
    ///
    /// Default commands are handed back to their slots and restart on the
    /// next tick.
    pub(crate) fn cancel_all(&mut self) -> TickReport {
        let mut report = TickReport::new(self.tick_count);

        for request in std::mem::take(&mut self.pending) {
            if let Request::Start { handle, .. } = request {
                self.remember(handle, CommandState::Cancelled);
                report.cancelled.push(handle);
            }
        }

        self.retire_all(&mut report);
        report
    }

    fn retire_all(&mut self, report: &mut TickReport) {
        let handles: Vec<CommandHandle> = self.active.keys().copied().collect();
        for handle in handles {
            self.retire(handle, true, report);
        }
    }

    /// Tear the session down; equivalent to `cancel_all` then drop.
    pub fn shutdown(mut self) -> TickReport {
        let report = self.cancel_all();
        debug!(
            "Scheduler shut down after {} ticks ({} commands cancelled)",
            self.tick_count,
            report.cancelled.len()
        );
        report
    }

    // ─── Queries ────────────────────────────────────────────────────

    /// Command currently owning `id`.
    pub fn current_owner(&self, id: SubsystemId) -> Option<CommandHandle> {
        self.registry.current_owner(id)
    }

    /// Lifecycle state of `handle`.
    ///
    /// Retired commands are remembered for a bounded number of retirements.
    pub fn state(&self, handle: CommandHandle) -> Option<CommandState> {
        if let Some(active) = self.active.get(&handle) {
            return Some(active.lifecycle.state());
        }
        let queued = self
            .pending
            .iter()
            .any(|r| matches!(r, Request::Start { handle: h, .. } if *h == handle));
        if queued {
            return Some(CommandState::Pending);
        }
        self.retired
            .iter()
            .rev()
            .find(|(h, _)| *h == handle)
            .map(|(_, state)| *state)
    }

    /// Returns true if `handle` is in the active set.
    pub fn is_scheduled(&self, handle: CommandHandle) -> bool {
        self.active.contains_key(&handle)
    }

    /// Number of active commands.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of queued requests.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Tick timing statistics.
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Serializable view of the current state.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let subsystems = self
            .registry
            .iter()
            .map(|(id, name)| SubsystemSnapshot {
                id,
                name: name.to_string(),
                owner: self.registry.current_owner(id),
                has_default: self.registry.has_default(id),
                default_running: self.registry.running_default(id).is_some(),
            })
            .collect();
        let commands = self
            .active
            .iter()
            .map(|(&handle, a)| CommandSnapshot {
                handle,
                name: a.name.clone(),
                state: a.lifecycle.state(),
                requirements: a.requirements.to_vec(),
                interruptible: a.default_for.is_some() || a.command.is_interruptible(),
                is_default: a.default_for.is_some(),
            })
            .collect();

        SchedulerSnapshot {
            tick: self.tick_count,
            subsystems,
            commands,
            pending_requests: self.pending.len(),
            stats: self.stats.clone(),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            registry: SubsystemRegistry::new(),
            active: BTreeMap::new(),
            pending: VecDeque::new(),
            retired: VecDeque::with_capacity(RETIRED_HISTORY),
            snapshot: Vec::new(),
            config: SchedulerConfig::default(),
            clock: Box::new(SystemClock::new()),
            next_handle: 1,
            tick_count: 0,
            stats: TickStats::new(),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.active.is_empty() && self.pending.is_empty() {
            return;
        }
        let report = self.cancel_all();
        for fault in &report.faults {
            warn!("During teardown: {fault}");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tick_count", &self.tick_count)
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.len())
            .field("registry", &self.registry)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
