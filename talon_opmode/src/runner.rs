//! Op mode runner: paces ticks and feeds scripted requests.
//!
//! ## RT Setup Sequence (`rt` feature)
//!
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack.
//! 3. `sched_setaffinity`: pin to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, priority)`.
//!
//! The loop then sleeps with `clock_nanosleep(TIMER_ABSTIME)`. Without the
//! feature every RT call is a no-op and pacing uses `std::thread::sleep`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use talon_common::config::Validate;
use talon_scheduler::clock::{Clock, SystemClock};
use talon_scheduler::scheduler::SchedulerSnapshot;
use talon_scheduler::{Command, Scheduler, TickReport};
use tracing::{debug, info, warn};

use crate::claw::Claw;
use crate::config::{OpModeConfig, ScriptAction, ScriptStep};
use crate::error::OpModeError;
use crate::hardware::HardwareMap;

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), OpModeError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| OpModeError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), OpModeError> {
    Ok(())
}

/// Touch stack pages up front so the loop never faults them in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), OpModeError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| OpModeError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| OpModeError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), OpModeError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), OpModeError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(OpModeError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), OpModeError> {
    Ok(())
}

/// Full RT setup. Call once before [`OpModeRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), OpModeError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Runner ─────────────────────────────────────────────────────────

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub started: u64,
    pub finished: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub faults: u64,
}

impl RunSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.started += report.started.len() as u64;
        self.finished += report.finished.len() as u64;
        self.cancelled += report.cancelled.len() as u64;
        self.rejected += report.rejected.len() as u64;
        self.faults += report.faults.len() as u64;
    }
}

/// Owns the scheduler, the hardware map and the claw binding.
pub struct OpModeRunner {
    scheduler: Scheduler,
    hardware: HardwareMap,
    claw: Claw,
    script: Vec<ScriptStep>,
    next_step: usize,
    tick_period: Duration,
    max_ticks: u64,
    running: Arc<AtomicBool>,
    summary: RunSummary,
}

impl OpModeRunner {
    /// Build a runner on the system clock.
    pub fn new(config: &OpModeConfig) -> Result<Self, OpModeError> {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    /// Build a runner whose scheduler reads time from `clock`.
    pub fn with_clock(config: &OpModeConfig, clock: Box<dyn Clock>) -> Result<Self, OpModeError> {
        config.validate()?;

        let mut scheduler = Scheduler::with_clock(config.scheduler.clone(), clock)?;
        let hardware = HardwareMap::from_config(&config.servos);
        let claw = Claw::register(&mut scheduler, &hardware, &config.claw)?;

        let mut script = config.script.clone();
        script.sort_by_key(|step| step.at_tick);

        Ok(Self {
            scheduler,
            hardware,
            claw,
            script,
            next_step: 0,
            tick_period: Duration::from_micros(config.loop_config.tick_period_us),
            max_ticks: config.loop_config.max_ticks,
            running: Arc::new(AtomicBool::new(true)),
            summary: RunSummary::default(),
        })
    }

    /// Override the tick limit (`0` = unbounded).
    pub fn set_max_ticks(&mut self, max_ticks: u64) {
        self.max_ticks = max_ticks;
    }

    pub fn set_tick_period(&mut self, period: Duration) {
        self.tick_period = period;
    }

    /// Flag polled once per tick; clear it to stop [`run`](Self::run).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Clear the running flag on SIGINT/SIGTERM.
    pub fn install_signal_handler(&self) -> Result<(), OpModeError> {
        let running = self.running_flag();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
        Ok(())
    }

    /// One loop iteration: due script steps, one tick, device update.
    pub fn step(&mut self) -> TickReport {
        let upcoming = self.scheduler.tick_count() + 1;
        while let Some(step) = self.script.get(self.next_step).copied() {
            if step.at_tick > upcoming {
                break;
            }
            self.next_step += 1;
            self.issue(step.action);
        }

        let report = self.scheduler.tick();
        self.hardware.update(self.tick_period);

        for (handle, err) in &report.rejected {
            warn!("Request {handle} rejected: {err}");
        }
        self.summary.ticks = report.tick;
        self.summary.absorb(&report);
        report
    }

    fn issue(&mut self, action: ScriptAction) {
        match action {
            ScriptAction::Open => {
                let command = self.claw.open();
                self.request(command);
            }
            ScriptAction::Close => {
                let command = self.claw.close();
                self.request(command);
            }
            ScriptAction::CancelAll => match self.scheduler.request_cancel_all() {
                Ok(()) => info!("Script: requested cancel_all"),
                Err(e) => {
                    warn!("Script: cancel_all refused: {e}");
                    self.summary.rejected += 1;
                }
            },
        }
    }

    fn request(&mut self, command: impl Command + 'static) {
        let name = command.name().to_string();
        match self.scheduler.request_start(command) {
            Ok(handle) => debug!("Script: requested {handle} '{name}'"),
            Err(e) => {
                warn!("Script: request '{name}' refused: {e}");
                self.summary.rejected += 1;
            }
        }
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && (self.max_ticks == 0 || self.scheduler.tick_count() < self.max_ticks)
    }

    /// Run until the tick limit is reached or the running flag clears.
    pub fn run(&mut self) -> Result<RunSummary, OpModeError> {
        #[cfg(feature = "rt")]
        {
            self.run_rt_loop()?;
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop();
        }

        Ok(self.summary.clone())
    }

    /// Tick loop paced with `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self) -> Result<(), OpModeError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let period_ns = self.tick_period.as_nanos() as i64;
        let mut next_wake = clock_gettime(clock)
            .map_err(|e| OpModeError::RtSetup(format!("clock_gettime: {e}")))?;

        while self.should_continue() {
            next_wake = timespec_add_ns(next_wake, period_ns);
            self.step();
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Tick loop paced with `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self) {
        use std::time::Instant;

        while self.should_continue() {
            let tick_start = Instant::now();
            self.step();
            if let Some(remaining) = self.tick_period.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    /// Cancel everything and return the final totals.
    pub fn shutdown(mut self) -> RunSummary {
        let report = self.scheduler.shutdown();
        self.summary.absorb(&report);
        info!(
            "Op mode finished: {} ticks, {} started, {} faults",
            self.summary.ticks, self.summary.started, self.summary.faults
        );
        self.summary
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.snapshot()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn hardware(&self) -> &HardwareMap {
        &self.hardware
    }

    pub fn claw(&self) -> &Claw {
        &self.claw
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

// ─── Tests ──────────────────────────────────────────────────────────
