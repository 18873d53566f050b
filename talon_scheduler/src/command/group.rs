//! Composite commands.
//!
//! Groups own their children and present them to the scheduler as one
//! command. Requirements are the union of the children's; a group is
//! interruptible only if every child is. Children of parallel groups run
//! in the same tick and must not share subsystems.

use super::{Command, CommandFault, Requirements, TickContext};
use crate::error::SchedulerError;
use crate::subsystem::SubsystemId;

fn all_interruptible(children: &[Box<dyn Command>]) -> bool {
    children.iter().all(|c| c.is_interruptible())
}

fn union_requirements(children: &[Box<dyn Command>]) -> Result<Requirements, SchedulerError> {
    let mut reqs = Requirements::new();
    for child in children {
        reqs.extend_from(child.requirements())?;
    }
    Ok(reqs)
}

fn disjoint_requirements(children: &[Box<dyn Command>]) -> Result<Requirements, SchedulerError> {
    let mut reqs = Requirements::new();
    for child in children {
        if let Some(subsystem) = reqs.overlap(child.requirements()) {
            return Err(SchedulerError::OverlappingRequirements { subsystem });
        }
        reqs.extend_from(child.requirements())?;
    }
    Ok(reqs)
}

fn keep_first(acc: &mut Result<(), CommandFault>, next: Result<(), CommandFault>) {
    if acc.is_ok() {
        *acc = next;
    }
}

/// Children advanced side by side.
struct Members {
    children: Vec<Box<dyn Command>>,
    running: Vec<bool>,
}

impl Members {
    fn new(children: Vec<Box<dyn Command>>) -> Self {
        let running = vec![false; children.len()];
        Self { children, running }
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        for (child, running) in self.children.iter_mut().zip(self.running.iter_mut()) {
            // Marked first so a faulting child still gets its end hook.
            *running = true;
            child.initialize(ctx)?;
        }
        Ok(())
    }

    /// Advance running children, ending those that finish.
    /// Returns how many finished this tick.
    fn execute(&mut self, ctx: &TickContext) -> Result<usize, CommandFault> {
        let mut finished = 0;
        for (child, running) in self.children.iter_mut().zip(self.running.iter_mut()) {
            if !*running {
                continue;
            }
            child.execute(ctx)?;
            if child.is_finished(ctx)? {
                *running = false;
                finished += 1;
                child.end(false)?;
            }
        }
        Ok(finished)
    }

    fn end_running(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        let mut result = Ok(());
        for (child, running) in self.children.iter_mut().zip(self.running.iter_mut()) {
            if *running {
                *running = false;
                keep_first(&mut result, child.end(interrupted));
            }
        }
        result
    }

    fn any_running(&self) -> bool {
        self.running.iter().any(|r| *r)
    }
}

/// Runs children one after another.
pub struct SequentialGroup {
    children: Vec<Box<dyn Command>>,
    index: usize,
    child_active: bool,
    requirements: Requirements,
    interruptible: bool,
}

impl SequentialGroup {
    /// Build a sequence. Children may share subsystems.
    ///
    /// # Errors
    /// `TooManyRequirements` if the union exceeds capacity.
    pub fn new(children: Vec<Box<dyn Command>>) -> Result<Self, SchedulerError> {
        Ok(Self {
            requirements: union_requirements(&children)?,
            interruptible: all_interruptible(&children),
            children,
            index: 0,
            child_active: false,
        })
    }

    fn start_current(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        if let Some(child) = self.children.get_mut(self.index) {
            self.child_active = true;
            child.initialize(ctx)?;
        }
        Ok(())
    }
}

impl Command for SequentialGroup {
    fn name(&self) -> &str {
        "SequentialGroup"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.index = 0;
        self.child_active = false;
        self.start_current(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        let Some(child) = self.children.get_mut(self.index) else {
            return Ok(());
        };
        child.execute(ctx)?;
        if child.is_finished(ctx)? {
            self.child_active = false;
            child.end(false)?;
            self.index += 1;
            self.start_current(ctx)?;
        }
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(self.index >= self.children.len())
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        if !self.child_active {
            return Ok(());
        }
        self.child_active = false;
        match self.children.get_mut(self.index) {
            Some(child) => child.end(interrupted),
            None => Ok(()),
        }
    }
}

/// Runs children together; finishes when all have finished.
pub struct ParallelGroup {
    members: Members,
    requirements: Requirements,
    interruptible: bool,
}

impl ParallelGroup {
    /// Build a parallel group.
    ///
    /// # Errors
    /// `OverlappingRequirements` if two children share a subsystem.
    pub fn new(children: Vec<Box<dyn Command>>) -> Result<Self, SchedulerError> {
        Ok(Self {
            requirements: disjoint_requirements(&children)?,
            interruptible: all_interruptible(&children),
            members: Members::new(children),
        })
    }
}

impl Command for ParallelGroup {
    fn name(&self) -> &str {
        "ParallelGroup"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.members.initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.members.execute(ctx).map(|_| ())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(!self.members.any_running())
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.members.end_running(interrupted)
    }
}

/// Runs children together; finishes as soon as one finishes.
/// The others are ended as interrupted.
pub struct RaceGroup {
    members: Members,
    requirements: Requirements,
    interruptible: bool,
    finished: bool,
}

impl RaceGroup {
    /// Build a race group.
    ///
    /// # Errors
    /// `OverlappingRequirements` if two children share a subsystem.
    pub fn new(children: Vec<Box<dyn Command>>) -> Result<Self, SchedulerError> {
        Ok(Self {
            requirements: disjoint_requirements(&children)?,
            interruptible: all_interruptible(&children),
            members: Members::new(children),
            finished: false,
        })
    }
}

impl Command for RaceGroup {
    fn name(&self) -> &str {
        "RaceGroup"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.finished = false;
        self.members.initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        if self.members.execute(ctx)? > 0 {
            self.finished = true;
        }
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(self.finished || !self.members.any_running())
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.members.end_running(interrupted || self.finished)
    }
}

/// Runs children together; finishes when the deadline child finishes.
/// Children still running at that point are ended as interrupted.
pub struct DeadlineGroup {
    members: Members,
    requirements: Requirements,
    interruptible: bool,
}

impl DeadlineGroup {
    /// Build a deadline group; `deadline` decides when the group ends.
    ///
    /// # Errors
    /// `OverlappingRequirements` if two children share a subsystem.
    pub fn new(
        deadline: Box<dyn Command>,
        others: Vec<Box<dyn Command>>,
    ) -> Result<Self, SchedulerError> {
        let mut children = Vec::with_capacity(others.len() + 1);
        children.push(deadline);
        children.extend(others);
        Ok(Self {
            requirements: disjoint_requirements(&children)?,
            interruptible: all_interruptible(&children),
            members: Members::new(children),
        })
    }

    fn deadline_done(&self) -> bool {
        !self.members.running.first().copied().unwrap_or(false)
    }
}

impl Command for DeadlineGroup {
    fn name(&self) -> &str {
        "DeadlineGroup"
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.members.initialize(ctx)
    }

    fn execute(&mut self, ctx: &TickContext) -> Result<(), CommandFault> {
        self.members.execute(ctx).map(|_| ())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(self.deadline_done())
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        let deadline_done = self.deadline_done();
        self.members.end_running(interrupted || deadline_done)
    }
}
