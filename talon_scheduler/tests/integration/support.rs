//! Shared test commands.

use std::cell::RefCell;
use std::rc::Rc;

use talon_scheduler::command::Requirements;
use talon_scheduler::{Command, CommandFault, SubsystemId, TickContext};

/// Ordered record of hook calls across commands.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }
}

/// Moves a simulated mechanism toward `target` in fixed steps and
/// finishes once it is there.
pub struct MoveTo {
    label: &'static str,
    requirements: Requirements,
    target: f64,
    step: f64,
    position: Rc<RefCell<f64>>,
    interruptible: bool,
    journal: Journal,
}

impl MoveTo {
    pub fn new(
        label: &'static str,
        subsystems: &[SubsystemId],
        target: f64,
        position: &Rc<RefCell<f64>>,
        journal: &Journal,
    ) -> Self {
        Self {
            label,
            requirements: Requirements::from_ids(subsystems).unwrap(),
            target,
            step: 0.25,
            position: position.clone(),
            interruptible: true,
            journal: journal.clone(),
        }
    }

    pub fn non_interruptible(mut self) -> Self {
        self.interruptible = false;
        self
    }
}

impl Command for MoveTo {
    fn name(&self) -> &str {
        self.label
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        self.journal.push(format!("{}:init", self.label));
        Ok(())
    }

    fn execute(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        let mut pos = self.position.borrow_mut();
        let delta = (self.target - *pos).clamp(-self.step, self.step);
        *pos += delta;
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok((*self.position.borrow() - self.target).abs() < 1e-9)
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.journal
            .push(format!("{}:end({interrupted})", self.label));
        Ok(())
    }
}

/// Never finishes; journals its lifecycle.
pub struct Hold {
    label: &'static str,
    requirements: Requirements,
    journal: Journal,
}

impl Hold {
    pub fn new(label: &'static str, subsystem: SubsystemId, journal: &Journal) -> Self {
        Self {
            label,
            requirements: Requirements::single(subsystem),
            journal: journal.clone(),
        }
    }
}

impl Command for Hold {
    fn name(&self) -> &str {
        self.label
    }

    fn requirements(&self) -> &[SubsystemId] {
        &self.requirements
    }

    fn initialize(&mut self, _ctx: &TickContext) -> Result<(), CommandFault> {
        self.journal.push(format!("{}:init", self.label));
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &TickContext) -> Result<bool, CommandFault> {
        Ok(false)
    }

    fn end(&mut self, interrupted: bool) -> Result<(), CommandFault> {
        self.journal
            .push(format!("{}:end({interrupted})", self.label));
        Ok(())
    }
}
