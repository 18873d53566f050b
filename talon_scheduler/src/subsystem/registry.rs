//! Subsystem registry: declared subsystems and their current owner.
//!
//! Constructed with the scheduler and mutated only from inside its tick.
//! Client code gets read-only access through `Scheduler::registry()`.
//! No internal locking: the scheduler is the single mutator.

use std::collections::HashMap;
use std::fmt;

use talon_common::consts::MAX_SUBSYSTEMS;

use super::SubsystemId;
use crate::command::{Command, CommandHandle};
use crate::error::SchedulerError;

/// Per-subsystem fallback command slot.
///
/// The command is moved into the active set while it runs and handed
/// back when it ends, so one instance is reused across activations.
#[derive(Default)]
struct DefaultSlot {
    command: Option<Box<dyn Command>>,
    running: Option<CommandHandle>,
}

impl DefaultSlot {
    const fn is_configured(&self) -> bool {
        self.command.is_some() || self.running.is_some()
    }
}

struct SubsystemEntry {
    name: String,
    owner: Option<CommandHandle>,
    default: DefaultSlot,
}

/// Registry of declared subsystems.
pub struct SubsystemRegistry {
    entries: Vec<SubsystemEntry>,
    by_name: HashMap<String, SubsystemId>,
}

impl SubsystemRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a subsystem with no owner and no default command.
    ///
    /// # Errors
    /// `DuplicateRegistration` if the name exists (first registration kept),
    /// `RegistryFull` past `MAX_SUBSYSTEMS`.
    pub(crate) fn register(&mut self, name: &str) -> Result<SubsystemId, SchedulerError> {
        let id = self.next_id(name)?;
        self.insert(id, name, None);
        Ok(id)
    }

    /// Register a subsystem together with its default command.
    ///
    /// The factory receives the id the subsystem will get. Nothing is
    /// inserted if the command does not require that id.
    pub(crate) fn register_with_default(
        &mut self,
        name: &str,
        factory: impl FnOnce(SubsystemId) -> Box<dyn Command>,
    ) -> Result<SubsystemId, SchedulerError> {
        let id = self.next_id(name)?;
        let command = factory(id);
        if !command.requirements().contains(&id) {
            return Err(SchedulerError::DefaultCommandRequirement { subsystem: id });
        }
        self.insert(id, name, Some(command));
        Ok(id)
    }

    fn next_id(&self, name: &str) -> Result<SubsystemId, SchedulerError> {
        if self.by_name.contains_key(name) {
            return Err(SchedulerError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        if self.entries.len() >= MAX_SUBSYSTEMS {
            return Err(SchedulerError::RegistryFull {
                capacity: MAX_SUBSYSTEMS,
            });
        }
        Ok(SubsystemId::new(self.entries.len() as u16))
    }

    fn insert(&mut self, id: SubsystemId, name: &str, default: Option<Box<dyn Command>>) {
        self.entries.push(SubsystemEntry {
            name: name.to_string(),
            owner: None,
            default: DefaultSlot {
                command: default,
                running: None,
            },
        });
        self.by_name.insert(name.to_string(), id);
    }

    /// Look up a subsystem by name.
    pub fn id(&self, name: &str) -> Option<SubsystemId> {
        self.by_name.get(name).copied()
    }

    /// Name of a registered subsystem.
    pub fn name(&self, id: SubsystemId) -> Option<&str> {
        self.entries.get(id.index()).map(|e| e.name.as_str())
    }

    /// Returns true if `id` was issued by this registry.
    #[inline]
    pub fn contains(&self, id: SubsystemId) -> bool {
        id.index() < self.entries.len()
    }

    /// Number of registered subsystems.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(id, name)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (SubsystemId, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (SubsystemId::new(i as u16), e.name.as_str()))
    }

    /// Command currently owning `id`, if any.
    pub fn current_owner(&self, id: SubsystemId) -> Option<CommandHandle> {
        self.entries.get(id.index()).and_then(|e| e.owner)
    }

    /// Returns true if a default command is configured for `id`.
    pub fn has_default(&self, id: SubsystemId) -> bool {
        self.entries
            .get(id.index())
            .is_some_and(|e| e.default.is_configured())
    }

    /// Handle of the running default command for `id`, if it is active.
    pub fn running_default(&self, id: SubsystemId) -> Option<CommandHandle> {
        self.entries.get(id.index()).and_then(|e| e.default.running)
    }

    pub(crate) fn set_owner(&mut self, id: SubsystemId, handle: CommandHandle) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.owner = Some(handle);
        }
    }

    /// Clear ownership only if `handle` still owns `id`.
    pub(crate) fn clear_owner(&mut self, id: SubsystemId, handle: CommandHandle) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            if entry.owner == Some(handle) {
                entry.owner = None;
            }
        }
    }

    /// Install or replace the default command for `id`.
    ///
    /// A running default keeps running until it ends; the replacement is
    /// used from the next activation.
    pub(crate) fn set_default(
        &mut self,
        id: SubsystemId,
        command: Box<dyn Command>,
    ) -> Result<(), SchedulerError> {
        if !command.requirements().contains(&id) {
            return Err(SchedulerError::DefaultCommandRequirement { subsystem: id });
        }
        let entry = self
            .entries
            .get_mut(id.index())
            .ok_or(SchedulerError::UnknownSubsystem(id))?;
        entry.default.command = Some(command);
        Ok(())
    }

    /// Take the idle default command of an unowned subsystem for starting.
    ///
    /// Returns `None` if the subsystem is owned, has no default, or its
    /// default is already running.
    pub(crate) fn take_idle_default(&mut self, id: SubsystemId) -> Option<Box<dyn Command>> {
        let entry = self.entries.get_mut(id.index())?;
        if entry.owner.is_some() || entry.default.running.is_some() {
            return None;
        }
        entry.default.command.take()
    }

    /// Put back a default command that could not be started.
    pub(crate) fn restore_default(&mut self, id: SubsystemId, command: Box<dyn Command>) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            if entry.default.command.is_none() {
                entry.default.command = Some(command);
            }
        }
    }

    pub(crate) fn mark_default_running(&mut self, id: SubsystemId, handle: CommandHandle) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.default.running = Some(handle);
        }
    }

    /// Hand a retired default command back to its slot.
    ///
    /// Dropped instead if the slot was given a replacement meanwhile.
    pub(crate) fn return_default(
        &mut self,
        id: SubsystemId,
        handle: CommandHandle,
        command: Box<dyn Command>,
    ) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            if entry.default.running == Some(handle) {
                entry.default.running = None;
            }
            if entry.default.command.is_none() {
                entry.default.command = Some(command);
            }
        }
    }
}

impl Default for SubsystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubsystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in &self.entries {
            list.entry(&(
                entry.name.as_str(),
                entry.owner,
                entry.default.is_configured(),
            ));
        }
        list.finish()
    }
}
