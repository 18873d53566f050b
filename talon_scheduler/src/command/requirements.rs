//! Fixed-capacity requirement sets.

use std::ops::Deref;

use talon_common::consts::MAX_REQUIREMENTS;

use crate::error::SchedulerError;
use crate::subsystem::SubsystemId;

/// Deduplicated set of required subsystems, capacity `MAX_REQUIREMENTS`.
///
/// Insertion order is kept; it decides which subsystem a `Conflict`
/// reports first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    ids: heapless::Vec<SubsystemId, MAX_REQUIREMENTS>,
}

impl Requirements {
    /// Empty set, for subsystem-agnostic commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing exactly one subsystem.
    pub fn single(id: SubsystemId) -> Self {
        let mut ids = heapless::Vec::new();
        // Capacity is at least one.
        let _ = ids.push(id);
        Self { ids }
    }

    /// Build from a slice, dropping duplicates.
    ///
    /// # Errors
    /// `TooManyRequirements` past `MAX_REQUIREMENTS` distinct ids.
    pub fn from_ids(ids: &[SubsystemId]) -> Result<Self, SchedulerError> {
        let mut set = Self::new();
        for &id in ids {
            set.insert(id)?;
        }
        Ok(set)
    }

    /// Add `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: SubsystemId) -> Result<bool, SchedulerError> {
        if self.contains(id) {
            return Ok(false);
        }
        self.ids
            .push(id)
            .map_err(|_| SchedulerError::TooManyRequirements {
                capacity: MAX_REQUIREMENTS,
            })?;
        Ok(true)
    }

    /// Add every id of `other`.
    pub fn extend_from(&mut self, other: &[SubsystemId]) -> Result<(), SchedulerError> {
        for &id in other {
            self.insert(id)?;
        }
        Ok(())
    }

    /// Returns true if `id` is required.
    #[inline]
    pub fn contains(&self, id: SubsystemId) -> bool {
        self.ids.contains(&id)
    }

    /// First subsystem also present in `other`.
    pub fn overlap(&self, other: &[SubsystemId]) -> Option<SubsystemId> {
        self.ids.iter().copied().find(|id| other.contains(id))
    }

    /// Requirements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[SubsystemId] {
        &self.ids
    }
}

impl Deref for Requirements {
    type Target = [SubsystemId];

    fn deref(&self) -> &[SubsystemId] {
        self.as_slice()
    }
}
