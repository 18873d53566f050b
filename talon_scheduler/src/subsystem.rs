//! Subsystems: exclusively-ownable handles to one hardware mechanism.
//!
//! A subsystem is identified by name at registration and by a compact
//! [`SubsystemId`] afterwards. Commands list the ids they require.

pub mod registry;

use serde::Serialize;
use static_assertions::const_assert_eq;
use std::fmt;

pub use registry::SubsystemRegistry;

/// Registry-assigned subsystem identifier.
///
/// Only meaningful for the scheduler that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubsystemId(u16);

const_assert_eq!(core::mem::size_of::<SubsystemId>(), 2);

impl SubsystemId {
    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Registration index.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subsystem#{}", self.0)
    }
}
