//! Talon Common Library
//!
//! This crate provides shared constants, configuration loading utilities
//! and the hardware driver seam for all Talon workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Workspace-wide limits and defaults
//! - [`config`] - Configuration loading traits and types
//! - [`hal`] - Hardware driver trait and device configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use talon_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
