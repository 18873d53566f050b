//! Host error type.

use talon_common::config::ConfigError;
use talon_common::hal::driver::HalError;
use talon_scheduler::SchedulerError;
use thiserror::Error;

/// Errors that stop the op mode.
#[derive(Debug, Error)]
pub enum OpModeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Real-time setup (memory locking, affinity, priority) failed.
    #[error("RT setup failed: {0}")]
    RtSetup(String),

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// State or summary could not be rendered as JSON.
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}
