//! Integration test: scheduler configuration from TOML.

use talon_common::config::{ConfigError, ConfigLoader, Validate};
use talon_scheduler::config::SchedulerConfig;
use talon_scheduler::Scheduler;

#[test]
fn scheduler_table_parses_and_builds() {
    let config = SchedulerConfig::from_toml(
        r#"
max_pending_requests = 8
tick_budget_us = 2000
"#,
    )
    .unwrap();
    config.validate().unwrap();

    let s = Scheduler::new(config).unwrap();
    assert_eq!(s.config().max_pending_requests, 8);
    assert_eq!(s.config().tick_budget_us, 2000);
}

#[test]
fn empty_table_uses_defaults() {
    let config = SchedulerConfig::from_toml("").unwrap();
    assert_eq!(config, SchedulerConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let result = SchedulerConfig::from_toml("max_pending = 8");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}
