//! Integration test: subsystem registration.

use talon_scheduler::command::basic::RunCommand;
use talon_scheduler::command::Requirements;
use talon_scheduler::config::SchedulerConfig;
use talon_scheduler::{Scheduler, SchedulerError, TickContext};

use super::support::{Hold, Journal};

#[test]
fn duplicate_registration_rejected_first_kept() {
    let journal = Journal::default();
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let hold_journal = journal.clone();
    let arm = s
        .register_with_default("arm", |id| Hold::new("first", id, &hold_journal))
        .unwrap();

    let err = s
        .register_with_default("arm", |id| Hold::new("second", id, &journal))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateRegistration { ref name } if name == "arm"));
    assert_eq!(s.registry().len(), 1);
    assert_eq!(s.registry().id("arm"), Some(arm));

    s.tick();
    assert_eq!(journal.entries(), vec!["first:init"]);
}

#[test]
fn registry_lookup() {
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let names = ["drive", "arm", "claw"];
    for name in names {
        s.register(name).unwrap();
    }

    let listed: Vec<&str> = s.registry().iter().map(|(_, name)| name).collect();
    assert_eq!(listed, names);
    let claw = s.registry().id("claw").unwrap();
    assert_eq!(s.registry().name(claw), Some("claw"));
    assert_eq!(s.registry().id("shooter"), None);
}

#[test]
fn default_for_wrong_subsystem_rolls_back() {
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();

    let err = s
        .register_with_default("claw", |_| {
            RunCommand::new(Requirements::single(arm), |_: &TickContext| Ok(()))
        })
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DefaultCommandRequirement { .. }));
    assert_eq!(s.registry().id("claw"), None);
    // The name is still free.
    assert!(s.register("claw").is_ok());
}
