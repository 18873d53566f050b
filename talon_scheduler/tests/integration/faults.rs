//! Integration test: hook faults.
//!
//! Validates: a faulting command is retired like a finished one, the
//! fault is reported, and its subsystem falls back to the default.

use talon_scheduler::command::basic::{InstantCommand, RunCommand};
use talon_scheduler::command::{CommandState, Hook, Requirements};
use talon_scheduler::config::SchedulerConfig;
use talon_scheduler::{CommandFault, Scheduler, SchedulerError, TickContext};

use super::support::{Hold, Journal};

#[test]
fn faulting_command_does_not_strand_subsystem() {
    let journal = Journal::default();
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let hold_journal = journal.clone();
    let lift = s
        .register_with_default("lift", |id| Hold::new("Hold", id, &hold_journal))
        .unwrap();
    s.tick();

    let mut calls = 0;
    let bad = s
        .request_start(RunCommand::new(Requirements::single(lift), move |_: &TickContext| {
            calls += 1;
            if calls == 3 {
                Err(CommandFault::new("encoder disconnected"))
            } else {
                Ok(())
            }
        }))
        .unwrap();

    let mut fault = None;
    for _ in 0..5 {
        let report = s.tick();
        if let Some(f) = report.faults.into_iter().next() {
            fault = Some(f);
            break;
        }
    }

    match fault {
        Some(SchedulerError::CommandFault {
            handle,
            hook,
            source,
            ..
        }) => {
            assert_eq!(handle, bad);
            assert_eq!(hook, Hook::Execute);
            assert_eq!(source.message(), "encoder disconnected");
        }
        other => panic!("expected a command fault, got {other:?}"),
    }
    assert_eq!(s.state(bad), Some(CommandState::Finished));
    let owner = s.current_owner(lift).unwrap();
    assert_eq!(s.registry().running_default(lift), Some(owner));
}

#[test]
fn instant_command_fault_reported_in_its_tick() {
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let claw = s.register("claw").unwrap();

    let h = s
        .request_start(InstantCommand::new(Requirements::single(claw), || {
            Err(CommandFault::new("servo not found"))
        }))
        .unwrap();
    let report = s.tick();

    assert_eq!(report.faults.len(), 1);
    assert!(report.faults[0].to_string().contains("servo not found"));
    assert!(report.finished.contains(&h));
    assert_eq!(s.current_owner(claw), None);
}

#[test]
fn one_fault_leaves_other_commands_running() {
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();
    let claw = s.register("claw").unwrap();

    let healthy = s
        .request_start(RunCommand::new(Requirements::single(arm), |_: &TickContext| Ok(())))
        .unwrap();
    s.request_start(RunCommand::new(Requirements::single(claw), |_: &TickContext| {
        Err(CommandFault::new("stall"))
    }))
    .unwrap();

    s.tick();
    let report = s.tick();
    assert_eq!(report.faults.len(), 1);
    assert!(s.is_scheduled(healthy));
    assert_eq!(s.current_owner(arm), Some(healthy));
    assert_eq!(s.current_owner(claw), None);
}
