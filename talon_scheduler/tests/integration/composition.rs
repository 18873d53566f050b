//! Integration test: composite commands under the scheduler.
//!
//! Validates: groups claim the union of their children's subsystems,
//! pre-emption interrupts the active child, and timeouts end commands.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use talon_scheduler::clock::ManualClock;
use talon_scheduler::command::basic::WaitCommand;
use talon_scheduler::config::SchedulerConfig;
use talon_scheduler::{CommandExt, Scheduler, SchedulerError};

use super::support::{Hold, Journal, MoveTo};

#[test]
fn sequence_holds_union_until_done() {
    let journal = Journal::default();
    let arm_pos = Rc::new(RefCell::new(0.0));
    let claw_pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();
    let claw = s.register("claw").unwrap();

    let pick = MoveTo::new("reach", &[arm], 0.5, &arm_pos, &journal)
        .and_then(MoveTo::new("grip", &[claw], 0.25, &claw_pos, &journal))
        .unwrap()
        .named("pick");
    let h = s.request_start(pick).unwrap();

    let mut ticks = 0;
    while s.is_scheduled(h) || ticks == 0 {
        s.tick();
        ticks += 1;
        if s.is_scheduled(h) {
            assert_eq!(s.current_owner(arm), Some(h));
            assert_eq!(s.current_owner(claw), Some(h));
        }
        assert!(ticks < 20);
    }

    assert_eq!(s.current_owner(arm), None);
    assert_eq!(
        journal.entries(),
        vec!["reach:init", "reach:end(false)", "grip:init", "grip:end(false)"]
    );
}

#[test]
fn preempting_a_group_interrupts_its_active_child() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();
    let claw = s.register("claw").unwrap();

    let group = Hold::new("arm_hold", arm, &journal)
        .alongside(Hold::new("claw_hold", claw, &journal))
        .unwrap();
    let g = s.request_start(group).unwrap();
    s.tick();

    s.request_start(MoveTo::new("open", &[claw], 1.0, &pos, &journal))
        .unwrap();
    let report = s.tick();

    assert_eq!(report.cancelled, vec![g]);
    // The whole group yields, not just the contested child.
    assert_eq!(s.current_owner(arm), None);
    assert!(journal.position("arm_hold:end(true)").is_some());
    assert!(journal.position("claw_hold:end(true)").unwrap() < journal.position("open:init").unwrap());
}

#[test]
fn overlapping_parallel_children_rejected() {
    let journal = Journal::default();
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();

    let result = Hold::new("a", arm, &journal).alongside(Hold::new("b", arm, &journal));
    assert!(matches!(
        result,
        Err(SchedulerError::OverlappingRequirements { subsystem }) if subsystem == arm
    ));
}

#[test]
fn timeout_ends_stuck_command() {
    let journal = Journal::default();
    let clock = ManualClock::new();
    let mut s = Scheduler::with_clock(SchedulerConfig::default(), Box::new(clock.clone())).unwrap();
    let arm = s.register("arm").unwrap();

    let h = s
        .request_start(Hold::new("stuck", arm, &journal).with_timeout(Duration::from_millis(500)))
        .unwrap();
    for _ in 0..10 {
        s.tick();
        clock.advance(Duration::from_millis(100));
    }

    assert!(!s.is_scheduled(h));
    assert_eq!(journal.entries(), vec!["stuck:init", "stuck:end(true)"]);
}

#[test]
fn race_against_wait_acts_as_deadline() {
    let journal = Journal::default();
    let clock = ManualClock::new();
    let mut s = Scheduler::with_clock(SchedulerConfig::default(), Box::new(clock.clone())).unwrap();
    let arm = s.register("arm").unwrap();

    let h = s
        .request_start(
            Hold::new("hold", arm, &journal)
                .race_with(WaitCommand::new(Duration::from_millis(200)))
                .unwrap(),
        )
        .unwrap();

    s.tick();
    clock.advance(Duration::from_millis(250));
    let report = s.tick();

    assert_eq!(report.finished, vec![h]);
    assert_eq!(journal.entries(), vec!["hold:init", "hold:end(true)"]);
}
