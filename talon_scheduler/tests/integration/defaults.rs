//! Integration test: default command restoration.
//!
//! Validates: the arm/Hold/MoveTo scenario and that defaults yield to
//! explicit requests, then come back once their subsystem is idle.

use std::cell::RefCell;
use std::rc::Rc;

use talon_scheduler::config::SchedulerConfig;
use talon_scheduler::Scheduler;

use super::support::{Hold, Journal, MoveTo};

#[test]
fn arm_returns_to_hold_after_move() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.4));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let hold_journal = journal.clone();
    let arm = s
        .register_with_default("arm", |id| Hold::new("Hold", id, &hold_journal))
        .unwrap();

    s.tick();
    let hold = s.current_owner(arm).unwrap();

    let mv = s
        .request_start(MoveTo::new("MoveTo", &[arm], 0.9, &pos, &journal))
        .unwrap();
    s.tick();
    assert_eq!(s.current_owner(arm), Some(mv));

    let mut finished_on = None;
    for _ in 0..10 {
        let report = s.tick();
        if report.finished.contains(&mv) {
            finished_on = Some(report.tick);
            break;
        }
    }
    assert!(finished_on.is_some(), "MoveTo never finished");
    assert!((*pos.borrow() - 0.9).abs() < 1e-9);

    s.tick();
    let owner = s.current_owner(arm).unwrap();
    assert_ne!(owner, mv);
    assert_ne!(owner, hold, "a restored default gets a fresh handle");
    assert_eq!(s.registry().running_default(arm), Some(owner));
    assert_eq!(
        journal.entries(),
        vec![
            "Hold:init",
            "Hold:end(true)",
            "MoveTo:init",
            "MoveTo:end(false)",
            "Hold:init"
        ]
    );
}

#[test]
fn default_returns_after_cancel() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let hold_journal = journal.clone();
    let arm = s
        .register_with_default("arm", |id| Hold::new("Hold", id, &hold_journal))
        .unwrap();

    let mv = s
        .request_start(MoveTo::new("MoveTo", &[arm], 100.0, &pos, &journal))
        .unwrap();
    let first = s.tick();
    // Explicit request is accepted before defaults are considered.
    assert_eq!(first.started, vec![mv]);

    s.request_cancel(mv).unwrap();
    let report = s.tick();
    assert_eq!(report.cancelled, vec![mv]);
    let owner = s.current_owner(arm).unwrap();
    assert_eq!(s.registry().running_default(arm), Some(owner));
}

#[test]
fn replaced_default_used_from_next_activation() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let hold_journal = journal.clone();
    let arm = s
        .register_with_default("arm", |id| Hold::new("old", id, &hold_journal))
        .unwrap();
    s.tick();

    s.set_default_command(arm, Hold::new("new", arm, &journal)).unwrap();
    s.request_start(MoveTo::new("MoveTo", &[arm], 0.25, &pos, &journal))
        .unwrap();
    for _ in 0..3 {
        s.tick();
    }

    let entries = journal.entries();
    assert_eq!(entries.first().map(String::as_str), Some("old:init"));
    assert_eq!(entries.last().map(String::as_str), Some("new:init"));
    assert_eq!(entries.iter().filter(|e| *e == "old:init").count(), 1);
}

#[test]
fn teardown_cancels_running_default() {
    let journal = Journal::default();
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let hold_journal = journal.clone();
    s.register_with_default("arm", |id| Hold::new("Hold", id, &hold_journal))
        .unwrap();
    s.tick();

    let report = s.shutdown();
    assert_eq!(report.cancelled.len(), 1);
    assert_eq!(journal.entries(), vec!["Hold:init", "Hold:end(true)"]);
}
