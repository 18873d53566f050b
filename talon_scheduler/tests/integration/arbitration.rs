//! Integration test: ownership arbitration.
//!
//! Validates: mutual exclusion across ticks, all-or-nothing starts and
//! the end-before-init ordering of pre-emption.

use std::cell::RefCell;
use std::rc::Rc;

use talon_scheduler::command::CommandState;
use talon_scheduler::config::SchedulerConfig;
use talon_scheduler::{Scheduler, SchedulerError};

use super::support::{Hold, Journal, MoveTo};

#[test]
fn subsystems_never_have_two_active_commands() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();
    let wrist = s.register("wrist").unwrap();
    let claw = s.register("claw").unwrap();
    s.set_default_command(claw, Hold::new("claw_hold", claw, &journal))
        .unwrap();

    let plans: [&[_]; 5] = [&[arm], &[arm, wrist], &[wrist, claw], &[claw], &[arm, claw]];
    for tick in 0..60_usize {
        if tick % 3 == 0 {
            let subsystems = plans[(tick / 3) % plans.len()];
            let target = if tick % 2 == 0 { 1.0 } else { 0.0 };
            s.request_start(MoveTo::new("move", subsystems, target, &pos, &journal))
                .unwrap();
        }
        s.tick();
        assert!(s.snapshot().is_exclusive(), "exclusivity broken at tick {tick}");
    }
}

#[test]
fn rejected_start_changes_no_owner() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();
    let wrist = s.register("wrist").unwrap();
    let claw = s.register("claw").unwrap();

    let wrist_hold = s.request_start(Hold::new("wrist_hold", wrist, &journal)).unwrap();
    let calibrate = s
        .request_start(MoveTo::new("calibrate", &[claw], 5.0, &pos, &journal).non_interruptible())
        .unwrap();
    s.tick();
    let before: Vec<_> = [arm, wrist, claw].iter().map(|&id| s.current_owner(id)).collect();

    // arm is free and wrist is interruptible; claw blocks the whole start.
    let sweep = s
        .request_start(MoveTo::new("sweep", &[arm, wrist, claw], 1.0, &pos, &journal))
        .unwrap();
    let report = s.tick();

    assert!(report.rejection(sweep).is_some_and(SchedulerError::is_conflict));
    let after: Vec<_> = [arm, wrist, claw].iter().map(|&id| s.current_owner(id)).collect();
    assert_eq!(before, after);
    assert_eq!(s.current_owner(wrist), Some(wrist_hold));
    assert_eq!(s.current_owner(claw), Some(calibrate));
    assert!(journal.position("wrist_hold:end(true)").is_none());
    assert!(journal.position("sweep:init").is_none());
}

#[test]
fn incumbent_ends_before_newcomer_initializes() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();
    let claw = s.register("claw").unwrap();

    let a = s.request_start(Hold::new("arm_hold", arm, &journal)).unwrap();
    let c = s.request_start(Hold::new("claw_hold", claw, &journal)).unwrap();
    s.tick();

    let both = s
        .request_start(MoveTo::new("stow", &[arm, claw], 0.5, &pos, &journal))
        .unwrap();
    let report = s.tick();

    assert_eq!(report.cancelled, vec![a, c]);
    assert_eq!(s.state(a), Some(CommandState::Cancelled));
    assert_eq!(s.current_owner(arm), Some(both));
    assert_eq!(s.current_owner(claw), Some(both));

    let init = journal.position("stow:init").unwrap();
    assert!(journal.position("arm_hold:end(true)").unwrap() < init);
    assert!(journal.position("claw_hold:end(true)").unwrap() < init);
}

#[test]
fn non_interruptible_command_can_still_be_cancelled() {
    let journal = Journal::default();
    let pos = Rc::new(RefCell::new(0.0));
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();

    let calibrate = s
        .request_start(MoveTo::new("calibrate", &[arm], 9.0, &pos, &journal).non_interruptible())
        .unwrap();
    s.tick();
    s.request_cancel(calibrate).unwrap();
    s.tick();

    assert_eq!(s.current_owner(arm), None);
    assert_eq!(
        journal.entries(),
        vec!["calibrate:init", "calibrate:end(true)"]
    );
}

#[test]
fn subsystem_agnostic_commands_run_alongside_everything() {
    use std::time::Duration;
    use talon_scheduler::command::basic::WaitCommand;

    let journal = Journal::default();
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    let arm = s.register("arm").unwrap();

    let hold = s.request_start(Hold::new("hold", arm, &journal)).unwrap();
    let wait = s.request_start(WaitCommand::new(Duration::from_secs(60))).unwrap();
    let report = s.tick();

    assert_eq!(report.started, vec![hold, wait]);
    assert_eq!(s.active_count(), 2);
}
