//! Integration tests for the protocol state machine and its audit surface

use std::sync::Arc;
use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use henshin::core::{
    log_digest, render_audit_summary, render_deposition_log, save_audit_bundle, successor,
    ManualClock, ProtocolStateMachine,
};
use henshin::types::{
    AuditStatus, EventStatus, ProtocolError, ProtocolState, RefusalCode, HAPPY_PATH,
};

fn machine_at_noon() -> (ProtocolStateMachine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()));
    (ProtocolStateMachine::with_clock(clock.clone()), clock)
}

/// Walk the happy path by hand, one second per step
#[test]
fn test_manual_walk_to_archived() {
    let (mut machine, clock) = machine_at_noon();
    while let Some(next) = successor(machine.state()) {
        clock.advance(Duration::seconds(1));
        machine.transition(next, "").unwrap();
    }

    assert_eq!(machine.state(), ProtocolState::Archived);
    assert_eq!(machine.event_count(), HAPPY_PATH.len() - 1);
    assert_eq!(machine.audit_status(), AuditStatus::Ready);

    let log = render_deposition_log(&machine);
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[0], "2026-10-19T12:00:01+00:00 IDLE->POSTED status=OK note=");
    assert_eq!(lines[11], "2026-10-19T12:00:12+00:00 ACTIVE->ARCHIVED status=OK note=");
}

#[test]
fn test_events_chain_from_initial_state() {
    let (mut machine, _) = machine_at_noon();
    machine.run_happy_path().unwrap();

    let events = machine.events();
    assert_eq!(events[0].from_state, machine.initial_state());
    for pair in events.windows(2) {
        assert_eq!(pair[0].to_state, pair[1].from_state);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

/// Every non-terminal state can be refused with every code
#[test]
fn test_refusal_from_every_live_state() {
    for (depth, state) in HAPPY_PATH[..HAPPY_PATH.len() - 1].iter().enumerate() {
        for code in RefusalCode::ALL {
            let (mut machine, _) = machine_at_noon();
            for next in &HAPPY_PATH[1..=depth] {
                machine.transition(*next, "").unwrap();
            }
            assert_eq!(machine.state(), *state);

            let event = machine.refuse(code.code(), "halt").unwrap();
            assert_eq!(event.from_state, *state);
            assert_eq!(event.status, EventStatus::Refused);
            assert_eq!(event.refusal_code, Some(code));
            assert!(machine.is_terminal());
        }
    }
}

#[test]
fn test_failed_calls_leave_log_untouched() {
    let (mut machine, _) = machine_at_noon();
    machine.transition(ProtocolState::Posted, "").unwrap();
    let before = render_deposition_log(&machine);
    let digest = log_digest(&machine);

    assert!(machine.transition(ProtocolState::TryOn, "").is_err());
    assert!(machine.refuse("NOT_A_CODE", "").is_err());
    assert!(machine.run_happy_path().is_err());

    assert_eq!(render_deposition_log(&machine), before);
    assert_eq!(log_digest(&machine), digest);
    assert_eq!(machine.state(), ProtocolState::Posted);
}

#[test]
fn test_terminal_machines_reject_everything() {
    let (mut machine, _) = machine_at_noon();
    machine.refuse("NC_CONTAMINATION_SUSPECT", "").unwrap();

    for state in ProtocolState::ALL {
        assert_eq!(
            machine.transition(state, ""),
            Err(ProtocolError::IllegalTransition { from: ProtocolState::Refused, to: state })
        );
    }
    assert_eq!(
        machine.refuse("AUDIT_MISMATCH", ""),
        Err(ProtocolError::TerminalState { state: ProtocolState::Refused })
    );
    assert_eq!(machine.event_count(), 1);
}

#[test]
fn test_archived_machine_rejects_transition_as_illegal() {
    let (mut machine, _) = machine_at_noon();
    machine.run_happy_path().unwrap();

    let err = machine.transition(ProtocolState::Refused, "").unwrap_err();
    assert_eq!(err.code(), "R501_ILLEGAL_TRANSITION");
    assert!(matches!(err, ProtocolError::IllegalTransition { from: ProtocolState::Archived, .. }));
    assert_eq!(machine.state(), ProtocolState::Archived);
}

#[test]
fn test_audit_bundle_on_disk() {
    let dir = std::env::temp_dir().join(format!("henshin_protocol_it_{}", std::process::id()));
    let (mut machine, _) = machine_at_noon();
    machine.transition(ProtocolState::Posted, "").unwrap();
    machine.refuse("AUDIT_MISMATCH", "").unwrap();

    let bundle = save_audit_bundle(&dir, "S-20261019-IT01", &machine).unwrap();
    assert!(bundle.deposition_log.ends_with("S-20261019-IT01/DepositionLog.txt"));

    let summary = std::fs::read_to_string(&bundle.audit_summary).unwrap();
    assert_eq!(summary, render_audit_summary("S-20261019-IT01", &machine));
    assert_eq!(
        summary,
        "SESSION: S-20261019-IT01\nFINAL_STATUS: REFUSED\nEVENT_COUNT: 2\nAUDIT: READY\n"
    );

    let log = std::fs::read_to_string(&bundle.deposition_log).unwrap();
    assert!(log.ends_with("POSTED->REFUSED status=REFUSED code=AUDIT_MISMATCH note=Protocol rejected\n"));
    assert_eq!(bundle.log_sha256, log_digest(&machine));

    std::fs::remove_dir_all(&dir).ok();
}
