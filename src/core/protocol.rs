//! Protocol state machine: strict happy-path chain plus a refusal branch
//!
//! Transitions:
//! - each happy-path state → its unique successor (no skipping, no going back)
//! - any non-terminal state → REFUSED (with a recognized refusal code)
//! - ARCHIVED and REFUSED are terminal; every mutating call then fails
//!   (`transition` with IllegalTransition, `refuse` and `run_happy_path`
//!   with TerminalState)
//!
//! A failed call never touches the state or the log.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use tracing::{info, warn};

use crate::types::{
    AuditStatus, EventStatus, ProtocolError, ProtocolEvent, ProtocolState, RefusalCode,
    HAPPY_PATH,
};

lazy_static! {
    /// Happy-path successor table, built once and shared read-only by every machine
    static ref SUCCESSORS: HashMap<ProtocolState, ProtocolState> = HAPPY_PATH
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();
}

/// Note recorded when a refusal carries none
pub const DEFAULT_REFUSAL_NOTE: &str = "Protocol rejected";

/// Unique legal successor of `state` on the happy path
pub fn successor(state: ProtocolState) -> Option<ProtocolState> {
    SUCCESSORS.get(&state).copied()
}

// =============================================================================
// CLOCKS
// =============================================================================

/// Time source for event timestamps
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic logs
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // a poisoned clock still holds a valid timestamp
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

// =============================================================================
// MACHINE
// =============================================================================

/// Single-owner protocol runner with an append-only event log
#[derive(Debug, Clone)]
pub struct ProtocolStateMachine {
    initial: ProtocolState,
    state: ProtocolState,
    events: Vec<ProtocolEvent>,
    clock: Arc<dyn Clock>,
}

impl Default for ProtocolStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolStateMachine {
    /// Machine at IDLE on the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Machine at IDLE on an injected clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::starting_at(ProtocolState::Idle, clock)
    }

    /// Machine resumed at an arbitrary initial state
    pub fn starting_at(initial: ProtocolState, clock: Arc<dyn Clock>) -> Self {
        Self {
            initial,
            state: initial,
            events: Vec::new(),
            clock,
        }
    }

    /// Advance to `to_state`, which must be the successor of the current state
    pub fn transition(&mut self, to_state: ProtocolState, note: &str) -> Result<ProtocolEvent, ProtocolError> {
        // terminal states have no successor, so this also covers them
        if successor(self.state) != Some(to_state) {
            warn!(from = %self.state, to = %to_state, "illegal transition rejected");
            return Err(ProtocolError::IllegalTransition { from: self.state, to: to_state });
        }

        info!(from = %self.state, to = %to_state, "protocol transition");
        Ok(self.record(to_state, EventStatus::Ok, note.to_string(), None))
    }

    /// Terminate with a refusal. `code` must be one of the recognized codes.
    pub fn refuse(&mut self, code: &str, note: &str) -> Result<ProtocolEvent, ProtocolError> {
        if self.state.is_terminal() {
            warn!(state = %self.state, code, "refusal from terminal state rejected");
            return Err(ProtocolError::TerminalState { state: self.state });
        }
        let code = RefusalCode::parse(code).ok_or_else(|| ProtocolError::UnknownRefusalCode {
            code: code.to_string(),
            state: self.state,
        })?;

        let note = if note.is_empty() { DEFAULT_REFUSAL_NOTE } else { note };
        warn!(from = %self.state, code = %code, "protocol refused");
        Ok(self.record(ProtocolState::Refused, EventStatus::Refused, note.to_string(), Some(code)))
    }

    /// Walk the chain from the initial state to ARCHIVED, returning the
    /// appended events. A machine resumed with `starting_at` walks from its
    /// own initial state.
    pub fn run_happy_path(&mut self) -> Result<Vec<ProtocolEvent>, ProtocolError> {
        if self.state.is_terminal() {
            return Err(ProtocolError::TerminalState { state: self.state });
        }
        if self.state != self.initial {
            return Err(ProtocolError::NotInitialState { state: self.state });
        }
        let first = self.events.len();
        while let Some(next) = successor(self.state) {
            self.transition(next, "")?;
        }
        Ok(self.events[first..].to_vec())
    }

    fn record(
        &mut self,
        to_state: ProtocolState,
        status: EventStatus,
        note: String,
        refusal_code: Option<RefusalCode>,
    ) -> ProtocolEvent {
        // the log never runs backwards, even if the clock does
        let mut timestamp = self.clock.now();
        if let Some(last) = self.events.last() {
            timestamp = timestamp.max(last.timestamp);
        }

        let event = ProtocolEvent {
            timestamp,
            from_state: self.state,
            to_state,
            status,
            note,
            refusal_code,
        };
        self.state = to_state;
        self.events.push(event.clone());
        event
    }

    /// Current state: the last event's `to_state`, or the initial state
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn initial_state(&self) -> ProtocolState {
        self.initial
    }

    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn audit_status(&self) -> AuditStatus {
        AuditStatus::for_state(self.state)
    }
}

// =============================================================================
// TESTS
// =============================================================================
