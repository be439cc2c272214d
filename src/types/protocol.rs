//! Protocol states, refusal codes and event records

use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ProtocolError;

/// Every state of the authorization lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolState {
    /// Initial state, nothing posted yet
    Idle,
    Posted,
    FitAudit,
    MorphotypeLocked,
    DesignIssued,
    DryFitSim,
    TryOn,
    ApprovalPending,
    Approved,
    Deposition,
    Sealing,
    Active,
    /// Terminal: protocol completed and archived
    Archived,
    /// Terminal: protocol rejected with a refusal code
    Refused,
}

/// The happy path, initial to archived. Consecutive pairs are the only
/// legal transitions.
pub const HAPPY_PATH: [ProtocolState; 13] = [
    ProtocolState::Idle,
    ProtocolState::Posted,
    ProtocolState::FitAudit,
    ProtocolState::MorphotypeLocked,
    ProtocolState::DesignIssued,
    ProtocolState::DryFitSim,
    ProtocolState::TryOn,
    ProtocolState::ApprovalPending,
    ProtocolState::Approved,
    ProtocolState::Deposition,
    ProtocolState::Sealing,
    ProtocolState::Active,
    ProtocolState::Archived,
];

impl ProtocolState {
    pub const ALL: [ProtocolState; 14] = [
        ProtocolState::Idle,
        ProtocolState::Posted,
        ProtocolState::FitAudit,
        ProtocolState::MorphotypeLocked,
        ProtocolState::DesignIssued,
        ProtocolState::DryFitSim,
        ProtocolState::TryOn,
        ProtocolState::ApprovalPending,
        ProtocolState::Approved,
        ProtocolState::Deposition,
        ProtocolState::Sealing,
        ProtocolState::Active,
        ProtocolState::Archived,
        ProtocolState::Refused,
    ];

    /// Wire name, shared verbatim with validators and demo drivers
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolState::Idle => "IDLE",
            ProtocolState::Posted => "POSTED",
            ProtocolState::FitAudit => "FIT_AUDIT",
            ProtocolState::MorphotypeLocked => "MORPHOTYPE_LOCKED",
            ProtocolState::DesignIssued => "DESIGN_ISSUED",
            ProtocolState::DryFitSim => "DRY_FIT_SIM",
            ProtocolState::TryOn => "TRY_ON",
            ProtocolState::ApprovalPending => "APPROVAL_PENDING",
            ProtocolState::Approved => "APPROVED",
            ProtocolState::Deposition => "DEPOSITION",
            ProtocolState::Sealing => "SEALING",
            ProtocolState::Active => "ACTIVE",
            ProtocolState::Archived => "ARCHIVED",
            ProtocolState::Refused => "REFUSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolState::Archived | ProtocolState::Refused)
    }

    /// Terminal color for this state
    pub fn color(&self) -> colored::Color {
        match self {
            ProtocolState::Idle => colored::Color::BrightBlack,
            ProtocolState::Archived => colored::Color::Green,
            ProtocolState::Refused => colored::Color::Red,
            _ => colored::Color::Yellow,
        }
    }
}

impl FromStr for ProtocolState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolState::ALL
            .iter()
            .copied()
            .find(|state| state.name() == s)
            .ok_or_else(|| ProtocolError::UnknownState { name: s.to_string() })
    }
}

impl std::fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Recognized refusal codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum RefusalCode {
    /// A required procedure step was skipped or left unfinished
    INCOMPLETE_PROCEDURE,
    /// Audit records disagree with the submitted fit
    AUDIT_MISMATCH,
    /// Resonance readings did not settle
    RESONANCE_UNSTABLE,
    /// Suspected non-conforming contamination
    NC_CONTAMINATION_SUSPECT,
}

impl RefusalCode {
    pub const ALL: [RefusalCode; 4] = [
        RefusalCode::INCOMPLETE_PROCEDURE,
        RefusalCode::AUDIT_MISMATCH,
        RefusalCode::RESONANCE_UNSTABLE,
        RefusalCode::NC_CONTAMINATION_SUSPECT,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::INCOMPLETE_PROCEDURE => "INCOMPLETE_PROCEDURE",
            Self::AUDIT_MISMATCH => "AUDIT_MISMATCH",
            Self::RESONANCE_UNSTABLE => "RESONANCE_UNSTABLE",
            Self::NC_CONTAMINATION_SUSPECT => "NC_CONTAMINATION_SUSPECT",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::INCOMPLETE_PROCEDURE => "Procedure incomplete",
            Self::AUDIT_MISMATCH => "Audit mismatch",
            Self::RESONANCE_UNSTABLE => "Resonance unstable",
            Self::NC_CONTAMINATION_SUSPECT => "Contamination suspected",
        }
    }

    /// Look up a code by its wire name
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

impl std::fmt::Display for RefusalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Outcome recorded on an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Ok,
    Refused,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Ok => write!(f, "OK"),
            EventStatus::Refused => write!(f, "REFUSED"),
        }
    }
}

/// One appended log entry; immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    pub timestamp: DateTime<Utc>,
    pub from_state: ProtocolState,
    pub to_state: ProtocolState,
    pub status: EventStatus,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal_code: Option<RefusalCode>,
}

impl ProtocolEvent {
    /// Single deposition-log line
    pub fn to_log_line(&self) -> String {
        let refusal = self
            .refusal_code
            .map(|c| format!(" code={}", c))
            .unwrap_or_default();
        format!(
            "{} {}->{} status={}{} note={}",
            self.timestamp.to_rfc3339(),
            self.from_state,
            self.to_state,
            self.status,
            refusal,
            self.note
        )
    }
}

/// Audit readiness of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// Archived or refused
    Ready,
    Incomplete,
}

impl AuditStatus {
    pub fn for_state(state: ProtocolState) -> Self {
        if state.is_terminal() {
            AuditStatus::Ready
        } else {
            AuditStatus::Incomplete
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStatus::Ready => write!(f, "READY"),
            AuditStatus::Incomplete => write!(f, "INCOMPLETE"),
        }
    }
}
