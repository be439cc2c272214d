//! Error types for the fitting engine and the protocol machine
//!
//! Every variant carries a stable reason code (`code()`) next to its
//! human-readable message, so logs and API payloads stay machine-parseable.

use crate::types::ProtocolState;

/// Configuration and input-document errors. Surfaced at construction or
/// call time, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("hold_to_equip_sec must be > 0, got {0}")]
    NonPositiveHold(f64),

    #[error("decay_rate must be >= 0, got {0}")]
    NegativeDecay(f64),

    #[error("dock radius must be >= 0, got {0}")]
    NegativeRadius(f64),

    #[error("frame {index}: dt_sec must be >= 0, got {dt_sec}")]
    NegativeFrameDelta { index: usize, dt_sec: f64 },

    #[error("duplicate segment name: {name}")]
    DuplicateSegment { name: String },

    #[error("unknown rig: {name}")]
    UnknownRig { name: String },

    #[error("invalid input document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NonPositiveHold(_) => "R401_NON_POSITIVE_HOLD",
            Self::NegativeDecay(_) => "R402_NEGATIVE_DECAY",
            Self::NegativeRadius(_) => "R403_NEGATIVE_RADIUS",
            Self::NegativeFrameDelta { .. } => "R404_NEGATIVE_FRAME_DELTA",
            Self::DuplicateSegment { .. } => "R405_DUPLICATE_SEGMENT",
            Self::UnknownRig { .. } => "R406_UNKNOWN_RIG",
            Self::Json(_) => "R407_INVALID_DOCUMENT",
            Self::Io(_) => "R408_IO",
        }
    }
}

/// Protocol sequencing errors. A failed call leaves the machine's state and
/// log untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: ProtocolState, to: ProtocolState },

    /// Refusal or happy-path run on a finished machine
    #[error("cannot leave terminal state: {state}")]
    TerminalState { state: ProtocolState },

    #[error("unknown refusal code: {code} (state {state})")]
    UnknownRefusalCode { code: String, state: ProtocolState },

    #[error("happy path must start from the initial state, machine is in {state}")]
    NotInitialState { state: ProtocolState },

    #[error("unknown protocol state: {name}")]
    UnknownState { name: String },
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IllegalTransition { .. } => "R501_ILLEGAL_TRANSITION",
            Self::TerminalState { .. } => "R502_TERMINAL_STATE",
            Self::UnknownRefusalCode { .. } => "R503_UNKNOWN_REFUSAL_CODE",
            Self::NotInitialState { .. } => "R504_NOT_INITIAL_STATE",
            Self::UnknownState { .. } => "R505_UNKNOWN_STATE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_states_verbatim() {
        let err = ProtocolError::IllegalTransition {
            from: ProtocolState::Idle,
            to: ProtocolState::Approved,
        };
        assert_eq!(err.to_string(), "illegal transition: IDLE -> APPROVED");
        assert_eq!(err.code(), "R501_ILLEGAL_TRANSITION");

        let err = ProtocolError::UnknownRefusalCode {
            code: "BAD_VIBES".to_string(),
            state: ProtocolState::TryOn,
        };
        assert_eq!(err.to_string(), "unknown refusal code: BAD_VIBES (state TRY_ON)");
    }

    #[test]
    fn test_config_codes_are_distinct() {
        let errs = [
            ConfigError::NonPositiveHold(0.0),
            ConfigError::NegativeDecay(-1.0),
            ConfigError::NegativeRadius(-1.0),
            ConfigError::NegativeFrameDelta { index: 0, dt_sec: -0.1 },
            ConfigError::DuplicateSegment { name: "a".into() },
            ConfigError::UnknownRig { name: "b".into() },
        ];
        let codes: std::collections::HashSet<_> = errs.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errs.len());
    }
}
