//! Henshin: suit-up fitting engine and protocol state machine
//!
//! Two subsystems share this crate:
//! - the per-frame fitting engine: dwell gate (DockCharger) → segment followers,
//!   driven by `core::run_body_sequence`
//! - the authorization protocol: a strict chain of states with a refusal
//!   branch and an append-only, timestamped event log (`core::ProtocolStateMachine`)

pub mod core;
pub mod types;

// =============================================================================
// DOCK (dwell gate) DEFAULTS
// =============================================================================

/// Dock anchor in working space (x, y)
pub const DEFAULT_DOCK_CENTER: (f64, f64) = (0.55, -0.25);

/// Radius of the dock zone; the boundary counts as inside
pub const DEFAULT_DOCK_RADIUS: f64 = 0.18;

/// Seconds of sustained dwell needed to fire equip
pub const DEFAULT_HOLD_TO_EQUIP_SEC: f64 = 0.7;

/// Hold seconds lost per second spent outside the zone
pub const DEFAULT_DECAY_RATE_PER_SEC: f64 = 2.2;

/// Joint whose projected point is tested against the dock zone
pub const DEFAULT_TRIGGER_JOINT: &str = "right_wrist";

// =============================================================================
// SEGMENT DEFAULTS
// =============================================================================

pub const DEFAULT_RADIUS_FACTOR: f64 = 0.22;
pub const DEFAULT_RADIUS_MIN: f64 = 0.05;
pub const DEFAULT_RADIUS_MAX: f64 = 0.22;

/// Fixed z-layer of a segment
pub const DEFAULT_SEGMENT_DEPTH: f64 = 0.22;

/// Per-second convergence rate of the follower
pub const DEFAULT_SMOOTH_GAIN: f64 = 18.0;

/// Decimal places kept for `hold_sec` in frame records
pub const HOLD_SEC_DECIMALS: i32 = 4;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.3.0";
