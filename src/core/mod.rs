//! Core modules for Henshin

pub mod projection;
pub mod dock;
pub mod follower;
pub mod sequence;
pub mod input;
pub mod protocol;
pub mod audit;
pub mod session;
pub mod api;

pub use projection::project;
pub use dock::DockCharger;
pub use follower::SegmentFollower;
pub use sequence::{SequenceConfig, run_body_sequence};
pub use input::{SequenceInput, DockInput};
pub use protocol::{ProtocolStateMachine, Clock, SystemClock, ManualClock, successor, DEFAULT_REFUSAL_NOTE};
pub use audit::{render_deposition_log, render_audit_summary, log_digest, save_audit_bundle, AuditBundle};
pub use session::{generate_session_id, is_valid_session_id};
pub use api::{create_router, run_server};
