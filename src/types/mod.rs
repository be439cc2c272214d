//! Core types for Henshin

mod geometry;
mod segment;
mod frame;
mod protocol;
mod error;

pub use geometry::{Point2, CoverScale, clamp};
pub use segment::{SegmentSpec, SegmentTransform, Rig, default_body_rig, right_arm_rig};
pub use frame::{BodyFrame, FrameRecord, SimulationResult};
pub use protocol::{ProtocolState, RefusalCode, EventStatus, ProtocolEvent, AuditStatus, HAPPY_PATH};
pub use error::{ConfigError, ProtocolError};
