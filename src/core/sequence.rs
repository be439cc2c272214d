//! Sequence runner: frames → dwell gate → segment followers → trace
//!
//! Each call is an independent simulation; the gate and followers live only
//! for the duration of one run.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::core::{project, DockCharger, SegmentFollower};
use crate::types::{
    default_body_rig, BodyFrame, ConfigError, CoverScale, FrameRecord, Point2,
    SegmentSpec, SimulationResult,
};
use crate::{
    DEFAULT_DECAY_RATE_PER_SEC, DEFAULT_DOCK_CENTER, DEFAULT_DOCK_RADIUS,
    DEFAULT_HOLD_TO_EQUIP_SEC, DEFAULT_TRIGGER_JOINT, HOLD_SEC_DECIMALS,
};

/// Everything a run needs besides the frames
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceConfig {
    /// Reflect x before projecting (selfie camera)
    pub mirror: bool,
    pub cover_scale: CoverScale,
    pub dock_center: Point2,
    pub dock_radius: f64,
    pub hold_to_equip_sec: f64,
    pub decay_rate_per_sec: f64,
    pub trigger_joint: String,
    pub segments: Vec<SegmentSpec>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            cover_scale: CoverScale::default(),
            dock_center: DEFAULT_DOCK_CENTER.into(),
            dock_radius: DEFAULT_DOCK_RADIUS,
            hold_to_equip_sec: DEFAULT_HOLD_TO_EQUIP_SEC,
            decay_rate_per_sec: DEFAULT_DECAY_RATE_PER_SEC,
            trigger_joint: DEFAULT_TRIGGER_JOINT.to_string(),
            segments: default_body_rig(),
        }
    }
}

impl SequenceConfig {
    /// Check everything that can be checked before the first frame
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for spec in &self.segments {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateSegment { name: spec.name.clone() });
            }
        }
        self.dock()?;
        Ok(())
    }

    fn dock(&self) -> Result<DockCharger, ConfigError> {
        DockCharger::with_decay(
            self.dock_center,
            self.dock_radius,
            self.hold_to_equip_sec,
            self.decay_rate_per_sec,
        )
    }
}

/// Round to the precision kept in frame records
fn round_hold(value: f64) -> f64 {
    let scale = 10f64.powi(HOLD_SEC_DECIMALS);
    (value * scale).round() / scale
}

/// Run one simulation over `frames` in order.
///
/// Missing joints are not errors: the trigger is treated as outside the zone
/// and affected segments show their dock pose for that frame.
pub fn run_body_sequence(
    frames: &[BodyFrame],
    config: &SequenceConfig,
) -> Result<SimulationResult, ConfigError> {
    config.validate()?;

    let mut dock = config.dock()?;
    let mut followers: Vec<SegmentFollower> = config
        .segments
        .iter()
        .map(|spec| SegmentFollower::new(spec.clone(), config.dock_center))
        .collect();

    let mut equipped = false;
    let mut equip_frame: i64 = -1;
    let mut records = Vec::with_capacity(frames.len());

    for (index, frame) in frames.iter().enumerate() {
        if !(frame.dt_sec >= 0.0) {
            return Err(ConfigError::NegativeFrameDelta { index, dt_sec: frame.dt_sec });
        }

        let joints: HashMap<&str, Point2> = frame
            .joints
            .iter()
            .map(|(name, &(x, y))| (name.as_str(), project(x, y, config.mirror, config.cover_scale)))
            .collect();

        let trigger = joints.get(config.trigger_joint.as_str()).copied();
        let fired = dock.tick(frame.dt_sec, trigger, equipped);
        if fired && !equipped {
            equipped = true;
            equip_frame = index as i64;
            info!(frame = index, trigger_joint = %config.trigger_joint, "equip latched");
        }

        let mut segments = BTreeMap::new();
        for follower in followers.iter_mut() {
            let spec = follower.spec();
            let start = joints.get(spec.start_joint.as_str()).copied();
            let end = joints.get(spec.end_joint.as_str()).copied();
            if equipped && (start.is_none() || end.is_none()) {
                debug!(frame = index, segment = %spec.name, "joint missing, docking segment");
            }
            let name = spec.name.clone();
            let pose = follower.update(equipped, start, end, config.dock_center, frame.dt_sec);
            segments.insert(name, pose);
        }

        records.push(FrameRecord {
            index,
            equipped,
            hold_sec: round_hold(dock.hold_sec()),
            segments,
        });
    }

    Ok(SimulationResult {
        equipped,
        equip_frame,
        trigger_joint: config.trigger_joint.clone(),
        segments: config.segments.iter().map(|s| s.name.clone()).collect(),
        frames: records,
    })
}

// =============================================================================
// TESTS
// =============================================================================
