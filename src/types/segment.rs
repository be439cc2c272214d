//! Segment configuration, derived poses and rig presets

use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, Point2};
use crate::{
    DEFAULT_RADIUS_FACTOR, DEFAULT_RADIUS_MAX, DEFAULT_RADIUS_MIN,
    DEFAULT_SEGMENT_DEPTH, DEFAULT_SMOOTH_GAIN,
};

fn default_radius_factor() -> f64 { DEFAULT_RADIUS_FACTOR }
fn default_radius_min() -> f64 { DEFAULT_RADIUS_MIN }
fn default_radius_max() -> f64 { DEFAULT_RADIUS_MAX }
fn default_depth() -> f64 { DEFAULT_SEGMENT_DEPTH }
fn default_smooth_gain() -> f64 { DEFAULT_SMOOTH_GAIN }

/// Static configuration of one trackable body segment.
///
/// Loaded once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Unique key within a rig
    pub name: String,
    /// Proximal joint
    #[serde(alias = "startJoint")]
    pub start_joint: String,
    /// Distal joint
    #[serde(alias = "endJoint")]
    pub end_joint: String,
    /// Thickness per unit of segment length
    #[serde(default = "default_radius_factor", alias = "radiusFactor")]
    pub radius_factor: f64,
    #[serde(default = "default_radius_min", alias = "radiusMin")]
    pub radius_min: f64,
    #[serde(default = "default_radius_max", alias = "radiusMax")]
    pub radius_max: f64,
    /// Fixed z-layer
    #[serde(default = "default_depth", alias = "depth")]
    pub z: f64,
    /// Per-second convergence rate
    #[serde(default = "default_smooth_gain", alias = "smoothGain")]
    pub smooth_gain: f64,
    /// Offset from the dock anchor while un-equipped
    #[serde(default, alias = "dockOffsetX")]
    pub dock_offset_x: f64,
    #[serde(default, alias = "dockOffsetY")]
    pub dock_offset_y: f64,
}

impl SegmentSpec {
    /// Spec with default radius, depth and gain
    pub fn new(name: &str, start_joint: &str, end_joint: &str) -> Self {
        Self {
            name: name.to_string(),
            start_joint: start_joint.to_string(),
            end_joint: end_joint.to_string(),
            radius_factor: DEFAULT_RADIUS_FACTOR,
            radius_min: DEFAULT_RADIUS_MIN,
            radius_max: DEFAULT_RADIUS_MAX,
            z: DEFAULT_SEGMENT_DEPTH,
            smooth_gain: DEFAULT_SMOOTH_GAIN,
            dock_offset_x: 0.0,
            dock_offset_y: 0.0,
        }
    }

    pub fn with_dock_offset(mut self, x: f64, y: f64) -> Self {
        self.dock_offset_x = x;
        self.dock_offset_y = y;
        self
    }

    pub fn with_radius(mut self, factor: f64, min: f64, max: f64) -> Self {
        self.radius_factor = factor;
        self.radius_min = min;
        self.radius_max = max;
        self
    }

    pub fn dock_offset(&self) -> Point2 {
        Point2::new(self.dock_offset_x, self.dock_offset_y)
    }
}

/// Rigid pose of one segment for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentTransform {
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub rotation_z: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
}

impl SegmentTransform {
    /// Resting pose: anchor + offset at the segment's depth, no rotation,
    /// unit scale
    pub fn docked(anchor: Point2, spec: &SegmentSpec) -> Self {
        let p = anchor + spec.dock_offset();
        Self {
            position_x: p.x,
            position_y: p.y,
            position_z: spec.z,
            rotation_z: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
        }
    }

    /// Move every field a fraction `t` of the way toward `target`.
    /// `t >= 1` lands on the target exactly.
    pub fn lerp_toward(&self, target: &Self, t: f64) -> Self {
        if t >= 1.0 {
            return *target;
        }
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        Self {
            position_x: lerp(self.position_x, target.position_x),
            position_y: lerp(self.position_y, target.position_y),
            position_z: lerp(self.position_z, target.position_z),
            rotation_z: lerp(self.rotation_z, target.rotation_z),
            scale_x: lerp(self.scale_x, target.scale_x),
            scale_y: lerp(self.scale_y, target.scale_y),
            scale_z: lerp(self.scale_z, target.scale_z),
        }
    }
}

/// Named segment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rig {
    /// Nine segments: both upper arms, forearms, thighs, shins and the chest span
    #[default]
    FullBody,
    /// Single right forearm
    RightArm,
}

impl Rig {
    pub fn specs(&self) -> Vec<SegmentSpec> {
        match self {
            Rig::FullBody => default_body_rig(),
            Rig::RightArm => right_arm_rig(),
        }
    }
}

impl FromStr for Rig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_body" => Ok(Rig::FullBody),
            "right_arm" => Ok(Rig::RightArm),
            other => Err(ConfigError::UnknownRig { name: other.to_string() }),
        }
    }
}

impl std::fmt::Display for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rig::FullBody => write!(f, "full_body"),
            Rig::RightArm => write!(f, "right_arm"),
        }
    }
}

/// The canonical nine-segment body rig
pub fn default_body_rig() -> Vec<SegmentSpec> {
    vec![
        SegmentSpec::new("right_upperarm", "right_shoulder", "right_elbow").with_dock_offset(0.28, 0.05),
        SegmentSpec::new("right_forearm", "right_elbow", "right_wrist").with_dock_offset(0.28, -0.02),
        SegmentSpec::new("left_upperarm", "left_shoulder", "left_elbow").with_dock_offset(-0.28, 0.05),
        SegmentSpec::new("left_forearm", "left_elbow", "left_wrist").with_dock_offset(-0.28, -0.02),
        SegmentSpec::new("right_thigh", "right_hip", "right_knee").with_dock_offset(0.12, -0.34),
        SegmentSpec::new("right_shin", "right_knee", "right_ankle").with_dock_offset(0.12, -0.56),
        SegmentSpec::new("left_thigh", "left_hip", "left_knee").with_dock_offset(-0.12, -0.34),
        SegmentSpec::new("left_shin", "left_knee", "left_ankle").with_dock_offset(-0.12, -0.56),
        SegmentSpec::new("chest_core", "left_shoulder", "right_hip")
            .with_radius(0.38, DEFAULT_RADIUS_MIN, 0.35),
    ]
}

/// Gauntlet-only rig: the forearm docks exactly on the anchor
pub fn right_arm_rig() -> Vec<SegmentSpec> {
    vec![
        SegmentSpec::new("right_forearm", "right_elbow", "right_wrist")
            .with_radius(DEFAULT_RADIUS_FACTOR, 0.08, DEFAULT_RADIUS_MAX),
    ]
}
