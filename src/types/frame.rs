//! Per-frame input samples and simulation output records

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};

use crate::types::SegmentTransform;

/// One tracked body sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBodyFrame")]
pub struct BodyFrame {
    /// Seconds since the previous frame (>= 0)
    pub dt_sec: f64,
    /// Joint name → normalized (x, y) in camera space, nominally [0,1]²
    pub joints: HashMap<String, (f64, f64)>,
}

/// Accepted input shape of a frame. Besides the `joints` map, the
/// right-arm capture format carries `right_elbow_xy01` / `right_wrist_xy01`
/// directly on the frame; those fold into `joints`.
#[derive(Deserialize)]
struct RawBodyFrame {
    #[serde(alias = "dtSec")]
    dt_sec: f64,
    #[serde(default, alias = "joints_xy01")]
    joints: HashMap<String, (f64, f64)>,
    #[serde(default, alias = "rightElbowXy01")]
    right_elbow_xy01: Option<(f64, f64)>,
    #[serde(default, alias = "rightWristXy01")]
    right_wrist_xy01: Option<(f64, f64)>,
}

impl From<RawBodyFrame> for BodyFrame {
    fn from(raw: RawBodyFrame) -> Self {
        let mut joints = raw.joints;
        // an explicit joints entry wins over the flat key
        if let Some(xy) = raw.right_elbow_xy01 {
            joints.entry("right_elbow".to_string()).or_insert(xy);
        }
        if let Some(xy) = raw.right_wrist_xy01 {
            joints.entry("right_wrist".to_string()).or_insert(xy);
        }
        Self { dt_sec: raw.dt_sec, joints }
    }
}

impl BodyFrame {
    pub fn new(dt_sec: f64) -> Self {
        Self { dt_sec, joints: HashMap::new() }
    }

    /// Builder-style joint insert
    pub fn with_joint(mut self, name: &str, x01: f64, y01: f64) -> Self {
        self.joints.insert(name.to_string(), (x01, y01));
        self
    }
}

/// Trace entry for one processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// 0-based position in the input sequence
    pub index: usize,
    /// Equip latch after this frame
    pub equipped: bool,
    /// Dwell accumulator after this frame, rounded to 4 decimals
    pub hold_sec: f64,
    /// Segment name → pose
    pub segments: BTreeMap<String, SegmentTransform>,
}

/// Full output of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub equipped: bool,
    /// Frame index where equip latched, -1 if never
    pub equip_frame: i64,
    pub trigger_joint: String,
    /// Segment names in rig order
    pub segments: Vec<String>,
    pub frames: Vec<FrameRecord>,
}

impl SimulationResult {
    /// Pose of `segment` at frame `index`
    pub fn pose(&self, index: usize, segment: &str) -> Option<&SegmentTransform> {
        self.frames.get(index).and_then(|f| f.segments.get(segment))
    }
}
