//! Simulation input document
//!
//! ```json
//! { "mirror": true, "cover_scale": {"x": 1, "y": 1},
//!   "dock": {"center": [0.55, -0.25], "radius": 0.18, "hold_to_equip_sec": 0.7,
//!            "trigger_joint": "right_wrist"},
//!   "rig": "full_body", "segments": [...],
//!   "frames": [{"dt_sec": 0.1, "joints": {"right_wrist": [0.2, 0.6]}}] }
//! ```
//! Every field is optional. camelCase spellings are accepted too.

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::core::{run_body_sequence, SequenceConfig};
use crate::types::{BodyFrame, ConfigError, CoverScale, Rig, SegmentSpec, SimulationResult};
use crate::{
    DEFAULT_DECAY_RATE_PER_SEC, DEFAULT_DOCK_CENTER, DEFAULT_DOCK_RADIUS,
    DEFAULT_HOLD_TO_EQUIP_SEC, DEFAULT_TRIGGER_JOINT,
};

fn default_mirror() -> bool { true }
fn default_center() -> [f64; 2] { [DEFAULT_DOCK_CENTER.0, DEFAULT_DOCK_CENTER.1] }
fn default_radius() -> f64 { DEFAULT_DOCK_RADIUS }
fn default_hold() -> f64 { DEFAULT_HOLD_TO_EQUIP_SEC }
fn default_decay() -> f64 { DEFAULT_DECAY_RATE_PER_SEC }
fn default_trigger() -> String { DEFAULT_TRIGGER_JOINT.to_string() }

/// `dock` section of the input document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockInput {
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_hold", alias = "holdToEquipSec")]
    pub hold_to_equip_sec: f64,
    #[serde(default = "default_decay", alias = "decayRate", alias = "decay_rate_per_sec")]
    pub decay_rate: f64,
    #[serde(default = "default_trigger", alias = "triggerJoint")]
    pub trigger_joint: String,
}

impl Default for DockInput {
    fn default() -> Self {
        Self {
            center: default_center(),
            radius: default_radius(),
            hold_to_equip_sec: default_hold(),
            decay_rate: default_decay(),
            trigger_joint: default_trigger(),
        }
    }
}

/// Whole simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceInput {
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    #[serde(default, alias = "coverScale")]
    pub cover_scale: CoverScale,
    #[serde(default)]
    pub dock: DockInput,
    /// Preset used when `segments` is empty
    #[serde(default)]
    pub rig: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentSpec>,
    #[serde(default)]
    pub frames: Vec<BodyFrame>,
}

impl Default for SequenceInput {
    fn default() -> Self {
        Self {
            mirror: default_mirror(),
            cover_scale: CoverScale::default(),
            dock: DockInput::default(),
            rig: None,
            segments: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl SequenceInput {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Resolve defaults and presets into a runnable config
    pub fn config(&self) -> Result<SequenceConfig, ConfigError> {
        let segments = if self.segments.is_empty() {
            let rig: Rig = match &self.rig {
                Some(name) => name.parse()?,
                None => Rig::default(),
            };
            rig.specs()
        } else {
            self.segments.clone()
        };

        let config = SequenceConfig {
            mirror: self.mirror,
            cover_scale: self.cover_scale,
            dock_center: (self.dock.center[0], self.dock.center[1]).into(),
            dock_radius: self.dock.radius,
            hold_to_equip_sec: self.dock.hold_to_equip_sec,
            decay_rate_per_sec: self.dock.decay_rate,
            trigger_joint: self.dock.trigger_joint.clone(),
            segments,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config and run the frames
    pub fn run(&self) -> Result<SimulationResult, ConfigError> {
        run_body_sequence(&self.frames, &self.config()?)
    }
}
