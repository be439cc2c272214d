//! SegmentFollower: limb-tracking pose with exponential smoothing
//!
//! Before equip (or when a joint is missing) the pose snaps to the dock
//! pose. After equip it converges toward the limb-derived target by
//! `clamp(dt * smooth_gain, 0, 1)` of the remaining gap every tick.

use std::f64::consts::FRAC_PI_2;

use crate::types::{clamp, Point2, SegmentSpec, SegmentTransform};

/// Pose tracker for one segment
#[derive(Debug, Clone)]
pub struct SegmentFollower {
    spec: SegmentSpec,
    transform: SegmentTransform,
}

impl SegmentFollower {
    /// Start at the dock pose around `anchor`
    pub fn new(spec: SegmentSpec, anchor: Point2) -> Self {
        let transform = SegmentTransform::docked(anchor, &spec);
        Self { spec, transform }
    }

    /// Snap (no smoothing) to the dock pose
    pub fn dock(&mut self, anchor: Point2) -> SegmentTransform {
        self.transform = SegmentTransform::docked(anchor, &self.spec);
        self.transform
    }

    /// Pose the segment would take if it jumped straight onto the limb
    pub fn target(&self, start: Point2, end: Point2) -> SegmentTransform {
        let direction = end - start;
        let length = direction.length();
        let midpoint = start.midpoint(end);
        // local "up" axis runs along the limb
        let rotation = direction.y.atan2(direction.x) - FRAC_PI_2;
        let radius = clamp(length * self.spec.radius_factor, self.spec.radius_min, self.spec.radius_max);

        SegmentTransform {
            position_x: midpoint.x,
            position_y: midpoint.y,
            position_z: self.spec.z,
            rotation_z: rotation,
            scale_x: radius,
            scale_y: length,
            scale_z: radius,
        }
    }

    /// Smooth toward the limb between `start` and `end`
    pub fn follow(&mut self, start: Point2, end: Point2, dt_sec: f64) -> SegmentTransform {
        let target = self.target(start, end);
        let t = clamp(dt_sec * self.spec.smooth_gain, 0.0, 1.0);
        self.transform = self.transform.lerp_toward(&target, t);
        self.transform
    }

    /// Per-frame update used by the sequence runner.
    ///
    /// Tracks only when equipped and both joints are present; anything else
    /// degrades to the dock pose for this frame.
    pub fn update(
        &mut self,
        equipped: bool,
        start: Option<Point2>,
        end: Option<Point2>,
        anchor: Point2,
        dt_sec: f64,
    ) -> SegmentTransform {
        match (equipped, start, end) {
            (true, Some(start), Some(end)) => self.follow(start, end, dt_sec),
            _ => self.dock(anchor),
        }
    }

    pub fn transform(&self) -> &SegmentTransform {
        &self.transform
    }

    pub fn spec(&self) -> &SegmentSpec {
        &self.spec
    }
}

// =============================================================================
// TESTS
// =============================================================================
