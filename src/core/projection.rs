//! Camera space → working space projection

use crate::types::{CoverScale, Point2};

/// Map normalized camera coordinates into the centered working space.
///
/// `x01`/`y01` are not clamped; values outside [0,1] land out of view.
/// Image y grows downward, working y grows upward.
pub fn project(x01: f64, y01: f64, mirror: bool, cover_scale: CoverScale) -> Point2 {
    let x_norm = if mirror { 1.0 - x01 } else { x01 };
    let x_ndc = x_norm * 2.0 - 1.0;
    let y_ndc = -(y01 * 2.0 - 1.0);
    Point2::new(x_ndc * cover_scale.x, y_ndc * cover_scale.y)
}
