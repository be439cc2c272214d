//! DockCharger: hold-to-equip dwell gate
//!
//! Per tick:
//! - already equipped → hold resets to 0, never fires
//! - trigger inside the zone (boundary inclusive) → hold += dt
//! - otherwise → hold decays linearly, floored at 0
//! - hold reaching the threshold fires once and resets hold to 0

use crate::types::{clamp, ConfigError, Point2};
use crate::DEFAULT_DECAY_RATE_PER_SEC;

/// Dwell gate state for one simulation run
#[derive(Debug, Clone)]
pub struct DockCharger {
    center: Point2,
    radius: f64,
    hold_to_equip_sec: f64,
    decay_rate_per_sec: f64,
    /// Accumulated dwell, within [0, hold_to_equip_sec]
    hold_sec: f64,
}

impl DockCharger {
    /// Create a gate with the default decay rate
    pub fn new(center: Point2, radius: f64, hold_to_equip_sec: f64) -> Result<Self, ConfigError> {
        Self::with_decay(center, radius, hold_to_equip_sec, DEFAULT_DECAY_RATE_PER_SEC)
    }

    /// Create a gate with an explicit decay rate
    pub fn with_decay(
        center: Point2,
        radius: f64,
        hold_to_equip_sec: f64,
        decay_rate_per_sec: f64,
    ) -> Result<Self, ConfigError> {
        // NaN fails every comparison, so test for the valid range
        if !(hold_to_equip_sec > 0.0) {
            return Err(ConfigError::NonPositiveHold(hold_to_equip_sec));
        }
        if !(decay_rate_per_sec >= 0.0) {
            return Err(ConfigError::NegativeDecay(decay_rate_per_sec));
        }
        if !(radius >= 0.0) {
            return Err(ConfigError::NegativeRadius(radius));
        }
        Ok(Self {
            center,
            radius,
            hold_to_equip_sec,
            decay_rate_per_sec,
            hold_sec: 0.0,
        })
    }

    /// Is `point` inside the zone (inclusive boundary)?
    pub fn contains(&self, point: Point2) -> bool {
        point.distance_to(self.center) <= self.radius
    }

    /// Advance the gate by `dt_sec`. Returns true iff equip fires on this call.
    pub fn tick(&mut self, dt_sec: f64, trigger: Option<Point2>, already_equipped: bool) -> bool {
        if already_equipped {
            self.hold_sec = 0.0;
            return false;
        }

        match trigger {
            Some(point) if self.contains(point) => {
                self.hold_sec += dt_sec;
            }
            _ => {
                self.hold_sec = (self.hold_sec - dt_sec * self.decay_rate_per_sec).max(0.0);
            }
        }

        if self.progress() >= 1.0 {
            self.hold_sec = 0.0;
            return true;
        }
        false
    }

    /// Fraction of the threshold reached, in [0, 1]
    pub fn progress(&self) -> f64 {
        clamp(self.hold_sec / self.hold_to_equip_sec, 0.0, 1.0)
    }

    pub fn hold_sec(&self) -> f64 {
        self.hold_sec
    }

    pub fn center(&self) -> Point2 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn hold_to_equip_sec(&self) -> f64 {
        self.hold_to_equip_sec
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const INSIDE: Option<Point2> = Some(Point2::ZERO);
    const OUTSIDE: Option<Point2> = Some(Point2 { x: 5.0, y: 5.0 });

    fn gate(hold: f64) -> DockCharger {
        DockCharger::new(Point2::ZERO, 1.0, hold).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        assert!(matches!(
            DockCharger::new(Point2::ZERO, 1.0, 0.0),
            Err(ConfigError::NonPositiveHold(_))
        ));
        assert!(DockCharger::new(Point2::ZERO, 1.0, -0.5).is_err());
        assert!(DockCharger::new(Point2::ZERO, 1.0, f64::NAN).is_err());
        assert!(matches!(
            DockCharger::with_decay(Point2::ZERO, 1.0, 0.5, -1.0),
            Err(ConfigError::NegativeDecay(_))
        ));
    }

    #[test]
    fn test_hold_accumulates_inside_and_fires_once() {
        // dyadic step keeps the sums exact
        let mut dock = gate(0.5);
        let dt = 0.125;
        for k in 1..=3 {
            assert!(!dock.tick(dt, INSIDE, false));
            assert_eq!(dock.hold_sec(), k as f64 * dt);
        }
        assert!(dock.tick(dt, INSIDE, false), "fourth tick reaches 0.5");
        assert_eq!(dock.hold_sec(), 0.0);
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let mut dock = DockCharger::new(Point2::ZERO, 0.5, 1.0).unwrap();
        dock.tick(0.25, Some(Point2::new(0.5, 0.0)), false);
        assert_eq!(dock.hold_sec(), 0.25);
    }

    #[test]
    fn test_decay_outside_floors_at_zero() {
        let mut dock = DockCharger::with_decay(Point2::ZERO, 1.0, 10.0, 2.0).unwrap();
        dock.tick(1.0, INSIDE, false);
        assert_eq!(dock.hold_sec(), 1.0);

        assert!(!dock.tick(0.25, OUTSIDE, false));
        assert_eq!(dock.hold_sec(), 0.5);
        assert!(!dock.tick(0.125, None, false));
        assert_eq!(dock.hold_sec(), 0.25);
        assert!(!dock.tick(1.0, OUTSIDE, false));
        assert_eq!(dock.hold_sec(), 0.0);
        assert!(!dock.tick(1.0, OUTSIDE, false));
        assert_eq!(dock.hold_sec(), 0.0);
    }

    #[test]
    fn test_brief_exit_is_forgiven() {
        let mut dock = DockCharger::with_decay(Point2::ZERO, 1.0, 1.0, 1.0).unwrap();
        dock.tick(0.5, INSIDE, false);
        dock.tick(0.125, OUTSIDE, false);
        assert_eq!(dock.hold_sec(), 0.375);
        assert!(!dock.tick(0.5, INSIDE, false));
        assert!(dock.tick(0.125, INSIDE, false));
    }

    #[test]
    fn test_inert_after_equip() {
        let mut dock = gate(0.25);
        dock.tick(0.125, INSIDE, false);
        for _ in 0..10 {
            assert!(!dock.tick(0.125, INSIDE, true));
            assert_eq!(dock.hold_sec(), 0.0);
        }
    }

    #[test]
    fn test_single_large_step_fires() {
        let mut dock = gate(0.7);
        assert!(dock.tick(5.0, INSIDE, false));
        assert_eq!(dock.hold_sec(), 0.0);
    }
}
