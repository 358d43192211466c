//! Pairwise interference checks
//!
//! Two objects interfere when the sum of their safety radii is not smaller
//! than the distance between their current positions. Everything here is a
//! pure function of positions and radii.

use glam::DVec2;

use super::state::Object;
use crate::consts::LOOKAHEAD_MARGIN;

/// Minimum separation below which two objects interfere
#[inline]
pub fn min_separation(a: &Object, b: &Object) -> f64 {
    a.safety_radius + b.safety_radius
}

/// Euclidean distance between two positions
#[inline]
pub fn distance(p: DVec2, q: DVec2) -> f64 {
    p.distance(q)
}

/// Result of a separation check between two positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Current distance between the objects
    pub distance: f64,
    /// Sum of the objects' safety radii
    pub min_separation: f64,
}

impl Separation {
    pub fn between(a: &Object, pa: DVec2, b: &Object, pb: DVec2) -> Self {
        Self {
            distance: distance(pa, pb),
            min_separation: min_separation(a, b),
        }
    }

    /// True when only one object may advance this tick
    #[inline]
    pub fn interferes(&self) -> bool {
        self.min_separation >= self.distance
    }

    /// Remaining slack before interference (negative when interfering)
    pub fn clearance(&self) -> f64 {
        self.distance - self.min_separation
    }
}

/// Lookahead test for the preferred object's candidate position.
///
/// Safe while `min_separation / lookahead_distance` stays below
/// [`LOOKAHEAD_MARGIN`]. A zero lookahead distance is never safe.
#[inline]
pub fn lookahead_is_safe(min_separation: f64, lookahead_distance: f64) -> bool {
    if lookahead_distance <= 0.0 {
        return false;
    }
    min_separation / lookahead_distance < LOOKAHEAD_MARGIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Trajectory;

    fn object(id: u32, safety_radius: f64) -> Object {
        let trajectory = Trajectory::from_points(vec![DVec2::ZERO]).unwrap();
        Object::new(id, format!("obj{}", id), id, 0, safety_radius, trajectory).unwrap()
    }

    #[test]
    fn test_min_separation_sums_radii() {
        let a = object(1, 1.5);
        let b = object(2, 0.25);
        assert!((min_separation(&a, &b) - 1.75).abs() < 1e-12);
        assert!((min_separation(&b, &a) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_interference_boundary_is_inclusive() {
        let a = object(1, 1.0);
        let b = object(2, 1.0);
        // Exactly at the margin counts as interfering
        let sep = Separation::between(&a, DVec2::ZERO, &b, DVec2::new(2.0, 0.0));
        assert!(sep.interferes());
        assert!(sep.clearance().abs() < 1e-12);

        let sep = Separation::between(&a, DVec2::ZERO, &b, DVec2::new(2.0001, 0.0));
        assert!(!sep.interferes());
    }

    #[test]
    fn test_zero_radii_coincident_positions_interfere() {
        let a = object(1, 0.0);
        let b = object(2, 0.0);
        let sep = Separation::between(&a, DVec2::ONE, &b, DVec2::ONE);
        assert!(sep.interferes());
    }

    #[test]
    fn test_lookahead_margin_of_two() {
        assert!(lookahead_is_safe(3.0, 1.6));
        assert!(!lookahead_is_safe(3.0, 1.5));
        assert!(!lookahead_is_safe(3.0, 1.0));
        assert!(!lookahead_is_safe(0.0, 0.0));
        assert!(lookahead_is_safe(0.0, 0.5));
    }
}
