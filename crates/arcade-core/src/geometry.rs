//! Planar and polar geometry shared by every game.
//!
//! Angles are radians. Two normal forms are used: [`normalize_angle`] maps to
//! `[-π, π)` (signed offsets), [`wrap_tau`] maps to `[0, 2π)` (sector lookup).

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Normalize an angle to `[-π, π)`.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= PI { wrapped - TAU } else { wrapped }
}

/// Wrap an angle into `[0, 2π)`.
#[inline]
pub fn wrap_tau(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Shortest signed rotation that takes `from` onto `to`, in `[-π, π)`.
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Convert polar (r, theta) to cartesian.
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian to polar (r, theta), theta in `(-π, π]`.
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

/// Reflect a velocity about a unit normal: `v - 2(v·n)n`.
#[inline]
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Rotate a vector counter-clockwise by `angle`.
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Earliest `t > 0` at which `origin + velocity * t` lies on the circle of
/// `radius` centred at the origin.
pub fn ray_circle_intersection(origin: Vec2, velocity: Vec2, radius: f32) -> Option<f32> {
    let a = velocity.length_squared();
    if a < 1e-8 {
        return None;
    }
    let b = 2.0 * origin.dot(velocity);
    let c = origin.length_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    [t1, t2].into_iter().filter(|t| *t > 0.0).reduce(f32::min)
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box from its centre and half extents.
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Overlap test; touching edges do not count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Horizontal overlap only (used for "still underneath" checks).
    pub fn overlaps_x(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_angle_range() {
        for i in -40..40 {
            let a = normalize_angle(i as f32 * 0.7);
            assert!((-PI..PI).contains(&a), "angle {a} out of range");
        }
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
    }

    #[test]
    fn wrap_tau_range() {
        assert!((wrap_tau(-0.5) - (TAU - 0.5)).abs() < 1e-5);
        assert!(wrap_tau(TAU).abs() < 1e-5);
        assert!((wrap_tau(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn angle_delta_takes_short_way() {
        let d = angle_delta(3.0, -3.0);
        assert!(d > 0.0 && d < 0.5, "expected short positive rotation, got {d}");
    }

    #[test]
    fn reflect_off_vertical_wall() {
        let r = reflect(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((r.x + 100.0).abs() < 1e-4);
        assert!(r.y.abs() < 1e-4);
    }

    #[test]
    fn ray_circle_from_center() {
        let t = ray_circle_intersection(Vec2::ZERO, Vec2::new(10.0, 0.0), 100.0).unwrap();
        assert!((t - 10.0).abs() < 1e-4);
    }

    #[test]
    fn ray_circle_miss_when_moving_away_outside() {
        let t = ray_circle_intersection(Vec2::new(200.0, 0.0), Vec2::new(10.0, 0.0), 100.0);
        assert!(t.is_none());
    }

    #[test]
    fn aabb_overlap() {
        let a = Aabb::from_center(Vec2::ZERO, Vec2::splat(1.0));
        let b = Aabb::from_center(Vec2::new(1.5, 0.0), Vec2::splat(1.0));
        let c = Aabb::from_center(Vec2::new(3.0, 0.0), Vec2::splat(1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.overlaps_x(&b));
    }
}
