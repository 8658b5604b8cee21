//! Sector partition of the circular arena.
//!
//! Entity `i` of `n` has base angle `i·2π/n` and owns the half-open sector
//! `[base − π/n, base + π/n)`. Sectors tile the circle exactly.

use std::f32::consts::{PI, TAU};

use arcade_core::entity::{EntityId, Zone, ZoneGeometry};
use arcade_core::geometry::{angle_delta, normalize_angle, wrap_tau};

/// Base angle of entity `i` among `n`.
pub fn base_angle(i: EntityId, n: usize) -> f32 {
    wrap_tau(i as f32 * TAU / n as f32)
}

/// Half-width of each sector, `π / n`.
pub fn max_offset(n: usize) -> f32 {
    PI / n as f32
}

/// Owner of the sector containing `theta`.
pub fn sector_for_angle(theta: f32, n: usize) -> EntityId {
    if n <= 1 {
        return 0;
    }
    let span = TAU / n as f32;
    let shifted = wrap_tau(theta + span / 2.0);
    ((shifted / span).floor() as usize).min(n - 1)
}

/// Clamp a paddle offset into its sector.
pub fn clamp_offset(offset: f32, n: usize) -> f32 {
    let m = max_offset(n);
    offset.clamp(-m, m)
}

/// Clamp an absolute angle into entity `i`'s sector, wrap-aware. The result
/// is normalized to `[-π, π)`.
pub fn clamp_angle(requested: f32, i: EntityId, n: usize) -> f32 {
    let base = base_angle(i, n);
    normalize_angle(base + clamp_offset(angle_delta(base, requested), n))
}

/// Effective paddle arc as `(center_offset, half_width)`: the paddle's own
/// arc intersected with its sector, so neighbours never overlap.
pub fn paddle_arc(offset: f32, paddle_half_arc: f32, n: usize) -> (f32, f32) {
    let m = max_offset(n);
    let h = paddle_half_arc.min(m);
    let lo = (offset - h).max(-m);
    let hi = (offset + h).min(m);
    ((lo + hi) / 2.0, ((hi - lo) / 2.0).max(0.0))
}

/// Whether `theta` lies within `half_width` of `center`.
pub fn angle_within(theta: f32, center: f32, half_width: f32) -> bool {
    angle_delta(center, theta).abs() <= half_width
}

/// One owned sector zone per entity.
pub fn sector_zones(n: usize) -> Vec<Zone> {
    (0..n)
        .map(|i| Zone {
            owner: Some(i),
            geometry: ZoneGeometry::Sector {
                center_angle: base_angle(i, n),
                half_width: max_offset(n),
            },
        })
        .collect()
}
