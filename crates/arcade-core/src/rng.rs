//! Seeded session RNG. Every random decision (AI reaction, bounce jitter,
//! spawn angles, course generation) draws from one stream per session so a
//! replay with the same seed and inputs is bit-identical.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// The session random stream.
pub type SimRng = Pcg32;

/// Create the session stream from a seed.
pub fn seeded(seed: u64) -> SimRng {
    Pcg32::seed_from_u64(seed)
}

/// Uniform angle in `[0, 2π)`.
pub fn uniform_angle(rng: &mut SimRng) -> f32 {
    rng.random_range(0.0..TAU)
}

/// Uniform value in `[-max, max]`. `max <= 0` or non-finite yields 0
/// without drawing.
pub fn jitter(rng: &mut SimRng, max: f32) -> f32 {
    if !max.is_finite() || max <= 0.0 {
        return 0.0;
    }
    rng.random_range(-max..=max)
}

/// Uniform value in `[lo, hi]`, tolerant of `lo >= hi`. Non-finite bounds
/// collapse the range to `lo` (or 0 when `lo` itself is not finite).
pub fn between(rng: &mut SimRng, lo: f32, hi: f32) -> f32 {
    if !lo.is_finite() {
        return 0.0;
    }
    if !hi.is_finite() || hi <= lo {
        return lo;
    }
    rng.random_range(lo..=hi)
}

/// Bernoulli trial with probability clamped into `[0, 1]`. NaN counts as 0.
pub fn chance(rng: &mut SimRng, probability: f32) -> bool {
    if probability.is_nan() {
        return false;
    }
    rng.random_bool(f64::from(probability.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for _ in 0..32 {
            assert_eq!(uniform_angle(&mut a).to_bits(), uniform_angle(&mut b).to_bits());
        }
    }

    #[test]
    fn jitter_bounded() {
        let mut rng = seeded(7);
        for _ in 0..1000 {
            let j = jitter(&mut rng, 0.15);
            assert!((-0.15..=0.15).contains(&j));
        }
        assert_eq!(jitter(&mut rng, 0.0), 0.0);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = seeded(1);
        assert!(chance(&mut rng, 1.0));
        assert!(!chance(&mut rng, 0.0));
        assert!(chance(&mut rng, 7.5), "probability above 1 clamps to always");
    }

    #[test]
    fn between_degenerate_range() {
        let mut rng = seeded(3);
        assert_eq!(between(&mut rng, 1.1, 1.1), 1.1);
        assert_eq!(between(&mut rng, 2.0, 1.0), 2.0);
    }

    #[test]
    fn non_finite_arguments_do_not_panic() {
        let mut rng = seeded(5);
        assert!(!chance(&mut rng, f32::NAN));
        assert!(chance(&mut rng, f32::INFINITY));
        assert!(!chance(&mut rng, f32::NEG_INFINITY));
        assert_eq!(between(&mut rng, 1.0, f32::NAN), 1.0);
        assert_eq!(between(&mut rng, 1.0, f32::INFINITY), 1.0);
        assert_eq!(between(&mut rng, f32::NAN, 2.0), 0.0);
        assert_eq!(between(&mut rng, f32::NEG_INFINITY, 2.0), 0.0);
        assert_eq!(jitter(&mut rng, f32::NAN), 0.0);
        assert_eq!(jitter(&mut rng, f32::INFINITY), 0.0);
    }
}
