//! Uniform-sphere sample table for the Monte-Carlo filter passes.
//!
//! Generated once at startup from a fixed seed so that repeated precompute
//! runs over an unchanged scene produce identical atlas contents, and shared
//! by every filter invocation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Must match `SPHERE_SAMPLE_COUNT` in `shaders/filter.wgsl`. At vec4 stride
/// this fills the 64 KiB uniform binding exactly.
pub const SPHERE_SAMPLE_COUNT: usize = 4096;

/// Rejection-sample unit-sphere directions: draw points in the cube, keep
/// those inside the ball, project onto the sphere. Returned as vec4 for
/// uniform-buffer layout (w unused).
pub fn generate_sphere_samples(seed: u64) -> Vec<[f32; 4]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(SPHERE_SAMPLE_COUNT);
    while samples.len() < SPHERE_SAMPLE_COUNT {
        let x = rng.gen::<f32>() * 2.0 - 1.0;
        let y = rng.gen::<f32>() * 2.0 - 1.0;
        let z = rng.gen::<f32>() * 2.0 - 1.0;
        let length_squared = x * x + y * y + z * z;
        if length_squared >= 1.0 || length_squared < 1e-12 {
            continue;
        }
        let inv = 1.0 / length_squared.sqrt();
        samples.push([x * inv, y * inv, z * inv, 0.0]);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_full_and_unit_length() {
        let samples = generate_sphere_samples(7);
        assert_eq!(samples.len(), SPHERE_SAMPLE_COUNT);
        for s in &samples {
            let len = (s[0] * s[0] + s[1] * s[1] + s[2] * s[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        assert_eq!(generate_sphere_samples(42), generate_sphere_samples(42));
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(generate_sphere_samples(1), generate_sphere_samples(2));
    }
}
