//! CPU reference for the direction parameterizations used by the probe
//! shaders. The WGSL in `shaders/octahedral_project.wgsl` and
//! `shaders/filter.wgsl` implements the same functions; keep them in sync.

use glam::{Vec2, Vec3};

fn sign_not_zero(v: f32) -> f32 {
    if v >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Octahedral encoding over the XZ plane: +Y maps to the UV center,
/// the lower hemisphere folds onto the square's corners. Bijective.
pub fn octahedral_encode(dir: Vec3) -> Vec2 {
    let l1 = dir.x.abs() + dir.y.abs() + dir.z.abs();
    let mut p = Vec2::new(dir.x, dir.z) / l1;
    if dir.y < 0.0 {
        p = Vec2::new(
            (1.0 - p.y.abs()) * sign_not_zero(p.x),
            (1.0 - p.x.abs()) * sign_not_zero(p.y),
        );
    }
    p * 0.5 + Vec2::splat(0.5)
}

/// Inverse of [`octahedral_encode`]. Returns a unit direction.
pub fn octahedral_decode(uv: Vec2) -> Vec3 {
    let f = uv * 2.0 - Vec2::ONE;
    let y = 1.0 - f.x.abs() - f.y.abs();
    let mut xz = f;
    if y < 0.0 {
        xz = Vec2::new(
            (1.0 - f.y.abs()) * sign_not_zero(f.x),
            (1.0 - f.x.abs()) * sign_not_zero(f.y),
        );
    }
    Vec3::new(xz.x, y, xz.y).normalize()
}

/// Sphere-map encoding with +Z at the UV center. Unlike the octahedral
/// parameterization this stays continuous under bilinear filtering, which
/// is why the filtered irradiance/distance layers use it.
pub fn sphere_map_encode(dir: Vec3) -> Vec2 {
    let m = 2.0 * (2.0 + 2.0 * dir.z).max(1e-8).sqrt();
    Vec2::new(dir.x / m + 0.5, dir.y / m + 0.5)
}

/// Inverse of [`sphere_map_encode`]. The valid region is the disc of radius
/// 0.5 around the UV center; radii are clamped onto it.
pub fn sphere_map_decode(uv: Vec2) -> Vec3 {
    let q = uv - Vec2::splat(0.5);
    let r2 = q.length_squared().min(0.25);
    let z = 1.0 - 8.0 * r2;
    let scale = 4.0 * (1.0 - 4.0 * r2).max(0.0).sqrt();
    Vec3::new(q.x * scale, q.y * scale, z).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn direction_sweep() -> Vec<Vec3> {
        let mut dirs = Vec::new();
        let n = 8;
        for i in 0..n {
            for j in 0..n {
                let theta = std::f32::consts::PI * (i as f32 + 0.5) / n as f32;
                let phi = std::f32::consts::TAU * j as f32 / n as f32;
                dirs.push(Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                ));
            }
        }
        dirs.extend([Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z]);
        dirs
    }

    #[test]
    fn octahedral_round_trip() {
        for dir in direction_sweep() {
            let decoded = octahedral_decode(octahedral_encode(dir));
            assert!(
                (decoded - dir).length() < EPSILON,
                "dir {dir:?} decoded {decoded:?}"
            );
        }
    }

    #[test]
    fn octahedral_known_points() {
        let up = octahedral_encode(Vec3::Y);
        assert!((up - Vec2::splat(0.5)).length() < EPSILON);

        // +X lands on the right edge midpoint.
        let x = octahedral_encode(Vec3::X);
        assert!((x - Vec2::new(1.0, 0.5)).length() < EPSILON);

        let down = octahedral_decode(Vec2::new(0.0, 0.0));
        assert!((down - Vec3::NEG_Y).length() < EPSILON);
    }

    #[test]
    fn sphere_map_round_trip() {
        for dir in direction_sweep() {
            // The backward pole is a singularity of the sphere map; skip it.
            if dir.z < -0.99 {
                continue;
            }
            let decoded = sphere_map_decode(sphere_map_encode(dir));
            assert!(
                (decoded - dir).length() < 1e-3,
                "dir {dir:?} decoded {decoded:?}"
            );
        }
    }

    #[test]
    fn sphere_map_center_is_forward() {
        let center = sphere_map_encode(Vec3::Z);
        assert!((center - Vec2::splat(0.5)).length() < EPSILON);
        let decoded = sphere_map_decode(Vec2::splat(0.5));
        assert!((decoded - Vec3::Z).length() < EPSILON);
    }
}
