//! Probe grid planner: a 3D lattice of world-space probe positions.

use glam::Vec3;

use crate::error::RenderError;

/// A single light-field probe. Position is immutable once placed; probes are
/// never destroyed, only re-precomputed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probe {
    pub index: usize,
    pub position: Vec3,
}

/// Ordered probe lattice. Index ordering is lexicographic with x fastest:
/// `index = x + y*cx + z*cx*cy`.
#[derive(Clone, Debug)]
pub struct ProbeGrid {
    origin: Vec3,
    step: Vec3,
    counts: [u32; 3],
    probes: Vec<Probe>,
}

impl ProbeGrid {
    /// Place `counts[0]*counts[1]*counts[2]` probes starting at `origin`,
    /// spaced by `step` along each axis. Deterministic; rejects
    /// non-positive counts.
    pub fn place(origin: Vec3, step: Vec3, counts: [u32; 3]) -> Result<Self, RenderError> {
        if counts.iter().any(|&c| c == 0) {
            return Err(RenderError::InvalidParameter(format!(
                "probe counts must be positive, got {counts:?}"
            )));
        }
        let total = (counts[0] * counts[1] * counts[2]) as usize;
        let mut probes = Vec::with_capacity(total);
        let mut index = 0;
        for z in 0..counts[2] {
            for y in 0..counts[1] {
                for x in 0..counts[0] {
                    let position = origin + Vec3::new(x as f32, y as f32, z as f32) * step;
                    probes.push(Probe { index, position });
                    index += 1;
                }
            }
        }
        Ok(Self {
            origin,
            step,
            counts,
            probes,
        })
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn step(&self) -> Vec3 {
        self.step
    }

    pub fn counts(&self) -> [u32; 3] {
        self.counts
    }

    pub fn count(&self) -> usize {
        self.probes.len()
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn position(&self, index: usize) -> Vec3 {
        self.probes[index].position
    }

    pub fn index_of(&self, x: u32, y: u32, z: u32) -> usize {
        (x + y * self.counts[0] + z * self.counts[0] * self.counts[1]) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_product_of_axis_counts() {
        let grid = ProbeGrid::place(Vec3::ZERO, Vec3::ONE, [3, 5, 2]).unwrap();
        assert_eq!(grid.count(), 30);
    }

    #[test]
    fn positions_follow_lattice_formula() {
        let origin = Vec3::new(1.0, -2.0, 0.5);
        let step = Vec3::new(0.5, 1.0, 2.0);
        let counts = [3u32, 4, 2];
        let grid = ProbeGrid::place(origin, step, counts).unwrap();
        for z in 0..counts[2] {
            for y in 0..counts[1] {
                for x in 0..counts[0] {
                    let index = grid.index_of(x, y, z);
                    let expected = origin + Vec3::new(x as f32, y as f32, z as f32) * step;
                    assert_eq!(grid.probes()[index].position, expected);
                    assert_eq!(grid.probes()[index].index, index);
                }
            }
        }
    }

    // Reference scene: counts [4,2,4], origin (-3,1,-3), step (2,2,2).
    // Probe 5 is (x=1, y=1, z=0) -> (-1, 3, -3); (x=1, y=0, z=1) is index 9.
    #[test]
    fn reference_scene_probe_positions() {
        let grid = ProbeGrid::place(
            Vec3::new(-3.0, 1.0, -3.0),
            Vec3::new(2.0, 2.0, 2.0),
            [4, 2, 4],
        )
        .unwrap();
        assert_eq!(grid.count(), 32);
        assert_eq!(grid.index_of(1, 1, 0), 5);
        assert_eq!(grid.position(5), Vec3::new(-1.0, 3.0, -3.0));
        assert_eq!(grid.index_of(1, 0, 1), 9);
        assert_eq!(grid.position(9), Vec3::new(-1.0, 1.0, -1.0));
    }

    #[test]
    fn zero_count_rejected() {
        assert!(ProbeGrid::place(Vec3::ZERO, Vec3::ONE, [0, 2, 2]).is_err());
        assert!(ProbeGrid::place(Vec3::ZERO, Vec3::ONE, [2, 2, 0]).is_err());
    }
}
