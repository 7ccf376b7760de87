use tilesmith_geom::{UNIT_SIZE, Vec3};

use crate::sampler::{Fallback, TerrainSampler};
use crate::{HeightField, VERTEX_COUNT};

/// Quantization step of the on-disk signed byte normals.
pub const NORMAL_STEPS: f32 = 127.0;

/// Rounds each component to the nearest 1/127.
pub fn quantize_normal(n: Vec3) -> Vec3 {
    let q = |v: f32| (v * NORMAL_STEPS).round() / NORMAL_STEPS;
    Vec3::new(q(n.x), q(n.y), q(n.z))
}

/// Smoothed normal at `v` from four neighbours half a unit away.
fn vertex_normal(v: Vec3, sampler: &impl TerrainSampler) -> Vec3 {
    let half = UNIT_SIZE * 0.5;
    let at = |dx: f32, dz: f32| {
        let (x, z) = (v.x + dx, v.z + dz);
        Vec3::new(x, sampler.sample_height(x, z).unwrap_or(v.y), z)
    };
    let west = at(-half, 0.0) - v;
    let north = at(0.0, -half) - v;
    let east = at(half, 0.0) - v;
    let south = at(0.0, half) - v;

    let sum = north.cross(west) + east.cross(north) + south.cross(east) + west.cross(south);
    quantize_normal(sum.normalized())
}

impl HeightField {
    /// Rebuilds every vertex normal. Heights inside this field are read
    /// directly; `neighbours` answers for positions past the border.
    pub fn recompute_normals(&mut self, neighbours: &dyn TerrainSampler) {
        let sampler = Fallback {
            primary: &*self,
            secondary: neighbours,
        };
        let mut normals = [Vec3::UP; VERTEX_COUNT];
        for (i, n) in normals.iter_mut().enumerate() {
            *n = vertex_normal(self.vertex_position(i), &sampler);
        }
        self.set_normals(normals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::NoTerrain;
    use crate::{inner_index, outer_index};

    #[test]
    fn flat_field_points_up() {
        let mut f = HeightField::new(0.0, 0.0, 42.0);
        f.recompute_normals(&NoTerrain);
        for n in f.normals() {
            assert_eq!(*n, Vec3::UP);
        }
    }

    #[test]
    fn slope_tilts_against_rising_x() {
        let mut heights = [0.0; VERTEX_COUNT];
        for i in 0..VERTEX_COUNT {
            let (gx, _) = crate::vertex_grid_pos(i);
            heights[i] = gx * UNIT_SIZE;
        }
        let mut f = HeightField::from_heights(0.0, 0.0, heights);
        f.recompute_normals(&NoTerrain);
        let n = f.normals()[inner_index(3, 3)];
        assert!(n.y > 0.0);
        assert!(n.x < 0.0);
        assert!(n.z.abs() < 1e-6);
        assert!((n.x + n.y).abs() < 0.02, "45 degree slope, got {n:?}");
    }

    #[test]
    fn border_uses_neighbour_sampler() {
        struct Wall;
        impl TerrainSampler for Wall {
            fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
                Some(100.0)
            }
        }
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        f.recompute_normals(&Wall);
        assert_ne!(f.normals()[outer_index(0, 0)], Vec3::UP);
        assert_eq!(f.normals()[inner_index(4, 4)], Vec3::UP);
    }

    #[test]
    fn quantization_is_on_127_grid() {
        let q = quantize_normal(Vec3::new(0.3, 0.5, 0.81));
        for c in [q.x, q.y, q.z] {
            let steps = c * NORMAL_STEPS;
            assert!((steps - steps.round()).abs() < 1e-4);
        }
    }
}
