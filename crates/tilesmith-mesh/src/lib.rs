//! Chunk height field: the interleaved 9x9 + 8x8 vertex grid, holes,
//! normals, LOD index generation and sculpting kernels.
#![forbid(unsafe_code)]

pub mod holes;
pub mod lod;
mod normals;
pub mod sampler;
pub mod sculpt;

use tilesmith_geom::{Aabb, UNIT_SIZE, Vec3};

pub use holes::{HOLE_GRID, HoleMask};
pub use lod::{FLAT_LOD_RANGE, LOD_INDEX_CAPS, LOD_LEVELS, LodIndices};
pub use sampler::{Fallback, NoTerrain, TerrainSampler};
pub use sculpt::{
    BrushTypeError, EditMode, FlattenBrush, FlattenKind, FlattenLocks, SculptBrush, SculptKernel,
};

/// Vertices per outer row.
pub const OUTER_ROW: usize = 9;
/// Vertices per inner row.
pub const INNER_ROW: usize = 8;
/// Stride between consecutive outer rows.
pub const ROW_STRIDE: usize = OUTER_ROW + INNER_ROW;
pub const VERTEX_COUNT: usize = OUTER_ROW * OUTER_ROW + INNER_ROW * INNER_ROW;
/// Outer vertices plus the eight bounding-box corners.
pub const HULL_POINTS: usize = OUTER_ROW * OUTER_ROW + 8;

#[inline]
pub const fn outer_index(row: usize, col: usize) -> usize {
    row * ROW_STRIDE + col
}

/// Same as `(row + 1) * 9 + row * 8 + col`.
#[inline]
pub const fn inner_index(row: usize, col: usize) -> usize {
    row * ROW_STRIDE + OUTER_ROW + col
}

/// Position of vertex `i` relative to the chunk corner, in quad units.
#[inline]
pub fn vertex_grid_pos(i: usize) -> (f32, f32) {
    let row = i / ROW_STRIDE;
    let rem = i % ROW_STRIDE;
    if rem < OUTER_ROW {
        (rem as f32, row as f32)
    } else {
        ((rem - OUTER_ROW) as f32 + 0.5, row as f32 + 0.5)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    origin_x: f32,
    origin_z: f32,
    heights: [f32; VERTEX_COUNT],
    normals: [Vec3; VERTEX_COUNT],
    holes: HoleMask,
    bounds: Aabb,
    hull: [Vec3; HULL_POINTS],
}

impl HeightField {
    /// Flat field at `base_height` whose corner sits at world `(origin_x, origin_z)`.
    pub fn new(origin_x: f32, origin_z: f32, base_height: f32) -> Self {
        Self::from_heights(origin_x, origin_z, [base_height; VERTEX_COUNT])
    }

    pub fn from_heights(origin_x: f32, origin_z: f32, heights: [f32; VERTEX_COUNT]) -> Self {
        let mut field = Self {
            origin_x,
            origin_z,
            heights,
            normals: [Vec3::UP; VERTEX_COUNT],
            holes: HoleMask::NONE,
            bounds: Aabb::default(),
            hull: [Vec3::default(); HULL_POINTS],
        };
        field.update_bounds();
        field
    }

    #[inline]
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_z)
    }

    #[inline]
    pub fn heights(&self) -> &[f32; VERTEX_COUNT] {
        &self.heights
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3; VERTEX_COUNT] {
        &self.normals
    }

    pub fn set_normals(&mut self, normals: [Vec3; VERTEX_COUNT]) {
        self.normals = normals;
    }

    /// World position of vertex `i`.
    pub fn vertex_position(&self, i: usize) -> Vec3 {
        let (gx, gz) = vertex_grid_pos(i);
        Vec3::new(
            self.origin_x + gx * UNIT_SIZE,
            self.heights[i],
            self.origin_z + gz * UNIT_SIZE,
        )
    }

    /// Height of outer vertex `(row, col)`; `None` outside the 9x9 grid.
    pub fn height_at(&self, row: usize, col: usize) -> Option<f32> {
        (row < OUTER_ROW && col < OUTER_ROW).then(|| self.heights[outer_index(row, col)])
    }

    /// Height of inner vertex `(row, col)`; `None` outside the 8x8 grid.
    pub fn inner_height_at(&self, row: usize, col: usize) -> Option<f32> {
        (row < INNER_ROW && col < INNER_ROW).then(|| self.heights[inner_index(row, col)])
    }

    /// Sets outer vertex `(row, col)`. Returns whether anything changed.
    pub fn set_height(&mut self, row: usize, col: usize, value: f32) -> bool {
        if row >= OUTER_ROW || col >= OUTER_ROW {
            return false;
        }
        self.set_vertex_height(outer_index(row, col), value)
    }

    pub fn set_vertex_height(&mut self, i: usize, value: f32) -> bool {
        match self.heights.get_mut(i) {
            Some(h) if *h != value => {
                *h = value;
                self.update_bounds();
                true
            }
            _ => false,
        }
    }

    /// Replaces every height at once (used by snapshot paste and decoding).
    pub fn set_heights(&mut self, heights: [f32; VERTEX_COUNT]) {
        self.heights = heights;
        self.update_bounds();
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub fn min_height(&self) -> f32 {
        self.bounds.min.y
    }

    #[inline]
    pub fn max_height(&self) -> f32 {
        self.bounds.max.y
    }

    /// Points for the ray-picking pre-test, kept in step with the heights.
    #[inline]
    pub fn intersect_hull(&self) -> &[Vec3; HULL_POINTS] {
        &self.hull
    }

    pub fn is_flat(&self) -> bool {
        self.max_height() - self.min_height() < FLAT_LOD_RANGE
    }

    pub(crate) fn update_bounds(&mut self) {
        let (min_y, max_y) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            });
        let extent = 8.0 * UNIT_SIZE;
        self.bounds = Aabb::new(
            Vec3::new(self.origin_x, min_y, self.origin_z),
            Vec3::new(self.origin_x + extent, max_y, self.origin_z + extent),
        );
        let (lo, hi) = (self.bounds.min, self.bounds.max);
        for row in 0..OUTER_ROW {
            for col in 0..OUTER_ROW {
                self.hull[row * OUTER_ROW + col] = self.vertex_position(outer_index(row, col));
            }
        }
        for (k, slot) in self.hull[OUTER_ROW * OUTER_ROW..].iter_mut().enumerate() {
            *slot = Vec3::new(
                if k & 1 == 0 { lo.x } else { hi.x },
                if k & 2 == 0 { lo.y } else { hi.y },
                if k & 4 == 0 { lo.z } else { hi.z },
            );
        }
    }

    #[inline]
    pub fn holes(&self) -> &HoleMask {
        &self.holes
    }

    pub fn set_holes(&mut self, holes: HoleMask) -> bool {
        let changed = self.holes != holes;
        self.holes = holes;
        changed
    }

    #[inline]
    pub fn is_hole(&self, x: usize, z: usize) -> bool {
        self.holes.is_hole(x, z)
    }

    pub fn set_hole(&mut self, x: usize, z: usize, hole: bool) -> bool {
        self.holes.set(x, z, hole)
    }

    /// Holes (or restores) the whole chunk.
    pub fn set_big_hole(&mut self, hole: bool) -> bool {
        self.set_holes(if hole { HoleMask::ALL } else { HoleMask::NONE })
    }

    /// Index buffers for every offered level. `flat_level_allowed` carries the
    /// texture/vertex-colour conditions the height field cannot see.
    pub fn generate_lod_indices(&self, flat_level_allowed: bool) -> LodIndices {
        LodIndices::generate(&self.holes, flat_level_allowed && self.is_flat())
    }

    pub fn indices_count(&self, level: usize) -> usize {
        lod::indices_count(level, &self.holes)
    }

    /// Interpolated height at world `(x, z)`, following the four-triangle fan
    /// of the containing quad. `None` outside the chunk.
    pub fn height_at_world(&self, x: f32, z: f32) -> Option<f32> {
        let lx = (x - self.origin_x) / UNIT_SIZE;
        let lz = (z - self.origin_z) / UNIT_SIZE;
        if !(0.0..=8.0).contains(&lx) || !(0.0..=8.0).contains(&lz) {
            return None;
        }
        let qx = (lx.floor() as usize).min(7);
        let qz = (lz.floor() as usize).min(7);
        let fx = lx - qx as f32;
        let fz = lz - qz as f32;

        let tl = (0.0, 0.0, self.heights[outer_index(qz, qx)]);
        let tr = (1.0, 0.0, self.heights[outer_index(qz, qx + 1)]);
        let bl = (0.0, 1.0, self.heights[outer_index(qz + 1, qx)]);
        let br = (1.0, 1.0, self.heights[outer_index(qz + 1, qx + 1)]);
        let c = (0.5, 0.5, self.heights[inner_index(qz, qx)]);

        let (a, b) = if fz <= fx && fz <= 1.0 - fx {
            (tl, tr)
        } else if fx >= fz && fx >= 1.0 - fz {
            (tr, br)
        } else if fz >= fx && fz >= 1.0 - fx {
            (br, bl)
        } else {
            (bl, tl)
        };
        Some(barycentric(a, b, c, fx, fz))
    }
}

impl TerrainSampler for HeightField {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self.height_at_world(x, z)
    }
}

fn barycentric(
    a: (f32, f32, f32),
    b: (f32, f32, f32),
    c: (f32, f32, f32),
    px: f32,
    pz: f32,
) -> f32 {
    let det = (b.1 - c.1) * (a.0 - c.0) + (c.0 - b.0) * (a.1 - c.1);
    let wa = ((b.1 - c.1) * (px - c.0) + (c.0 - b.0) * (pz - c.1)) / det;
    let wb = ((c.1 - a.1) * (px - c.0) + (a.0 - c.0) * (pz - c.1)) / det;
    let wc = 1.0 - wa - wb;
    wa * a.2 + wb * b.2 + wc * c.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_formulas_agree() {
        for row in 0..INNER_ROW {
            for col in 0..INNER_ROW {
                assert_eq!(inner_index(row, col), (row + 1) * 9 + row * 8 + col);
            }
        }
        assert_eq!(outer_index(8, 8), VERTEX_COUNT - 1);
    }

    #[test]
    fn grid_positions_interleave() {
        assert_eq!(vertex_grid_pos(outer_index(2, 3)), (3.0, 2.0));
        assert_eq!(vertex_grid_pos(inner_index(2, 3)), (3.5, 2.5));
    }

    #[test]
    fn sculpt_moves_the_hull() {
        let mut f = HeightField::new(0.0, 0.0, 2.0);
        let hull = *f.intersect_hull();
        assert!(hull.iter().all(|p| p.y == 2.0));
        let centre = f.vertex_position(outer_index(4, 4));
        let brush = SculptBrush {
            kernel: SculptKernel::Flat,
            mode: EditMode::All,
            change: 5.0,
            radius: UNIT_SIZE * 0.5,
            inner_radius: 0.0,
        };
        assert!(f.sculpt(centre, &brush));
        let hull = f.intersect_hull();
        assert_eq!(hull[4 * OUTER_ROW + 4].y, 7.0);
        assert_eq!(hull[0].y, 2.0);
        let top = hull[OUTER_ROW * OUTER_ROW..].iter().filter(|p| p.y == 7.0).count();
        assert_eq!(top, 4);

        let mut heights = *f.heights();
        heights[outer_index(0, 8)] = -3.0;
        f.set_heights(heights);
        assert_eq!(f.intersect_hull()[8].y, -3.0);
        assert!(f.intersect_hull()[OUTER_ROW * OUTER_ROW..].iter().any(|p| p.y == -3.0));
    }

    #[test]
    fn out_of_range_lookups_are_none() {
        let f = HeightField::new(0.0, 0.0, 1.0);
        assert_eq!(f.height_at(9, 0), None);
        assert_eq!(f.inner_height_at(0, 8), None);
        assert_eq!(f.height_at_world(-1.0, 5.0), None);
        assert!(!HeightField::new(0.0, 0.0, 0.0).clone().set_height(0, 9, 3.0));
    }

    #[test]
    fn interpolation_hits_vertices() {
        let mut heights = [0.0; VERTEX_COUNT];
        for (i, h) in heights.iter_mut().enumerate() {
            *h = i as f32 * 0.25;
        }
        let f = HeightField::from_heights(100.0, 200.0, heights);
        for i in [outer_index(0, 0), outer_index(3, 5), inner_index(4, 4), outer_index(8, 8)] {
            let p = f.vertex_position(i);
            let h = f.height_at_world(p.x, p.z).unwrap();
            assert!((h - heights[i]).abs() < 1e-3, "vertex {i}: {h} vs {}", heights[i]);
        }
    }

    #[test]
    fn bounds_follow_edits() {
        let mut f = HeightField::new(0.0, 0.0, 10.0);
        assert!(f.is_flat());
        assert!(f.set_height(4, 4, 25.0));
        assert_eq!(f.max_height(), 25.0);
        assert_eq!(f.min_height(), 10.0);
        assert!(!f.is_flat());
        assert!(!f.set_height(4, 4, 25.0));
    }

    #[test]
    fn big_hole_round_trip_restores_full_lod() {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        assert!(f.set_big_hole(true));
        assert!(f.generate_lod_indices(true).level(0).unwrap().is_empty());
        assert!(f.set_big_hole(false));
        assert_eq!(f.generate_lod_indices(true).level(0).unwrap().len(), 768);
    }

    #[test]
    fn flat_level_needs_flat_terrain() {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        assert!(f.generate_lod_indices(true).has_flat_level());
        assert!(!f.generate_lod_indices(false).has_flat_level());
        f.set_height(0, 0, 1.0);
        assert!(!f.generate_lod_indices(true).has_flat_level());
    }
}
