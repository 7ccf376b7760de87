//! Height brushes: additive sculpt kernels, flatten and blur.
//!
//! Every brush works on horizontal distance from the cursor and only touches
//! vertices strictly inside its radius (the square kernel uses the Chebyshev
//! distance instead). All entry points return whether any height changed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilesmith_geom::{UNIT_SIZE, Vec3, angled_height};

use crate::HeightField;
use crate::VERTEX_COUNT;
use crate::sampler::{Fallback, TerrainSampler};

/// Height tolerance for the below/above cursor edit modes.
pub const EDIT_MODE_TOLERANCE: f32 = 0.05;
const GAUSSIAN_SIGMA: f32 = 0.39;

/// A brush type id that names no known kernel.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown {family} brush type {value}")]
pub struct BrushTypeError {
    pub family: &'static str,
    pub value: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SculptKernel {
    Flat,
    Linear,
    Smooth,
    Polynomial,
    Trigonometric,
    Gaussian,
    QuadraticSquare,
}

impl TryFrom<u32> for SculptKernel {
    type Error = BrushTypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => SculptKernel::Flat,
            1 => SculptKernel::Linear,
            2 => SculptKernel::Smooth,
            3 => SculptKernel::Polynomial,
            4 => SculptKernel::Trigonometric,
            5 => SculptKernel::Gaussian,
            6 => SculptKernel::QuadraticSquare,
            _ => {
                return Err(BrushTypeError {
                    family: "sculpt",
                    value,
                });
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    All,
    /// Only vertices no higher than the cursor.
    BelowCursor,
    /// Only vertices no lower than the cursor.
    AboveCursor,
}

impl EditMode {
    fn admits(self, vertex_y: f32, cursor_y: f32) -> bool {
        match self {
            EditMode::All => true,
            EditMode::BelowCursor => vertex_y <= cursor_y + EDIT_MODE_TOLERANCE,
            EditMode::AboveCursor => vertex_y >= cursor_y - EDIT_MODE_TOLERANCE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SculptBrush {
    pub kernel: SculptKernel,
    pub mode: EditMode,
    /// Height added at the cursor; negative lowers.
    pub change: f32,
    pub radius: f32,
    /// Inner radius as a fraction of `radius`, in `[0, 1]`.
    pub inner_radius: f32,
}

impl SculptBrush {
    /// Height delta for a vertex at `(dist, cheb)` from the cursor, `None` when
    /// outside the footprint.
    fn delta(&self, dist: f32, cheb: f32) -> Option<f32> {
        let r = self.radius;
        let inner = self.inner_radius.clamp(0.0, 1.0);
        let reach = if self.kernel == SculptKernel::QuadraticSquare { cheb } else { dist };
        if reach >= r {
            return None;
        }
        let d = dist / r;
        Some(match self.kernel {
            SculptKernel::Flat => self.change,
            SculptKernel::Linear => self.change * (1.0 - d * (1.0 - inner)),
            SculptKernel::Smooth => self.change / (1.0 + d),
            SculptKernel::Polynomial => self.change * (1.0 - d * d),
            SculptKernel::Trigonometric => self.change * d.cos(),
            SculptKernel::Gaussian => {
                let de = d.max(inner);
                self.change * (-(de * de) / (2.0 * GAUSSIAN_SIGMA * GAUSSIAN_SIGMA)).exp()
            }
            SculptKernel::QuadraticSquare => {
                let inner_r = r * inner;
                let t = if r - inner_r <= f32::EPSILON {
                    0.0
                } else {
                    ((cheb - inner_r) / (r - inner_r)).clamp(0.0, 1.0)
                };
                self.change * (1.0 - t * t)
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlattenKind {
    /// Constant `strength` blend.
    #[default]
    Flat,
    /// Blend fades linearly to zero at the radius.
    Linear,
    /// Blend is `strength^(1 + d/r)`.
    Smooth,
    /// Snap straight to the target.
    Origin,
}

impl TryFrom<u32> for FlattenKind {
    type Error = BrushTypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => FlattenKind::Flat,
            1 => FlattenKind::Linear,
            2 => FlattenKind::Smooth,
            3 => FlattenKind::Origin,
            _ => {
                return Err(BrushTypeError {
                    family: "flatten",
                    value,
                });
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FlattenLocks {
    pub no_raise: bool,
    pub no_lower: bool,
}

impl FlattenLocks {
    fn allows(self, from: f32, to: f32) -> bool {
        !(to > from && self.no_raise || to < from && self.no_lower)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlattenBrush {
    pub kind: FlattenKind,
    /// Blend amount in `[0, 1]`.
    pub strength: f32,
    pub radius: f32,
    /// Plane tilt in radians; zero is level.
    pub angle: f32,
    /// Plane facing in radians.
    pub orientation: f32,
    /// Plane anchor. `None` anchors at the cursor.
    pub origin: Option<Vec3>,
    pub locks: FlattenLocks,
}

impl FlattenBrush {
    fn factor(&self, dist: f32) -> f32 {
        let s = self.strength.clamp(0.0, 1.0);
        match self.kind {
            FlattenKind::Flat => s,
            FlattenKind::Linear => s * (1.0 - dist / self.radius),
            FlattenKind::Smooth => s.powf(1.0 + dist / self.radius),
            FlattenKind::Origin => 1.0,
        }
    }

    fn blend(&self, y: f32, target: f32, dist: f32) -> Option<f32> {
        let new = y + (target - y) * self.factor(dist);
        (new != y && self.locks.allows(y, new)).then_some(new)
    }
}

impl HeightField {
    /// Applies an additive sculpt kernel around `cursor`.
    pub fn sculpt(&mut self, cursor: Vec3, brush: &SculptBrush) -> bool {
        let mut changed = false;
        for i in 0..VERTEX_COUNT {
            let v = self.vertex_position(i);
            if !brush.mode.admits(v.y, cursor.y) {
                continue;
            }
            let cheb = (v.x - cursor.x).abs().max((v.z - cursor.z).abs());
            if let Some(delta) = brush.delta(v.dist_xz(cursor), cheb) {
                changed |= self.write_height(i, v.y + delta);
            }
        }
        if changed {
            self.update_bounds();
        }
        changed
    }

    /// Pulls heights toward the plane through `brush.origin` (or the cursor).
    pub fn flatten(&mut self, cursor: Vec3, brush: &FlattenBrush) -> bool {
        let anchor = brush.origin.unwrap_or(cursor);
        let mut changed = false;
        for i in 0..VERTEX_COUNT {
            let v = self.vertex_position(i);
            let dist = v.dist_xz(cursor);
            if dist >= brush.radius {
                continue;
            }
            let target = angled_height(anchor, v, brush.angle, brush.orientation);
            if let Some(new) = brush.blend(v.y, target, dist) {
                changed |= self.write_height(i, new);
            }
        }
        if changed {
            self.update_bounds();
        }
        changed
    }

    /// Pulls heights toward a distance-weighted average of their
    /// surroundings. `neighbours` answers for positions past the border.
    pub fn blur(
        &mut self,
        cursor: Vec3,
        brush: &FlattenBrush,
        neighbours: &dyn TerrainSampler,
    ) -> bool {
        let targets = self.blur_targets(cursor, brush, neighbours);
        log::trace!("blur at ({}, {}) moves {} vertices", cursor.x, cursor.z, targets.len());
        let mut changed = false;
        for (i, new) in targets {
            changed |= self.write_height(i, new);
        }
        if changed {
            self.update_bounds();
        }
        changed
    }

    fn blur_targets(
        &self,
        cursor: Vec3,
        brush: &FlattenBrush,
        neighbours: &dyn TerrainSampler,
    ) -> Vec<(usize, f32)> {
        let sampler = Fallback {
            primary: self,
            secondary: neighbours,
        };
        let rad = (brush.radius / UNIT_SIZE) as i32;
        let half = UNIT_SIZE * 0.5;
        let mut out = Vec::new();
        for i in 0..VERTEX_COUNT {
            let v = self.vertex_position(i);
            let dist = v.dist_xz(cursor);
            if dist >= brush.radius {
                continue;
            }
            let mut total = 0.0;
            let mut weight = 0.0;
            for j in -2 * rad..=2 * rad {
                let tz = v.z + j as f32 * half;
                for k in -rad..=rad {
                    let tx = v.x + k as f32 * UNIT_SIZE + (j % 2) as f32 * half;
                    let d = ((tx - v.x).powi(2) + (tz - v.z).powi(2)).sqrt();
                    if d > brush.radius {
                        continue;
                    }
                    if let Some(h) = sampler.sample_height(tx, tz) {
                        let w = 1.0 - d / brush.radius;
                        total += w * h;
                        weight += w;
                    }
                }
            }
            if weight <= f32::EPSILON {
                continue;
            }
            if let Some(new) = brush.blend(v.y, total / weight, dist) {
                out.push((i, new));
            }
        }
        out
    }

    /// Sets a height without refreshing bounds; callers batch the refresh.
    fn write_height(&mut self, i: usize, value: f32) -> bool {
        let h = &mut self.heights[i];
        if *h == value {
            return false;
        }
        *h = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::NoTerrain;
    use crate::{inner_index, outer_index};
    use tilesmith_geom::CHUNK_SIZE;

    fn center() -> Vec3 {
        Vec3::new(CHUNK_SIZE * 0.5, 0.0, CHUNK_SIZE * 0.5)
    }

    fn brush(kernel: SculptKernel) -> SculptBrush {
        SculptBrush {
            kernel,
            mode: EditMode::All,
            change: 2.0,
            radius: UNIT_SIZE * 3.0,
            inner_radius: 0.0,
        }
    }

    #[test]
    fn every_kernel_peaks_at_cursor() {
        for id in 0..7 {
            let kernel = SculptKernel::try_from(id).unwrap();
            let mut f = HeightField::new(0.0, 0.0, 0.0);
            assert!(f.sculpt(center(), &brush(kernel)), "{kernel:?}");
            let peak = f.heights()[outer_index(4, 4)];
            assert!((peak - 2.0).abs() < 1e-4, "{kernel:?} peak {peak}");
            assert_eq!(f.heights()[outer_index(0, 0)], 0.0, "{kernel:?}");
            assert_eq!(f.max_height(), peak);
        }
    }

    #[test]
    fn falloff_decreases_with_distance() {
        for kernel in [
            SculptKernel::Linear,
            SculptKernel::Smooth,
            SculptKernel::Polynomial,
            SculptKernel::Trigonometric,
            SculptKernel::Gaussian,
        ] {
            let mut f = HeightField::new(0.0, 0.0, 0.0);
            f.sculpt(center(), &brush(kernel));
            let near = f.heights()[inner_index(4, 4)];
            let far = f.heights()[outer_index(4, 6)];
            assert!(near > far, "{kernel:?}: {near} <= {far}");
        }
    }

    #[test]
    fn unknown_kernel_ids_are_errors() {
        assert_eq!(
            SculptKernel::try_from(7),
            Err(BrushTypeError {
                family: "sculpt",
                value: 7
            })
        );
        assert!(FlattenKind::try_from(4).is_err());
    }

    #[test]
    fn below_cursor_mode_skips_high_vertices() {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        f.set_height(4, 5, 10.0);
        let mut b = brush(SculptKernel::Flat);
        b.mode = EditMode::BelowCursor;
        f.sculpt(center(), &b);
        assert_eq!(f.height_at(4, 5), Some(10.0));
        assert_eq!(f.height_at(4, 4), Some(2.0));

        let mut b = brush(SculptKernel::Flat);
        b.mode = EditMode::AboveCursor;
        let mut g = HeightField::new(0.0, 0.0, -5.0);
        assert!(!g.sculpt(center(), &b));
    }

    #[test]
    fn flatten_origin_snaps_to_plane() {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        f.set_height(4, 4, 8.0);
        let b = FlattenBrush {
            kind: FlattenKind::Origin,
            strength: 0.5,
            radius: UNIT_SIZE * 2.0,
            angle: 0.0,
            orientation: 0.0,
            origin: Some(Vec3::new(0.0, 3.0, 0.0)),
            locks: FlattenLocks::default(),
        };
        assert!(f.flatten(center(), &b));
        assert_eq!(f.height_at(4, 4), Some(3.0));
        assert_eq!(f.height_at(0, 0), Some(0.0));
    }

    #[test]
    fn flatten_locks_block_direction() {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        f.set_height(4, 4, 8.0);
        let b = FlattenBrush {
            kind: FlattenKind::Flat,
            strength: 1.0,
            radius: UNIT_SIZE * 2.0,
            angle: 0.0,
            orientation: 0.0,
            origin: Some(Vec3::new(0.0, 4.0, 0.0)),
            locks: FlattenLocks {
                no_raise: true,
                no_lower: false,
            },
        };
        f.flatten(center(), &b);
        assert_eq!(f.height_at(4, 4), Some(4.0));
        assert_eq!(f.height_at(4, 5), Some(0.0));
    }

    #[test]
    fn blur_softens_spike() {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        f.set_height(4, 4, 10.0);
        let b = FlattenBrush {
            kind: FlattenKind::Flat,
            strength: 1.0,
            radius: UNIT_SIZE * 2.0,
            angle: 0.0,
            orientation: 0.0,
            origin: None,
            locks: FlattenLocks::default(),
        };
        assert!(f.blur(center(), &b, &NoTerrain));
        let peak = f.heights()[outer_index(4, 4)];
        assert!(peak < 10.0 && peak > 0.0, "peak {peak}");
        assert!(f.heights()[inner_index(4, 4)] > 0.0);
    }

    #[test]
    fn blur_keeps_flat_ground_flat() {
        let mut f = HeightField::new(0.0, 0.0, 7.0);
        let b = FlattenBrush {
            kind: FlattenKind::Smooth,
            strength: 0.8,
            radius: UNIT_SIZE * 4.0,
            angle: 0.0,
            orientation: 0.0,
            origin: None,
            locks: FlattenLocks::default(),
        };
        f.blur(center(), &b, &NoTerrain);
        for h in f.heights() {
            assert!((h - 7.0).abs() < 1e-4);
        }
    }
}
