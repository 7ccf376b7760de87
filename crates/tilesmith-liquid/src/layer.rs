use tilesmith_geom::{UNIT_SIZE, Vec3, angled_height, shortest_dist_to_square};
use tilesmith_mesh::HeightField;

use crate::{LIQUID_VERTEX_COUNT, LiquidKind, SUBCHUNKS, SubchunkMask, VERTS};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LiquidVertex {
    pub height: f32,
    pub uv: (f32, f32),
    /// Opacity in `[0, 1]`.
    pub depth: f32,
}

/// How a paint stroke shapes and targets liquid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiquidBrush {
    pub radius: f32,
    pub liquid_id: u16,
    /// `false` removes coverage.
    pub add: bool,
    pub angle: f32,
    pub orientation: f32,
    /// Plane anchor when locked; otherwise the cursor is used.
    pub origin: Option<Vec3>,
    /// Re-snap already covered subchunks to the plane.
    pub override_height: bool,
    /// Only paint the layer of `liquid_id`, creating it when missing.
    pub override_liquid_id: bool,
    pub opacity_factor: f32,
}

/// One liquid surface over a chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct LiquidLayer {
    liquid_id: u16,
    kind: LiquidKind,
    coverage: SubchunkMask,
    vertices: [LiquidVertex; LIQUID_VERTEX_COUNT],
    min: f32,
    max: f32,
    fishable: SubchunkMask,
    fatigue: SubchunkMask,
}

#[inline]
pub(crate) fn vidx(x: usize, z: usize) -> usize {
    z * VERTS + x
}

/// Vertex `(x, z)` of the four corners of subchunk `(x, z)`.
pub(crate) fn corners(x: usize, z: usize) -> [(usize, usize); 4] {
    [(x, z), (x + 1, z), (x, z + 1), (x + 1, z + 1)]
}

impl LiquidLayer {
    /// Layer with no coverage and every vertex at `height`.
    pub fn new(liquid_id: u16, kind: LiquidKind, height: f32) -> Self {
        let mut vertices = [LiquidVertex::default(); LIQUID_VERTEX_COUNT];
        for z in 0..VERTS {
            for x in 0..VERTS {
                vertices[vidx(x, z)] = LiquidVertex {
                    height,
                    uv: (x as f32, z as f32),
                    depth: 1.0,
                };
            }
        }
        Self {
            liquid_id,
            kind,
            coverage: SubchunkMask::NONE,
            vertices,
            min: height,
            max: height,
            fishable: SubchunkMask::ALL,
            fatigue: SubchunkMask::NONE,
        }
    }

    /// Rebuilds a layer from stored parts, refreshing the cached range.
    pub fn from_parts(
        liquid_id: u16,
        kind: LiquidKind,
        coverage: SubchunkMask,
        vertices: [LiquidVertex; LIQUID_VERTEX_COUNT],
        fishable: SubchunkMask,
        fatigue: SubchunkMask,
    ) -> Self {
        let mut layer = Self {
            liquid_id,
            kind,
            coverage,
            vertices,
            min: 0.0,
            max: 0.0,
            fishable,
            fatigue,
        };
        layer.update_min_max();
        layer
    }

    #[inline]
    pub fn liquid_id(&self) -> u16 {
        self.liquid_id
    }

    #[inline]
    pub fn kind(&self) -> LiquidKind {
        self.kind
    }

    #[inline]
    pub fn coverage(&self) -> SubchunkMask {
        self.coverage
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coverage.is_empty()
    }

    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[inline]
    pub fn fishable(&self) -> SubchunkMask {
        self.fishable
    }

    #[inline]
    pub fn fatigue_mask(&self) -> SubchunkMask {
        self.fatigue
    }

    pub fn vertices(&self) -> &[LiquidVertex; LIQUID_VERTEX_COUNT] {
        &self.vertices
    }

    pub fn vertex(&self, x: usize, z: usize) -> Option<&LiquidVertex> {
        (x < VERTS && z < VERTS).then(|| &self.vertices[vidx(x, z)])
    }

    /// Edits one vertex. Covered range is refreshed.
    pub fn set_vertex(&mut self, x: usize, z: usize, v: LiquidVertex) -> bool {
        if x >= VERTS || z >= VERTS {
            return false;
        }
        self.vertices[vidx(x, z)] = v;
        self.update_min_max();
        true
    }

    pub fn is_covered(&self, x: usize, z: usize) -> bool {
        self.coverage.get(x, z)
    }

    pub fn set_covered(&mut self, x: usize, z: usize, on: bool) -> bool {
        let changed = self.coverage.set(x, z, on);
        if changed {
            self.update_min_max();
        }
        changed
    }

    pub fn set_fishable(&mut self, x: usize, z: usize, on: bool) -> bool {
        self.fishable.set(x, z, on)
    }

    /// A vertex is live when any subchunk touching it is covered.
    pub fn is_vertex_live(&self, x: usize, z: usize) -> bool {
        let xs = x.saturating_sub(1)..=x.min(SUBCHUNKS - 1);
        let zs = z.saturating_sub(1)..=z.min(SUBCHUNKS - 1);
        zs.into_iter()
            .any(|sz| xs.clone().any(|sx| self.coverage.get(sx, sz)))
    }

    pub fn update_min_max(&mut self) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for z in 0..VERTS {
            for x in 0..VERTS {
                if self.is_vertex_live(x, z) {
                    let h = self.vertices[vidx(x, z)].height;
                    lo = lo.min(h);
                    hi = hi.max(h);
                }
            }
        }
        if lo > hi {
            let h = self.vertices[0].height;
            (lo, hi) = (h, h);
        }
        self.min = lo;
        self.max = hi;
    }

    /// Copies the corner heights of subchunk `(x, z)` from `other`.
    pub fn copy_subchunk_height(&mut self, x: usize, z: usize, other: &LiquidLayer) {
        if x >= SUBCHUNKS || z >= SUBCHUNKS {
            return;
        }
        for (cx, cz) in corners(x, z) {
            self.vertices[vidx(cx, cz)].height = other.vertices[vidx(cx, cz)].height;
        }
    }

    /// Adds or removes coverage under a stroke. Newly covered subchunks, and
    /// covered ones when `override_height` is set, get their corners snapped
    /// to the brush plane. Removal leaves heights untouched.
    pub fn paint(
        &mut self,
        terrain: &HeightField,
        pos: Vec3,
        brush: &LiquidBrush,
        add: bool,
    ) -> bool {
        let (ox, oz) = terrain.origin();
        let anchor = brush.origin.unwrap_or(pos);
        let mut changed = false;
        for z in 0..SUBCHUNKS {
            for x in 0..SUBCHUNKS {
                let sx = ox + x as f32 * UNIT_SIZE;
                let sz = oz + z as f32 * UNIT_SIZE;
                if shortest_dist_to_square(pos.x, pos.z, sx, sz, UNIT_SIZE) > brush.radius {
                    continue;
                }
                if !add {
                    changed |= self.coverage.set(x, z, false);
                    continue;
                }
                if brush.override_height || !self.coverage.get(x, z) {
                    for (cx, cz) in corners(x, z) {
                        let at =
                            Vec3::new(ox + cx as f32 * UNIT_SIZE, 0.0, oz + cz as f32 * UNIT_SIZE);
                        let h = angled_height(anchor, at, brush.angle, brush.orientation);
                        let v = &mut self.vertices[vidx(cx, cz)];
                        if v.height != h {
                            v.height = h;
                            changed = true;
                        }
                    }
                }
                changed |= self.coverage.set(x, z, true);
            }
        }
        if changed {
            self.update_min_max();
            self.autogen_depth(terrain, brush.opacity_factor);
        }
        changed
    }

    /// Clears subchunks whose four corners all sit below the terrain, or the
    /// whole layer when it is entirely below the terrain's lowest point.
    pub fn crop(&mut self, terrain: &HeightField) -> bool {
        if self.coverage.is_empty() {
            return false;
        }
        if self.max < terrain.min_height() {
            self.coverage = SubchunkMask::NONE;
            self.update_attributes();
            return true;
        }
        let mut changed = false;
        for (x, z) in self.coverage.cells().collect::<Vec<_>>() {
            let submerged = corners(x, z).iter().all(|&(cx, cz)| {
                let ground = terrain.height_at(cz, cx).unwrap_or(f32::NEG_INFINITY);
                self.vertices[vidx(cx, cz)].height < ground
            });
            if submerged {
                changed |= self.coverage.set(x, z, false);
            }
        }
        if changed {
            self.update_min_max();
            self.update_attributes();
        }
        changed
    }

    /// Recomputes every vertex depth as
    /// `clamp((liquid - terrain + 1) * factor, 0, 1)`.
    pub fn autogen_depth(&mut self, terrain: &HeightField, factor: f32) {
        for z in 0..VERTS {
            for x in 0..VERTS {
                let v = &mut self.vertices[vidx(x, z)];
                let ground = terrain.height_at(z, x).unwrap_or(v.height);
                v.depth = ((v.height - ground + 1.0) * factor).clamp(0.0, 1.0);
            }
        }
        self.update_attributes();
    }

    /// Ocean layers whose every covered subchunk is at full depth on all four
    /// corners.
    pub fn is_fatigue(&self) -> bool {
        self.kind == LiquidKind::Ocean
            && !self.coverage.is_empty()
            && self.coverage.cells().all(|(x, z)| {
                corners(x, z)
                    .iter()
                    .all(|&(cx, cz)| self.vertices[vidx(cx, cz)].depth >= 1.0)
            })
    }

    /// Refreshes the fishable/fatigue masks from [`Self::is_fatigue`].
    pub fn update_attributes(&mut self) {
        if self.is_fatigue() {
            self.fishable = SubchunkMask::ALL;
            self.fatigue = SubchunkMask::ALL;
        } else {
            self.fatigue = SubchunkMask::NONE;
        }
    }

    /// Every vertex height is the same.
    pub fn is_flat(&self) -> bool {
        self.max - self.min < f32::EPSILON
    }

    /// Turns the layer a quarter, matching the terrain: subchunk `(x, z)`
    /// moves to `(7 - z, x)` and vertex `(x, z)` to `(8 - z, x)`.
    pub fn rotate_90(&mut self) {
        self.remap(
            |x, z| (z, SUBCHUNKS - 1 - x),
            |x, z| (z, VERTS - 1 - x),
        );
    }

    /// Mirrors along x (`horizontal`) or z.
    pub fn mirror(&mut self, horizontal: bool) {
        if horizontal {
            self.remap(|x, z| (SUBCHUNKS - 1 - x, z), |x, z| (VERTS - 1 - x, z));
        } else {
            self.remap(|x, z| (x, SUBCHUNKS - 1 - z), |x, z| (x, VERTS - 1 - z));
        }
    }

    fn remap(
        &mut self,
        cell: impl Fn(usize, usize) -> (usize, usize),
        vertex: impl Fn(usize, usize) -> (usize, usize),
    ) {
        self.coverage = self.coverage.remap(&cell);
        self.fishable = self.fishable.remap(&cell);
        self.fatigue = self.fatigue.remap(&cell);
        let src = self.vertices;
        for z in 0..VERTS {
            for x in 0..VERTS {
                let (sx, sz) = vertex(x, z);
                self.vertices[vidx(x, z)] = src[vidx(sx, sz)];
            }
        }
    }
}
