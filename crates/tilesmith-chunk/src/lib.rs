//! The terrain chunk: one height field with its texture and liquid stacks,
//! area id, shadow bits and vertex colors, plus the on-disk record format.
//!
//! Every mutating call returns a [`DirtySet`] naming what changed and also
//! folds it into the chunk's pending set, which [`Chunk::take_dirty`] hands
//! to whoever mirrors the chunk elsewhere.
#![forbid(unsafe_code)]

mod colors;
mod dirty;
mod flags;
pub mod io;
mod sampler;
mod shadow;
pub mod tile;

pub use colors::{MAX_COLOR, VertexColors};
pub use dirty::DirtySet;
pub use flags::ChunkFlags;
pub use io::{ChunkError, LiquidFormat, ReadOptions, WriteOptions, read_chunk, write_chunk};
pub use sampler::TileSampler;
pub use shadow::ShadowMap;
pub use tile::{read_tile, write_tile};

use tilesmith_alpha::ALPHA_SIZE;
use tilesmith_geom::{CHUNK_SIZE, TEXEL_SIZE, Vec3};
use tilesmith_liquid::{LiquidBrush, LiquidStack, LiquidTypeTable};
use tilesmith_mesh::{
    FlattenBrush, HOLE_GRID, HeightField, HoleMask, LodIndices, SculptBrush, TerrainSampler,
    VERTEX_COUNT,
};
use tilesmith_texture::{Brush, TextureId, TextureStack};

/// World-space edge of one hole cell.
const HOLE_CELL_SIZE: f32 = CHUNK_SIZE / HOLE_GRID as f32;

#[derive(Clone, Debug)]
pub struct Chunk {
    index_x: u32,
    index_z: u32,
    mesh: HeightField,
    textures: TextureStack,
    liquids: LiquidStack,
    area_id: u32,
    flags: ChunkFlags,
    shadows: Option<ShadowMap>,
    colors: Option<VertexColors>,
    dirty: DirtySet,
}

impl Chunk {
    /// Flat chunk at world chunk `(index_x, index_z)` with a single base
    /// texture.
    pub fn new(index_x: u32, index_z: u32, base_height: f32, base_texture: TextureId) -> Self {
        let (ox, oz) = Self::origin_of(index_x, index_z);
        Self {
            index_x,
            index_z,
            mesh: HeightField::new(ox, oz, base_height),
            textures: TextureStack::with_base(base_texture),
            liquids: LiquidStack::new(),
            area_id: 0,
            flags: ChunkFlags::default(),
            shadows: None,
            colors: None,
            dirty: DirtySet::ALL,
        }
    }

    /// World corner of the chunk at `(index_x, index_z)`.
    pub fn origin_of(index_x: u32, index_z: u32) -> (f32, f32) {
        (index_x as f32 * CHUNK_SIZE, index_z as f32 * CHUNK_SIZE)
    }

    #[inline]
    pub fn index(&self) -> (u32, u32) {
        (self.index_x, self.index_z)
    }

    #[inline]
    pub fn origin(&self) -> (f32, f32) {
        self.mesh.origin()
    }

    #[inline]
    pub fn mesh(&self) -> &HeightField {
        &self.mesh
    }

    #[inline]
    pub fn textures(&self) -> &TextureStack {
        &self.textures
    }

    #[inline]
    pub fn liquids(&self) -> &LiquidStack {
        &self.liquids
    }

    #[inline]
    pub fn area_id(&self) -> u32 {
        self.area_id
    }

    #[inline]
    pub fn flags(&self) -> ChunkFlags {
        self.flags
    }

    pub fn shadows(&self) -> Option<&ShadowMap> {
        self.shadows.as_ref()
    }

    pub fn vertex_colors(&self) -> Option<&VertexColors> {
        self.colors.as_ref()
    }

    /// Pending changes since the last [`Self::take_dirty`].
    pub fn dirty(&self) -> DirtySet {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> DirtySet {
        std::mem::take(&mut self.dirty)
    }

    fn mark(&mut self, d: DirtySet) -> DirtySet {
        self.dirty |= d;
        d
    }

    /// Interpolated terrain height at world `(x, z)`; `None` off the chunk.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.mesh.height_at_world(x, z)
    }

    /// LOD buffers. The single-quad level is only offered to flat chunks
    /// with fewer than two textures and no vertex colors.
    pub fn generate_lod_indices(&self) -> LodIndices {
        let allowed = self.textures.len() < 2 && self.colors.is_none();
        self.mesh.generate_lod_indices(allowed)
    }

    fn terrain_changed(&mut self, changed: bool, neighbours: &dyn TerrainSampler) -> DirtySet {
        if changed {
            self.mesh.recompute_normals(neighbours);
        }
        self.mark(DirtySet::TERRAIN.when(changed))
    }

    pub fn sculpt(
        &mut self,
        cursor: Vec3,
        brush: &SculptBrush,
        neighbours: &dyn TerrainSampler,
    ) -> DirtySet {
        let changed = self.mesh.sculpt(cursor, brush);
        self.terrain_changed(changed, neighbours)
    }

    pub fn flatten(
        &mut self,
        cursor: Vec3,
        brush: &FlattenBrush,
        neighbours: &dyn TerrainSampler,
    ) -> DirtySet {
        let changed = self.mesh.flatten(cursor, brush);
        self.terrain_changed(changed, neighbours)
    }

    pub fn blur(
        &mut self,
        cursor: Vec3,
        brush: &FlattenBrush,
        neighbours: &dyn TerrainSampler,
    ) -> DirtySet {
        let changed = self.mesh.blur(cursor, brush, neighbours);
        self.terrain_changed(changed, neighbours)
    }

    /// Recomputes normals after a neighbour changed along the shared border.
    pub fn refresh_normals(&mut self, neighbours: &dyn TerrainSampler) -> DirtySet {
        self.mesh.recompute_normals(neighbours);
        self.mark(DirtySet {
            normals: true,
            ..DirtySet::NONE
        })
    }

    /// Replaces every height and rebuilds normals.
    pub fn set_heights(
        &mut self,
        heights: [f32; VERTEX_COUNT],
        neighbours: &dyn TerrainSampler,
    ) -> DirtySet {
        let changed = *self.mesh.heights() != heights;
        if changed {
            self.mesh.set_heights(heights);
        }
        self.terrain_changed(changed, neighbours)
    }

    /// Holes or fills the 4x4 cell under `pos`, or the whole chunk when `big`.
    pub fn set_hole(&mut self, pos: Vec3, big: bool, add: bool) -> DirtySet {
        let changed = if big {
            self.mesh.set_big_hole(add)
        } else {
            let (ox, oz) = self.origin();
            let cx = ((pos.x - ox) / HOLE_CELL_SIZE).floor();
            let cz = ((pos.z - oz) / HOLE_CELL_SIZE).floor();
            let range = 0.0..HOLE_GRID as f32;
            range.contains(&cx)
                && range.contains(&cz)
                && self.mesh.set_hole(cx as usize, cz as usize, add)
        };
        self.mark(
            DirtySet {
                holes: true,
                lod: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    pub fn set_holes(&mut self, holes: HoleMask) -> DirtySet {
        let changed = self.mesh.set_holes(holes);
        self.mark(
            DirtySet {
                holes: true,
                lod: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    pub fn set_area_id(&mut self, area_id: u32) -> DirtySet {
        let changed = self.area_id != area_id;
        self.area_id = area_id;
        self.mark(
            DirtySet {
                area: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    pub fn set_impassable(&mut self, on: bool) -> DirtySet {
        let changed = self.flags.impassable != on;
        self.flags.impassable = on;
        self.mark(
            DirtySet {
                area: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    fn shadow_dirty(changed: bool) -> DirtySet {
        DirtySet {
            shadows: true,
            ..DirtySet::NONE
        }
        .when(changed)
    }

    /// Drops the shadow map entirely.
    pub fn clear_shadows(&mut self) -> DirtySet {
        let changed = self.shadows.take().is_some();
        self.flags.has_shadow = false;
        self.mark(Self::shadow_dirty(changed))
    }

    /// Sets shadow texel `(x, z)`, allocating the map on first use.
    pub fn set_shadow(&mut self, x: usize, z: usize, on: bool) -> DirtySet {
        if x >= ALPHA_SIZE || z >= ALPHA_SIZE || (!on && self.shadows.is_none()) {
            return DirtySet::NONE;
        }
        let changed = self.shadows.get_or_insert_with(ShadowMap::new).set(x, z, on);
        self.flags.has_shadow = true;
        self.mark(Self::shadow_dirty(changed))
    }

    /// Shadows every texel within `radius` of `pos`, or clears them.
    pub fn paint_shadow(&mut self, pos: Vec3, radius: f32, on: bool) -> DirtySet {
        let (ox, oz) = self.origin();
        let mut d = DirtySet::NONE;
        for z in 0..ALPHA_SIZE {
            for x in 0..ALPHA_SIZE {
                let tx = ox + (x as f32 + 0.5) * TEXEL_SIZE;
                let tz = oz + (z as f32 + 0.5) * TEXEL_SIZE;
                if Vec3::new(tx, 0.0, tz).dist_xz(pos) <= radius {
                    d |= self.set_shadow(x, z, on);
                }
            }
        }
        d
    }

    pub fn set_shadows(&mut self, shadows: Option<ShadowMap>) -> DirtySet {
        let changed = self.shadows != shadows;
        self.flags.has_shadow = shadows.is_some();
        self.shadows = shadows;
        self.mark(Self::shadow_dirty(changed))
    }

    /// Tints vertices within `radius` of `pos` toward `color` with a linear
    /// falloff. The color block is created on first use.
    pub fn paint_vertex_color(
        &mut self,
        pos: Vec3,
        radius: f32,
        color: Vec3,
        strength: f32,
    ) -> DirtySet {
        if radius <= 0.0 {
            return DirtySet::NONE;
        }
        let hits: Vec<(usize, f32)> = (0..VERTEX_COUNT)
            .filter_map(|i| {
                let dist = self.mesh.vertex_position(i).dist_xz(pos);
                (dist < radius).then(|| (i, strength * (1.0 - dist / radius)))
            })
            .collect();
        if hits.is_empty() {
            return DirtySet::NONE;
        }
        let created = self.colors.is_none();
        let colors = self.colors.get_or_insert_with(VertexColors::new);
        let mut changed = created;
        for (i, w) in hits {
            changed |= colors.blend(i, color, w);
        }
        self.flags.has_vertex_colors = true;
        self.mark(
            DirtySet {
                vertex_colors: true,
                lod: created,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    pub fn set_vertex_colors(&mut self, colors: Option<VertexColors>) -> DirtySet {
        let changed = self.colors != colors;
        self.flags.has_vertex_colors = colors.is_some();
        self.colors = colors;
        self.mark(
            DirtySet {
                vertex_colors: true,
                lod: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    fn texture_changed(&mut self, changed: bool) -> DirtySet {
        self.mark(
            DirtySet {
                alpha: true,
                lod: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    pub fn paint_texture(
        &mut self,
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        texture: TextureId,
    ) -> DirtySet {
        let origin = self.origin();
        let changed = self
            .textures
            .paint(origin, pos, brush, strength, pressure, texture);
        self.texture_changed(changed)
    }

    /// Applies `f` to the texture stack. `f` reports whether it changed
    /// anything.
    pub fn edit_textures(&mut self, f: impl FnOnce(&mut TextureStack) -> bool) -> DirtySet {
        let changed = f(&mut self.textures);
        self.texture_changed(changed)
    }

    pub fn set_textures(&mut self, textures: TextureStack) -> DirtySet {
        let changed = self.textures != textures;
        self.textures = textures;
        self.texture_changed(changed)
    }

    fn liquid_changed(&mut self, changed: bool) -> DirtySet {
        self.mark(
            DirtySet {
                liquid: true,
                ..DirtySet::NONE
            }
            .when(changed),
        )
    }

    pub fn paint_liquid(
        &mut self,
        pos: Vec3,
        brush: &LiquidBrush,
        types: &LiquidTypeTable,
    ) -> DirtySet {
        let changed = self.liquids.paint(&self.mesh, pos, brush, types);
        self.liquid_changed(changed)
    }

    pub fn crop_liquid(&mut self) -> DirtySet {
        let changed = self.liquids.crop(&self.mesh);
        self.liquid_changed(changed)
    }

    pub fn autogen_liquid_depth(&mut self, factor: f32) -> DirtySet {
        let before = self.liquids.clone();
        self.liquids.autogen_depth(&self.mesh, factor);
        let changed = before != self.liquids;
        self.liquid_changed(changed)
    }

    /// Applies `f` to the liquid stack. `f` reports whether it changed
    /// anything.
    pub fn edit_liquids(&mut self, f: impl FnOnce(&mut LiquidStack) -> bool) -> DirtySet {
        let changed = f(&mut self.liquids);
        self.liquid_changed(changed)
    }

    pub fn set_liquids(&mut self, liquids: LiquidStack) -> DirtySet {
        let changed = self.liquids != liquids;
        self.liquids = liquids;
        self.liquid_changed(changed)
    }

    pub(crate) fn from_parts(parts: ChunkParts) -> Self {
        Self {
            index_x: parts.index_x,
            index_z: parts.index_z,
            mesh: parts.mesh,
            textures: parts.textures,
            liquids: parts.liquids,
            area_id: parts.area_id,
            flags: parts.flags,
            shadows: parts.shadows,
            colors: parts.colors,
            dirty: DirtySet::ALL,
        }
    }
}

pub(crate) struct ChunkParts {
    pub index_x: u32,
    pub index_z: u32,
    pub mesh: HeightField,
    pub textures: TextureStack,
    pub liquids: LiquidStack,
    pub area_id: u32,
    pub flags: ChunkFlags,
    pub shadows: Option<ShadowMap>,
    pub colors: Option<VertexColors>,
}

impl TerrainSampler for Chunk {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self.height_at(x, z)
    }
}
