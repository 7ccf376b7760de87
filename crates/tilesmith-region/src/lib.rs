//! Copy, rotate, mirror and paste of rectangular chunk selections.
//!
//! A [`RegionSnapshot`] is a deep copy of every chunk in a selection. The
//! transforms return new snapshots, so a selection can be turned any number
//! of times from the same source. Rotation keeps the selection centred where
//! it was captured; the centre is stored in doubled chunk units so odd and
//! even extents both stay exact.
#![forbid(unsafe_code)]

mod tables;

use hashbrown::HashMap;
use tilesmith_alpha::ALPHA_SIZE;
use tilesmith_chunk::{Chunk, DirtySet, ShadowMap, TileSampler, VertexColors};
use tilesmith_liquid::LiquidStack;
use tilesmith_mesh::{Fallback, HOLE_GRID, HoleMask, NoTerrain, TerrainSampler, VERTEX_COUNT};
use tilesmith_texture::TextureStack;

/// Everything a paste writes into one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkSnapshot {
    /// World chunk coordinates. May leave the map after a transform.
    pub x: i32,
    pub z: i32,
    pub heights: [f32; VERTEX_COUNT],
    pub holes: HoleMask,
    pub textures: TextureStack,
    pub liquids: LiquidStack,
    pub shadows: Option<ShadowMap>,
    pub colors: Option<VertexColors>,
    pub area_id: u32,
}

impl ChunkSnapshot {
    pub fn capture(chunk: &Chunk) -> Self {
        let (x, z) = chunk.index();
        let mut textures = chunk.textures().clone();
        textures.end_stroke();
        Self {
            x: x as i32,
            z: z as i32,
            heights: *chunk.mesh().heights(),
            holes: *chunk.mesh().holes(),
            textures,
            liquids: chunk.liquids().clone(),
            shadows: chunk.shadows().cloned(),
            colors: chunk.vertex_colors().cloned(),
            area_id: chunk.area_id(),
        }
    }

    /// Content turned a quarter in place. Coordinates are left alone.
    pub fn rotated_90(&self) -> Self {
        let table = tables::rotate();
        let last_hole = HOLE_GRID - 1;
        let last_texel = ALPHA_SIZE - 1;
        let mut out = self.clone();
        out.heights = tables::apply(table, &self.heights);
        out.holes = self.holes.remap(|x, z| (z, last_hole - x));
        out.textures.rotate_90();
        out.liquids.rotate_90();
        out.shadows = self
            .shadows
            .as_ref()
            .map(|s| s.remap(|x, z| (z, last_texel - x)));
        out.colors = self.colors.as_ref().map(|c| c.remap(|i| table[i]));
        out
    }

    /// Content mirrored along x (`horizontal`) or z.
    pub fn mirrored(&self, horizontal: bool) -> Self {
        let table = tables::mirror(horizontal);
        let flip = move |last: usize| {
            move |x: usize, z: usize| {
                if horizontal {
                    (last - x, z)
                } else {
                    (x, last - z)
                }
            }
        };
        let mut out = self.clone();
        out.heights = tables::apply(table, &self.heights);
        out.holes = self.holes.remap(flip(HOLE_GRID - 1));
        out.textures.mirror(horizontal);
        out.liquids.mirror(horizontal);
        out.shadows = self
            .shadows
            .as_ref()
            .map(|s| s.remap(flip(ALPHA_SIZE - 1)));
        out.colors = self.colors.as_ref().map(|c| c.remap(|i| table[i]));
        out
    }

    /// Writes the snapshot into `chunk`. Normals are left to the caller.
    fn paste_into(&self, chunk: &mut Chunk) -> DirtySet {
        let mut d = chunk.set_heights(self.heights, &NoTerrain);
        d |= chunk.set_holes(self.holes);
        d |= chunk.set_textures(self.textures.clone());
        d |= chunk.set_liquids(self.liquids.clone());
        d |= chunk.set_shadows(self.shadows.clone());
        d |= chunk.set_vertex_colors(self.colors.clone());
        d |= chunk.set_area_id(self.area_id);
        d
    }
}

/// A rectangular selection of chunk snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSnapshot {
    /// Selection centre, doubled: `2 * min + extent - 1` per axis.
    center2: (i32, i32),
    width: u32,
    height: u32,
    chunks: Vec<ChunkSnapshot>,
}

impl RegionSnapshot {
    /// Copies the chunks whose index lies in `min..=max`. Missing chunks
    /// leave gaps; the selection keeps its full extent.
    pub fn capture<'a>(
        chunks: impl IntoIterator<Item = &'a Chunk>,
        min: (u32, u32),
        max: (u32, u32),
    ) -> Self {
        let (x0, z0) = (min.0.min(max.0), min.1.min(max.1));
        let (x1, z1) = (min.0.max(max.0), min.1.max(max.1));
        let width = x1 - x0 + 1;
        let height = z1 - z0 + 1;
        let mut snaps: Vec<ChunkSnapshot> = chunks
            .into_iter()
            .filter(|c| {
                let (x, z) = c.index();
                (x0..=x1).contains(&x) && (z0..=z1).contains(&z)
            })
            .map(ChunkSnapshot::capture)
            .collect();
        snaps.sort_by_key(|s| (s.z, s.x));
        log::debug!(
            "captured {} chunks in a {width}x{height} selection",
            snaps.len()
        );
        Self {
            center2: (
                2 * x0 as i32 + width as i32 - 1,
                2 * z0 as i32 + height as i32 - 1,
            ),
            width,
            height,
            chunks: snaps,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Lowest chunk coordinate the selection covers.
    pub fn origin(&self) -> (i32, i32) {
        Self::origin_for(self.center2, self.width, self.height)
    }

    fn origin_for(center2: (i32, i32), width: u32, height: u32) -> (i32, i32) {
        (
            (center2.0 - (width as i32 - 1)).div_euclid(2),
            (center2.1 - (height as i32 - 1)).div_euclid(2),
        )
    }

    pub fn chunks(&self) -> &[ChunkSnapshot] {
        &self.chunks
    }

    pub fn get(&self, x: i32, z: i32) -> Option<&ChunkSnapshot> {
        self.chunks.iter().find(|c| c.x == x && c.z == z)
    }

    /// Turns the selection a quarter about its centre. Width and height
    /// swap; chunk `(i, j)` of the grid moves to `(height - 1 - j, i)`.
    pub fn rotate_90(&self) -> Self {
        let (x0, z0) = self.origin();
        let (nw, nh) = (self.height, self.width);
        let (nx0, nz0) = Self::origin_for(self.center2, nw, nh);
        let mut chunks: Vec<ChunkSnapshot> = self
            .chunks
            .iter()
            .map(|c| {
                let (i, j) = (c.x - x0, c.z - z0);
                let mut out = c.rotated_90();
                out.x = nx0 + (self.height as i32 - 1 - j);
                out.z = nz0 + i;
                out
            })
            .collect();
        chunks.sort_by_key(|s| (s.z, s.x));
        Self {
            center2: self.center2,
            width: nw,
            height: nh,
            chunks,
        }
    }

    /// Mirrors the selection along x (`horizontal`) or z about its centre.
    pub fn mirror(&self, horizontal: bool) -> Self {
        let (x0, z0) = self.origin();
        let mut chunks: Vec<ChunkSnapshot> = self
            .chunks
            .iter()
            .map(|c| {
                let mut out = c.mirrored(horizontal);
                if horizontal {
                    out.x = x0 + (self.width as i32 - 1 - (c.x - x0));
                } else {
                    out.z = z0 + (self.height as i32 - 1 - (c.z - z0));
                }
                out
            })
            .collect();
        chunks.sort_by_key(|s| (s.z, s.x));
        Self {
            chunks,
            ..self.clone()
        }
    }

    /// Moves the selection so its lowest corner lands on `origin`.
    pub fn moved_to(&self, origin: (i32, i32)) -> Self {
        let (x0, z0) = self.origin();
        let (dx, dz) = (origin.0 - x0, origin.1 - z0);
        let mut out = self.clone();
        out.center2 = (self.center2.0 + 2 * dx, self.center2.1 + 2 * dz);
        for c in &mut out.chunks {
            c.x += dx;
            c.z += dz;
        }
        out
    }

    /// Pastes onto the live chunks whose index matches a snapshot, then
    /// rebuilds their normals against each other and `neighbours`. Snapshots
    /// with no live chunk underneath are skipped.
    pub fn apply(&self, chunks: &mut [Chunk], neighbours: &dyn TerrainSampler) -> DirtySet {
        let by_index: HashMap<(u32, u32), usize> = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (c.index(), i))
            .collect();
        let mut d = DirtySet::NONE;
        let mut touched = Vec::new();
        for snap in &self.chunks {
            let (Ok(x), Ok(z)) = (u32::try_from(snap.x), u32::try_from(snap.z)) else {
                continue;
            };
            let Some(&i) = by_index.get(&(x, z)) else {
                continue;
            };
            d |= snap.paste_into(&mut chunks[i]);
            touched.push(i);
        }
        if touched.len() < self.chunks.len() {
            log::debug!(
                "paste skipped {} chunks outside the loaded set",
                self.chunks.len() - touched.len()
            );
        }

        let pasted: Vec<Chunk> = touched.iter().map(|&i| chunks[i].clone()).collect();
        let sampler = Fallback {
            primary: TileSampler::new(&pasted),
            secondary: neighbours,
        };
        for &i in &touched {
            d |= chunks[i].refresh_normals(&sampler);
        }
        d
    }
}
