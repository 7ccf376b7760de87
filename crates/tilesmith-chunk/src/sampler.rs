use hashbrown::HashMap;
use tilesmith_geom::CHUNK_SIZE;
use tilesmith_mesh::TerrainSampler;

use crate::Chunk;

/// Height lookups across a set of loaded chunks, keyed by chunk index.
pub struct TileSampler<'a> {
    chunks: HashMap<(u32, u32), &'a Chunk>,
}

impl<'a> TileSampler<'a> {
    pub fn new(chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        Self {
            chunks: chunks.into_iter().map(|c| (c.index(), c)).collect(),
        }
    }

    /// Same set without the chunk at `index`, for editing that chunk while
    /// sampling its neighbours.
    pub fn without(&self, index: (u32, u32)) -> Self {
        Self {
            chunks: self
                .chunks
                .iter()
                .filter(|&(k, _)| *k != index)
                .map(|(&k, &c)| (k, c))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl TerrainSampler for TileSampler<'_> {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        if x < 0.0 || z < 0.0 {
            return None;
        }
        let ix = (x / CHUNK_SIZE).floor() as u32;
        let iz = (z / CHUNK_SIZE).floor() as u32;
        // Points on a shared edge belong to both chunks; try the lower one
        // when the chunk at the floor index is missing.
        [(ix, iz), (ix.wrapping_sub(1), iz), (ix, iz.wrapping_sub(1))]
            .into_iter()
            .filter_map(|k| self.chunks.get(&k))
            .find_map(|c| c.height_at(x, z))
    }
}
