//! Index buffers for the five terrain levels of detail.
//!
//! Level 0 fans four triangles around each quad's inner vertex. Levels 1..=4
//! only use outer vertices and cover square blocks of 1, 2, 4 and 8 quads
//! with two triangles each. A block is skipped entirely when any quad inside
//! it is holed.

use std::sync::LazyLock;

use crate::holes::HoleMask;
use crate::{inner_index, outer_index};

pub const LOD_LEVELS: usize = 5;
/// Upper bound on each level's index count (a chunk without holes).
pub const LOD_INDEX_CAPS: [usize; LOD_LEVELS] = [768, 384, 96, 24, 6];
/// Height range under which a chunk counts as flat for the single-quad level.
pub const FLAT_LOD_RANGE: f32 = 0.1;

/// Quad-block edge per level.
const BLOCK_SIZE: [usize; LOD_LEVELS] = [1, 1, 2, 4, 8];

struct Block {
    qx: usize,
    qz: usize,
    indices: Vec<u16>,
}

// Hole-free index lists per level, grouped per block. Built once.
static FULL_STRIPS: LazyLock<[Vec<Block>; LOD_LEVELS]> =
    LazyLock::new(|| std::array::from_fn(build_level));

fn build_level(level: usize) -> Vec<Block> {
    let size = BLOCK_SIZE[level];
    let blocks = 8 / size;
    let mut out = Vec::with_capacity(blocks * blocks);
    for bz in 0..blocks {
        for bx in 0..blocks {
            let qx = bx * size;
            let qz = bz * size;
            let tl = outer_index(qz, qx) as u16;
            let tr = outer_index(qz, qx + size) as u16;
            let bl = outer_index(qz + size, qx) as u16;
            let br = outer_index(qz + size, qx + size) as u16;
            let indices = if level == 0 {
                let c = inner_index(qz, qx) as u16;
                vec![c, tl, tr, c, tr, br, c, br, bl, c, bl, tl]
            } else {
                vec![tl, tr, br, tl, br, bl]
            };
            out.push(Block { qx, qz, indices });
        }
    }
    out
}

/// Number of indices `level` produces with `holes` applied.
pub fn indices_count(level: usize, holes: &HoleMask) -> usize {
    let Some(blocks) = FULL_STRIPS.get(level) else {
        return 0;
    };
    let size = BLOCK_SIZE[level];
    blocks
        .iter()
        .filter(|b| !holes.block_has_hole(b.qx, b.qz, size))
        .map(|b| b.indices.len())
        .sum()
}

/// Index buffer for `level`, skipping holed blocks. Empty for unknown levels.
pub fn level_indices(level: usize, holes: &HoleMask) -> Vec<u16> {
    let Some(blocks) = FULL_STRIPS.get(level) else {
        return Vec::new();
    };
    let size = BLOCK_SIZE[level];
    let mut out = Vec::with_capacity(LOD_INDEX_CAPS[level]);
    for b in blocks {
        if !holes.block_has_hole(b.qx, b.qz, size) {
            out.extend_from_slice(&b.indices);
        }
    }
    out
}

/// Generated index buffers. The single-quad level is only present for flat,
/// simply textured chunks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LodIndices {
    levels: Vec<Vec<u16>>,
}

impl LodIndices {
    pub fn generate(holes: &HoleMask, include_flat_level: bool) -> Self {
        let count = if include_flat_level { LOD_LEVELS } else { LOD_LEVELS - 1 };
        Self {
            levels: (0..count).map(|l| level_indices(l, holes)).collect(),
        }
    }

    pub fn level(&self, level: usize) -> Option<&[u16]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn has_flat_level(&self) -> bool {
        self.levels.len() == LOD_LEVELS
    }

    pub fn total_indices(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}
