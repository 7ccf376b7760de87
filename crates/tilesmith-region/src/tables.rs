//! Vertex index remaps for the interleaved 9x9 + 8x8 grid.
//!
//! Each table maps a destination vertex index to the source index it reads
//! from. They are built once on first use.

use std::sync::LazyLock;

use tilesmith_mesh::{VERTEX_COUNT, inner_index, outer_index, vertex_grid_pos};

/// Quads per chunk edge.
const EXTENT: f32 = 8.0;

type Table = [usize; VERTEX_COUNT];

/// Index of the vertex at quad-unit position `(x, z)`. Inner vertices sit
/// on half units.
fn index_at(x: f32, z: f32) -> usize {
    if x.fract() == 0.0 {
        outer_index(z as usize, x as usize)
    } else {
        inner_index(z.floor() as usize, x.floor() as usize)
    }
}

fn build(source: impl Fn(f32, f32) -> (f32, f32)) -> Table {
    let mut table = [0; VERTEX_COUNT];
    for (i, slot) in table.iter_mut().enumerate() {
        let (x, z) = vertex_grid_pos(i);
        let (sx, sz) = source(x, z);
        *slot = index_at(sx, sz);
    }
    table
}

static ROTATE: LazyLock<Table> = LazyLock::new(|| build(|x, z| (z, EXTENT - x)));
static MIRROR_X: LazyLock<Table> = LazyLock::new(|| build(|x, z| (EXTENT - x, z)));
static MIRROR_Z: LazyLock<Table> = LazyLock::new(|| build(|x, z| (x, EXTENT - z)));

/// Quarter turn: vertex `(x, z)` moves to `(8 - z, x)`.
pub fn rotate() -> &'static Table {
    &ROTATE
}

pub fn mirror(horizontal: bool) -> &'static Table {
    if horizontal { &MIRROR_X } else { &MIRROR_Z }
}

pub fn apply<T: Copy>(table: &Table, values: &[T; VERTEX_COUNT]) -> [T; VERTEX_COUNT] {
    std::array::from_fn(|i| values[table[i]])
}
