//! Terrain chunk editing core: height fields, alphamaps, texture and liquid
//! layers, region transforms and tile loading.
#![forbid(unsafe_code)]

pub mod config;

pub use config::{ConfigError, EditorConfig};
pub use tilesmith_alpha as alpha;
pub use tilesmith_chunk as chunk;
pub use tilesmith_geom as geom;
pub use tilesmith_liquid as liquid;
pub use tilesmith_mesh as mesh;
pub use tilesmith_region as region;
pub use tilesmith_runtime as runtime;
pub use tilesmith_texture as texture;

pub use tilesmith_chunk::{Chunk, ChunkError, DirtySet, read_tile, write_tile};
pub use tilesmith_region::{ChunkSnapshot, RegionSnapshot};
pub use tilesmith_runtime::{LoadedTile, TileLoader};
