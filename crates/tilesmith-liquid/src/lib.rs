//! Liquid layers of a terrain chunk.
//!
//! A chunk carries a stack of [`LiquidLayer`]s, each an 8x8 grid of
//! subchunks over a 9x9 vertex lattice. Layers are painted with a
//! [`LiquidBrush`], cropped against the terrain, and stored either as
//! per-layer legacy records ([`legacy`]) or in the packed modern block
//! ([`modern`]).
#![forbid(unsafe_code)]

mod kind;
mod layer;
pub mod legacy;
mod mask;
pub mod modern;
mod stack;

pub use kind::{LiquidKind, LiquidTypeTable};
pub use layer::{LiquidBrush, LiquidLayer, LiquidVertex};
pub use mask::SubchunkMask;
pub use modern::VertexFormat;
pub use stack::LiquidStack;

/// Subchunks per side.
pub const SUBCHUNKS: usize = 8;
/// Vertices per side.
pub const VERTS: usize = SUBCHUNKS + 1;
pub const LIQUID_VERTEX_COUNT: usize = VERTS * VERTS;

#[derive(Debug, thiserror::Error)]
pub enum LiquidError {
    #[error("liquid block truncated: need {needed} bytes, have {got}")]
    Truncated { needed: usize, got: usize },
    #[error("unknown liquid vertex format {0}")]
    BadVertexFormat(u16),
    #[error("liquid bounds {x}+{width} x {z}+{height} exceed the chunk")]
    BadBounds {
        x: u8,
        z: u8,
        width: u8,
        height: u8,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
