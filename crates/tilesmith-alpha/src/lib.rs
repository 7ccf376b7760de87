//! 64x64 alphamaps and their on-disk encodings.
#![forbid(unsafe_code)]

mod codec;
pub mod convert;

use std::fmt;

pub use codec::AlphaError;
pub use convert::{big_to_old, old_to_big};

/// Texels per alphamap edge.
pub const ALPHA_SIZE: usize = 64;
/// Texels per alphamap.
pub const ALPHA_TEXELS: usize = ALPHA_SIZE * ALPHA_SIZE;
/// Size of an uncompressed 4-bit ("old") alphamap.
pub const OLD_ALPHA_BYTES: usize = ALPHA_TEXELS / 2;
/// Longest run a single compressed entry can describe.
pub const MAX_RUN: usize = 0x7F;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlphaFormat {
    /// Packed 4-bit nibbles, two texels per byte.
    Old,
    /// One byte per texel.
    Big,
    /// Run-length "copy/fill" stream of 8-bit texels.
    Compressed,
}

/// Opacity grid for one non-base texture layer, row-major (`z * 64 + x`).
#[derive(Clone, PartialEq, Eq)]
pub struct Alphamap {
    values: Box<[u8; ALPHA_TEXELS]>,
}

impl Alphamap {
    pub fn new() -> Self {
        Self::filled(0)
    }

    pub fn filled(value: u8) -> Self {
        Self {
            values: Box::new([value; ALPHA_TEXELS]),
        }
    }

    pub fn from_values(values: &[u8; ALPHA_TEXELS]) -> Self {
        Self {
            values: Box::new(*values),
        }
    }

    #[inline]
    pub fn idx(x: usize, z: usize) -> usize {
        z * ALPHA_SIZE + x
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> u8 {
        self.values[Self::idx(x, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: u8) {
        self.values[Self::idx(x, z)] = value;
    }

    #[inline]
    pub fn values(&self) -> &[u8; ALPHA_TEXELS] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [u8; ALPHA_TEXELS] {
        &mut self.values
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    pub fn max_value(&self) -> u8 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    /// New grid whose texel `(x, z)` is read from `self` at `source(x, z)`.
    pub fn remap(&self, source: impl Fn(usize, usize) -> (usize, usize)) -> Self {
        let mut out = Self::new();
        for z in 0..ALPHA_SIZE {
            for x in 0..ALPHA_SIZE {
                let (sx, sz) = source(x, z);
                out.values[Self::idx(x, z)] = self.get(sx, sz);
            }
        }
        out
    }

    /// Decodes one alphamap from the front of `bytes`, returning it with the
    /// number of bytes consumed. `fix_edges` only applies to [`AlphaFormat::Old`].
    pub fn decode(
        bytes: &[u8],
        format: AlphaFormat,
        fix_edges: bool,
    ) -> Result<(Self, usize), AlphaError> {
        match format {
            AlphaFormat::Old => codec::decode_old(bytes, fix_edges),
            AlphaFormat::Big => codec::decode_big(bytes),
            AlphaFormat::Compressed => Ok(codec::decompress(bytes)),
        }
    }

    pub fn encode(&self, format: AlphaFormat) -> Vec<u8> {
        match format {
            AlphaFormat::Old => codec::encode_old(self),
            AlphaFormat::Big => self.values.to_vec(),
            AlphaFormat::Compressed => codec::compress(self),
        }
    }

    /// Run-length compressed form of the grid.
    pub fn compress(&self) -> Vec<u8> {
        codec::compress(self)
    }
}

impl Default for Alphamap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Alphamap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nonzero = self.values.iter().filter(|&&v| v != 0).count();
        f.debug_struct("Alphamap")
            .field("nonzero", &nonzero)
            .field("max", &self.max_value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_transposes() {
        let mut a = Alphamap::new();
        a.set(5, 9, 200);
        let t = a.remap(|x, z| (z, x));
        assert_eq!(t.get(9, 5), 200);
        assert_eq!(t.get(5, 9), 0);
    }

    #[test]
    fn decode_dispatches_by_format() {
        let a = Alphamap::filled(0x44);
        let (big, used) = Alphamap::decode(&a.encode(AlphaFormat::Big), AlphaFormat::Big, false)
            .unwrap();
        assert_eq!((big, used), (a.clone(), ALPHA_TEXELS));
        let (old, used) = Alphamap::decode(&a.encode(AlphaFormat::Old), AlphaFormat::Old, true)
            .unwrap();
        assert_eq!((old, used), (a, OLD_ALPHA_BYTES));
    }
}
