use crate::SUBCHUNKS;

/// One bit per liquid subchunk, bit `z * 8 + x`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SubchunkMask(pub u64);

impl SubchunkMask {
    pub const NONE: SubchunkMask = SubchunkMask(0);
    pub const ALL: SubchunkMask = SubchunkMask(u64::MAX);

    #[inline]
    pub fn get(self, x: usize, z: usize) -> bool {
        x < SUBCHUNKS && z < SUBCHUNKS && self.0 & (1 << (z * SUBCHUNKS + x)) != 0
    }

    /// Returns whether the bit changed. Out-of-range cells are ignored.
    pub fn set(&mut self, x: usize, z: usize, on: bool) -> bool {
        if x >= SUBCHUNKS || z >= SUBCHUNKS {
            return false;
        }
        let bit = 1u64 << (z * SUBCHUNKS + x);
        let before = self.0;
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
        before != self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Covered cells as `(x, z)`.
    pub fn cells(self) -> impl Iterator<Item = (usize, usize)> {
        (0..SUBCHUNKS * SUBCHUNKS)
            .filter(move |i| self.0 & (1 << i) != 0)
            .map(|i| (i % SUBCHUNKS, i / SUBCHUNKS))
    }

    /// New mask whose cell `(x, z)` is read from `source(x, z)`.
    pub fn remap(self, source: impl Fn(usize, usize) -> (usize, usize)) -> Self {
        let mut out = Self::NONE;
        for z in 0..SUBCHUNKS {
            for x in 0..SUBCHUNKS {
                let (sx, sz) = source(x, z);
                out.set(x, z, self.get(sx, sz));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_and_cells() {
        let mut m = SubchunkMask::NONE;
        assert!(m.set(3, 5, true));
        assert!(!m.set(3, 5, true));
        assert!(m.get(3, 5));
        assert!(!m.get(5, 3));
        assert!(!m.set(8, 0, true));
        assert_eq!(m.0, 1 << 43);
        assert_eq!(m.cells().collect::<Vec<_>>(), vec![(3, 5)]);
    }
}
