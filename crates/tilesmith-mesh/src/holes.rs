/// Cells per hole-mask edge. Each cell covers 2x2 quads of the 8x8 quad grid.
pub const HOLE_GRID: usize = 4;

/// 4x4 grid of disabled terrain cells. Packs to the on-disk `u16` layout,
/// bit `z * 4 + x`, only through [`HoleMask::to_bits`]/[`HoleMask::from_bits`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HoleMask {
    cells: [[bool; HOLE_GRID]; HOLE_GRID],
}

impl HoleMask {
    pub const NONE: HoleMask = HoleMask {
        cells: [[false; HOLE_GRID]; HOLE_GRID],
    };
    pub const ALL: HoleMask = HoleMask {
        cells: [[true; HOLE_GRID]; HOLE_GRID],
    };

    /// `None` outside the 4x4 grid.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> Option<bool> {
        self.cells.get(z).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn is_hole(&self, x: usize, z: usize) -> bool {
        self.get(x, z).unwrap_or(false)
    }

    /// Returns whether the mask changed. Out-of-range cells are ignored.
    pub fn set(&mut self, x: usize, z: usize, hole: bool) -> bool {
        match self.cells.get_mut(z).and_then(|row| row.get_mut(x)) {
            Some(cell) if *cell != hole => {
                *cell = hole;
                true
            }
            _ => false,
        }
    }

    /// Whether quad `(qx, qz)` of the 8x8 quad grid lies in a hole.
    #[inline]
    pub fn quad_is_hole(&self, qx: usize, qz: usize) -> bool {
        self.is_hole(qx / 2, qz / 2)
    }

    /// Whether any quad in the `size`x`size` block starting at `(qx, qz)` is holed.
    pub fn block_has_hole(&self, qx: usize, qz: usize, size: usize) -> bool {
        let x0 = qx / 2;
        let z0 = qz / 2;
        let x1 = (qx + size).div_ceil(2).min(HOLE_GRID);
        let z1 = (qz + size).div_ceil(2).min(HOLE_GRID);
        (z0..z1).any(|z| (x0..x1).any(|x| self.cells[z][x]))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    pub fn is_full(&self) -> bool {
        *self == Self::ALL
    }

    pub fn count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c).count()
    }

    pub fn to_bits(&self) -> u16 {
        let mut bits = 0u16;
        for z in 0..HOLE_GRID {
            for x in 0..HOLE_GRID {
                if self.cells[z][x] {
                    bits |= 1 << (z * HOLE_GRID + x);
                }
            }
        }
        bits
    }

    pub fn from_bits(bits: u16) -> Self {
        let mut mask = Self::NONE;
        for z in 0..HOLE_GRID {
            for x in 0..HOLE_GRID {
                mask.cells[z][x] = bits & (1 << (z * HOLE_GRID + x)) != 0;
            }
        }
        mask
    }

    /// Builds a new mask where cell `(x, z)` takes the value of `f(x, z)`'s cell.
    pub fn remap(&self, f: impl Fn(usize, usize) -> (usize, usize)) -> Self {
        let mut out = Self::NONE;
        for z in 0..HOLE_GRID {
            for x in 0..HOLE_GRID {
                let (sx, sz) = f(x, z);
                out.cells[z][x] = self.cells[sz][sx];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_layout_is_row_major() {
        let mut m = HoleMask::NONE;
        m.set(1, 2, true);
        assert_eq!(m.to_bits(), 1 << 9);
        assert_eq!(HoleMask::from_bits(1 << 9), m);
        assert_eq!(HoleMask::ALL.to_bits(), 0xFFFF);
    }

    #[test]
    fn quads_map_to_cells() {
        let mut m = HoleMask::NONE;
        m.set(3, 0, true);
        assert!(m.quad_is_hole(6, 0));
        assert!(m.quad_is_hole(7, 1));
        assert!(!m.quad_is_hole(5, 0));
        assert!(m.block_has_hole(4, 0, 4));
        assert!(!m.block_has_hole(0, 0, 4));
        assert!(m.block_has_hole(0, 0, 8));
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut m = HoleMask::NONE;
        assert!(!m.set(4, 0, true));
        assert_eq!(m.get(0, 4), None);
        assert!(m.is_empty());
    }
}
