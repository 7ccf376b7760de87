const HAS_SHADOW: u32 = 1 << 0;
const IMPASSABLE: u32 = 1 << 1;
const HAS_VERTEX_COLORS: u32 = 1 << 2;
const DO_NOT_FIX_ALPHA: u32 = 1 << 3;
const BIG_ALPHA: u32 = 1 << 4;
const KNOWN: u32 = HAS_SHADOW | IMPASSABLE | HAS_VERTEX_COLORS | DO_NOT_FIX_ALPHA | BIG_ALPHA;

/// Chunk header flag word, unpacked. Unnamed bits ride along in `other`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkFlags {
    pub has_shadow: bool,
    pub impassable: bool,
    pub has_vertex_colors: bool,
    /// Old-format alphamaps are loaded without the edge fix-up.
    pub do_not_fix_alpha: bool,
    pub big_alpha: bool,
    pub other: u32,
}

impl ChunkFlags {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            has_shadow: bits & HAS_SHADOW != 0,
            impassable: bits & IMPASSABLE != 0,
            has_vertex_colors: bits & HAS_VERTEX_COLORS != 0,
            do_not_fix_alpha: bits & DO_NOT_FIX_ALPHA != 0,
            big_alpha: bits & BIG_ALPHA != 0,
            other: bits & !KNOWN,
        }
    }

    pub fn to_bits(&self) -> u32 {
        [
            (self.has_shadow, HAS_SHADOW),
            (self.impassable, IMPASSABLE),
            (self.has_vertex_colors, HAS_VERTEX_COLORS),
            (self.do_not_fix_alpha, DO_NOT_FIX_ALPHA),
            (self.big_alpha, BIG_ALPHA),
        ]
        .into_iter()
        .filter(|&(on, _)| on)
        .fold(self.other & !KNOWN, |bits, (_, bit)| bits | bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_keep_unknown_flags() {
        let f = ChunkFlags::from_bits(0x8000_0012);
        assert!(f.impassable);
        assert!(f.big_alpha);
        assert!(!f.has_shadow);
        assert_eq!(f.other, 0x8000_0000);
        assert_eq!(f.to_bits(), 0x8000_0012);
    }
}
