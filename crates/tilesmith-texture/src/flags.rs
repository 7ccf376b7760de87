use serde::{Deserialize, Serialize};

const ROTATION_MASK: u32 = 0x7;
const SPEED_SHIFT: u32 = 3;
const SPEED_MASK: u32 = 0x7 << SPEED_SHIFT;
const ANIMATED: u32 = 1 << 6;
const GLOW: u32 = 1 << 7;
const USE_ALPHA: u32 = 1 << 8;
const COMPRESSED: u32 = 1 << 9;
const CUBEMAP: u32 = 1 << 10;
const KNOWN: u32 = ROTATION_MASK | SPEED_MASK | ANIMATED | GLOW | USE_ALPHA | COMPRESSED | CUBEMAP;

/// Animation steps in a full turn.
pub const ROTATION_STEPS: u8 = 8;

/// Per-layer flag word, unpacked.
///
/// `rotation` is the animation flow direction in 45 degree steps and
/// `speed` its 3-bit rate. Bits this type does not name are kept in
/// `other` so they survive a read/write cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerFlags {
    pub rotation: u8,
    pub speed: u8,
    pub animated: bool,
    pub glow: bool,
    pub use_alpha: bool,
    pub compressed: bool,
    pub cubemap: bool,
    pub other: u32,
}

impl LayerFlags {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            rotation: (bits & ROTATION_MASK) as u8,
            speed: ((bits & SPEED_MASK) >> SPEED_SHIFT) as u8,
            animated: bits & ANIMATED != 0,
            glow: bits & GLOW != 0,
            use_alpha: bits & USE_ALPHA != 0,
            compressed: bits & COMPRESSED != 0,
            cubemap: bits & CUBEMAP != 0,
            other: bits & !KNOWN,
        }
    }

    pub fn to_bits(&self) -> u32 {
        let mut bits = self.other & !KNOWN;
        bits |= u32::from(self.rotation) & ROTATION_MASK;
        bits |= (u32::from(self.speed) << SPEED_SHIFT) & SPEED_MASK;
        for (on, bit) in [
            (self.animated, ANIMATED),
            (self.glow, GLOW),
            (self.use_alpha, USE_ALPHA),
            (self.compressed, COMPRESSED),
            (self.cubemap, CUBEMAP),
        ] {
            if on {
                bits |= bit;
            }
        }
        bits
    }

    /// Flow direction after the layer's terrain is turned a quarter.
    pub fn rotated_90(self) -> Self {
        Self {
            rotation: (self.rotation + 2) % ROTATION_STEPS,
            ..self
        }
    }

    /// Flow direction after mirroring across x (`horizontal`) or z.
    pub fn mirrored(self, horizontal: bool) -> Self {
        let r = self.rotation % ROTATION_STEPS;
        let rotation = if horizontal {
            (ROTATION_STEPS + 4 - r) % ROTATION_STEPS
        } else {
            (ROTATION_STEPS - r) % ROTATION_STEPS
        };
        Self { rotation, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_bits_land_where_expected() {
        let f = LayerFlags {
            rotation: 5,
            speed: 3,
            animated: true,
            glow: true,
            use_alpha: true,
            compressed: false,
            cubemap: true,
            other: 0,
        };
        assert_eq!(f.to_bits(), 5 | 3 << 3 | 1 << 6 | 1 << 7 | 1 << 8 | 1 << 10);
        assert_eq!(LayerFlags::from_bits(f.to_bits()), f);
    }

    #[test]
    fn unknown_bits_survive() {
        let bits = 0x8000_1000 | USE_ALPHA;
        let f = LayerFlags::from_bits(bits);
        assert!(f.use_alpha);
        assert_eq!(f.to_bits(), bits);
    }

    #[test]
    fn four_quarter_turns_restore_direction() {
        let mut f = LayerFlags::from_bits(3 | ANIMATED);
        for _ in 0..4 {
            f = f.rotated_90();
        }
        assert_eq!(f.rotation, 3);
        assert_eq!(LayerFlags::from_bits(7).rotated_90().rotation, 1);
    }

    #[test]
    fn mirrors_are_involutions() {
        for r in 0..8 {
            let f = LayerFlags::from_bits(r);
            assert_eq!(f.mirrored(true).mirrored(true), f);
            assert_eq!(f.mirrored(false).mirrored(false), f);
        }
        assert_eq!(LayerFlags::from_bits(1).mirrored(true).rotation, 3);
        assert_eq!(LayerFlags::from_bits(2).mirrored(false).rotation, 6);
    }
}
