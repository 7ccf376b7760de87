use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Rendering family of a liquid type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidKind {
    #[default]
    River,
    Ocean,
    Magma,
    Slime,
}

impl LiquidKind {
    /// Type bits used by the legacy per-tile flags.
    pub fn legacy_bits(self) -> u8 {
        match self {
            LiquidKind::River => 0,
            LiquidKind::Ocean => 1,
            LiquidKind::Magma => 2,
            LiquidKind::Slime => 3,
        }
    }

    pub fn from_legacy_bits(bits: u8) -> Option<Self> {
        match bits & 0x7 {
            0 => Some(LiquidKind::River),
            1 => Some(LiquidKind::Ocean),
            2 => Some(LiquidKind::Magma),
            3 => Some(LiquidKind::Slime),
            _ => None,
        }
    }

    /// Id this kind has in the built-in type table.
    pub fn default_id(self) -> u16 {
        u16::from(self.legacy_bits()) + 1
    }

    /// Order legacy records must be written in. Readers of the legacy block
    /// fail to draw some kinds when they come out of this order.
    pub fn legacy_priority(self) -> u8 {
        match self {
            LiquidKind::River => 0,
            LiquidKind::Ocean => 1,
            LiquidKind::Slime => 2,
            LiquidKind::Magma => 3,
        }
    }

    /// Whether vertices carry texture coordinates instead of depth.
    pub fn uses_uv(self) -> bool {
        matches!(self, LiquidKind::Magma | LiquidKind::Slime)
    }
}

/// Maps liquid type ids to their kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiquidTypeTable {
    kinds: HashMap<u16, LiquidKind>,
}

impl LiquidTypeTable {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: u16, kind: LiquidKind) {
        self.kinds.insert(id, kind);
    }

    pub fn kind_of(&self, id: u16) -> Option<LiquidKind> {
        self.kinds.get(&id).copied()
    }

    /// Kind of `id`, treating unknown ids as river.
    pub fn resolve(&self, id: u16) -> LiquidKind {
        self.kind_of(id).unwrap_or_else(|| {
            log::debug!("unknown liquid type {id}, treating as river");
            LiquidKind::River
        })
    }

    /// Lowest id registered for `kind`.
    pub fn id_for(&self, kind: LiquidKind) -> Option<u16> {
        self.kinds
            .iter()
            .filter(|&(_, k)| *k == kind)
            .map(|(&id, _)| id)
            .min()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for LiquidTypeTable {
    fn default() -> Self {
        let mut t = Self::empty();
        t.insert(1, LiquidKind::River);
        t.insert(2, LiquidKind::Ocean);
        t.insert(3, LiquidKind::Magma);
        t.insert(4, LiquidKind::Slime);
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_fallback() {
        let t = LiquidTypeTable::default();
        assert_eq!(t.kind_of(2), Some(LiquidKind::Ocean));
        assert_eq!(t.kind_of(99), None);
        assert_eq!(t.resolve(99), LiquidKind::River);
        assert_eq!(t.id_for(LiquidKind::Slime), Some(4));
    }

    #[test]
    fn lowest_id_wins() {
        let mut t = LiquidTypeTable::default();
        t.insert(14, LiquidKind::Ocean);
        t.insert(0, LiquidKind::Magma);
        assert_eq!(t.id_for(LiquidKind::Ocean), Some(2));
        assert_eq!(t.id_for(LiquidKind::Magma), Some(0));
        assert_eq!(LiquidTypeTable::empty().id_for(LiquidKind::River), None);
    }

    #[test]
    fn legacy_bits_round_trip() {
        for k in [LiquidKind::River, LiquidKind::Ocean, LiquidKind::Magma, LiquidKind::Slime] {
            assert_eq!(LiquidKind::from_legacy_bits(k.legacy_bits()), Some(k));
        }
        assert_eq!(LiquidKind::from_legacy_bits(6), None);
        assert!(LiquidKind::Ocean.legacy_priority() < LiquidKind::Slime.legacy_priority());
        assert!(LiquidKind::Slime.legacy_priority() < LiquidKind::Magma.legacy_priority());
    }
}
