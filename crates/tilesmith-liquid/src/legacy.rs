//! Single-layer legacy liquid records.
//!
//! Each record carries a full 9x9 vertex grid and an 8x8 array of tile flag
//! bytes. A chunk with several liquid layers stores one record per layer,
//! written in [`LiquidKind::legacy_priority`] order.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    LIQUID_VERTEX_COUNT, LiquidError, LiquidKind, LiquidLayer, LiquidStack, LiquidTypeTable,
    LiquidVertex, SUBCHUNKS, SubchunkMask, VERTS,
};

const HEADER_BYTES: usize = 8;
const VERTEX_BYTES: usize = 12;
/// Size of one record on disk.
pub const LEGACY_RECORD_BYTES: usize =
    8 + LIQUID_VERTEX_COUNT * VERTEX_BYTES + SUBCHUNKS * SUBCHUNKS;
/// Fixed-point scale of the 16-bit texture coordinates.
pub const UV_SCALE: f32 = 256.0;

const KIND_MASK: u8 = 0x07;
const HIDDEN: u8 = 1 << 3;
const RESERVED_MASK: u8 = 0x30;
const FISHABLE: u8 = 1 << 6;
const FATIGUE: u8 = 1 << 7;

/// Per-tile flag byte, unpacked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LegacyTile {
    /// Raw 3-bit liquid type; see [`LiquidKind::from_legacy_bits`].
    pub kind_bits: u8,
    /// Tile carries no liquid.
    pub hidden: bool,
    pub fishable: bool,
    pub fatigue: bool,
    /// Bits 4 and 5, kept as read.
    pub reserved: u8,
}

impl LegacyTile {
    /// Flag byte of an uncovered tile.
    pub const EMPTY: LegacyTile = LegacyTile {
        kind_bits: KIND_MASK,
        hidden: true,
        fishable: false,
        fatigue: false,
        reserved: 0,
    };

    pub fn from_byte(b: u8) -> Self {
        Self {
            kind_bits: b & KIND_MASK,
            hidden: b & HIDDEN != 0,
            fishable: b & FISHABLE != 0,
            fatigue: b & FATIGUE != 0,
            reserved: b & RESERVED_MASK,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut b = (self.kind_bits & KIND_MASK) | (self.reserved & RESERVED_MASK);
        if self.hidden {
            b |= HIDDEN;
        }
        if self.fishable {
            b |= FISHABLE;
        }
        if self.fatigue {
            b |= FATIGUE;
        }
        b
    }

    pub fn kind(self) -> Option<LiquidKind> {
        LiquidKind::from_legacy_bits(self.kind_bits)
    }

    pub fn is_covered(self) -> bool {
        !self.hidden && self.kind().is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LegacyVertex {
    pub height: f32,
    pub u: i16,
    pub v: i16,
    pub depth: u8,
    pub flow: [u8; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegacyLiquid {
    pub min: f32,
    pub max: f32,
    pub vertices: [LegacyVertex; LIQUID_VERTEX_COUNT],
    pub tiles: [LegacyTile; SUBCHUNKS * SUBCHUNKS],
}

fn uv_to_fixed(v: f32) -> i16 {
    (v * UV_SCALE)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

impl LegacyLiquid {
    pub fn from_layer(layer: &LiquidLayer) -> Self {
        let mut vertices = [LegacyVertex::default(); LIQUID_VERTEX_COUNT];
        for (out, v) in vertices.iter_mut().zip(layer.vertices()) {
            *out = LegacyVertex {
                height: v.height,
                u: uv_to_fixed(v.uv.0),
                v: uv_to_fixed(v.uv.1),
                depth: (v.depth * 255.0).round().clamp(0.0, 255.0) as u8,
                flow: [0; 2],
            };
        }
        let mut tiles = [LegacyTile::EMPTY; SUBCHUNKS * SUBCHUNKS];
        for (x, z) in layer.coverage().cells() {
            tiles[z * SUBCHUNKS + x] = LegacyTile {
                kind_bits: layer.kind().legacy_bits(),
                hidden: false,
                fishable: layer.fishable().get(x, z),
                fatigue: layer.fatigue_mask().get(x, z),
                reserved: 0,
            };
        }
        Self {
            min: layer.min(),
            max: layer.max(),
            vertices,
            tiles,
        }
    }

    /// Kind of the first covered tile.
    pub fn kind(&self) -> Option<LiquidKind> {
        self.tiles
            .iter()
            .find(|t| t.is_covered())
            .and_then(|t| t.kind())
    }

    /// Layer view of the record. `None` when no tile is covered.
    pub fn to_layer(&self, types: &LiquidTypeTable) -> Option<LiquidLayer> {
        let kind = self.kind()?;
        let liquid_id = types.id_for(kind).unwrap_or_else(|| kind.default_id());
        let mut coverage = SubchunkMask::NONE;
        let mut fishable = SubchunkMask::NONE;
        let mut fatigue = SubchunkMask::NONE;
        for z in 0..SUBCHUNKS {
            for x in 0..SUBCHUNKS {
                let t = self.tiles[z * SUBCHUNKS + x];
                if t.is_covered() {
                    coverage.set(x, z, true);
                    fishable.set(x, z, t.fishable);
                    fatigue.set(x, z, t.fatigue);
                }
            }
        }
        let mut vertices = [LiquidVertex::default(); LIQUID_VERTEX_COUNT];
        for (out, v) in vertices.iter_mut().zip(&self.vertices) {
            *out = LiquidVertex {
                height: v.height,
                uv: (f32::from(v.u) / UV_SCALE, f32::from(v.v) / UV_SCALE),
                depth: f32::from(v.depth) / 255.0,
            };
        }
        Some(LiquidLayer::from_parts(
            liquid_id, kind, coverage, vertices, fishable, fatigue,
        ))
    }
}

/// One record per non-empty layer, in legacy priority order.
pub fn to_legacy_records(stack: &LiquidStack) -> Vec<LegacyLiquid> {
    let mut layers: Vec<&LiquidLayer> =
        stack.layers().iter().filter(|l| !l.is_empty()).collect();
    layers.sort_by_key(|l| l.kind().legacy_priority());
    layers.into_iter().map(LegacyLiquid::from_layer).collect()
}

pub fn from_legacy_records(records: &[LegacyLiquid], types: &LiquidTypeTable) -> LiquidStack {
    LiquidStack::from_layers(records.iter().filter_map(|r| r.to_layer(types)).collect())
}

pub fn write_legacy(records: &[LegacyLiquid], out: &mut Vec<u8>) -> Result<(), LiquidError> {
    out.write_u32::<LittleEndian>(records.len() as u32)?;
    out.write_u32::<LittleEndian>(0)?;
    for r in records {
        out.write_f32::<LittleEndian>(r.min)?;
        out.write_f32::<LittleEndian>(r.max)?;
        for v in &r.vertices {
            out.write_f32::<LittleEndian>(v.height)?;
            out.write_i16::<LittleEndian>(v.u)?;
            out.write_i16::<LittleEndian>(v.v)?;
            out.write_u8(v.depth)?;
            out.write_u8(v.flow[0])?;
            out.write_u8(v.flow[1])?;
            out.write_u8(0)?;
        }
        for t in &r.tiles {
            out.write_u8(t.to_byte())?;
        }
    }
    Ok(())
}

pub fn read_legacy(bytes: &[u8]) -> Result<Vec<LegacyLiquid>, LiquidError> {
    let mut rd = Cursor::new(bytes);
    let count = rd.read_u32::<LittleEndian>()? as usize;
    let _reserved = rd.read_u32::<LittleEndian>()?;
    let needed = HEADER_BYTES + count * LEGACY_RECORD_BYTES;
    if bytes.len() < needed {
        return Err(LiquidError::Truncated {
            needed,
            got: bytes.len(),
        });
    }
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let min = rd.read_f32::<LittleEndian>()?;
        let max = rd.read_f32::<LittleEndian>()?;
        let mut vertices = [LegacyVertex::default(); LIQUID_VERTEX_COUNT];
        for v in vertices.iter_mut() {
            v.height = rd.read_f32::<LittleEndian>()?;
            v.u = rd.read_i16::<LittleEndian>()?;
            v.v = rd.read_i16::<LittleEndian>()?;
            v.depth = rd.read_u8()?;
            v.flow = [rd.read_u8()?, rd.read_u8()?];
            let _pad = rd.read_u8()?;
        }
        let mut tiles = [LegacyTile::EMPTY; SUBCHUNKS * SUBCHUNKS];
        for t in tiles.iter_mut() {
            *t = LegacyTile::from_byte(rd.read_u8()?);
        }
        records.push(LegacyLiquid {
            min,
            max,
            vertices,
            tiles,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(id: u16, kind: LiquidKind, h: f32) -> LiquidLayer {
        let mut l = LiquidLayer::new(id, kind, h);
        l.set_covered(2, 2, true);
        l.set_covered(3, 2, true);
        l
    }

    #[test]
    fn record_size_matches_layout() {
        assert_eq!(LEGACY_RECORD_BYTES, 1044);
        let mut out = Vec::new();
        let r = LegacyLiquid::from_layer(&layer(1, LiquidKind::River, 2.0));
        write_legacy(&[r.clone(), r], &mut out).unwrap();
        assert_eq!(out.len(), 8 + 2 * 1044);
    }

    #[test]
    fn tile_bits() {
        let t = LegacyTile {
            kind_bits: 2,
            hidden: false,
            fishable: true,
            fatigue: true,
            reserved: 0x10,
        };
        assert_eq!(t.to_byte(), 0x02 | 0x10 | 0x40 | 0x80);
        assert_eq!(LegacyTile::from_byte(t.to_byte()), t);
        assert_eq!(LegacyTile::EMPTY.to_byte(), 0x0F);
        assert!(!LegacyTile::EMPTY.is_covered());
    }

    #[test]
    fn records_are_sorted_by_priority() {
        let stack = LiquidStack::from_layers(vec![
            layer(3, LiquidKind::Magma, 1.0),
            layer(4, LiquidKind::Slime, 1.0),
            layer(1, LiquidKind::River, 1.0),
            layer(2, LiquidKind::Ocean, 1.0),
        ]);
        let kinds: Vec<_> = to_legacy_records(&stack)
            .iter()
            .map(|r| r.kind().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![LiquidKind::River, LiquidKind::Ocean, LiquidKind::Slime, LiquidKind::Magma]
        );
    }

    #[test]
    fn bytes_round_trip_to_layers() {
        let stack = LiquidStack::from_layers(vec![
            layer(2, LiquidKind::Ocean, 5.5),
            layer(3, LiquidKind::Magma, -2.0),
        ]);
        let mut out = Vec::new();
        write_legacy(&to_legacy_records(&stack), &mut out).unwrap();
        let back = from_legacy_records(&read_legacy(&out).unwrap(), &LiquidTypeTable::default());
        assert_eq!(back.len(), 2);
        let ocean = back.layer(back.find(2).unwrap()).unwrap();
        assert_eq!(ocean.kind(), LiquidKind::Ocean);
        assert_eq!(ocean.coverage(), stack.layer(0).unwrap().coverage());
        assert_eq!(ocean.max(), 5.5);
        assert_eq!(LegacyLiquid::from_layer(ocean).vertices[2 * VERTS + 2].height, 5.5);
        let magma = back.layer(back.find(3).unwrap()).unwrap();
        assert_eq!(magma.vertex(4, 1).unwrap().uv, (4.0, 1.0));
    }

    #[test]
    fn short_block_is_an_error() {
        let mut bytes = vec![1, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0; 100]);
        assert!(matches!(
            read_legacy(&bytes),
            Err(LiquidError::Truncated { needed: 1052, .. })
        ));
    }
}
