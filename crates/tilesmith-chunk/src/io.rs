//! `MCNK` chunk records.
//!
//! A record is a 32-byte header followed by tagged sub-records. Heights are
//! stored relative to the header's base height, normals as signed bytes in
//! `(x, z, y)` order, vertex colors as BGRA. Alphamaps of the non-base
//! layers are concatenated in `MCAL`, each in the encoding its layer flags
//! and the chunk's `big_alpha` flag select.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilesmith_alpha::{ALPHA_SIZE, AlphaError, AlphaFormat, Alphamap, big_to_old, old_to_big};
use tilesmith_geom::Vec3;
use tilesmith_liquid::{LiquidError, LiquidStack, LiquidTypeTable, legacy, modern};
use tilesmith_mesh::{HeightField, HoleMask, VERTEX_COUNT};
use tilesmith_texture::{LayerFlags, MAX_LAYERS, TextureId, TextureStack};

use crate::{Chunk, ChunkFlags, ChunkParts, MAX_COLOR, ShadowMap, VertexColors};

pub type Tag = [u8; 4];

pub const MCNK: Tag = *b"MCNK";
pub const MCVT: Tag = *b"MCVT";
pub const MCNR: Tag = *b"MCNR";
pub const MCCV: Tag = *b"MCCV";
pub const MCLY: Tag = *b"MCLY";
pub const MCAL: Tag = *b"MCAL";
pub const MCSH: Tag = *b"MCSH";
pub const MCLQ: Tag = *b"MCLQ";
pub const MLIQ: Tag = *b"MLIQ";

pub const HEADER_BYTES: usize = 32;
const FRAME_BYTES: usize = 8;
const LAYER_RECORD_BYTES: usize = 16;
const SHADOW_BYTES: usize = ALPHA_SIZE * 8;
const NORMAL_SCALE: f32 = 127.0;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("expected {} record, found {}", expected.escape_ascii(), found.escape_ascii())]
    UnexpectedTag { expected: Tag, found: Tag },
    #[error("{} record is {got} bytes, expected {expected}", tag.escape_ascii())]
    SizeMismatch { tag: Tag, expected: usize, got: usize },
    #[error("record truncated: need {needed} bytes, have {got}")]
    Truncated { needed: usize, got: usize },
    #[error("texture layer {index}: {reason}")]
    Layer { index: usize, reason: &'static str },
    #[error("unknown liquid format {0}")]
    LiquidFormat(u32),
    #[error("alphamap: {0}")]
    Alpha(#[from] AlphaError),
    #[error("liquid: {0}")]
    Liquid(#[from] LiquidError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How liquids are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidFormat {
    Legacy,
    #[default]
    Modern,
}

impl LiquidFormat {
    fn header_value(self) -> u32 {
        match self {
            LiquidFormat::Legacy => 1,
            LiquidFormat::Modern => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// 8-bit alphamaps; 4-bit otherwise.
    pub big_alpha: bool,
    /// Run-length compress 8-bit alphamaps.
    pub compress: bool,
    pub liquid_format: LiquidFormat,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            big_alpha: true,
            compress: true,
            liquid_format: LiquidFormat::Modern,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Apply the old-alpha edge fix unless the chunk opts out.
    pub fix_edges: bool,
    pub liquid_types: LiquidTypeTable,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            fix_edges: true,
            liquid_types: LiquidTypeTable::default(),
        }
    }
}

fn write_frame(out: &mut Vec<u8>, tag: Tag, payload: &[u8]) -> Result<(), ChunkError> {
    out.extend_from_slice(&tag);
    out.write_u32::<LittleEndian>(payload.len() as u32)?;
    out.extend_from_slice(payload);
    Ok(())
}

fn to_normal_byte(v: f32) -> i8 {
    (v * NORMAL_SCALE).round().clamp(-NORMAL_SCALE, NORMAL_SCALE) as i8
}

fn to_color_byte(v: f32) -> u8 {
    (v / MAX_COLOR * 255.0).round().clamp(0.0, 255.0) as u8
}

fn from_color_byte(b: u8) -> f32 {
    f32::from(b) / 255.0 * MAX_COLOR
}

/// Appends one framed `MCNK` record for `chunk`.
pub fn write_chunk(chunk: &Chunk, opts: &WriteOptions, out: &mut Vec<u8>) -> Result<(), ChunkError> {
    let mesh = chunk.mesh();
    let base = mesh.min_height();
    let textures = chunk.textures();

    let mut flags = chunk.flags();
    flags.big_alpha = opts.big_alpha;
    flags.has_shadow = chunk.shadows().is_some();
    flags.has_vertex_colors = chunk.vertex_colors().is_some();
    let liquid_format = if chunk.liquids().is_empty() {
        0
    } else {
        opts.liquid_format.header_value()
    };

    let mut body = Vec::with_capacity(4096);
    body.write_u32::<LittleEndian>(flags.to_bits())?;
    let (ix, iz) = chunk.index();
    body.write_u32::<LittleEndian>(ix)?;
    body.write_u32::<LittleEndian>(iz)?;
    body.write_u32::<LittleEndian>(textures.len() as u32)?;
    body.write_u32::<LittleEndian>(chunk.area_id())?;
    body.write_u16::<LittleEndian>(mesh.holes().to_bits())?;
    body.write_u16::<LittleEndian>(0)?;
    body.write_f32::<LittleEndian>(base)?;
    body.write_u32::<LittleEndian>(liquid_format)?;

    let mut sub = Vec::with_capacity(VERTEX_COUNT * 4);
    for &h in mesh.heights() {
        sub.write_f32::<LittleEndian>(h - base)?;
    }
    write_frame(&mut body, MCVT, &sub)?;

    sub.clear();
    for n in mesh.normals() {
        sub.write_i8(to_normal_byte(n.x))?;
        sub.write_i8(to_normal_byte(n.z))?;
        sub.write_i8(to_normal_byte(n.y))?;
    }
    write_frame(&mut body, MCNR, &sub)?;

    if let Some(colors) = chunk.vertex_colors() {
        sub.clear();
        for c in colors.colors() {
            sub.extend_from_slice(&[
                to_color_byte(c.z),
                to_color_byte(c.y),
                to_color_byte(c.x),
                255,
            ]);
        }
        write_frame(&mut body, MCCV, &sub)?;
    }

    let mut alphas: Vec<Alphamap> = textures
        .layers()
        .iter()
        .skip(1)
        .map(|l| l.alpha().cloned().unwrap_or_default())
        .collect();
    let format = match (opts.big_alpha, opts.compress) {
        (false, _) => {
            big_to_old(&mut alphas);
            AlphaFormat::Old
        }
        (true, false) => AlphaFormat::Big,
        (true, true) => AlphaFormat::Compressed,
    };
    let mut mcal = Vec::new();
    let mut mcly = Vec::with_capacity(textures.len() * LAYER_RECORD_BYTES);
    for (i, layer) in textures.layers().iter().enumerate() {
        let mut lf = layer.flags;
        let offset = mcal.len() as u32;
        if i == 0 {
            lf.use_alpha = false;
            lf.compressed = false;
        } else {
            lf.use_alpha = true;
            lf.compressed = format == AlphaFormat::Compressed;
            mcal.extend_from_slice(&alphas[i - 1].encode(format));
        }
        mcly.write_u32::<LittleEndian>(layer.texture.0)?;
        mcly.write_u32::<LittleEndian>(lf.to_bits())?;
        mcly.write_u32::<LittleEndian>(if i == 0 { 0 } else { offset })?;
        mcly.write_u32::<LittleEndian>(layer.effect_id)?;
    }
    write_frame(&mut body, MCLY, &mcly)?;
    write_frame(&mut body, MCAL, &mcal)?;

    if let Some(shadows) = chunk.shadows() {
        sub.clear();
        for &row in shadows.rows() {
            sub.write_u64::<LittleEndian>(row)?;
        }
        write_frame(&mut body, MCSH, &sub)?;
    }

    match liquid_format {
        1 => {
            sub.clear();
            legacy::write_legacy(&legacy::to_legacy_records(chunk.liquids()), &mut sub)?;
            write_frame(&mut body, MCLQ, &sub)?;
        }
        2 => {
            sub.clear();
            modern::write_modern(chunk.liquids(), &mut sub)?;
            write_frame(&mut body, MLIQ, &sub)?;
        }
        _ => {}
    }

    write_frame(out, MCNK, &body)
}

/// Reader over one record's bytes.
struct Records<'a> {
    rd: Cursor<&'a [u8]>,
}

impl<'a> Records<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ChunkError> {
        let bytes = *self.rd.get_ref();
        let start = self.rd.position() as usize;
        let end = start + n;
        if end > bytes.len() {
            return Err(ChunkError::Truncated {
                needed: end,
                got: bytes.len(),
            });
        }
        self.rd.set_position(end as u64);
        Ok(&bytes[start..end])
    }

    /// Next framed sub-record, which must carry `tag`. `size` pins the
    /// payload length when the layout fixes it.
    fn expect(&mut self, tag: Tag, size: Option<usize>) -> Result<&'a [u8], ChunkError> {
        let frame = self.take(FRAME_BYTES)?;
        let found: Tag = [frame[0], frame[1], frame[2], frame[3]];
        if found != tag {
            return Err(ChunkError::UnexpectedTag {
                expected: tag,
                found,
            });
        }
        let len = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]) as usize;
        match size {
            Some(expected) if expected != len => {
                return Err(ChunkError::SizeMismatch {
                    tag,
                    expected,
                    got: len,
                });
            }
            _ => {}
        }
        self.take(len)
    }
}

/// Splits one framed record off the front of `bytes`: `(tag, payload, total)`.
pub(crate) fn split_frame(bytes: &[u8]) -> Result<(Tag, &[u8], usize), ChunkError> {
    if bytes.len() < FRAME_BYTES {
        return Err(ChunkError::Truncated {
            needed: FRAME_BYTES,
            got: bytes.len(),
        });
    }
    let tag: Tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let total = FRAME_BYTES + len;
    if bytes.len() < total {
        return Err(ChunkError::Truncated {
            needed: total,
            got: bytes.len(),
        });
    }
    Ok((tag, &bytes[FRAME_BYTES..total], total))
}

/// Parses one framed `MCNK` record from the front of `bytes`, returning the
/// chunk and the bytes consumed.
pub fn read_chunk(bytes: &[u8], opts: &ReadOptions) -> Result<(Chunk, usize), ChunkError> {
    let (tag, payload, total) = split_frame(bytes)?;
    if tag != MCNK {
        return Err(ChunkError::UnexpectedTag {
            expected: MCNK,
            found: tag,
        });
    }
    let mut r = Records {
        rd: Cursor::new(payload),
    };
    let mut header = Cursor::new(r.take(HEADER_BYTES)?);
    let mut flags = ChunkFlags::from_bits(header.read_u32::<LittleEndian>()?);
    let index_x = header.read_u32::<LittleEndian>()?;
    let index_z = header.read_u32::<LittleEndian>()?;
    let layer_count = header.read_u32::<LittleEndian>()? as usize;
    let area_id = header.read_u32::<LittleEndian>()?;
    let holes = HoleMask::from_bits(header.read_u16::<LittleEndian>()?);
    let _pad = header.read_u16::<LittleEndian>()?;
    let base = header.read_f32::<LittleEndian>()?;
    let liquid_format = header.read_u32::<LittleEndian>()?;
    if layer_count > MAX_LAYERS {
        return Err(ChunkError::Layer {
            index: layer_count - 1,
            reason: "more than four layers",
        });
    }

    let mut heights = [0.0f32; VERTEX_COUNT];
    let mut mcvt = Cursor::new(r.expect(MCVT, Some(VERTEX_COUNT * 4))?);
    for h in heights.iter_mut() {
        *h = mcvt.read_f32::<LittleEndian>()? + base;
    }
    let (ox, oz) = Chunk::origin_of(index_x, index_z);
    let mut mesh = HeightField::from_heights(ox, oz, heights);
    mesh.set_holes(holes);

    let mcnr = r.expect(MCNR, Some(VERTEX_COUNT * 3))?;
    let mut normals = [Vec3::UP; VERTEX_COUNT];
    for (n, b) in normals.iter_mut().zip(mcnr.chunks_exact(3)) {
        let c = |i: usize| f32::from(b[i] as i8) / NORMAL_SCALE;
        *n = Vec3::new(c(0), c(2), c(1));
    }
    mesh.set_normals(normals);

    let colors = if flags.has_vertex_colors {
        let mccv = r.expect(MCCV, Some(VERTEX_COUNT * 4))?;
        let mut colors = [VertexColors::NEUTRAL; VERTEX_COUNT];
        for (c, b) in colors.iter_mut().zip(mccv.chunks_exact(4)) {
            *c = Vec3::new(from_color_byte(b[2]), from_color_byte(b[1]), from_color_byte(b[0]));
        }
        Some(VertexColors::from_colors(colors))
    } else {
        None
    };

    let mcly = r.expect(MCLY, Some(layer_count * LAYER_RECORD_BYTES))?;
    let mcal = r.expect(MCAL, None)?;
    let fix_edges = opts.fix_edges && !flags.do_not_fix_alpha;
    let mut entries = Vec::with_capacity(layer_count);
    let mut alphas = Vec::with_capacity(layer_count.saturating_sub(1));
    let mut all_old = true;
    let mut ly = Cursor::new(mcly);
    for index in 0..layer_count {
        let texture = TextureId(ly.read_u32::<LittleEndian>()?);
        let lf = LayerFlags::from_bits(ly.read_u32::<LittleEndian>()?);
        let offset = ly.read_u32::<LittleEndian>()? as usize;
        let effect_id = ly.read_u32::<LittleEndian>()?;
        if index > 0 {
            let format = if lf.compressed {
                AlphaFormat::Compressed
            } else if flags.big_alpha {
                AlphaFormat::Big
            } else {
                AlphaFormat::Old
            };
            all_old &= format == AlphaFormat::Old;
            let Some(src) = mcal.get(offset..) else {
                return Err(ChunkError::Layer {
                    index,
                    reason: "alpha offset past the end of MCAL",
                });
            };
            let (amap, _) = Alphamap::decode(src, format, fix_edges)?;
            alphas.push(amap);
        }
        entries.push((texture, lf, effect_id));
    }
    if !alphas.is_empty() && all_old {
        old_to_big(&mut alphas);
    }
    let mut textures = TextureStack::new();
    let mut alphas = alphas.into_iter();
    for (i, (texture, lf, effect_id)) in entries.into_iter().enumerate() {
        let alpha = if i == 0 { None } else { alphas.next() };
        textures.push_decoded(texture, lf, effect_id, alpha);
    }

    let shadows = if flags.has_shadow {
        let mut sh = Cursor::new(r.expect(MCSH, Some(SHADOW_BYTES))?);
        let mut rows = [0u64; ALPHA_SIZE];
        for row in rows.iter_mut() {
            *row = sh.read_u64::<LittleEndian>()?;
        }
        Some(ShadowMap::from_rows(rows))
    } else {
        None
    };

    let liquids = match liquid_format {
        0 => LiquidStack::new(),
        1 => {
            let records = legacy::read_legacy(r.expect(MCLQ, None)?)?;
            legacy::from_legacy_records(&records, &opts.liquid_types)
        }
        2 => modern::read_modern(r.expect(MLIQ, None)?, &opts.liquid_types)?,
        other => return Err(ChunkError::LiquidFormat(other)),
    };

    // The in-memory stack always holds 8-bit alpha.
    flags.big_alpha = true;
    let chunk = Chunk::from_parts(ChunkParts {
        index_x,
        index_z,
        mesh,
        textures,
        liquids,
        area_id,
        flags,
        shadows,
        colors,
    });
    Ok((chunk, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesmith_geom::CHUNK_SIZE;
    use tilesmith_liquid::{LiquidBrush, LiquidKind};
    use tilesmith_mesh::NoTerrain;
    use tilesmith_texture::Brush;

    fn sample_chunk() -> Chunk {
        let mut c = Chunk::new(4, 7, 20.0, TextureId(11));
        let (ox, oz) = c.origin();
        let mut heights = *c.mesh().heights();
        for (i, h) in heights.iter_mut().enumerate() {
            *h = 20.0 + (i % 13) as f32 * 0.75;
        }
        c.set_heights(heights, &NoTerrain);
        let centre = Vec3::new(ox + CHUNK_SIZE * 0.5, 30.0, oz + CHUNK_SIZE * 0.5);
        c.paint_texture(centre, &Brush::new(10.0, 0.5), 255.0, 1.0, TextureId(12));
        c.paint_texture(
            Vec3::new(ox + 5.0, 0.0, oz + 5.0),
            &Brush::new(12.0, 0.2),
            180.0,
            0.7,
            TextureId(13),
        );
        c.set_area_id(1519);
        c.set_shadow(5, 9, true);
        c.set_hole(Vec3::new(ox + 1.0, 0.0, oz + 1.0), false, true);
        c.paint_liquid(
            centre,
            &LiquidBrush {
                radius: 12.0,
                liquid_id: 2,
                add: true,
                angle: 0.0,
                orientation: 0.0,
                origin: None,
                override_height: false,
                override_liquid_id: false,
                opacity_factor: 0.5,
            },
            &LiquidTypeTable::default(),
        );
        c
    }

    fn assert_same(a: &Chunk, b: &Chunk) {
        assert_eq!(a.index(), b.index());
        assert_eq!(a.area_id(), b.area_id());
        assert_eq!(a.mesh().holes(), b.mesh().holes());
        for (x, y) in a.mesh().heights().iter().zip(b.mesh().heights()) {
            assert!((x - y).abs() < 1e-3, "{x} vs {y}");
        }
        assert_eq!(a.shadows(), b.shadows());
        assert_eq!(a.liquids().len(), b.liquids().len());
        assert_eq!(a.textures().len(), b.textures().len());
        for (la, lb) in a.textures().layers().iter().zip(b.textures().layers()) {
            assert_eq!(la.texture, lb.texture);
        }
    }

    #[test]
    fn compressed_round_trip_is_exact_for_alpha() {
        let c = sample_chunk();
        assert_eq!(c.textures().len(), 3);
        let mut out = Vec::new();
        write_chunk(&c, &WriteOptions::default(), &mut out).unwrap();
        let (back, used) = read_chunk(&out, &ReadOptions::default()).unwrap();
        assert_eq!(used, out.len());
        assert_same(&c, &back);
        for i in 1..3 {
            assert_eq!(
                c.textures().layer(i).unwrap().alpha(),
                back.textures().layer(i).unwrap().alpha()
            );
            assert!(back.textures().layer(i).unwrap().flags.compressed);
        }
        let ocean = back.liquids().layer(0).unwrap();
        assert_eq!(ocean.kind(), LiquidKind::Ocean);
        assert_eq!(ocean.coverage(), c.liquids().layer(0).unwrap().coverage());
    }

    #[test]
    fn legacy_liquid_and_big_alpha() {
        let c = sample_chunk();
        let opts = WriteOptions {
            big_alpha: true,
            compress: false,
            liquid_format: LiquidFormat::Legacy,
        };
        let mut out = Vec::new();
        write_chunk(&c, &opts, &mut out).unwrap();
        let (back, _) = read_chunk(&out, &ReadOptions::default()).unwrap();
        assert_same(&c, &back);
        assert_eq!(
            c.textures().layer(2).unwrap().alpha(),
            back.textures().layer(2).unwrap().alpha()
        );
        assert_eq!(back.liquids().layer(0).unwrap().liquid_id(), 2);
    }

    #[test]
    fn old_alpha_keeps_sums() {
        let c = sample_chunk();
        let opts = WriteOptions {
            big_alpha: false,
            compress: true,
            liquid_format: LiquidFormat::Modern,
        };
        let mut out = Vec::new();
        write_chunk(&c, &opts, &mut out).unwrap();
        let opts = ReadOptions {
            fix_edges: false,
            ..ReadOptions::default()
        };
        let (back, _) = read_chunk(&out, &opts).unwrap();
        assert_same(&c, &back);
        let t = back.textures();
        for z in 0..ALPHA_SIZE {
            for x in 0..ALPHA_SIZE {
                let sum: u32 = (0..t.len())
                    .map(|i| u32::from(t.opacity(i, x, z).unwrap()))
                    .sum();
                assert_eq!(sum, 255);
            }
        }
        assert!(!t.layer(1).unwrap().flags.compressed);
    }

    #[test]
    fn normals_and_colors_survive() {
        let mut c = sample_chunk();
        let (ox, oz) = c.origin();
        c.paint_vertex_color(Vec3::new(ox, 0.0, oz), 20.0, Vec3::new(2.0, 0.5, 0.0), 1.0);
        let mut out = Vec::new();
        write_chunk(&c, &WriteOptions::default(), &mut out).unwrap();
        let (back, _) = read_chunk(&out, &ReadOptions::default()).unwrap();
        for (a, b) in c.mesh().normals().iter().zip(back.mesh().normals()) {
            assert!((*a - *b).length() < 0.02);
        }
        let (ca, cb) = (c.vertex_colors().unwrap(), back.vertex_colors().unwrap());
        for (a, b) in ca.colors().iter().zip(cb.colors()) {
            assert!((*a - *b).length() < 0.02);
        }
        assert!(back.flags().has_vertex_colors);
    }

    #[test]
    fn malformed_records_are_errors() {
        let c = sample_chunk();
        let mut out = Vec::new();
        write_chunk(&c, &WriteOptions::default(), &mut out).unwrap();

        let mut wrong = out.clone();
        wrong[0] = b'X';
        assert!(matches!(
            read_chunk(&wrong, &ReadOptions::default()),
            Err(ChunkError::UnexpectedTag { .. })
        ));

        assert!(matches!(
            read_chunk(&out[..out.len() - 3], &ReadOptions::default()),
            Err(ChunkError::Truncated { .. })
        ));

        // MCVT size field sits right after the 8-byte frame and 32-byte header.
        let mut sized = out.clone();
        sized[FRAME_BYTES + HEADER_BYTES + 4] = 7;
        assert!(matches!(
            read_chunk(&sized, &ReadOptions::default()),
            Err(ChunkError::SizeMismatch { .. })
        ));

        let mut layers = out;
        layers[FRAME_BYTES + 12] = 9;
        assert!(matches!(
            read_chunk(&layers, &ReadOptions::default()),
            Err(ChunkError::Layer { .. })
        ));
    }
}
