//! Packed multi-layer liquid block.
//!
//! Each layer stores only the bounding box of its coverage, an optional
//! coverage bitmask for that box, and the vertex attributes its format
//! needs.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    LiquidError, LiquidKind, LiquidLayer, LiquidStack, LiquidTypeTable,
    SUBCHUNKS, SubchunkMask, VERTS,
};

const LAYER_HEADER_BYTES: usize = 36;

/// Which vertex attributes a layer stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    HeightDepth,
    HeightUv,
    DepthOnly,
    HeightUvDepth,
}

impl TryFrom<u16> for VertexFormat {
    type Error = LiquidError;

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(VertexFormat::HeightDepth),
            1 => Ok(VertexFormat::HeightUv),
            2 => Ok(VertexFormat::DepthOnly),
            3 => Ok(VertexFormat::HeightUvDepth),
            other => Err(LiquidError::BadVertexFormat(other)),
        }
    }
}

impl VertexFormat {
    pub fn to_u16(self) -> u16 {
        match self {
            VertexFormat::HeightDepth => 0,
            VertexFormat::HeightUv => 1,
            VertexFormat::DepthOnly => 2,
            VertexFormat::HeightUvDepth => 3,
        }
    }

    /// Format the writer picks for `layer`. Textured kinds keep their uvs,
    /// oceans drop the heights when every vertex of the written box sits at
    /// `min`, hidden ones included.
    pub fn for_layer(layer: &LiquidLayer) -> Self {
        if layer.kind().uses_uv() {
            VertexFormat::HeightUv
        } else if layer.kind() == LiquidKind::Ocean && box_is_level(layer) {
            VertexFormat::DepthOnly
        } else {
            VertexFormat::HeightDepth
        }
    }

    fn has_height(self) -> bool {
        !matches!(self, VertexFormat::DepthOnly)
    }

    fn has_uv(self) -> bool {
        matches!(self, VertexFormat::HeightUv | VertexFormat::HeightUvDepth)
    }

    fn has_depth(self) -> bool {
        !matches!(self, VertexFormat::HeightUv)
    }
}

/// Subchunk bounding box `(x, z, width, height)` of a mask.
fn coverage_bounds(mask: SubchunkMask) -> Option<(usize, usize, usize, usize)> {
    let mut cells = mask.cells();
    let (x0, z0) = cells.next()?;
    let (mut lx, mut lz, mut hx, mut hz) = (x0, z0, x0, z0);
    for (x, z) in cells {
        lx = lx.min(x);
        lz = lz.min(z);
        hx = hx.max(x);
        hz = hz.max(z);
    }
    Some((lx, lz, hx - lx + 1, hz - lz + 1))
}

fn box_vertices(bx: usize, bz: usize, bw: usize, bh: usize) -> impl Iterator<Item = (usize, usize)> {
    (bz..=bz + bh).flat_map(move |z| (bx..=bx + bw).map(move |x| (x, z)))
}

fn box_is_level(layer: &LiquidLayer) -> bool {
    let Some((bx, bz, bw, bh)) = coverage_bounds(layer.coverage()) else {
        return false;
    };
    box_vertices(bx, bz, bw, bh)
        .all(|(x, z)| layer.vertex(x, z).is_some_and(|v| v.height == layer.min()))
}

fn depth_to_byte(d: f32) -> u8 {
    (d * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Appends the block for every non-empty layer of `stack`.
pub fn write_modern(stack: &LiquidStack, out: &mut Vec<u8>) -> Result<(), LiquidError> {
    let layers: Vec<&LiquidLayer> = stack.layers().iter().filter(|l| !l.is_empty()).collect();
    out.write_u32::<LittleEndian>(layers.len() as u32)?;
    for layer in layers {
        let Some((bx, bz, bw, bh)) = coverage_bounds(layer.coverage()) else {
            continue;
        };
        let format = VertexFormat::for_layer(layer);
        let mut mask_bytes = vec![0u8; (bw * bh).div_ceil(8)];
        let mut full = true;
        for z in 0..bh {
            for x in 0..bw {
                let bit = z * bw + x;
                if layer.is_covered(bx + x, bz + z) {
                    mask_bytes[bit / 8] |= 1 << (bit % 8);
                } else {
                    full = false;
                }
            }
        }

        out.write_u16::<LittleEndian>(layer.liquid_id())?;
        out.write_u16::<LittleEndian>(format.to_u16())?;
        out.write_f32::<LittleEndian>(layer.min())?;
        out.write_f32::<LittleEndian>(layer.max())?;
        out.write_u8(bx as u8)?;
        out.write_u8(bz as u8)?;
        out.write_u8(bw as u8)?;
        out.write_u8(bh as u8)?;
        out.write_u8(u8::from(!full))?;
        out.extend_from_slice(&[0; 3]);
        out.write_u64::<LittleEndian>(layer.fishable().0)?;
        out.write_u64::<LittleEndian>(layer.fatigue_mask().0)?;
        if !full {
            out.extend_from_slice(&mask_bytes);
        }

        let verts: Vec<_> = box_vertices(bx, bz, bw, bh)
            .filter_map(|(x, z)| layer.vertex(x, z).copied())
            .collect();
        if format.has_height() {
            for v in &verts {
                out.write_f32::<LittleEndian>(v.height)?;
            }
        }
        if format.has_uv() {
            for v in &verts {
                out.write_f32::<LittleEndian>(v.uv.0)?;
                out.write_f32::<LittleEndian>(v.uv.1)?;
            }
        }
        if format.has_depth() {
            for v in &verts {
                out.write_u8(depth_to_byte(v.depth))?;
            }
        }
    }
    Ok(())
}

fn take<'a>(rd: &mut Cursor<&'a [u8]>, n: usize) -> Result<&'a [u8], LiquidError> {
    let start = rd.position() as usize;
    let bytes = *rd.get_ref();
    let end = start + n;
    if end > bytes.len() {
        return Err(LiquidError::Truncated {
            needed: end,
            got: bytes.len(),
        });
    }
    rd.set_position(end as u64);
    Ok(&bytes[start..end])
}

/// Parses a modern block. Layer ids are resolved through `types`.
pub fn read_modern(bytes: &[u8], types: &LiquidTypeTable) -> Result<LiquidStack, LiquidError> {
    let mut rd = Cursor::new(bytes);
    let count = rd.read_u32::<LittleEndian>()? as usize;
    let mut layers = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let mut header = Cursor::new(take(&mut rd, LAYER_HEADER_BYTES)?);
        let liquid_id = header.read_u16::<LittleEndian>()?;
        let format = VertexFormat::try_from(header.read_u16::<LittleEndian>()?)?;
        let min = header.read_f32::<LittleEndian>()?;
        let _max = header.read_f32::<LittleEndian>()?;
        let (x, z, width, height) = (
            header.read_u8()?,
            header.read_u8()?,
            header.read_u8()?,
            header.read_u8()?,
        );
        let has_mask = header.read_u8()? != 0;
        let mut pad = [0u8; 3];
        header.read_exact(&mut pad)?;
        let fishable = SubchunkMask(header.read_u64::<LittleEndian>()?);
        let fatigue = SubchunkMask(header.read_u64::<LittleEndian>()?);

        let (bx, bz, bw, bh) = (x as usize, z as usize, width as usize, height as usize);
        if bw == 0 || bh == 0 || bx + bw > SUBCHUNKS || bz + bh > SUBCHUNKS {
            return Err(LiquidError::BadBounds {
                x,
                z,
                width,
                height,
            });
        }

        let mut coverage = SubchunkMask::NONE;
        let mask = if has_mask {
            Some(take(&mut rd, (bw * bh).div_ceil(8))?)
        } else {
            None
        };
        for cz in 0..bh {
            for cx in 0..bw {
                let bit = cz * bw + cx;
                let on = mask.is_none_or(|m| m[bit / 8] & (1 << (bit % 8)) != 0);
                coverage.set(bx + cx, bz + cz, on);
            }
        }

        let n = (bw + 1) * (bh + 1);
        let heights: Vec<f32> = if format.has_height() {
            let mut c = Cursor::new(take(&mut rd, n * 4)?);
            (0..n)
                .map(|_| c.read_f32::<LittleEndian>())
                .collect::<Result<_, _>>()?
        } else {
            vec![min; n]
        };
        let uvs: Option<Vec<(f32, f32)>> = if format.has_uv() {
            let mut c = Cursor::new(take(&mut rd, n * 8)?);
            Some(
                (0..n)
                    .map(|_| {
                        Ok::<_, std::io::Error>((
                            c.read_f32::<LittleEndian>()?,
                            c.read_f32::<LittleEndian>()?,
                        ))
                    })
                    .collect::<Result<_, _>>()?,
            )
        } else {
            None
        };
        let depths: Option<&[u8]> = if format.has_depth() {
            Some(take(&mut rd, n)?)
        } else {
            None
        };

        let kind = types.resolve(liquid_id);
        let template = LiquidLayer::new(liquid_id, kind, min);
        let mut vertices = *template.vertices();
        let mut i = 0;
        for vz in bz..=bz + bh {
            for vx in bx..=bx + bw {
                let v = &mut vertices[vz * VERTS + vx];
                v.height = heights[i];
                if let Some(uvs) = &uvs {
                    v.uv = uvs[i];
                }
                if let Some(d) = depths {
                    v.depth = f32::from(d[i]) / 255.0;
                }
                i += 1;
            }
        }
        layers.push(LiquidLayer::from_parts(
            liquid_id, kind, coverage, vertices, fishable, fatigue,
        ));
    }
    Ok(LiquidStack::from_layers(layers))
}
