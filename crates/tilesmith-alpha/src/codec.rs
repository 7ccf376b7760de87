use thiserror::Error;

use crate::{ALPHA_SIZE, ALPHA_TEXELS, Alphamap, MAX_RUN, OLD_ALPHA_BYTES};

const FILL_BIT: u8 = 0x80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlphaError {
    #[error("alphamap truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
}

pub(crate) fn decode_old(bytes: &[u8], fix_edges: bool) -> Result<(Alphamap, usize), AlphaError> {
    if bytes.len() < OLD_ALPHA_BYTES {
        return Err(AlphaError::Truncated {
            needed: OLD_ALPHA_BYTES,
            got: bytes.len(),
        });
    }
    let mut amap = Alphamap::new();
    let out = amap.values_mut();
    for (i, &c) in bytes[..OLD_ALPHA_BYTES].iter().enumerate() {
        let lo = c & 0x0F;
        let hi = c >> 4;
        out[i * 2] = lo | (lo << 4);
        out[i * 2 + 1] = hi | (hi << 4);
    }
    if fix_edges {
        for row in 0..ALPHA_SIZE {
            out[row * ALPHA_SIZE + 63] = out[row * ALPHA_SIZE + 62];
        }
        for col in 0..ALPHA_SIZE {
            out[63 * ALPHA_SIZE + col] = out[62 * ALPHA_SIZE + col];
        }
        out[63 * ALPHA_SIZE + 63] = out[62 * ALPHA_SIZE + 62];
    }
    Ok((amap, OLD_ALPHA_BYTES))
}

pub(crate) fn encode_old(amap: &Alphamap) -> Vec<u8> {
    amap.values()
        .chunks_exact(2)
        .map(|pair| (pair[0] >> 4) | (pair[1] & 0xF0))
        .collect()
}

pub(crate) fn decode_big(bytes: &[u8]) -> Result<(Alphamap, usize), AlphaError> {
    let Some(src) = bytes.get(..ALPHA_TEXELS) else {
        return Err(AlphaError::Truncated {
            needed: ALPHA_TEXELS,
            got: bytes.len(),
        });
    };
    let mut amap = Alphamap::new();
    amap.values_mut().copy_from_slice(src);
    Ok((amap, ALPHA_TEXELS))
}

/// Never fails: overlong runs are clamped to the grid and a short stream
/// leaves the remaining texels at zero. Both cases are logged.
pub(crate) fn decompress(bytes: &[u8]) -> (Alphamap, usize) {
    let mut amap = Alphamap::new();
    let out = amap.values_mut();
    let mut written = 0usize;
    let mut pos = 0usize;

    while written < ALPHA_TEXELS {
        let Some(&header) = bytes.get(pos) else {
            log::warn!(
                "compressed alphamap ended after {} of {} texels",
                written,
                ALPHA_TEXELS
            );
            break;
        };
        pos += 1;
        let fill = header & FILL_BIT != 0;
        let declared = (header & !FILL_BIT) as usize;
        let mut count = declared;
        if written + count > ALPHA_TEXELS {
            log::warn!(
                "compressed alphamap run of {} at texel {} overflows the grid; clamping",
                declared,
                written
            );
            count = ALPHA_TEXELS - written;
        }

        if fill {
            let Some(&value) = bytes.get(pos) else {
                log::warn!("compressed alphamap fill entry missing its value byte");
                break;
            };
            pos += 1;
            out[written..written + count].fill(value);
            written += count;
        } else {
            let available = bytes.len().saturating_sub(pos);
            let take = count.min(available);
            out[written..written + take].copy_from_slice(&bytes[pos..pos + take]);
            written += take;
            pos += declared.min(available);
            if take < count {
                log::warn!(
                    "compressed alphamap copy entry truncated ({} of {} bytes)",
                    take,
                    count
                );
                break;
            }
        }
    }

    (amap, pos)
}

pub(crate) fn compress(amap: &Alphamap) -> Vec<u8> {
    let mut out = Vec::with_capacity(ALPHA_TEXELS / 4);
    for row in amap.values().chunks_exact(ALPHA_SIZE) {
        compress_row(row, &mut out);
    }
    out
}

// Runs never cross a row: each row starts with fresh run tracking.
fn compress_row(row: &[u8], out: &mut Vec<u8>) {
    let len = row.len();
    let mut i = 0;
    while i < len {
        let run = repeat_len(row, i);
        if run >= 2 {
            out.push(FILL_BIT | run as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        let start = i;
        i += 1;
        while i < len && i - start < MAX_RUN {
            if i + 1 < len && row[i] == row[i + 1] {
                break;
            }
            i += 1;
        }
        out.push((i - start) as u8);
        out.extend_from_slice(&row[start..i]);
    }
}

fn repeat_len(row: &[u8], start: usize) -> usize {
    let v = row[start];
    row[start..]
        .iter()
        .take(MAX_RUN)
        .take_while(|&&x| x == v)
        .count()
}
