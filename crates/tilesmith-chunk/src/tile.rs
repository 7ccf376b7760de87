//! `MTIL` tile containers: a chunk count followed by that many `MCNK`
//! records.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::io::{Tag, split_frame};
use crate::{Chunk, ChunkError, ReadOptions, WriteOptions, read_chunk, write_chunk};

pub const MTIL: Tag = *b"MTIL";

pub fn write_tile<'a>(
    chunks: impl IntoIterator<Item = &'a Chunk>,
    opts: &WriteOptions,
) -> Result<Vec<u8>, ChunkError> {
    let mut records = Vec::new();
    let mut count = 0u32;
    for chunk in chunks {
        write_chunk(chunk, opts, &mut records)?;
        count += 1;
    }
    let mut out = Vec::with_capacity(records.len() + 12);
    out.extend_from_slice(&MTIL);
    out.write_u32::<LittleEndian>((records.len() + 4) as u32)?;
    out.write_u32::<LittleEndian>(count)?;
    out.extend_from_slice(&records);
    Ok(out)
}

/// Parses a tile container. A chunk record that fails to parse is reported
/// in its slot and skipped by its frame size; the container itself must be
/// well formed. Records past a frame that overruns the buffer are lost.
pub fn read_tile(
    bytes: &[u8],
    opts: &ReadOptions,
) -> Result<Vec<Result<Chunk, ChunkError>>, ChunkError> {
    let (tag, payload, _) = split_frame(bytes)?;
    if tag != MTIL {
        return Err(ChunkError::UnexpectedTag {
            expected: MTIL,
            found: tag,
        });
    }
    let Some(count) = payload.get(..4) else {
        return Err(ChunkError::Truncated {
            needed: 4,
            got: payload.len(),
        });
    };
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
    let mut rest = &payload[4..];
    let mut out = Vec::with_capacity(count.min(256));
    for index in 0..count {
        let total = match split_frame(rest) {
            Ok((_, _, total)) => total,
            Err(e) => {
                log::warn!("tile chunk {index}: {e}, dropping the remaining records");
                out.push(Err(e));
                break;
            }
        };
        match read_chunk(&rest[..total], opts) {
            Ok((chunk, _)) => out.push(Ok(chunk)),
            Err(e) => {
                log::warn!("tile chunk {index}: skipping malformed record: {e}");
                out.push(Err(e));
            }
        }
        rest = &rest[total..];
    }
    log::debug!(
        "read tile: {} of {count} chunks ok",
        out.iter().filter(|c| c.is_ok()).count()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesmith_texture::TextureId;

    #[test]
    fn bad_record_does_not_sink_siblings() {
        let chunks = [
            Chunk::new(0, 0, 1.0, TextureId(1)),
            Chunk::new(1, 0, 2.0, TextureId(1)),
            Chunk::new(2, 0, 3.0, TextureId(1)),
        ];
        let mut bytes = write_tile(&chunks, &WriteOptions::default()).unwrap();
        // Corrupt the middle chunk's MCVT tag, keeping its frame intact.
        let first = split_frame(&bytes[12..]).unwrap().2;
        let mcvt_tag = 12 + first + 8 + 32;
        assert_eq!(&bytes[mcvt_tag..mcvt_tag + 4], b"MCVT");
        bytes[mcvt_tag] = b'Z';

        let read = read_tile(&bytes, &ReadOptions::default()).unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[0].as_ref().unwrap().index(), (0, 0));
        assert!(matches!(read[1], Err(ChunkError::UnexpectedTag { .. })));
        assert_eq!(read[2].as_ref().unwrap().mesh().max_height(), 3.0);
    }

    #[test]
    fn container_tag_is_checked() {
        let mut bytes = write_tile(std::iter::empty(), &WriteOptions::default()).unwrap();
        assert_eq!(bytes.len(), 12);
        assert!(read_tile(&bytes, &ReadOptions::default()).unwrap().is_empty());
        bytes[0] = b'?';
        assert!(read_tile(&bytes, &ReadOptions::default()).is_err());
    }
}
