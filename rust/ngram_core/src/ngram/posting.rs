//! Delta-encoded posting lists.
//!
//! A posting list is a strictly increasing run of absolute content offsets.
//! On disk each entry is stored as the gap from its predecessor (the first
//! gap is from zero), LEB128 varint encoded. All lists of a shard share one
//! arena; a [`Section`] points at each list's bytes.

use super::error::{NgramError, Result};

/// Byte range inside a shard region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Section {
    pub offset: u32,
    pub length: u32,
}

impl Section {
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }
}

/// Append one LEB128 varint.
pub fn write_varint(out: &mut Vec<u8>, mut v: u32) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7F) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Read one LEB128 varint starting at `*pos`, advancing it.
pub fn read_varint(data: &[u8], pos: &mut usize) -> Result<u32> {
    let mut shift = 0u32;
    let mut out: u32 = 0;
    loop {
        let b = *data
            .get(*pos)
            .ok_or_else(|| NgramError::corrupt("unexpected end of posting data"))?;
        *pos += 1;
        if shift == 28 && b & 0x70 != 0 {
            return Err(NgramError::corrupt("varint overflows u32"));
        }
        out |= ((b & 0x7F) as u32) << shift;
        if b & 0x80 == 0 {
            return Ok(out);
        }
        shift += 7;
        if shift > 28 {
            return Err(NgramError::corrupt("varint too long"));
        }
    }
}

/// Delta-encode a strictly increasing list into `out`.
pub fn encode_postings(offsets: &[u32], out: &mut Vec<u8>) {
    let mut prev = 0u32;
    for &offset in offsets {
        debug_assert!(offset >= prev, "posting offsets must be sorted");
        write_varint(out, offset - prev);
        prev = offset;
    }
}

/// Decode `count` delta-encoded offsets back to absolute values.
///
/// Every byte of `data` must be consumed and every gap after the first must
/// be non-zero; anything else means the section is corrupt.
pub fn decode_postings(data: &[u8], count: u32) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(count as usize);
    let mut pos = 0usize;
    let mut prev = 0u32;
    for i in 0..count {
        let delta = read_varint(data, &mut pos)?;
        if i > 0 && delta == 0 {
            return Err(NgramError::corrupt("posting list is not strictly increasing"));
        }
        prev = prev
            .checked_add(delta)
            .ok_or_else(|| NgramError::corrupt("posting offset overflows u32"))?;
        out.push(prev);
    }
    if pos != data.len() {
        return Err(NgramError::corrupt(format!(
            "posting section has {} trailing bytes",
            data.len() - pos
        )));
    }
    Ok(out)
}

/// One contiguous buffer holding every encoded list of a shard.
#[derive(Debug, Default)]
pub struct PostingArena {
    bytes: Vec<u8>,
}

impl PostingArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `offsets` at the end of the arena and return where it landed.
    pub fn push(&mut self, offsets: &[u32]) -> Result<Section> {
        let start = self.bytes.len();
        encode_postings(offsets, &mut self.bytes);
        let offset = u32::try_from(start)
            .map_err(|_| NgramError::CapacityExceeded("posting arena exceeds 4 GiB".into()))?;
        let length = u32::try_from(self.bytes.len() - start)
            .map_err(|_| NgramError::CapacityExceeded("posting list exceeds 4 GiB".into()))?;
        Ok(Section { offset, length })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        for v in [0u32, 1, 127, 128, 300, 16_383, 16_384, u32::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, v);
            let mut pos = 0;
            assert_eq!(read_varint(&buf, &mut pos).unwrap(), v);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn varint_widths() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 127);
        assert_eq!(buf.len(), 1);
        buf.clear();
        write_varint(&mut buf, 128);
        assert_eq!(buf, vec![0x80, 0x01]);
        buf.clear();
        write_varint(&mut buf, u32::MAX);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn varint_truncated() {
        let mut pos = 0;
        assert!(matches!(
            read_varint(&[0x80, 0x80], &mut pos),
            Err(NgramError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn varint_overflow_rejected() {
        let mut pos = 0;
        assert!(read_varint(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F], &mut pos).is_err());
        let mut pos = 0;
        assert!(read_varint(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01], &mut pos).is_err());
    }

    #[test]
    fn deltas_are_small() {
        let offsets = [1_000_000u32, 1_000_001, 1_000_005];
        let mut buf = Vec::new();
        encode_postings(&offsets, &mut buf);
        // 3-byte first value, then two 1-byte gaps.
        assert_eq!(buf.len(), 5);
        assert_eq!(decode_postings(&buf, 3).unwrap(), offsets.to_vec());
    }

    #[test]
    fn first_offset_zero_is_valid() {
        let mut buf = Vec::new();
        encode_postings(&[0, 4], &mut buf);
        assert_eq!(decode_postings(&buf, 2).unwrap(), vec![0, 4]);
    }

    #[test]
    fn duplicate_offset_is_corrupt() {
        let buf = vec![5u8, 0u8];
        assert!(decode_postings(&buf, 2).is_err());
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let mut buf = Vec::new();
        encode_postings(&[1, 2], &mut buf);
        buf.push(7);
        assert!(decode_postings(&buf, 2).is_err());
    }

    #[test]
    fn arena_sections_are_contiguous() {
        let mut arena = PostingArena::new();
        let a = arena.push(&[1, 2, 3]).unwrap();
        let b = arena.push(&[500]).unwrap();
        assert_eq!(a, Section { offset: 0, length: 3 });
        assert_eq!(b.offset as u64, a.end());
        assert_eq!(arena.len() as u64, b.end());
        let bytes = arena.as_bytes();
        let b_bytes = &bytes[b.offset as usize..b.end() as usize];
        assert_eq!(decode_postings(b_bytes, 1).unwrap(), vec![500]);
    }
}
