//! ASCII case splitting.
//!
//! The index only ever stores lower-cased bytes. Where the uppercase letters
//! were is kept on the side as one bit per byte, so a case-sensitive query can
//! still be checked exactly at the positions the index nominates.

/// Bit-per-byte record of which positions were ASCII uppercase.
///
/// Bit `i % 8` of byte `i / 8` is set when position `i` was uppercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseBits {
    bits: Vec<u8>,
}

impl CaseBits {
    /// Wrap an already packed bit array.
    pub fn from_bytes(bits: Vec<u8>) -> Self {
        CaseBits { bits }
    }

    /// Whether position `pos` was uppercase. Positions past the end read as
    /// lowercase.
    pub fn is_upper(&self, pos: usize) -> bool {
        is_upper_at(&self.bits, pos)
    }

    /// Packed bytes, `ceil(len / 8)` long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bits
    }
}

/// Number of packed bytes needed for `len` positions.
pub fn case_bits_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// Look up a single case bit in a packed array.
#[inline]
pub fn is_upper_at(bits: &[u8], pos: usize) -> bool {
    bits.get(pos / 8)
        .is_some_and(|byte| byte & (1 << (pos % 8)) != 0)
}

/// Fold `raw` to lowercase and record where uppercase letters were.
pub fn split_case(raw: &[u8]) -> (Vec<u8>, CaseBits) {
    let mut folded = Vec::with_capacity(raw.len());
    let mut bits = vec![0u8; case_bits_len(raw.len())];
    for (i, &b) in raw.iter().enumerate() {
        if b.is_ascii_uppercase() {
            bits[i / 8] |= 1 << (i % 8);
            folded.push(b.to_ascii_lowercase());
        } else {
            folded.push(b);
        }
    }
    (folded, CaseBits { bits })
}

/// Inverse of [`split_case`].
pub fn reconstruct_case(folded: &[u8], bits: &CaseBits) -> Vec<u8> {
    folded
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if bits.is_upper(i) {
                b.to_ascii_uppercase()
            } else {
                b
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lowercases_ascii_only() {
        let (folded, bits) = split_case(b"Hello, WORLD");
        assert_eq!(folded, b"hello, world");
        assert!(bits.is_upper(0));
        assert!(!bits.is_upper(1));
        assert!(bits.is_upper(7));
        assert!(bits.is_upper(11));
        assert!(!bits.is_upper(5));
    }

    #[test]
    fn non_ascii_passes_through() {
        let raw = "Ärger".as_bytes();
        let (folded, bits) = split_case(raw);
        // Only the ASCII tail is folded.
        assert_eq!(&folded[..2], &raw[..2]);
        assert_eq!(&folded[2..], b"rger");
        assert!(!bits.is_upper(0));
        assert!(!bits.is_upper(1));
    }

    #[test]
    fn bits_are_packed() {
        let (_, bits) = split_case(b"ABCDEFGHIj");
        assert_eq!(bits.as_bytes(), &[0xFF, 0x01]);
        assert_eq!(case_bits_len(10), 2);
    }

    #[test]
    fn empty_input() {
        let (folded, bits) = split_case(b"");
        assert!(folded.is_empty());
        assert!(bits.as_bytes().is_empty());
        assert!(!bits.is_upper(0));
    }

    #[test]
    fn reconstruct_restores_original() {
        let raw = b"fn Main() { let X = MyType::new(); }";
        let (folded, bits) = split_case(raw);
        assert_eq!(reconstruct_case(&folded, &bits), raw.to_vec());
    }
}
