//! Packed trigram keys.

use std::fmt;

/// Width of an ngram in bytes.
pub const NGRAM_LEN: usize = 3;

/// A 3-byte window packed as `(b0 << 16) | (b1 << 8) | b2`.
///
/// Integer order equals lexicographic byte order, so sorted keys serialize
/// as sorted byte triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NgramKey(u32);

impl NgramKey {
    pub fn from_bytes(bytes: [u8; NGRAM_LEN]) -> Self {
        NgramKey(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }

    /// Key for the first three bytes of `window`, if it is long enough.
    pub fn from_slice(window: &[u8]) -> Option<Self> {
        match window {
            [a, b, c, ..] => Some(Self::from_bytes([*a, *b, *c])),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; NGRAM_LEN] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            write!(f, "{}", std::ascii::escape_default(b))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack() {
        let key = NgramKey::from_bytes(*b"abc");
        assert_eq!(key.as_u32(), 0x0061_6263);
        assert_eq!(key.to_bytes(), *b"abc");
    }

    #[test]
    fn order_matches_bytes() {
        let mut keys = vec![
            NgramKey::from_bytes(*b"zzz"),
            NgramKey::from_bytes(*b"abd"),
            NgramKey::from_bytes([0xff, 0, 0]),
            NgramKey::from_bytes(*b"abc"),
        ];
        keys.sort();
        let bytes: Vec<[u8; 3]> = keys.iter().map(|k| k.to_bytes()).collect();
        let mut expected = bytes.clone();
        expected.sort();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn from_slice_needs_three_bytes() {
        assert_eq!(NgramKey::from_slice(b"ab"), None);
        assert_eq!(
            NgramKey::from_slice(b"abcd"),
            Some(NgramKey::from_bytes(*b"abc"))
        );
    }

    #[test]
    fn display_escapes() {
        assert_eq!(NgramKey::from_bytes(*b"a\nb").to_string(), "a\\nb");
    }
}
