// (c) Roel Kluin, 2023, GPL v3

use std::fmt;

const INVALID: u8 = 4;

const fn ascii_table() -> [u8; 256] {
    let mut t = [INVALID; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'T' as usize] = 2;
    t[b't' as usize] = 2;
    t[b'G' as usize] = 3;
    t[b'g' as usize] = 3;
    t
}

static NT2B: [u8; 256] = ascii_table();
const B2NT: &[u8; 4] = b"ACTG";

/// A nucleotide in two bits: A: 0x0, C: 0x1, T: 0x2, G: 0x3.
///
/// The complement is the code xor 2.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TwoBit(u8);

impl TwoBit {
    pub const A: TwoBit = TwoBit(0);
    pub const C: TwoBit = TwoBit(1);
    pub const T: TwoBit = TwoBit(2);
    pub const G: TwoBit = TwoBit(3);

    /// enumeration order of neighbour candidates.
    pub const ALL: [TwoBit; 4] = [TwoBit::A, TwoBit::C, TwoBit::T, TwoBit::G];

    /// None for anything but ACGT, either case.
    #[inline(always)]
    pub fn from_ascii(b: u8) -> Option<TwoBit> {
        match NT2B[b as usize] {
            INVALID => None,
            b2 => Some(TwoBit(b2)),
        }
    }
    /// the low two bits of `bits`.
    #[inline(always)]
    pub(crate) fn from_bits(bits: u64) -> TwoBit {
        TwoBit((bits & 3) as u8)
    }
    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
    #[inline(always)]
    pub fn as_u64(&self) -> u64 {
        u64::from(self.0)
    }
    #[inline(always)]
    pub fn complement(&self) -> TwoBit {
        TwoBit(self.0 ^ 2)
    }
    pub fn to_ascii(&self) -> u8 {
        B2NT[self.0 as usize]
    }
}

impl fmt::Debug for TwoBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.to_ascii() as char, self.0)
    }
}

impl fmt::Display for TwoBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii() as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_roundtrip() {
        for b2 in TwoBit::ALL {
            assert_eq!(TwoBit::from_ascii(b2.to_ascii()), Some(b2));
            assert_eq!(
                TwoBit::from_ascii(b2.to_ascii().to_ascii_lowercase()),
                Some(b2)
            );
        }
        for b in [b'N', b'n', b'X', b'U', b'-', b'0', b' '] {
            assert_eq!(TwoBit::from_ascii(b), None);
        }
    }
    #[test]
    fn complement() {
        assert_eq!(TwoBit::A.complement(), TwoBit::T);
        assert_eq!(TwoBit::T.complement(), TwoBit::A);
        assert_eq!(TwoBit::C.complement(), TwoBit::G);
        assert_eq!(TwoBit::G.complement(), TwoBit::C);
        assert_eq!(format!("{:?}", TwoBit::G), "G (3)");
    }
}
