// (c) Roel Kluin, 2023, GPL v3

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::array::from_fn;
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Shl, Shr, Sub};
use std::{cmp, fmt};

/// An unsigned integer of N 64-bit words, word 0 the least significant.
///
/// All arithmetic wraps modulo 2^(64 * N); shifts are logical.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct LargeInt<const N: usize>(pub(crate) [u64; N]);

impl<const N: usize> LargeInt<N> {
    pub const BITS: usize = 64 * N;

    pub const fn zero() -> Self {
        LargeInt([0; N])
    }
    pub const fn from_words(words: [u64; N]) -> Self {
        LargeInt(words)
    }
    pub fn words(&self) -> &[u64; N] {
        &self.0
    }
    pub fn low_u64(&self) -> u64 {
        self.0[0]
    }
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }
    /// the lowest `bits` bits set, all others clear.
    pub fn low_mask(bits: usize) -> Self {
        LargeInt(from_fn(|i| {
            let lo = i * 64;
            if bits >= lo + 64 {
                u64::MAX
            } else if bits > lo {
                (1_u64 << (bits - lo)) - 1
            } else {
                0
            }
        }))
    }
    pub fn wrapping_add(self, other: Self) -> Self {
        let mut carry = false;
        LargeInt(from_fn(|i| {
            let (s, c1) = self.0[i].overflowing_add(other.0[i]);
            let (s, c2) = s.overflowing_add(u64::from(carry));
            carry = c1 || c2;
            s
        }))
    }
    pub fn wrapping_sub(self, other: Self) -> Self {
        let mut borrow = false;
        LargeInt(from_fn(|i| {
            let (d, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d, b2) = d.overflowing_sub(u64::from(borrow));
            borrow = b1 || b2;
            d
        }))
    }
}

impl<const N: usize> Default for LargeInt<N> {
    fn default() -> Self {
        LargeInt::zero()
    }
}

impl<const N: usize> From<u64> for LargeInt<N> {
    fn from(v: u64) -> Self {
        let mut r = LargeInt::zero();
        r.0[0] = v;
        r
    }
}

impl<const N: usize> Ord for LargeInt<N> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        // most significant word decides
        for i in (0..N).rev() {
            match self.0[i].cmp(&other.0[i]) {
                cmp::Ordering::Equal => continue,
                x => return x,
            }
        }
        cmp::Ordering::Equal
    }
}

impl<const N: usize> PartialOrd for LargeInt<N> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<const N: usize> Shl<usize> for LargeInt<N> {
    type Output = Self;
    fn shl(self, n: usize) -> Self {
        if n >= Self::BITS {
            return LargeInt::zero();
        }
        let (ws, bs) = (n / 64, n % 64);
        LargeInt(from_fn(|i| {
            if i < ws {
                return 0;
            }
            let src = i - ws;
            let mut w = self.0[src] << bs;
            if bs > 0 && src > 0 {
                w |= self.0[src - 1] >> (64 - bs);
            }
            w
        }))
    }
}

impl<const N: usize> Shr<usize> for LargeInt<N> {
    type Output = Self;
    fn shr(self, n: usize) -> Self {
        if n >= Self::BITS {
            return LargeInt::zero();
        }
        let (ws, bs) = (n / 64, n % 64);
        LargeInt(from_fn(|i| {
            let src = i + ws;
            if src >= N {
                return 0;
            }
            let mut w = self.0[src] >> bs;
            if bs > 0 && src + 1 < N {
                w |= self.0[src + 1] << (64 - bs);
            }
            w
        }))
    }
}

macro_rules! implement_wordwise { ($($tr:ident, $f:ident, $op:tt);*) => ($(
    impl<const N: usize> $tr for LargeInt<N> {
        type Output = Self;
        #[inline]
        fn $f(self, other: Self) -> Self {
            LargeInt(from_fn(|i| self.0[i] $op other.0[i]))
        }
    }
)*)}

implement_wordwise!(BitOr, bitor, |; BitAnd, bitand, &; BitXor, bitxor, ^);

impl<const N: usize> Not for LargeInt<N> {
    type Output = Self;
    fn not(self) -> Self {
        LargeInt(from_fn(|i| !self.0[i]))
    }
}

impl<const N: usize> Add for LargeInt<N> {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }
}

impl<const N: usize> Sub for LargeInt<N> {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }
}

impl<const N: usize> fmt::LowerHex for LargeInt<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top = (0..N).rev().find(|&i| self.0[i] != 0).unwrap_or(0);
        write!(f, "{:x}", self.0[top])?;
        for i in (0..top).rev() {
            write!(f, "{:016x}", self.0[i])?;
        }
        Ok(())
    }
}

impl<const N: usize> fmt::Debug for LargeInt<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self)
    }
}

impl<const N: usize> Serialize for LargeInt<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(N)?;
        for w in self.0.iter() {
            tup.serialize_element(w)?;
        }
        tup.end()
    }
}

struct WordsVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for WordsVisitor<N> {
    type Value = LargeInt<N>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a tuple of {} u64 words", N)
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut words = [0_u64; N];
        for (i, w) in words.iter_mut().enumerate() {
            *w = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(LargeInt(words))
    }
}

impl<'de, const N: usize> Deserialize<'de> for LargeInt<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(N, WordsVisitor::<N>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{thread_rng, Rng};

    #[test]
    fn shift_across_words() {
        let one = LargeInt::<2>::from(1);
        let x = one << 64;
        assert_eq!(x.0, [0, 1]);
        assert_eq!(x >> 64, one);
        let y = LargeInt::<2>::from(0x8000_0000_0000_0001) << 1;
        assert_eq!(y.0, [2, 1]);
        assert_eq!(y >> 1, LargeInt::from(0x8000_0000_0000_0001));
        assert_eq!(one << 128, LargeInt::zero());
        assert_eq!(LargeInt::<3>::from_words([0, 0, 0xf0]) >> 132, LargeInt::from(0xf));
    }
    #[test]
    fn shifts_match_u128() {
        let mut rng = thread_rng();
        for _ in 0..200 {
            let v: u128 = rng.gen();
            let n = rng.gen_range(0..128);
            let x = LargeInt::<2>::from_words([v as u64, (v >> 64) as u64]);
            let l = x << n;
            let r = x >> n;
            assert_eq!(l.0, [(v << n) as u64, ((v << n) >> 64) as u64]);
            assert_eq!(r.0, [(v >> n) as u64, ((v >> n) >> 64) as u64]);
        }
    }
    #[test]
    fn ordering_is_high_word_first() {
        let a = LargeInt::<2>::from_words([u64::MAX, 0]);
        let b = LargeInt::<2>::from_words([0, 1]);
        assert!(a < b);
        assert_eq!(a.max(b), b);
    }
    #[test]
    fn carry_and_borrow() {
        let a = LargeInt::<2>::from_words([u64::MAX, 0]);
        let one = LargeInt::from(1);
        assert_eq!((a + one).0, [0, 1]);
        assert_eq!(((a + one) - one), a);
        assert_eq!((LargeInt::<2>::zero() - one).0, [u64::MAX, u64::MAX]);
    }
    #[test]
    fn masks() {
        assert_eq!(LargeInt::<2>::low_mask(70).0, [u64::MAX, 0x3f]);
        assert_eq!(LargeInt::<2>::low_mask(128).0, [u64::MAX, u64::MAX]);
        assert_eq!(LargeInt::<1>::low_mask(8).0, [0xff]);
        assert!(LargeInt::<1>::low_mask(0).is_zero());
    }
    #[test]
    fn hex() {
        let x = LargeInt::<2>::from_words([0xab, 0x1]);
        assert_eq!(format!("{:x}", x), "100000000000000ab");
        assert_eq!(format!("{:x}", LargeInt::<2>::zero()), "0");
    }
    #[test]
    fn bincode_width_is_fixed() {
        let x = LargeInt::<3>::from_words([1, 2, 3]);
        let buf = bincode::serialize(&x).unwrap();
        assert_eq!(buf.len(), 24);
        let y: LargeInt<3> = bincode::deserialize(&buf).unwrap();
        assert_eq!(x, y);
    }
}
