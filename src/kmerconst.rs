// (c) Roel Kluin, 2023, GPL v3

use crate::error::KmerError;
use crate::kmer::KmerIter;
use crate::new_types::largeint::LargeInt;
use crate::new_types::strand::Strand;
use crate::new_types::twobit::TwoBit;
use num_traits::{FromPrimitive, PrimInt};
use std::mem::size_of;

/// A packed k-mer: two bits per nucleotide, the first nucleotide most significant.
pub type Kmer<const N: usize> = LargeInt<N>;

/// nucleotides per 64-bit word.
pub const WORD_SPAN: usize = 32;

pub trait RevCmp {
    fn revcmp(self, kmerlen: u32) -> Self;
}

/// create bitmask. e.g. dvm::<u32>(0xf0, 0xff) => 0xf0_f0_f0_f0
#[inline]
fn dvm<T: PrimInt + FromPrimitive>(numerator: u32, divisor: u32) -> T {
    let base = T::max_value() / T::from_u32(divisor).unwrap_or_else(T::one);
    T::from_u32(numerator).unwrap_or_else(T::zero) * base
}

macro_rules! implement_revcmp { ($($ty:ty),*) => ($(
	/// give twobit reverse complement for given kmerlen
	impl RevCmp for $ty {
		#[inline]
		fn revcmp(self, kmerlen: u32) -> $ty {
			let mut seq = self.swap_bytes() ^ dvm::<$ty>(2, 3);
			seq = ((seq & dvm::<$ty>(0xf0, 0xff)) >> 4) | ((seq & dvm::<$ty>(0xf, 0xff)) << 4);
			seq = ((seq & dvm::<$ty>(0xc, 0xf)) >> 2) | ((seq & dvm::<$ty>(0x3, 0xf)) << 2);
			seq.checked_shr((size_of::<$ty>() * 8) as u32 - kmerlen * 2).unwrap_or(0)
		}
	}
	)*)
}

implement_revcmp!(u32, u64, u128);

/// Number of 64-bit words required for k-mers of this size.
pub fn words_for(kmerlen: usize) -> usize {
    (kmerlen.max(1) + WORD_SPAN - 1) / WORD_SPAN
}

/// The k-mer model: size, mask and the codec operations on packed k-mers of N words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KmerConst<const N: usize> {
    pub kmerlen: usize,
    mask: Kmer<N>,
    topb2: usize,
}

impl<const N: usize> KmerConst<N> {
    pub fn new(kmerlen: usize) -> Result<Self, KmerError> {
        if kmerlen == 0 {
            return Err(KmerError::InvalidConfig("k-mer size must be > 0".to_string()));
        }
        if kmerlen > WORD_SPAN * N {
            return Err(KmerError::SizeTooLarge {
                k: kmerlen,
                max: WORD_SPAN * N,
            });
        }
        dbg_print!("k-mer model k: {}, words: {}", kmerlen, N);
        Ok(KmerConst {
            kmerlen,
            mask: Kmer::low_mask(kmerlen * 2),
            topb2: kmerlen * 2 - 2,
        })
    }
    /// maximum k-mer size for this word count.
    pub fn span(&self) -> usize {
        WORD_SPAN * N
    }
    /// bytes per packed k-mer.
    pub fn memory_size(&self) -> usize {
        size_of::<Kmer<N>>()
    }
    pub(crate) fn mask(&self) -> Kmer<N> {
        self.mask
    }
    pub(crate) fn topb2(&self) -> usize {
        self.topb2
    }

    pub fn encode(&self, seq: &[u8]) -> Result<Kmer<N>, KmerError> {
        if seq.len() != self.kmerlen {
            return Err(KmerError::SizeMismatch {
                expected: self.kmerlen,
                actual: seq.len(),
            });
        }
        seq.iter().enumerate().try_fold(Kmer::zero(), |acc, (position, &b)| {
            TwoBit::from_ascii(b)
                .map(|b2| (acc << 2) | Kmer::from(b2.as_u64()))
                .ok_or(KmerError::InvalidAlphabet {
                    found: b as char,
                    position,
                })
        })
    }

    pub fn decode(&self, kmer: Kmer<N>) -> String {
        (0..self.kmerlen)
            .map(|i| self.nucleotide(kmer, i).to_ascii() as char)
            .collect()
    }

    /// the nucleotide at position i, counted from the left.
    pub fn nucleotide(&self, kmer: Kmer<N>, i: usize) -> TwoBit {
        dbg_assert!(i < self.kmerlen);
        TwoBit::from_bits((kmer >> (self.topb2 - 2 * i)).low_u64())
    }

    pub fn reverse_complement(&self, kmer: Kmer<N>) -> Kmer<N> {
        let w = kmer.words();
        // each word reversed as 32 nucleotides, word order swapped, then aligned.
        let full = LargeInt::from_words(std::array::from_fn(|i| {
            w[N - 1 - i].revcmp(WORD_SPAN as u32)
        }));
        full >> (WORD_SPAN * N - self.kmerlen) * 2
    }

    /// the smaller of a k-mer and its reverse complement.
    pub fn canonical(&self, kmer: Kmer<N>) -> Kmer<N> {
        kmer.min(self.reverse_complement(kmer))
    }

    pub fn is_canonical(&self, kmer: Kmer<N>) -> bool {
        kmer <= self.reverse_complement(kmer)
    }

    /// canonical form and the strand on which `kmer` reads it.
    pub fn orient(&self, kmer: Kmer<N>) -> (Kmer<N>, Strand) {
        let rc = self.reverse_complement(kmer);
        if kmer <= rc {
            (kmer, Strand::Forward)
        } else {
            (rc, Strand::Reverse)
        }
    }

    /// the canonical k-mer as read on the given strand.
    pub fn with_strand(&self, canonical: Kmer<N>, strand: Strand) -> Kmer<N> {
        match strand {
            Strand::Forward => canonical,
            Strand::Reverse => self.reverse_complement(canonical),
        }
    }

    /// drop the leftmost nucleotide, append b2.
    #[inline]
    pub fn append(&self, kmer: Kmer<N>, b2: TwoBit) -> Kmer<N> {
        ((kmer << 2) | Kmer::from(b2.as_u64())) & self.mask
    }

    /// drop the rightmost nucleotide, prepend b2.
    #[inline]
    pub fn prepend(&self, kmer: Kmer<N>, b2: TwoBit) -> Kmer<N> {
        (kmer >> 2) | (Kmer::from(b2.as_u64()) << self.topb2)
    }

    /// all overlapping k-mers of a raw sequence; stretches with other than ACGT are skipped.
    pub fn iter<'a>(&'a self, seq: &'a [u8]) -> KmerIter<'a, N> {
        KmerIter::new(self, seq)
    }
}
