// (c) Roel Kluin, 2023, GPL v3

use crate::kmer::{hash, hash_open_addressing, narrow_hash};
use crate::kmerconst::Kmer;
use arrayvec::ArrayVec;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

const MAX_PROBES: u32 = 16;

/// Probabilistic membership of packed k-mers: no false negatives, false
/// positives bounded by the rate the filter was sized for.
///
/// Probe i is at `h1 + i * h2 + narrow_hash(key, window_i)`, `h1` and `h2`
/// being the seeded and the open addressing hash.
#[derive(Clone, Serialize, Deserialize)]
pub struct BloomFilter {
    bits: BitVec<u64, Lsb0>,
    probes: u32,
    key_bits: usize,
    seed: u64,
}

impl BloomFilter {
    /// A filter for `expected` items at false-positive rate `fp_rate`, for keys of `key_bits` bits.
    pub fn new(expected: u64, fp_rate: f64, key_bits: usize) -> Self {
        let n = expected.max(1) as f64;
        let p = fp_rate.clamp(f64::MIN_POSITIVE, 1.0);
        let m = ((-n * p.ln() / (LN_2 * LN_2)).ceil() as usize).max(64);
        let m = (m + 63) & !63;
        let probes = ((m as f64 / n * LN_2).round() as u32).clamp(1, MAX_PROBES);
        dbg_print!("bloom: {} bits, {} probes for {} items", m, probes, expected);
        BloomFilter {
            bits: bitvec![u64, Lsb0; 0; m],
            probes,
            key_bits: key_bits.max(16),
            seed: 0,
        }
    }
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    pub fn bit_count(&self) -> usize {
        self.bits.len()
    }
    pub fn probes(&self) -> u32 {
        self.probes
    }
    pub fn memory_usage(&self) -> usize {
        self.bits.as_raw_slice().len() * 8
    }

    #[inline]
    fn positions<const N: usize>(&self, key: Kmer<N>) -> impl Iterator<Item = usize> + '_ {
        let h1 = hash(key, self.seed);
        let h2 = hash_open_addressing(key) | 1;
        let m = self.bits.len() as u128;
        (0..u64::from(self.probes)).map(move |i| {
            let window = (16 * i as usize) % (self.key_bits - 8);
            let h = h1
                .wrapping_add(i.wrapping_mul(h2))
                .wrapping_add(narrow_hash(key, window));
            // multiply-shift range reduction
            ((u128::from(h) * m) >> 64) as usize
        })
    }

    pub fn insert<const N: usize>(&mut self, key: Kmer<N>) {
        let positions: ArrayVec<usize, { MAX_PROBES as usize }> = self.positions(key).collect();
        for pos in positions {
            self.bits.set(pos, true);
        }
    }

    pub fn contains<const N: usize>(&self, key: Kmer<N>) -> bool {
        self.positions(key).all(|pos| self.bits[pos])
    }

    /// fraction of bits set; the expected false-positive rate is this to the power probes.
    pub fn fill_ratio(&self) -> f64 {
        self.bits.count_ones() as f64 / self.bits.len() as f64
    }
}
