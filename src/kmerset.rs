// (c) Roel Kluin, 2023, GPL v3

use crate::kmer::{hash, hash_open_addressing};
use crate::kmerconst::Kmer;
use bitvec::prelude::*;

const MIN_CAPACITY: usize = 16;

/// Exact set of packed k-mers, open addressing with double hashing.
///
/// The home slot comes from `hash`, the probe step from `hash_open_addressing`.
/// Capacity is a power of two and the step odd, so a probe sequence visits every
/// slot. The load factor is kept at or below one half.
pub struct KmerSet<const N: usize> {
    slots: Vec<Kmer<N>>,
    used: BitVec<u64, Lsb0>,
    len: usize,
    seed: u64,
}

impl<const N: usize> KmerSet<N> {
    pub fn with_capacity(expected: usize) -> Self {
        let capacity = (expected.max(1) * 2).next_power_of_two().max(MIN_CAPACITY);
        KmerSet {
            slots: vec![Kmer::zero(); capacity],
            used: bitvec![u64, Lsb0; 0; capacity],
            len: 0,
            seed: 0,
        }
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    pub fn memory_usage(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Kmer<N>>() + self.used.as_raw_slice().len() * 8
    }

    /// slot holding `key`, or the free slot where it would go.
    fn find(&self, key: Kmer<N>) -> usize {
        let mask = self.slots.len() - 1;
        let mut pos = hash(key, self.seed) as usize & mask;
        let step = (hash_open_addressing(key) | 1) as usize;
        // at most half full, so a free slot is always reached.
        while self.used[pos] && self.slots[pos] != key {
            pos = pos.wrapping_add(step) & mask;
        }
        pos
    }

    /// true if `key` was not yet present.
    pub fn insert(&mut self, key: Kmer<N>) -> bool {
        if (self.len + 1) * 2 > self.slots.len() {
            self.grow();
        }
        let pos = self.find(key);
        if self.used[pos] {
            return false;
        }
        self.slots[pos] = key;
        self.used.set(pos, true);
        self.len += 1;
        true
    }

    pub fn contains(&self, key: Kmer<N>) -> bool {
        self.used[self.find(key)]
    }

    pub fn iter(&self) -> impl Iterator<Item = Kmer<N>> + '_ {
        self.used.iter_ones().map(move |i| self.slots[i])
    }

    fn grow(&mut self) {
        let mut bigger = KmerSet::with_capacity(self.slots.len());
        dbg_print!("kmerset grows to {} slots", bigger.capacity());
        for key in self.iter() {
            let pos = bigger.find(key);
            bigger.slots[pos] = key;
            bigger.used.set(pos, true);
        }
        bigger.len = self.len;
        *self = bigger;
    }
}

impl<const N: usize> Extend<Kmer<N>> for KmerSet<N> {
    fn extend<I: IntoIterator<Item = Kmer<N>>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}
