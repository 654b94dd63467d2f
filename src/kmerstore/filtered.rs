// (c) Roel Kluin, 2023, GPL v3

use super::{Bag, Collection, ItemIter, Iterable};
use crate::bloom::BloomFilter;
use crate::kmerconst::Kmer;
use anyhow::Result;

/// Any k-mer collection with a Bloom filter kept alongside, answering
/// `may_contain` without a scan. Appends are visible to the filter at once.
pub struct FilteredStore<S, const N: usize> {
    inner: S,
    filter: BloomFilter,
}

impl<S: Collection<Kmer<N>>, const N: usize> FilteredStore<S, N> {
    /// `expected` sizes the filter; more items raise the false-positive rate, never lose one.
    pub fn new(inner: S, expected: u64, fp_rate: f64) -> Result<Self> {
        let mut filter = BloomFilter::new(expected, fp_rate, 64 * N);
        for kmer in inner.iterator()? {
            filter.insert(kmer?);
        }
        Ok(FilteredStore { inner, filter })
    }
    pub fn may_contain(&self, kmer: Kmer<N>) -> bool {
        self.filter.contains(kmer)
    }
    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Collection<Kmer<N>>, const N: usize> Bag<Kmer<N>> for FilteredStore<S, N> {
    fn append(&mut self, item: Kmer<N>) -> Result<()> {
        self.filter.insert(item);
        self.inner.append(item)
    }
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

impl<S: Collection<Kmer<N>>, const N: usize> Iterable<Kmer<N>> for FilteredStore<S, N> {
    fn count(&self) -> u64 {
        self.inner.count()
    }
    fn iterator(&self) -> Result<ItemIter<'_, Kmer<N>>> {
        self.inner.iterator()
    }
    fn bulk_copy<'b>(&self, buffer: &'b mut [Kmer<N>]) -> Result<&'b [Kmer<N>]> {
        self.inner.bulk_copy(buffer)
    }
}
