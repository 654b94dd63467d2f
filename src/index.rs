// (c) Roel Kluin, 2023, GPL v3

use crate::bloom::BloomFilter;
use crate::config::GraphConfig;
use crate::error::KmerError;
use crate::kmerconst::{Kmer, KmerConst};
use crate::kmerset::KmerSet;
use crate::kmerstore::{Bag, Collection, Iterable, MemoryStore, RunCounter};
use anyhow::{ensure, Result};

/// k-mers held in memory per sorted run while counting.
pub const RUN_CAPACITY: usize = 1 << 22;

/// Membership of canonical k-mers, built once from a k-mer collection.
///
/// Holds the solid k-mers (seen at least `minimum_occurrence_threshold`
/// times) in a collection, a Bloom pre-filter when the configured false
/// positive rate is below 1, and an exact table unless `bloom_only` is set.
/// Immutable after construction.
pub struct KmerIndex<const N: usize> {
    model: KmerConst<N>,
    config: GraphConfig,
    solid: Box<dyn Collection<Kmer<N>>>,
    bloom: Option<BloomFilter>,
    exact: Option<KmerSet<N>>,
    observed: u64,
}

impl<const N: usize> KmerIndex<N> {
    /// Index the k-mers of `source`, solid k-mers kept in memory.
    pub fn build<S>(config: GraphConfig, source: &S) -> Result<Self>
    where
        S: Iterable<Kmer<N>> + ?Sized,
    {
        Self::build_into(config, source, Box::new(MemoryStore::new()))
    }

    /// Index the k-mers of `source`, solid k-mers appended to the empty `solid`.
    pub fn build_into<S>(
        config: GraphConfig,
        source: &S,
        solid: Box<dyn Collection<Kmer<N>>>,
    ) -> Result<Self>
    where
        S: Iterable<Kmer<N>> + ?Sized,
    {
        Self::build_external(config, source, solid, RUN_CAPACITY)
    }

    /// As `build_into`, counting occurrences by external sort with sorted runs
    /// of at most `run_capacity` k-mers.
    pub fn build_external<S>(
        config: GraphConfig,
        source: &S,
        mut solid: Box<dyn Collection<Kmer<N>>>,
        run_capacity: usize,
    ) -> Result<Self>
    where
        S: Iterable<Kmer<N>> + ?Sized,
    {
        config.validate()?;
        let model = KmerConst::<N>::new(config.kmer_size)?;
        ensure!(solid.count() == 0, "the solid k-mer collection is not empty");

        let mut counter = RunCounter::new(run_capacity);
        for kmer in source.iterator()? {
            counter.push(model.canonical(kmer?))?;
        }
        if counter.pushed() == 0 {
            return Err(KmerError::EmptySource.into());
        }

        let threshold = config.minimum_occurrence_threshold;
        let mut observed = 0;
        for counted in counter.finish()? {
            let (kmer, count) = counted?;
            observed += 1;
            if count >= threshold {
                solid.append(kmer)?;
            }
        }
        solid.flush()?;
        dbg_print!("{} distinct k-mers, {} solid", observed, solid.count());
        let mut index = Self::with_solid(model, config, solid)?;
        index.observed = observed;
        Ok(index)
    }

    /// Index a collection of solid canonical k-mers, e.g. one persisted by an
    /// earlier build. The k-mers must be canonical and strictly ascending.
    pub fn open(config: GraphConfig, solid: Box<dyn Collection<Kmer<N>>>) -> Result<Self> {
        config.validate()?;
        let model = KmerConst::<N>::new(config.kmer_size)?;
        Self::with_solid(model, config, solid)
    }

    fn with_solid(
        model: KmerConst<N>,
        config: GraphConfig,
        solid: Box<dyn Collection<Kmer<N>>>,
    ) -> Result<Self> {
        let size = solid.count();
        let mut bloom = config.uses_bloom().then(|| {
            BloomFilter::new(size, config.target_false_positive_rate, 2 * config.kmer_size)
        });
        let mut exact = (!config.bloom_only).then(|| KmerSet::with_capacity(size as usize));
        let mut last = None;
        for kmer in solid.iterator()? {
            let kmer = kmer?;
            ensure!(
                model.is_canonical(kmer) && kmer & !model.mask() == Kmer::default(),
                "solid k-mer {:x} is not a canonical {}-mer",
                kmer,
                config.kmer_size
            );
            ensure!(
                last.map_or(true, |prev| prev < kmer),
                "solid k-mers are not strictly ascending at {:x}",
                kmer
            );
            last = Some(kmer);
            if let Some(b) = bloom.as_mut() {
                b.insert(kmer);
            }
            if let Some(e) = exact.as_mut() {
                e.insert(kmer);
            }
        }
        Ok(KmerIndex {
            model,
            config,
            solid,
            bloom,
            exact,
            observed: size,
        })
    }

    /// membership of a canonical k-mer; no false negatives.
    #[inline]
    pub fn contains_canonical(&self, kmer: Kmer<N>) -> bool {
        if let Some(b) = &self.bloom {
            if !b.contains(kmer) {
                return false;
            }
        }
        match &self.exact {
            Some(e) => e.contains(kmer),
            None => true,
        }
    }

    /// membership of a k-mer in either orientation.
    pub fn contains(&self, kmer: Kmer<N>) -> bool {
        self.contains_canonical(self.model.canonical(kmer))
    }

    /// exact membership, None for a Bloom-only index.
    pub fn contains_exact(&self, kmer: Kmer<N>) -> Option<bool> {
        let canonical = self.model.canonical(kmer);
        self.exact.as_ref().map(|e| e.contains(canonical))
    }

    /// number of distinct solid canonical k-mers.
    pub fn size(&self) -> u64 {
        self.solid.count()
    }
    /// number of distinct canonical k-mers in the source, solid or not.
    pub fn observed(&self) -> u64 {
        self.observed
    }
    pub fn solid(&self) -> &dyn Collection<Kmer<N>> {
        self.solid.as_ref()
    }
    pub fn model(&self) -> &KmerConst<N> {
        &self.model
    }
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
    pub fn is_exact(&self) -> bool {
        self.exact.is_some()
    }
    /// bytes held by the membership layers.
    pub fn memory_usage(&self) -> usize {
        self.bloom.as_ref().map_or(0, BloomFilter::memory_usage)
            + self.exact.as_ref().map_or(0, KmerSet::memory_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmerstore::{Bag, DiskStore, ItemIter, SortedStore};
    use rand::{thread_rng, Rng};

    fn store_of(model: &KmerConst<1>, seqs: &[&str]) -> MemoryStore<Kmer<1>> {
        let mut m = MemoryStore::new();
        for s in seqs {
            m.append(model.encode(s.as_bytes()).unwrap()).unwrap();
        }
        m.flush().unwrap();
        m
    }

    #[test]
    fn duplicates_and_strands_collapse() {
        let config = GraphConfig::with_kmer_size(5);
        let model = KmerConst::<1>::new(5).unwrap();
        let src = store_of(&model, &["ACGTT", "AACGT", "ACGTT", "GGATC"]);
        let index = KmerIndex::build(config, &src).unwrap();
        // AACGT is the reverse complement of ACGTT
        assert_eq!(index.size(), 2);
        assert!(index.contains(model.encode(b"ACGTT").unwrap()));
        assert!(index.contains(model.encode(b"GATCC").unwrap()));
        assert_eq!(index.contains_exact(model.encode(b"TTTTT").unwrap()), Some(false));
        let solid: Vec<_> = index.solid().iterator().unwrap().map(|r| r.unwrap()).collect();
        assert!(solid.iter().all(|&k| model.is_canonical(k)));
        assert!(index.memory_usage() > 0);
    }

    #[test]
    fn occurrence_threshold() {
        let config = GraphConfig {
            minimum_occurrence_threshold: 2,
            ..GraphConfig::with_kmer_size(4)
        };
        let model = KmerConst::<1>::new(4).unwrap();
        let src = store_of(&model, &["AATG", "CATT", "ATGC", "CCCC"]);
        let index = KmerIndex::build(config, &src).unwrap();
        assert_eq!(index.size(), 1);
        assert_eq!(index.observed(), 3);
        assert!(index.contains(model.encode(b"AATG").unwrap()));
        assert!(!index.contains(model.encode(b"ATGC").unwrap()));
        assert!(!index.contains(model.encode(b"CCCC").unwrap()));
    }

    #[test]
    fn empty_source() {
        let src = MemoryStore::<Kmer<1>>::new();
        let err = KmerIndex::build(GraphConfig::with_kmer_size(4), &src).err().unwrap();
        assert_eq!(err.downcast_ref::<KmerError>(), Some(&KmerError::EmptySource));
    }

    #[test]
    fn all_below_threshold_is_an_empty_index() {
        let config = GraphConfig {
            minimum_occurrence_threshold: 5,
            ..GraphConfig::with_kmer_size(4)
        };
        let model = KmerConst::<1>::new(4).unwrap();
        let index = KmerIndex::build(config, &store_of(&model, &["AATG"])).unwrap();
        assert_eq!(index.size(), 0);
        assert!(!index.contains(model.encode(b"AATG").unwrap()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let model = KmerConst::<1>::new(4).unwrap();
        let src = store_of(&model, &["AATG"]);
        let config = GraphConfig {
            target_false_positive_rate: 1.0,
            bloom_only: true,
            ..GraphConfig::with_kmer_size(4)
        };
        let err = KmerIndex::build(config, &src).err().unwrap();
        assert!(matches!(err.downcast_ref::<KmerError>(), Some(KmerError::InvalidConfig(_))));
        let err = KmerIndex::<1>::build(GraphConfig::with_kmer_size(40), &src).err().unwrap();
        assert!(matches!(err.downcast_ref::<KmerError>(), Some(KmerError::SizeTooLarge { .. })));
    }

    #[test]
    fn layers_follow_config() {
        let mut rng = thread_rng();
        let model = KmerConst::<1>::new(21).unwrap();
        let mut src = MemoryStore::new();
        for _ in 0..2000 {
            src.append(Kmer::<1>::from(rng.gen::<u64>()) & model.mask()).unwrap();
        }
        src.flush().unwrap();

        let exact_only = GraphConfig {
            target_false_positive_rate: 1.0,
            ..GraphConfig::with_kmer_size(21)
        };
        let bloom_only = GraphConfig {
            bloom_only: true,
            ..GraphConfig::with_kmer_size(21)
        };
        let both = GraphConfig::with_kmer_size(21);
        for config in [exact_only, bloom_only, both] {
            let index = KmerIndex::build_into(config, &src, Box::new(SortedStore::new(256))).unwrap();
            assert_eq!(index.is_exact(), !config.bloom_only);
            for kmer in src.as_slice() {
                assert!(index.contains(*kmer));
                assert!(index.contains(model.reverse_complement(*kmer)));
            }
        }
    }

    #[test]
    fn reopened_solid_set() {
        let model = KmerConst::<1>::new(4).unwrap();
        let config = GraphConfig::with_kmer_size(4);
        let src = store_of(&model, &["AATG", "ATGC"]);
        let first = KmerIndex::build(config, &src).unwrap();
        let solid: Vec<_> = first.solid().iterator().unwrap().map(|r| r.unwrap()).collect();
        let again = KmerIndex::open(config, Box::new(MemoryStore::from(solid))).unwrap();
        assert_eq!(again.size(), 2);
        assert!(again.contains(model.encode(b"GCAT").unwrap()));
    }

    #[test]
    fn reopened_set_must_be_distinct_and_canonical() {
        let model = KmerConst::<1>::new(4).unwrap();
        let config = GraphConfig::with_kmer_size(4);
        let aatg = model.encode(b"AATG").unwrap();
        let atgc = model.canonical(model.encode(b"ATGC").unwrap());
        let (lo, hi) = if aatg < atgc { (aatg, atgc) } else { (atgc, aatg) };

        let twice = MemoryStore::from(vec![lo, lo, hi]);
        let err = KmerIndex::open(config, Box::new(twice)).err().unwrap();
        assert!(err.to_string().contains("ascending"));
        let unsorted = MemoryStore::from(vec![hi, lo]);
        assert!(KmerIndex::open(config, Box::new(unsorted)).is_err());

        // CATT is the reverse complement of AATG and not canonical
        let catt = model.encode(b"CATT").unwrap();
        assert!(!model.is_canonical(catt));
        let err = KmerIndex::open(config, Box::new(MemoryStore::from(vec![catt]))).err().unwrap();
        assert!(err.to_string().contains("canonical"));
        // bits above 2k
        let wide = MemoryStore::from(vec![aatg | Kmer::from(1_u64 << 40)]);
        assert!(KmerIndex::open(config, Box::new(wide)).is_err());
    }

    #[test]
    fn spilled_count_runs_give_the_same_index() {
        let mut rng = thread_rng();
        let model = KmerConst::<1>::new(11).unwrap();
        let config = GraphConfig {
            minimum_occurrence_threshold: 3,
            ..GraphConfig::with_kmer_size(11)
        };
        let dir = tempfile::tempdir().unwrap();
        let mut src = DiskStore::create(dir.path().join("reads.bin")).unwrap();
        let mut mem = MemoryStore::new();
        for _ in 0..4000 {
            let kmer = Kmer::<1>::from(rng.gen_range(0..600_u64));
            src.append(kmer).unwrap();
            mem.append(kmer).unwrap();
        }
        src.flush().unwrap();
        mem.flush().unwrap();

        let in_memory = KmerIndex::build(config, &mem).unwrap();
        for run_capacity in [3, 16, 1000] {
            let spilled =
                KmerIndex::build_external(config, &src, Box::new(MemoryStore::new()), run_capacity)
                    .unwrap();
            assert_eq!(spilled.size(), in_memory.size());
            assert_eq!(spilled.observed(), in_memory.observed());
            let a: Vec<_> = spilled.solid().iterator().unwrap().map(|r| r.unwrap()).collect();
            let b: Vec<_> = in_memory.solid().iterator().unwrap().map(|r| r.unwrap()).collect();
            assert_eq!(a, b);
        }
        assert!(in_memory.size() > 0);
        assert!(in_memory.size() < in_memory.observed());
        assert!(model.is_canonical(in_memory.solid().iterator().unwrap().next().unwrap().unwrap()));
    }

    /// A source that claims far more k-mers than it yields.
    struct Overstated(Vec<Kmer<1>>);

    impl Iterable<Kmer<1>> for Overstated {
        fn count(&self) -> u64 {
            1 << 34
        }
        fn iterator(&self) -> Result<ItemIter<'_, Kmer<1>>> {
            Ok(Box::new(self.0.iter().copied().map(Ok)))
        }
    }

    #[test]
    fn source_count_is_not_preallocated() {
        let model = KmerConst::<1>::new(4).unwrap();
        let src = Overstated(vec![model.encode(b"AATG").unwrap(), model.encode(b"CCCC").unwrap()]);
        let index = KmerIndex::build(GraphConfig::with_kmer_size(4), &src).unwrap();
        assert_eq!(index.size(), 2);
        assert_eq!(index.observed(), 2);
    }
}
