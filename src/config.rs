// (c) Roel Kluin, 2023, GPL v3

use crate::error::KmerError;
use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Construction parameters of the k-mer index and graph.
#[derive(Args, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Length of k-mers, the graph nodes
    #[arg(short = 'k', long, default_value = "31")]
    pub kmer_size: usize,

    /// False positive rate of the Bloom pre-filter, 1 disables it
    #[arg(short = 'p', long = "fp-rate", default_value = "0.01")]
    pub target_false_positive_rate: f64,

    /// Minimum number of occurrences for a k-mer to become a node
    #[arg(short = 'm', long = "min-occurrence", default_value = "1")]
    pub minimum_occurrence_threshold: u32,

    /// Keep only the Bloom filter; membership may give false positives
    #[arg(long)]
    pub bloom_only: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            kmer_size: 31,
            target_false_positive_rate: 0.01,
            minimum_occurrence_threshold: 1,
            bloom_only: false,
        }
    }
}

impl GraphConfig {
    pub fn with_kmer_size(kmer_size: usize) -> Self {
        GraphConfig {
            kmer_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), KmerError> {
        let p = self.target_false_positive_rate;
        if self.kmer_size == 0 {
            return Err(KmerError::InvalidConfig("kmer_size must be > 0".to_string()));
        }
        if !(p > 0.0 && p <= 1.0) {
            return Err(KmerError::InvalidConfig(format!(
                "target_false_positive_rate {} not in (0, 1]",
                p
            )));
        }
        if self.minimum_occurrence_threshold == 0 {
            return Err(KmerError::InvalidConfig(
                "minimum_occurrence_threshold must be >= 1".to_string(),
            ));
        }
        if self.bloom_only && p >= 1.0 {
            return Err(KmerError::InvalidConfig(
                "bloom_only requires a false positive rate below 1".to_string(),
            ));
        }
        Ok(())
    }

    /// whether the index holds a Bloom filter.
    pub fn uses_bloom(&self) -> bool {
        self.target_false_positive_rate < 1.0
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut w = BufWriter::new(file);
        bincode::serialize_into(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let config: GraphConfig = bincode::deserialize_from(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}
