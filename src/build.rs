// (c) Roel Kluin, 2023, GPL v3

use crate::bank::{open_bank, SeqRecord};
use crate::config::GraphConfig;
use crate::error::KmerError;
use crate::graph::{append_kmers, Graph};
use crate::index::KmerIndex;
use crate::kmerconst::{words_for, Kmer, KmerConst, WORD_SPAN};
use crate::kmerstore::{Bag, Collection, DiskStore, MemoryStore, SortedStore};
use ahash::AHashMap;
use anyhow::{anyhow, ensure, Result};
use clap::{Args, ValueEnum};
use crossbeam_channel::{bounded, Sender};
use std::path::{Path, PathBuf};
use std::thread;

/// Largest word count the command line dispatches to.
pub const MAX_WORDS: usize = 4;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Store {
    /// all k-mers in memory
    Memory,
    /// k-mers appended to a temporary file
    Disk,
    /// external merge sort; keeps each k-mer once, so no occurrence threshold
    Sorted,
}

#[derive(Args, Debug)]
pub struct BuildCmd {
    /// FASTA or FASTQ files, optionally gzipped
    #[arg(value_name = "READS", required = true)]
    reads: Vec<PathBuf>,

    #[command(flatten)]
    config: GraphConfig,

    /// Where k-mers of the reads are collected
    #[arg(short = 's', long, value_enum, default_value = "memory")]
    store: Store,

    /// K-mers held in memory per sorted run, when collecting and when counting
    #[arg(long, default_value = "4000000")]
    run_capacity: usize,

    /// Write the solid k-mers to this file, and the configuration beside it
    #[arg(short = 'o', long, value_name = "FILE")]
    out: Option<PathBuf>,
}

/// configuration file stored with persisted solid k-mers.
pub fn config_path(solid: &Path) -> PathBuf {
    solid.with_extension("cfg")
}

/// Sends the sequences of all files to the channel; the count of sequences sent.
fn read_banks(paths: Vec<PathBuf>, tx: Sender<SeqRecord>) -> Result<u64> {
    let mut n = 0;
    for path in paths {
        eprintln!("Reading {:?}", path);
        for record in open_bank(&path)? {
            if tx.send(record?).is_err() {
                // receiver is gone, it reports why.
                return Ok(n);
            }
            n += 1;
        }
    }
    Ok(n)
}

/// Collect k-mers of all reads into `store`. A reader thread parses, this thread appends.
fn collect_reads<const N: usize>(
    reads: &[PathBuf],
    model: &KmerConst<N>,
    store: &mut dyn Collection<Kmer<N>>,
) -> Result<u64> {
    let (tx, rx) = bounded(1024);
    let paths = reads.to_vec();
    let reader = thread::spawn(move || read_banks(paths, tx));

    let mut kmers = 0;
    let mut appended = Ok(());
    for record in rx.iter() {
        match append_kmers(model, &record.seq, &mut *store) {
            Ok(n) => kmers += n,
            Err(e) => {
                appended = Err(e);
                break;
            }
        }
    }
    drop(rx);
    let sequences = reader
        .join()
        .map_err(|_| anyhow!("reader thread panicked"))??;
    appended?;
    store.flush()?;
    eprintln!("{} k-mers from {} sequences", kmers, sequences);
    Ok(kmers)
}

pub(crate) fn make_stats<const N: usize>(graph: &Graph<N>) -> Result<()> {
    let index = graph.index();
    println!(
        "{} solid of {} distinct k-mers \t{:.2}%",
        index.size(),
        index.observed(),
        100.0 * index.size() as f64 / index.observed().max(1) as f64
    );
    println!(
        "membership: {} bytes{}",
        index.memory_usage(),
        if index.is_exact() { "" } else { " (Bloom filter only)" }
    );

    let mut degree_counter = AHashMap::new();
    let (mut branching, mut dead_ends) = (0_u64, 0_u64);
    for node in graph.nodes()? {
        let node = node?;
        let degree = (graph.indegree(node), graph.outdegree(node));
        *degree_counter.entry(degree).or_insert(0_u64) += 1;
        if degree.0 > 1 || degree.1 > 1 {
            branching += 1;
        }
        if degree.0 == 0 || degree.1 == 0 {
            dead_ends += 1;
        }
    }
    println!("{} branching nodes, {} dead ends", branching, dead_ends);
    let mut count_vec: Vec<_> = degree_counter.into_iter().collect();
    count_vec.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    println!("in\tout\tnodes");
    for ((i, o), n) in count_vec {
        println!("{}\t{}\t{}", i, o, n);
    }
    Ok(())
}

fn build_graph<const N: usize>(cmd: BuildCmd) -> Result<Graph<N>> {
    let config = cmd.config;
    config.validate()?;
    ensure!(
        cmd.store != Store::Sorted || config.minimum_occurrence_threshold == 1,
        "the sorted store keeps no counts, use another store for an occurrence threshold"
    );
    let model = KmerConst::<N>::new(config.kmer_size)?;
    if let Some(out) = &cmd.out {
        ensure!(!out.exists(), "{:?} already exists!", out);
    }

    let mut store: Box<dyn Collection<Kmer<N>>> = match cmd.store {
        Store::Memory => Box::new(MemoryStore::new()),
        Store::Disk => Box::new(DiskStore::temporary()?),
        Store::Sorted => Box::new(SortedStore::new(cmd.run_capacity)),
    };
    collect_reads(&cmd.reads, &model, store.as_mut())?;

    let index = match &cmd.out {
        Some(out) => {
            eprintln!("Writing {:?}", out);
            let solid = Box::new(DiskStore::create(out)?);
            let built = KmerIndex::build_external(config, store.as_ref(), solid, cmd.run_capacity)
                .and_then(|index| config.save(&config_path(out)).map(|_| index));
            if built.is_err() {
                // no partial output to trip the next run
                let _ = std::fs::remove_file(out);
                let _ = std::fs::remove_file(config_path(out));
            }
            built?
        }
        None => KmerIndex::build_external(
            config,
            store.as_ref(),
            Box::new(MemoryStore::new()),
            cmd.run_capacity,
        )?,
    };
    Ok(Graph::from_index(index))
}

pub fn build(cmd: BuildCmd) -> Result<()> {
    let k = cmd.config.kmer_size;
    match words_for(k) {
        1 => make_stats(&build_graph::<1>(cmd)?),
        2 => make_stats(&build_graph::<2>(cmd)?),
        3 => make_stats(&build_graph::<3>(cmd)?),
        4 => make_stats(&build_graph::<4>(cmd)?),
        _ => Err(KmerError::SizeTooLarge {
            k,
            max: WORD_SPAN * MAX_WORDS,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmerstore::Iterable;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn cmd(reads: Vec<PathBuf>, k: usize, store: Store, out: Option<PathBuf>) -> BuildCmd {
        BuildCmd {
            reads,
            config: GraphConfig::with_kmer_size(k),
            store,
            run_capacity: 3,
            out,
        }
    }

    #[test]
    fn stores_give_the_same_graph() {
        let mut fa = NamedTempFile::new().unwrap();
        writeln!(fa, ">a\nACGATTGCAAGGTCNNACGATTG\n>b\nTTGCAAGG").unwrap();
        let reads = vec![fa.path().to_path_buf()];
        let mut solids = Vec::new();
        for store in [Store::Memory, Store::Disk, Store::Sorted] {
            let g = build_graph::<1>(cmd(reads.clone(), 5, store, None)).unwrap();
            let mut s: Vec<_> = g.nodes().unwrap().map(|n| g.to_string(n.unwrap())).collect();
            s.sort();
            solids.push(s);
            make_stats(&g).unwrap();
        }
        assert_eq!(solids[0], solids[1]);
        assert_eq!(solids[0], solids[2]);
        assert!(!solids[0].is_empty());
    }

    #[test]
    fn persists_solid_kmers() {
        let mut fq = NamedTempFile::new().unwrap();
        writeln!(fq, "@r\nACGTTGCAGT\n+\nIIIIIIIIII").unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("short.solid");
        let g = build_graph::<1>(cmd(vec![fq.path().to_path_buf()], 7, Store::Disk, Some(out.clone())))
            .unwrap();
        assert_eq!(g.size(), 4);
        let reopened = DiskStore::<Kmer<1>>::open(&out).unwrap();
        assert_eq!(reopened.count(), 4);
        assert_eq!(GraphConfig::load(&config_path(&out)).unwrap().kmer_size, 7);
        // never overwritten
        assert!(build_graph::<1>(cmd(vec![fq.path().to_path_buf()], 7, Store::Disk, Some(out))).is_err());
    }

    #[test]
    fn failed_build_leaves_no_output() {
        let mut fq = NamedTempFile::new().unwrap();
        writeln!(fq, "@r\nACGTTGCAGT\n+\nIIIIIIIIII").unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("reads.solid");
        let reads = vec![fq.path().to_path_buf()];

        // no 33-mer in a 10 base read
        let err = build_graph::<2>(cmd(reads.clone(), 33, Store::Memory, Some(out.clone())))
            .err()
            .unwrap();
        assert_eq!(err.downcast_ref::<KmerError>(), Some(&KmerError::EmptySource));
        assert!(!out.exists());
        assert!(!config_path(&out).exists());

        // the same output path is free for the next run
        let g = build_graph::<1>(cmd(reads, 5, Store::Memory, Some(out.clone()))).unwrap();
        assert_eq!(g.size(), 6);
        assert!(out.exists());
        assert_eq!(GraphConfig::load(&config_path(&out)).unwrap().kmer_size, 5);
    }

    #[test]
    fn sorted_store_refuses_threshold() {
        let mut c = cmd(vec![PathBuf::from("unused.fa")], 5, Store::Sorted, None);
        c.config.minimum_occurrence_threshold = 2;
        assert!(build_graph::<1>(c).is_err());
    }

    #[test]
    fn oversized_k() {
        let c = cmd(vec![PathBuf::from("unused.fa")], 200, Store::Memory, None);
        let err = build(c).err().unwrap();
        assert!(matches!(err.downcast_ref::<KmerError>(), Some(KmerError::SizeTooLarge { .. })));
    }
}
