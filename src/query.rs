// (c) Roel Kluin, 2023, GPL v3

use crate::build::{config_path, MAX_WORDS};
use crate::config::GraphConfig;
use crate::error::KmerError;
use crate::graph::{Graph, Neighbors};
use crate::index::KmerIndex;
use crate::kmerconst::{words_for, Kmer, WORD_SPAN};
use crate::kmerstore::DiskStore;
use anyhow::{Context, Result};
use clap::Args;
use itertools::Itertools;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct QueryCmd {
    /// Solid k-mers written by `build --out`
    #[arg(short = 'i', long = "solid", value_name = "FILE", required = true)]
    solid: PathBuf,

    /// K-mers to look up
    #[arg(value_name = "KMER", required = true)]
    kmers: Vec<String>,
}

fn open_graph<const N: usize>(solid: &Path, config: GraphConfig) -> Result<Graph<N>> {
    let store = DiskStore::<Kmer<N>>::open(solid)?;
    let index = KmerIndex::open(config, Box::new(store))?;
    Ok(Graph::from_index(index))
}

fn names<const N: usize>(graph: &Graph<N>, nodes: &Neighbors<N>) -> String {
    if nodes.is_empty() {
        "-".to_string()
    } else {
        nodes.iter().map(|&n| graph.to_string(n)).join(",")
    }
}

/// One line per k-mer: the k-mer, its strand, successors and predecessors.
fn print_neighbours<const N: usize, W: Write>(graph: &Graph<N>, kmers: &[String], out: &mut W) -> Result<()> {
    for text in kmers {
        let node = graph.node(text).with_context(|| format!("k-mer {:?}", text))?;
        if !graph.contains(node) {
            writeln!(out, "{}\tabsent", text)?;
            continue;
        }
        writeln!(
            out,
            "{}\t{}\tout:{}\tin:{}",
            text,
            node.strand,
            names(graph, &graph.successors(node)),
            names(graph, &graph.predecessors(node))
        )?;
    }
    Ok(())
}

fn run<const N: usize, W: Write>(cmd: &QueryCmd, config: GraphConfig, out: &mut W) -> Result<()> {
    let graph = open_graph::<N>(&cmd.solid, config)?;
    eprintln!("{:?}", graph);
    print_neighbours(&graph, &cmd.kmers, out)
}

pub(crate) fn query_to<W: Write>(cmd: QueryCmd, out: &mut W) -> Result<()> {
    let config = GraphConfig::load(&config_path(&cmd.solid))?;
    let k = config.kmer_size;
    match words_for(k) {
        1 => run::<1, W>(&cmd, config, out),
        2 => run::<2, W>(&cmd, config, out),
        3 => run::<3, W>(&cmd, config, out),
        4 => run::<4, W>(&cmd, config, out),
        _ => Err(KmerError::SizeTooLarge {
            k,
            max: WORD_SPAN * MAX_WORDS,
        }
        .into()),
    }
}

pub fn query(cmd: QueryCmd) -> Result<()> {
    query_to(cmd, &mut io::stdout().lock())
}
