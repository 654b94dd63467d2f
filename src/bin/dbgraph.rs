// (c) Roel Kluin, 2023, GPL v3

extern crate dbgraph;

// target/release/dbgraph build -k 31 -o reads.solid reads_1.fq.gz reads_2.fq.gz
//
// target/release/dbgraph query -i reads.solid ACGT...

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbgraph::build;
use dbgraph::query;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Builds a de Bruijn graph from reads and reports its statistics
    Build(build::BuildCmd),

    /// Prints neighbours of k-mers in a persisted graph
    Query(query::QueryCmd),
}

/// De Bruijn graph construction and queries
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct DbGraph {
    /// Print the debug note stack on exit
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = DbGraph::parse();

    let res = match cli.command {
        Commands::Build(cmd) => build::build(cmd),
        Commands::Query(cmd) => query::query(cmd),
    };
    if cli.debug > 0 {
        eprintln!("{}", dbgraph::rdbg::dump());
    }
    res
}
