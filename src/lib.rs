// (c) Roel Kluin, 2023, GPL v3

//! De Bruijn graphs of DNA k-mers: a packed k-mer codec, interchangeable
//! k-mer collections, a membership index and an adjacency engine that derives
//! edges from the index instead of storing them.

//for rdbg
#[macro_use]
extern crate lazy_static;

//bank
#[macro_use]
extern crate derive_new;

#[macro_use]
pub mod rdbg;
pub mod bank;
pub mod bloom;
pub mod build;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod kmer;
pub mod kmerconst;
pub mod kmerset;
pub mod kmerstore;
pub mod new_types;
pub mod query;

pub use config::GraphConfig;
pub use error::KmerError;
pub use graph::{Graph, Node, NodeIterator};
pub use index::KmerIndex;
pub use kmerconst::{Kmer, KmerConst};
pub use new_types::strand::{Direction, Strand};
pub use new_types::twobit::TwoBit;
