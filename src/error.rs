// (c) Roel Kluin, 2023, GPL v3

use derive_more::Display;

/// Failures of the codec, the index build and the node cursor.
///
/// I/O errors of storage backends are not part of this taxonomy; those are
/// propagated as the `anyhow::Error` source they were raised with.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum KmerError {
    #[display(fmt = "invalid nucleotide {:?} at position {}", found, position)]
    InvalidAlphabet { found: char, position: usize },

    #[display(fmt = "sequence length {} does not match k-mer size {}", actual, expected)]
    SizeMismatch { expected: usize, actual: usize },

    #[display(fmt = "k-mer size {} exceeds the span of {} nucleotides", k, max)]
    SizeTooLarge { k: usize, max: usize },

    #[display(fmt = "k-mer source yielded no items")]
    EmptySource,

    #[display(fmt = "node iterator is not positioned on an item")]
    InvalidCursorState,

    #[display(fmt = "invalid configuration: {}", _0)]
    InvalidConfig(String),
}

impl std::error::Error for KmerError {}
