// (c) Roel Kluin, 2023, GPL v3

use crate::bank::SeqRecord;
use crate::config::GraphConfig;
use crate::error::KmerError;
use crate::index::KmerIndex;
use crate::kmerconst::{Kmer, KmerConst};
use crate::kmerstore::{Bag, Collection, ItemIter, Iterable, MemoryStore};
use crate::new_types::strand::{Direction, Strand};
use crate::new_types::twobit::TwoBit;
use anyhow::Result;
use arrayvec::ArrayVec;
use std::fmt;

/// A vertex seen from one of its two ends: a canonical k-mer and the strand
/// it is read on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Node<const N: usize> {
    pub kmer: Kmer<N>,
    pub strand: Strand,
}

impl<const N: usize> Node<N> {
    pub fn new(kmer: Kmer<N>, strand: Strand) -> Self {
        Node { kmer, strand }
    }
    /// the same vertex seen from the other end.
    #[must_use]
    pub fn reverse(self) -> Self {
        Node::new(self.kmer, self.strand.reverse())
    }
}

pub type Neighbors<const N: usize> = ArrayVec<Node<N>, 4>;

/// Append every k-mer of `seq` to `store` in canonical form. Returns the number appended.
pub fn append_kmers<S, const N: usize>(model: &KmerConst<N>, seq: &[u8], store: &mut S) -> Result<u64>
where
    S: Collection<Kmer<N>> + ?Sized,
{
    let mut n = 0;
    for xmer in model.iter(seq) {
        store.append(xmer.canonical())?;
        n += 1;
    }
    Ok(n)
}

/// De Bruijn graph over the k-mers of an index. Edges are not stored: the
/// neighbours of a node are its four one-nucleotide extensions that the index
/// contains.
pub struct Graph<const N: usize> {
    index: KmerIndex<N>,
}

impl<const N: usize> Graph<N> {
    pub fn from_index(index: KmerIndex<N>) -> Self {
        Graph { index }
    }

    /// graph of the k-mers in `source`.
    pub fn build<S>(config: GraphConfig, source: &S) -> Result<Self>
    where
        S: Iterable<Kmer<N>> + ?Sized,
    {
        KmerIndex::build(config, source).map(Graph::from_index)
    }

    /// graph of all k-mers of the sequences, collected through `store`.
    pub fn from_sequences<I, S>(config: GraphConfig, bank: I, store: &mut S) -> Result<Self>
    where
        I: IntoIterator<Item = Result<SeqRecord>>,
        S: Collection<Kmer<N>> + ?Sized,
    {
        config.validate()?;
        let model = KmerConst::<N>::new(config.kmer_size)?;
        for record in bank {
            let record = record?;
            let n = append_kmers(&model, &record.seq, &mut *store)?;
            dbg_print!("{}: {} k-mers", record.id, n);
        }
        store.flush()?;
        Self::build(config, &*store)
    }

    /// graph of the k-mers of a few sequences, held in memory.
    pub fn from_strings(config: GraphConfig, seqs: &[&str]) -> Result<Self> {
        let bank = seqs
            .iter()
            .enumerate()
            .map(|(i, s)| Ok(SeqRecord::new(i.to_string(), s.as_bytes().to_vec())));
        Self::from_sequences(config, bank, &mut MemoryStore::<Kmer<N>>::new())
    }

    pub fn index(&self) -> &KmerIndex<N> {
        &self.index
    }
    pub fn model(&self) -> &KmerConst<N> {
        self.index.model()
    }
    pub fn size(&self) -> u64 {
        self.index.size()
    }

    /// the node of a k-mer given as text.
    pub fn node(&self, seq: &str) -> Result<Node<N>, KmerError> {
        let kmer = self.model().encode(seq.as_bytes())?;
        Ok(self.node_of(kmer))
    }
    /// the node of an oriented k-mer.
    pub fn node_of(&self, kmer: Kmer<N>) -> Node<N> {
        let (canonical, strand) = self.model().orient(kmer);
        Node::new(canonical, strand)
    }
    /// the k-mer as read along the node's strand.
    pub fn kmer_of(&self, node: Node<N>) -> Kmer<N> {
        self.model().with_strand(node.kmer, node.strand)
    }
    pub fn to_string(&self, node: Node<N>) -> String {
        self.model().decode(self.kmer_of(node))
    }
    pub fn contains(&self, node: Node<N>) -> bool {
        self.index.contains_canonical(node.kmer)
    }

    /// the node one nucleotide away, if present.
    #[inline]
    fn step(&self, kmer: Kmer<N>, nt: TwoBit, dir: Direction) -> Option<Node<N>> {
        let next = match dir {
            Direction::Outgoing => self.model().append(kmer, nt),
            Direction::Incoming => self.model().prepend(kmer, nt),
        };
        let node = self.node_of(next);
        self.contains(node).then(|| node)
    }

    /// neighbours in A, C, T, G order of the added nucleotide.
    pub fn neighbors(&self, node: Node<N>, dir: Direction) -> Neighbors<N> {
        let kmer = self.kmer_of(node);
        TwoBit::ALL
            .iter()
            .filter_map(|&nt| self.step(kmer, nt, dir))
            .collect()
    }
    pub fn successors(&self, node: Node<N>) -> Neighbors<N> {
        self.neighbors(node, Direction::Outgoing)
    }
    pub fn predecessors(&self, node: Node<N>) -> Neighbors<N> {
        self.neighbors(node, Direction::Incoming)
    }
    /// the successor reached by appending `nt`.
    pub fn successor(&self, node: Node<N>, nt: TwoBit) -> Option<Node<N>> {
        self.step(self.kmer_of(node), nt, Direction::Outgoing)
    }
    /// the predecessor reached by prepending `nt`.
    pub fn predecessor(&self, node: Node<N>, nt: TwoBit) -> Option<Node<N>> {
        self.step(self.kmer_of(node), nt, Direction::Incoming)
    }

    pub fn degree(&self, node: Node<N>, dir: Direction) -> usize {
        let kmer = self.kmer_of(node);
        TwoBit::ALL
            .iter()
            .filter(|&&nt| self.step(kmer, nt, dir).is_some())
            .count()
    }
    pub fn outdegree(&self, node: Node<N>) -> usize {
        self.degree(node, Direction::Outgoing)
    }
    pub fn indegree(&self, node: Node<N>) -> usize {
        self.degree(node, Direction::Incoming)
    }
    /// more than one way in or out.
    pub fn is_branching(&self, node: Node<N>) -> bool {
        let more_than_one = |dir| {
            let kmer = self.kmer_of(node);
            TwoBit::ALL
                .iter()
                .filter(|&&nt| self.step(kmer, nt, dir).is_some())
                .nth(1)
                .is_some()
        };
        more_than_one(Direction::Outgoing) || more_than_one(Direction::Incoming)
    }

    /// all nodes, forward strand, in the order of the solid k-mer collection.
    pub fn nodes(&self) -> Result<impl Iterator<Item = Result<Node<N>>> + '_> {
        Ok(self
            .index
            .solid()
            .iterator()?
            .map(|kmer| kmer.map(|k| Node::new(k, Strand::Forward))))
    }

    pub fn iterator(&self) -> NodeIterator<'_, N> {
        NodeIterator::new(self)
    }
}

impl<const N: usize> fmt::Debug for Graph<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("k", &self.model().kmerlen)
            .field("nodes", &self.size())
            .field("exact", &self.index.is_exact())
            .finish()
    }
}

enum Cursor<'a, const N: usize> {
    Uninitialized,
    Positioned {
        items: ItemIter<'a, Kmer<N>>,
        index: u64,
        node: Node<N>,
    },
    Done,
}

/// Explicit cursor over the nodes of a graph: `first`, then `item` and
/// `next` until `is_done`. Not to be shared between threads.
pub struct NodeIterator<'a, const N: usize> {
    graph: &'a Graph<N>,
    cursor: Cursor<'a, N>,
}

impl<'a, const N: usize> NodeIterator<'a, N> {
    pub fn new(graph: &'a Graph<N>) -> Self {
        NodeIterator {
            graph,
            cursor: Cursor::Uninitialized,
        }
    }

    fn advance(&mut self, mut items: ItemIter<'a, Kmer<N>>, index: u64) -> Result<()> {
        self.cursor = match items.next().transpose()? {
            Some(kmer) => Cursor::Positioned {
                items,
                index,
                node: Node::new(kmer, Strand::Forward),
            },
            None => Cursor::Done,
        };
        Ok(())
    }

    /// (re)start at the first node.
    pub fn first(&mut self) -> Result<()> {
        let items = self.graph.index.solid().iterator()?;
        self.advance(items, 0)
    }

    pub fn next(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.cursor, Cursor::Uninitialized) {
            Cursor::Positioned { items, index, .. } => self.advance(items, index + 1),
            other => {
                self.cursor = other;
                Err(KmerError::InvalidCursorState.into())
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.cursor, Cursor::Done)
    }

    pub fn item(&self) -> Result<Node<N>, KmerError> {
        match &self.cursor {
            Cursor::Positioned { node, .. } => Ok(*node),
            _ => Err(KmerError::InvalidCursorState),
        }
    }

    /// position of the current node, counted from the first.
    pub fn position(&self) -> Option<u64> {
        match &self.cursor {
            Cursor::Positioned { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// number of nodes an iteration visits.
    pub fn size(&self) -> u64 {
        self.graph.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(k: usize, seqs: &[&str]) -> Graph<1> {
        Graph::from_strings(GraphConfig::with_kmer_size(k), seqs).unwrap()
    }

    #[test]
    fn node_orientation() {
        let g = small(4, &["AATGC"]);
        let n = g.node("CATT").unwrap();
        assert_eq!(n.strand, Strand::Reverse);
        assert_eq!(g.to_string(n), "CATT");
        assert_eq!(g.to_string(n.reverse()), "AATG");
        assert_eq!(n.reverse(), g.node("AATG").unwrap());
        assert!(g.contains(n));
        assert!(matches!(g.node("AATN"), Err(KmerError::InvalidAlphabet { .. })));
        assert!(matches!(g.node("AAT"), Err(KmerError::SizeMismatch { .. })));
    }

    #[test]
    fn reverse_strand_edges_mirror() {
        let g = small(4, &["AATGC"]);
        let aatg = g.node("AATG").unwrap();
        let atgc = g.node("ATGC").unwrap();
        assert_eq!(g.successors(aatg).as_slice(), &[atgc]);
        assert_eq!(g.predecessors(atgc).as_slice(), &[aatg]);
        // walking the other strand: GCAT -> CATT
        assert_eq!(g.successors(atgc.reverse()).as_slice(), &[aatg.reverse()]);
        assert_eq!(g.successor(aatg, TwoBit::C), Some(atgc));
        assert_eq!(g.successor(aatg, TwoBit::A), None);
        assert_eq!(g.predecessor(atgc, TwoBit::A), Some(aatg));
    }

    #[test]
    fn branching() {
        // ACGA is followed by CGAT and CGAC
        let g = small(4, &["ACGAT", "ACGAC"]);
        let n = g.node("ACGA").unwrap();
        assert_eq!(g.outdegree(n), 2);
        assert!(g.is_branching(n));
        assert!(!g.is_branching(g.node("CGAT").unwrap()));
        let names: Vec<_> = g.successors(n).iter().map(|&s| g.to_string(s)).collect();
        // A, C, T, G order
        assert_eq!(names, vec!["CGAC", "CGAT"]);
    }

    #[test]
    fn cursor_states() {
        let g = small(4, &["AATGC"]);
        let mut it = g.iterator();
        assert_eq!(it.item(), Err(KmerError::InvalidCursorState));
        assert!(it.next().is_err());
        assert!(!it.is_done());
        it.first().unwrap();
        let mut seen = Vec::new();
        while !it.is_done() {
            seen.push(g.to_string(it.item().unwrap()));
            assert_eq!(it.position(), Some(seen.len() as u64 - 1));
            it.next().unwrap();
        }
        seen.sort();
        assert_eq!(seen, vec!["AATG", "ATGC"]);
        assert_eq!(it.size(), 2);
        assert_eq!(it.item(), Err(KmerError::InvalidCursorState));
        let err = it.next().err().unwrap();
        assert_eq!(err.downcast_ref::<KmerError>(), Some(&KmerError::InvalidCursorState));
        it.first().unwrap();
        assert!(!it.is_done());
    }

    #[test]
    fn debug_summary() {
        let g = small(4, &["AATGC"]);
        assert_eq!(format!("{:?}", g), "Graph { k: 4, nodes: 2, exact: true }");
    }
}
