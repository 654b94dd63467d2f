// (c) Roel Kluin, 2023, GPL v3

use crate::kmerconst::{Kmer, KmerConst};
use crate::new_types::strand::Strand;
use crate::new_types::twobit::TwoBit;

const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

const fn splitmix_table(seed: u64) -> [u64; 256] {
    let mut t = [0_u64; 256];
    let mut s = seed;
    let mut i = 0;
    while i < 256 {
        s = s.wrapping_add(GOLDEN);
        let mut z = s;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        t[i] = z ^ (z >> 31);
        i += 1;
    }
    t
}

/// fixed, so narrow hashes are stable across runs and builds.
static RANDOM_VALUES: [u64; 256] = splitmix_table(0x40164);

#[inline]
fn hash64(key: u64, seed: u64) -> u64 {
    let mut hash = seed;
    hash ^= (hash << 7)
        ^ key.wrapping_mul(hash >> 3)
        ^ !((hash << 11).wrapping_add(key ^ (hash >> 5)));
    hash = (!hash).wrapping_add(hash << 21);
    hash ^= hash >> 24;
    hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
    hash ^= hash >> 14;
    hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
    hash ^= hash >> 28;
    hash.wrapping_add(hash << 31)
}

#[inline]
fn oahash64(key: u64) -> u64 {
    let mut code = key;
    code ^= code >> 14;
    code = (!code).wrapping_add(code << 18);
    code ^= code >> 31;
    code = code.wrapping_mul(21);
    code ^= code >> 11;
    code = code.wrapping_add(code << 6);
    code ^ (code >> 22)
}

/// Primary table hash of a packed k-mer.
///
/// Words are hashed with a per-word seed so equal words do not cancel.
pub fn hash<const N: usize>(key: Kmer<N>, seed: u64) -> u64 {
    key.words()
        .iter()
        .enumerate()
        .fold(0, |h, (i, &w)| h ^ hash64(w, seed ^ GOLDEN.wrapping_mul(i as u64)))
}

/// Secondary hash, independent of `hash`, for rehashing and probe steps.
pub fn hash_open_addressing<const N: usize>(key: Kmer<N>) -> u64 {
    key.words()
        .iter()
        .enumerate()
        .fold(0, |h, (i, &w)| {
            h ^ oahash64(w.wrapping_add(GOLDEN.wrapping_mul(i as u64)))
        })
}

/// Cheap hash of the 16 bits of the packed value starting at bit `shift`.
#[inline]
pub fn narrow_hash<const N: usize>(key: Kmer<N>, shift: usize) -> u64 {
    let input = (key >> shift).low_u64();
    RANDOM_VALUES[(input & 255) as usize] ^ RANDOM_VALUES[((input >> 8) & 255) as usize].rotate_left(32)
}

/// A k-mer read from a sequence, with both strands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Xmer<const N: usize> {
    /// offset of the first nucleotide in the sequence.
    pub pos: usize,
    pub dna: Kmer<N>,
    pub rc: Kmer<N>,
}

impl<const N: usize> Xmer<N> {
    pub fn canonical(&self) -> Kmer<N> {
        self.dna.min(self.rc)
    }
    /// Forward if the sequence reads the canonical k-mer. Palindromes are forward.
    pub fn strand(&self) -> Strand {
        if self.dna <= self.rc {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

/// Every overlapping k-mer of a raw sequence, both strands updated per nucleotide.
pub struct KmerIter<'a, const N: usize> {
    kc: &'a KmerConst<N>,
    seq: &'a [u8],
    i: usize,
    filled: usize,
    dna: Kmer<N>,
    rc: Kmer<N>,
}

impl<'a, const N: usize> KmerIter<'a, N> {
    pub(crate) fn new(kc: &'a KmerConst<N>, seq: &'a [u8]) -> Self {
        KmerIter {
            kc,
            seq,
            i: 0,
            filled: 0,
            dna: Kmer::zero(),
            rc: Kmer::zero(),
        }
    }
}

impl<'a, const N: usize> Iterator for KmerIter<'a, N> {
    type Item = Xmer<N>;

    fn next(&mut self) -> Option<Xmer<N>> {
        while let Some(&b) = self.seq.get(self.i) {
            self.i += 1;
            match TwoBit::from_ascii(b) {
                Some(b2) => {
                    // XXX function is hot
                    self.dna = self.kc.append(self.dna, b2);
                    self.rc = self.kc.prepend(self.rc, b2.complement());
                    self.filled += 1;
                    if self.filled >= self.kc.kmerlen {
                        return Some(Xmer {
                            pos: self.i - self.kc.kmerlen,
                            dna: self.dna,
                            rc: self.rc,
                        });
                    }
                }
                None => {
                    dbg_print!("skipping {:?} at {}", b as char, self.i - 1);
                    self.filled = 0;
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.seq.len() - self.i + self.filled;
        (0, Some((rest + 1).saturating_sub(self.kc.kmerlen)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;
    use rand::{thread_rng, Rng};

    #[test]
    fn test_rolling_strands() {
        let kc = KmerConst::<1>::new(4).unwrap();
        let xmers: Vec<_> = kc.iter(b"AATGC").collect();
        assert_eq!(xmers.len(), 2);
        assert_eq!(kc.decode(xmers[0].dna), "AATG");
        assert_eq!(kc.decode(xmers[0].rc), "CATT");
        assert_eq!(kc.decode(xmers[1].dna), "ATGC");
        assert_eq!(kc.decode(xmers[1].rc), "GCAT");
        assert_eq!(xmers[1].pos, 1);
        assert_eq!(xmers[0].strand(), Strand::Forward);
    }
    #[test]
    fn test_n_resets_window() {
        let kc = KmerConst::<1>::new(3).unwrap();
        let xmers: Vec<_> = kc.iter(b"ACGNTTAnCC").collect();
        let decoded: Vec<_> = xmers.iter().map(|x| kc.decode(x.dna)).collect();
        assert_eq!(decoded, vec!["ACG", "TTA"]);
        assert_eq!(xmers[1].pos, 4);
        assert_eq!(kc.iter(b"AC").count(), 0);
    }
    #[test]
    fn test_rolling_matches_codec() {
        let mut rng = thread_rng();
        let k = rng.gen_range(20..=64);
        let kc = KmerConst::<2>::new(k).unwrap();
        let seq: Vec<u8> = (0..200).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
        let mut n = 0;
        for x in kc.iter(&seq) {
            let v = kc.encode(&seq[x.pos..x.pos + k]).unwrap();
            assert_eq!(x.dna, v);
            assert_eq!(x.rc, kc.reverse_complement(v));
            assert_eq!(x.canonical(), kc.canonical(v));
            n += 1;
        }
        assert_eq!(n, 200 - k + 1);
    }
    #[test]
    fn test_hash_deterministic_and_seeded() {
        let v = Kmer::<2>::from_words([0x1234_5678_9abc_def0, 0x42]);
        assert_eq!(hash(v, 7), hash(v, 7));
        assert_ne!(hash(v, 7), hash(v, 8));
        assert_ne!(hash(v, 0), hash_open_addressing(v));
        // equal words must not cancel
        assert_ne!(hash(Kmer::<2>::from_words([5, 5]), 0), 0);
        assert_ne!(hash_open_addressing(Kmer::<2>::from_words([5, 5])), 0);
    }
    #[test]
    fn test_hash_spreads() {
        let n = 1 << 12;
        let mut low = AHashSet::new();
        let mut oa = AHashSet::new();
        for i in 0..n {
            let v = Kmer::<1>::from(i as u64);
            low.insert(hash(v, 0) & 0xffff);
            oa.insert(hash_open_addressing(v) & 0xffff);
        }
        // 4096 keys into 65536 buckets; a good mix leaves few collisions.
        assert!(low.len() > n * 9 / 10, "{}", low.len());
        assert!(oa.len() > n * 9 / 10, "{}", oa.len());
    }
    #[test]
    fn test_narrow_hash_window() {
        let a = Kmer::<2>::from_words([0xff_ab_cd_00, 0]);
        let b = Kmer::<2>::from_words([0x11_ab_cd_00, 0]);
        assert_eq!(narrow_hash(a, 8), narrow_hash(b, 8));
        assert_ne!(narrow_hash(a, 16), narrow_hash(b, 16));
        let c = Kmer::<2>::from_words([0, 0xabcd]);
        assert_eq!(narrow_hash(c, 64), narrow_hash(Kmer::<2>::from(0xabcd), 0));
    }
}
