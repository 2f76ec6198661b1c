//! Bitset primitives.
//!
//! Two flavors are needed by the solver: a fixed 64-bit [`Bitvector`] for
//! small per-box sets (box count is capped at 64, same cap the teacher
//! repo's arrays use), and a variable-length [`Zone`] — a bitset over the
//! `Z` reachable cells of a level, which commonly exceeds 64 for anything
//! bigger than a small puzzle.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::OnceLock;

/// Zobrist-style word salts for [`Zone::fold`], generated once from a
/// constant seed rather than sampled per process, the same discipline the
/// teacher repo's `zobrist.rs` uses for its per-cell hash tables — a fixed
/// seed keeps a level's transposition hash stable across runs, which §6's
/// persisted caches depend on. Reused cyclically across a zone's words
/// instead of sized to the zone, since zone length varies per level; this
/// only needs enough spread that the fold depends on word position, not
/// just word value, the blind spot a plain XOR fold has.
fn word_salts() -> &'static [u64] {
    static SALTS: OnceLock<Vec<u64>> = OnceLock::new();
    SALTS.get_or_init(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5a17_0b17_2a1e_9f3c);
        (0..256).map(|_| rng.next_u64()).collect()
    })
}

/// A fixed-capacity bitset over box indices 0..64.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bitvector {
    bits: u64,
}

impl Bitvector {
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    /// A bitvector with the low `n` bits set.
    pub fn full(n: u8) -> Self {
        assert!(n <= 64, "n out of bounds");
        Self {
            bits: if n == 64 { u64::MAX } else { (1u64 << n) - 1 },
        }
    }

    pub fn contains(&self, index: u8) -> bool {
        assert!(index < 64, "index out of bounds");
        (self.bits & (1u64 << index)) != 0
    }

    pub fn add(&mut self, index: u8) {
        assert!(index < 64, "index out of bounds");
        self.bits |= 1u64 << index;
    }

    pub fn remove(&mut self, index: u8) {
        assert!(index < 64, "index out of bounds");
        self.bits &= !(1u64 << index);
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn union(&self, other: &Bitvector) -> Bitvector {
        Bitvector {
            bits: self.bits | other.bits,
        }
    }

    pub fn add_all(&mut self, other: &Bitvector) {
        self.bits |= other.bits;
    }

    pub fn contains_any(&self, other: &Bitvector) -> bool {
        (self.bits & other.bits) != 0
    }

    pub fn is_subset_of(&self, other: &Bitvector) -> bool {
        (self.bits & !other.bits) == 0
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.bits == 0 {
            None
        } else {
            let index = self.bits.trailing_zeros() as u8;
            self.bits &= self.bits - 1;
            Some(index)
        }
    }

    pub fn iter(&self) -> BitvectorIter {
        BitvectorIter { bits: self.bits }
    }
}

pub struct BitvectorIter {
    bits: u64,
}

impl Iterator for BitvectorIter {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            None
        } else {
            let index = self.bits.trailing_zeros() as u8;
            self.bits &= self.bits - 1; // Clear the lowest set bit
            Some(index)
        }
    }
}

impl IntoIterator for &Bitvector {
    type Item = u8;
    type IntoIter = BitvectorIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A fixed-length (at construction) bitset over `len` grid cells. Used for
/// the box zone and the pusher-reachability zone that together make up a
/// [`crate::node::Node`].
///
/// Operations between `Zone`s of mismatched length panic: the length is
/// fixed for a level's lifetime and mismatches indicate a programmer
/// error, not a runtime condition to recover from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zone {
    words: Vec<u64>,
    len: usize,
}

const WORD_BITS: usize = 64;

impl Zone {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn check_len(&self, other: &Zone) {
        assert_eq!(self.len, other.len, "zone length mismatch");
    }

    /// Mask of valid bits in the final word (0 bits above `len`).
    fn tail_mask(&self) -> u64 {
        let rem = self.len % WORD_BITS;
        if rem == 0 { u64::MAX } else { (1u64 << rem) - 1 }
    }

    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "index out of bounds");
        (self.words[i / WORD_BITS] & (1u64 << (i % WORD_BITS))) != 0
    }

    pub fn set(&mut self, i: usize) {
        assert!(i < self.len, "index out of bounds");
        self.words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
    }

    pub fn clear(&mut self, i: usize) {
        assert!(i < self.len, "index out of bounds");
        self.words[i / WORD_BITS] &= !(1u64 << (i % WORD_BITS));
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn is_full(&self) -> bool {
        let mask = self.tail_mask();
        let (last, rest) = self.words.split_last().unwrap();
        rest.iter().all(|&w| w == u64::MAX) && (*last & mask) == mask
    }

    pub fn popcount(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_subset_of(&self, other: &Zone) -> bool {
        self.check_len(other);
        self.words
            .iter()
            .zip(&other.words)
            .all(|(&a, &b)| (a & !b) == 0)
    }

    pub fn or_with(&mut self, other: &Zone) {
        self.check_len(other);
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    pub fn and_with(&mut self, other: &Zone) {
        self.check_len(other);
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a &= b;
        }
    }

    pub fn xor_with(&mut self, other: &Zone) {
        self.check_len(other);
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a ^= b;
        }
    }

    /// In-place complement, restricted to the `len` valid bits.
    pub fn not(&mut self) {
        let mask = self.tail_mask();
        let last = self.words.len() - 1;
        for (i, w) in self.words.iter_mut().enumerate() {
            *w = if i == last { !*w & mask } else { !*w };
        }
    }

    /// In-place set difference: `self &= !other`.
    pub fn minus(&mut self, other: &Zone) {
        self.check_len(other);
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a &= !b;
        }
    }

    pub fn union(&self, other: &Zone) -> Zone {
        let mut result = self.clone();
        result.or_with(other);
        result
    }

    /// Removes and returns some set bit, or `None` if empty. Used by the
    /// deadlock detector's worklist-style traversals.
    pub fn pop(&mut self) -> Option<usize> {
        for (wi, w) in self.words.iter_mut().enumerate() {
            if *w != 0 {
                let bit = w.trailing_zeros() as usize;
                *w &= *w - 1;
                return Some(wi * WORD_BITS + bit);
            }
        }
        None
    }

    pub fn iter(&self) -> ZoneIter<'_> {
        ZoneIter {
            zone: self,
            word_idx: 0,
            word: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Fold hash input as described by the data model: a Zobrist-salted XOR
    /// of the zone's words. Exposed so [`crate::node::Node`] can combine two
    /// zones into one transposition-table key without relying on
    /// `Vec<u64>`'s default (length-prefixed) hash behavior.
    pub fn fold(&self) -> u64 {
        let salts = word_salts();
        self.words
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &w)| acc ^ (w ^ salts[i % salts.len()]))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.words.len() * 8);
        out.extend_from_slice(&(self.len as u64).to_le_bytes());
        for w in &self.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Zone> {
        if bytes.len() < 8 {
            return None;
        }
        let len = u64::from_le_bytes(bytes[0..8].try_into().ok()?) as usize;
        let nwords = len.div_ceil(WORD_BITS);
        if bytes.len() != 8 + nwords * 8 {
            return None;
        }
        let mut words = Vec::with_capacity(nwords);
        for i in 0..nwords {
            let start = 8 + i * 8;
            words.push(u64::from_le_bytes(bytes[start..start + 8].try_into().ok()?));
        }
        Some(Zone { words, len })
    }
}

pub struct ZoneIter<'a> {
    zone: &'a Zone,
    word_idx: usize,
    word: u64,
}

impl Iterator for ZoneIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.word != 0 {
                let bit = self.word.trailing_zeros() as usize;
                self.word &= self.word - 1;
                return Some(self.word_idx * WORD_BITS + bit);
            }
            self.word_idx += 1;
            self.word = *self.zone.words.get(self.word_idx)?;
        }
    }
}

impl<'a> IntoIterator for &'a Zone {
    type Item = usize;
    type IntoIter = ZoneIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitvector_get_set() {
        let mut bv = Bitvector::new();
        assert!(!bv.contains(0));
        bv.add(5);
        assert!(bv.contains(5));
        assert!(!bv.contains(63));
        bv.add(0);
        bv.add(63);
        assert!(bv.contains(0));
        assert!(bv.contains(63));
    }

    #[test]
    fn test_bitvector_remove() {
        let mut bv = Bitvector::full(5);
        assert_eq!(bv.len(), 5);
        bv.remove(2);
        assert!(!bv.contains(2));
        assert_eq!(bv.len(), 4);
    }

    #[test]
    fn test_bitvector_iter_all() {
        let mut bv = Bitvector::new();
        for i in 0..64 {
            bv.add(i);
        }
        let indexes: Vec<u8> = bv.iter().collect();
        assert_eq!(indexes, (0..64).collect::<Vec<u8>>());
    }

    #[test]
    fn test_zone_basic() {
        let mut z = Zone::new(130);
        assert!(z.is_empty());
        z.set(0);
        z.set(64);
        z.set(129);
        assert!(z.get(0) && z.get(64) && z.get(129));
        assert!(!z.get(1));
        assert_eq!(z.popcount(), 3);
        z.clear(64);
        assert!(!z.get(64));
        assert_eq!(z.popcount(), 2);
    }

    #[test]
    fn test_zone_is_full() {
        let mut z = Zone::new(70);
        assert!(!z.is_full());
        for i in 0..70 {
            z.set(i);
        }
        assert!(z.is_full());
    }

    #[test]
    fn test_zone_set_algebra() {
        let mut a = Zone::new(128);
        let mut b = Zone::new(128);
        a.set(1);
        a.set(100);
        b.set(100);
        b.set(2);

        assert!(!a.is_subset_of(&b));
        let mut c = a.clone();
        c.and_with(&b);
        assert_eq!(c.popcount(), 1);
        assert!(c.get(100));

        let mut d = a.clone();
        d.or_with(&b);
        assert_eq!(d.popcount(), 3);

        let mut e = a.clone();
        e.minus(&b);
        assert_eq!(e.popcount(), 1);
        assert!(e.get(1));
    }

    #[test]
    fn test_zone_not_respects_length() {
        let mut z = Zone::new(5);
        z.set(0);
        z.not();
        assert_eq!(z.popcount(), 4);
        assert!(!z.get(0));
        for i in 1..5 {
            assert!(z.get(i));
        }
    }

    #[test]
    fn test_zone_roundtrip_bytes() {
        let mut z = Zone::new(200);
        z.set(3);
        z.set(150);
        z.set(199);
        let bytes = z.to_bytes();
        let back = Zone::from_bytes(&bytes).unwrap();
        assert_eq!(z, back);
    }

    #[test]
    fn test_zone_pop() {
        let mut z = Zone::new(70);
        z.set(3);
        z.set(69);
        let mut popped = Vec::new();
        while let Some(i) = z.pop() {
            popped.push(i);
        }
        popped.sort_unstable();
        assert_eq!(popped, vec![3, 69]);
        assert!(z.is_empty());
    }

    #[test]
    fn test_zone_iter() {
        let mut z = Zone::new(100);
        z.set(0);
        z.set(63);
        z.set(64);
        z.set(99);
        let bits: Vec<usize> = z.iter().collect();
        assert_eq!(bits, vec![0, 63, 64, 99]);
    }

    #[test]
    #[should_panic(expected = "zone length mismatch")]
    fn test_zone_mismatch_panics() {
        let a = Zone::new(10);
        let b = Zone::new(20);
        let _ = a.is_subset_of(&b);
    }
}
