use std::fmt;

use super::ops::SetOp;
use super::run::{Run, RunContainer};
use super::BITMAP_WORDS;

/// A fixed 65536-bit vector with a maintained cardinality
///
/// Lazy operations (`apply_lazy`, `apply_array_lazy`) leave `cardinality`
/// stale until [`recount`](Self::recount) is called.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct BitsetContainer {
    words: Box<[u64; BITMAP_WORDS]>,
    cardinality: u32,
}

impl fmt::Debug for BitsetContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitsetContainer")
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

/// Calls `f(word_index, mask)` for each word overlapping `[start, end]`
#[inline]
fn for_each_masked_word<F: FnMut(usize, u64)>(start: u16, end: u16, mut f: F) {
    let (start, end) = (usize::from(start), usize::from(end));
    let (first, last) = (start / 64, end / 64);
    for index in first..=last {
        let mut mask = !0u64;
        if index == first {
            mask &= !0u64 << (start % 64);
        }
        if index == last {
            mask &= !0u64 >> (63 - end % 64);
        }
        f(index, mask);
    }
}

impl BitsetContainer {
    pub fn new() -> Self {
        Self {
            words: Box::new([0; BITMAP_WORDS]),
            cardinality: 0,
        }
    }

    #[cfg(test)]
    pub fn full() -> Self {
        Self {
            words: Box::new([!0; BITMAP_WORDS]),
            cardinality: 1 << 16,
        }
    }

    pub fn from_words(words: Box<[u64; BITMAP_WORDS]>) -> Self {
        let mut bits = Self {
            words,
            cardinality: 0,
        };
        bits.recount();
        bits
    }

    #[inline]
    pub fn words(&self) -> &[u64; BITMAP_WORDS] {
        &self.words
    }

    #[inline]
    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    pub fn recount(&mut self) {
        self.cardinality = self.words.iter().map(|w| w.count_ones()).sum();
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        let value = usize::from(value);
        self.words[value / 64] & (1 << (value % 64)) != 0
    }

    #[inline]
    pub fn add(&mut self, value: u16) -> bool {
        let value = usize::from(value);
        let word = &mut self.words[value / 64];
        let bit = 1u64 << (value % 64);
        let added = *word & bit == 0;
        *word |= bit;
        self.cardinality += u32::from(added);
        added
    }

    #[inline]
    pub fn remove(&mut self, value: u16) -> bool {
        let value = usize::from(value);
        let word = &mut self.words[value / 64];
        let bit = 1u64 << (value % 64);
        let removed = *word & bit != 0;
        *word &= !bit;
        self.cardinality -= u32::from(removed);
        removed
    }

    pub fn add_range(&mut self, start: u16, end: u16) {
        let words = &mut self.words;
        let mut added = 0;
        for_each_masked_word(start, end, |i, mask| {
            added += (mask & !words[i]).count_ones();
            words[i] |= mask;
        });
        self.cardinality += added;
    }

    pub fn remove_range(&mut self, start: u16, end: u16) {
        let words = &mut self.words;
        let mut removed = 0;
        for_each_masked_word(start, end, |i, mask| {
            removed += (mask & words[i]).count_ones();
            words[i] &= !mask;
        });
        self.cardinality -= removed;
    }

    pub fn flip_range(&mut self, start: u16, end: u16) {
        let words = &mut self.words;
        let mut cardinality = self.cardinality;
        for_each_masked_word(start, end, |i, mask| {
            cardinality -= (mask & words[i]).count_ones();
            words[i] ^= mask;
            cardinality += (mask & words[i]).count_ones();
        });
        self.cardinality = cardinality;
    }

    pub fn range_cardinality(&self, start: u16, end: u16) -> u32 {
        let mut count = 0;
        for_each_masked_word(start, end, |i, mask| {
            count += (mask & self.words[i]).count_ones();
        });
        count
    }

    pub fn contains_range(&self, start: u16, end: u16) -> bool {
        let mut all = true;
        for_each_masked_word(start, end, |i, mask| {
            all &= self.words[i] & mask == mask;
        });
        all
    }

    pub fn minimum(&self) -> Option<u16> {
        self.words
            .iter()
            .position(|&w| w != 0)
            .map(|i| (i * 64) as u16 + self.words[i].trailing_zeros() as u16)
    }

    pub fn maximum(&self) -> Option<u16> {
        self.words
            .iter()
            .rposition(|&w| w != 0)
            .map(|i| (i * 64) as u16 + 63 - self.words[i].leading_zeros() as u16)
    }

    /// Number of values `<= value`
    pub fn rank(&self, value: u16) -> u32 {
        let value = usize::from(value);
        let index = value / 64;
        let below: u32 = self.words[..index].iter().map(|w| w.count_ones()).sum();
        below + (self.words[index] & (!0u64 >> (63 - value % 64))).count_ones()
    }

    pub fn select(&self, n: u32) -> Option<u16> {
        let mut remaining = n;
        for (i, &word) in self.words.iter().enumerate() {
            let ones = word.count_ones();
            if remaining < ones {
                let mut word = word;
                for _ in 0..remaining {
                    word &= word - 1;
                }
                return Some((i * 64) as u16 + word.trailing_zeros() as u16);
            }
            remaining -= ones;
        }
        None
    }

    pub fn num_runs(&self) -> usize {
        let mut runs = 0;
        let mut carry = 0u64;
        for &word in self.words.iter() {
            runs += (word & !((word << 1) | carry)).count_ones() as usize;
            carry = word >> 63;
        }
        runs
    }

    /// Maximal runs of set bits in ascending order
    pub fn runs(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut i = 0;
        let mut word = self.words[0];
        loop {
            while word == 0 && i < BITMAP_WORDS - 1 {
                i += 1;
                word = self.words[i];
            }
            if word == 0 {
                break;
            }
            let start = i * 64 + word.trailing_zeros() as usize;
            word |= word - 1;
            while word == !0 && i < BITMAP_WORDS - 1 {
                i += 1;
                word = self.words[i];
            }
            if word == !0 {
                runs.push(Run::new(start as u16, u16::MAX));
                break;
            }
            let end = i * 64 + (!word).trailing_zeros() as usize;
            runs.push(Run::new(start as u16, (end - 1) as u16));
            word &= word + 1;
        }
        runs
    }

    pub fn to_run(&self) -> RunContainer {
        RunContainer::from_runs_unchecked(self.runs())
    }

    pub fn to_array_values(&self) -> Vec<u16> {
        let mut values = Vec::with_capacity(self.cardinality as usize);
        values.extend(self.iter());
        values
    }

    pub fn iter(&self) -> BitsetIter<'_> {
        BitsetIter {
            words: &self.words,
            index: 0,
            current: self.words[0],
        }
    }

    /// Iterate over values `>= from`
    pub fn iter_from(&self, from: u16) -> BitsetIter<'_> {
        let from = usize::from(from);
        let index = from / 64;
        BitsetIter {
            words: &self.words,
            index,
            current: self.words[index] & (!0u64 << (from % 64)),
        }
    }

    /// Word-wise operation without maintaining the cardinality
    pub fn apply_lazy(&mut self, other: &Self, op: SetOp) {
        for (a, &b) in self.words.iter_mut().zip(other.words.iter()) {
            *a = op.apply_word(*a, b);
        }
    }

    /// Sets (for `Or`) or toggles (for `Xor`) each value without maintaining
    /// the cardinality
    pub fn apply_array_lazy(&mut self, values: &[u16], op: SetOp) {
        for &value in values {
            let value = usize::from(value);
            let bit = 1u64 << (value % 64);
            let word = &mut self.words[value / 64];
            *word = op.apply_word(*word, bit);
        }
    }

    pub fn apply_runs_lazy(&mut self, runs: &[Run], op: SetOp) {
        let words = &mut self.words;
        for run in runs {
            for_each_masked_word(run.start, run.end(), |i, mask| {
                words[i] = op.apply_word(words[i], mask);
            });
        }
    }

    pub fn combine(&self, other: &Self, op: SetOp) -> Self {
        let mut out = self.clone();
        out.apply_lazy(other, op);
        out.recount();
        out
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & !b == 0)
    }
}

/// Ascending iterator over the set bits of a [`BitsetContainer`]
#[derive(Clone)]
pub(crate) struct BitsetIter<'a> {
    words: &'a [u64; BITMAP_WORDS],
    index: usize,
    current: u64,
}

impl Iterator for BitsetIter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        while self.current == 0 {
            self.index += 1;
            if self.index >= BITMAP_WORDS {
                return None;
            }
            self.current = self.words[self.index];
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some((self.index * 64 + bit) as u16)
    }
}
