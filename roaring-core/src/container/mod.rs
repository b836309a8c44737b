//! Per-chunk storage: one of three interchangeable encodings of a set of
//! 16-bit values.
//!
//! A non-run container holds an [`ArrayContainer`] exactly when its
//! cardinality is at most [`ARRAY_LIMIT`]; the portable format depends on it.

mod array;
mod bitset;
mod ops;
mod run;

use std::iter::Copied;
use std::slice;

pub(crate) use self::array::ArrayContainer;
pub(crate) use self::bitset::{BitsetContainer, BitsetIter};
pub(crate) use self::ops::SetOp;
pub(crate) use self::run::{Run, RunContainer, RunIter};

/// Largest cardinality stored as a sorted array rather than a bitset
pub const ARRAY_LIMIT: usize = 4096;

/// Number of 64-bit words in a bitset container
pub const BITMAP_WORDS: usize = 1024;

/// Serialized size in bytes of a bitset container
pub(crate) const BITSET_BYTES: usize = BITMAP_WORDS * 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContainerKind {
    Array,
    Bitset,
    Run,
}

#[derive(Clone, Debug)]
pub(crate) enum Container {
    Array(ArrayContainer),
    Bitset(BitsetContainer),
    Run(RunContainer),
}

impl Default for Container {
    fn default() -> Self {
        Container::Array(ArrayContainer::new())
    }
}

/// Serialized size of a non-run container with `cardinality` values
#[inline]
pub(crate) fn dense_size(cardinality: u32) -> usize {
    if cardinality as usize <= ARRAY_LIMIT {
        2 * cardinality as usize
    } else {
        BITSET_BYTES
    }
}

/// Serialized size of a run container with `runs` runs
#[inline]
pub(crate) fn run_size(runs: usize) -> usize {
    2 + 4 * runs
}

impl Container {
    /// The smallest encoding of `[start, end]`
    pub fn from_range(start: u16, end: u16) -> Self {
        Container::Run(RunContainer::from_range(start, end)).normalize(true)
    }

    pub fn full() -> Self {
        Container::Run(RunContainer::from_range(0, u16::MAX))
    }

    /// `values` must be strictly increasing
    pub fn from_sorted_values(values: Vec<u16>) -> Self {
        Container::Array(ArrayContainer::from_sorted_unchecked(values)).normalize(false)
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Array(_) => ContainerKind::Array,
            Container::Bitset(_) => ContainerKind::Bitset,
            Container::Run(_) => ContainerKind::Run,
        }
    }

    #[inline]
    pub fn is_run(&self) -> bool {
        matches!(self, Container::Run(_))
    }

    #[inline]
    pub fn is_bitset(&self) -> bool {
        matches!(self, Container::Bitset(_))
    }

    pub fn cardinality(&self) -> u32 {
        match self {
            Container::Array(a) => a.cardinality(),
            Container::Bitset(b) => b.cardinality(),
            Container::Run(r) => r.cardinality(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Container::Array(a) => a.is_empty(),
            Container::Bitset(b) => b.cardinality() == 0,
            Container::Run(r) => r.is_empty(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.cardinality() == 1 << 16
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        match self {
            Container::Array(a) => a.contains(value),
            Container::Bitset(b) => b.contains(value),
            Container::Run(r) => r.contains(value),
        }
    }

    pub fn add(&mut self, value: u16) -> bool {
        match self {
            Container::Array(a) => {
                if a.contains(value) {
                    return false;
                }
                if a.cardinality() as usize >= ARRAY_LIMIT {
                    let mut bits = a.to_bitset();
                    bits.add(value);
                    *self = Container::Bitset(bits);
                    true
                } else {
                    a.add(value)
                }
            }
            Container::Bitset(b) => b.add(value),
            Container::Run(r) => r.add(value),
        }
    }

    pub fn remove(&mut self, value: u16) -> bool {
        match self {
            Container::Array(a) => a.remove(value),
            Container::Bitset(b) => {
                let removed = b.remove(value);
                if removed && b.cardinality() as usize <= ARRAY_LIMIT {
                    *self = Container::Array(ArrayContainer::from_sorted_unchecked(
                        b.to_array_values(),
                    ));
                }
                removed
            }
            Container::Run(r) => r.remove(value),
        }
    }

    /// Adds `[start, end]`
    pub fn add_range(&mut self, start: u16, end: u16) {
        match self {
            Container::Bitset(b) => b.add_range(start, end),
            Container::Run(r) => r.add_range(start, end),
            Container::Array(a) => {
                let mut run = a.to_run();
                run.add_range(start, end);
                *self = Container::Run(run);
            }
        }
        *self = std::mem::take(self).normalize(true);
    }

    /// Removes `[start, end]`
    pub fn remove_range(&mut self, start: u16, end: u16) {
        match self {
            Container::Bitset(b) => b.remove_range(start, end),
            Container::Run(r) => r.remove_range(start, end),
            Container::Array(a) => a.retain(|v| v < start || v > end),
        }
        *self = std::mem::take(self).normalize(true);
    }

    /// Complements `[start, end]`
    pub fn flip_range(&mut self, start: u16, end: u16) {
        if let Container::Bitset(b) = self {
            b.flip_range(start, end);
            *self = std::mem::take(self).normalize(true);
        } else {
            *self = self.op(&Container::Run(RunContainer::from_range(start, end)), SetOp::Xor);
        }
    }

    pub fn minimum(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.minimum(),
            Container::Bitset(b) => b.minimum(),
            Container::Run(r) => r.minimum(),
        }
    }

    pub fn maximum(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.maximum(),
            Container::Bitset(b) => b.maximum(),
            Container::Run(r) => r.maximum(),
        }
    }

    /// Number of values `<= value`
    pub fn rank(&self, value: u16) -> u32 {
        match self {
            Container::Array(a) => a.rank(value),
            Container::Bitset(b) => b.rank(value),
            Container::Run(r) => r.rank(value),
        }
    }

    /// The `n`th smallest value, zero based
    pub fn select(&self, n: u32) -> Option<u16> {
        match self {
            Container::Array(a) => a.select(n),
            Container::Bitset(b) => b.select(n),
            Container::Run(r) => r.select(n),
        }
    }

    pub fn range_cardinality(&self, start: u16, end: u16) -> u32 {
        match self {
            Container::Array(a) => a.range_cardinality(start, end),
            Container::Bitset(b) => b.range_cardinality(start, end),
            Container::Run(r) => r.range_cardinality(start, end),
        }
    }

    pub fn contains_range(&self, start: u16, end: u16) -> bool {
        match self {
            Container::Array(a) => a.contains_range(start, end),
            Container::Bitset(b) => b.contains_range(start, end),
            Container::Run(r) => r.contains_range(start, end),
        }
    }

    pub fn num_runs(&self) -> usize {
        match self {
            Container::Array(a) => a.num_runs(),
            Container::Bitset(b) => b.num_runs(),
            Container::Run(r) => r.num_runs(),
        }
    }

    /// Bytes this container occupies in the portable format, excluding headers
    pub fn serialized_size(&self) -> usize {
        match self {
            Container::Run(r) => run_size(r.num_runs()),
            _ => dense_size(self.cardinality()),
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        match self {
            Container::Array(a) => Iter::Array(a.iter()),
            Container::Bitset(b) => Iter::Bitset(b.iter()),
            Container::Run(r) => Iter::Run(r.iter()),
        }
    }

    /// Iterate over values `>= from`
    pub fn iter_from(&self, from: u16) -> Iter<'_> {
        match self {
            Container::Array(a) => Iter::Array(a.iter_from(from)),
            Container::Bitset(b) => Iter::Bitset(b.iter_from(from)),
            Container::Run(r) => Iter::Run(r.iter_from(from)),
        }
    }

    pub fn to_bitset(&self) -> BitsetContainer {
        match self {
            Container::Array(a) => a.to_bitset(),
            Container::Bitset(b) => b.clone(),
            Container::Run(r) => r.to_bitset(),
        }
    }

    fn into_run(self) -> Self {
        match self {
            Container::Array(a) => Container::Run(a.to_run()),
            Container::Bitset(b) => Container::Run(b.to_run()),
            run @ Container::Run(_) => run,
        }
    }

    /// Array or bitset, by cardinality
    fn into_dense(self) -> Self {
        let array = self.cardinality() as usize <= ARRAY_LIMIT;
        match self {
            Container::Array(a) if !array => Container::Bitset(a.to_bitset()),
            Container::Bitset(b) if array => {
                Container::Array(ArrayContainer::from_sorted_unchecked(b.to_array_values()))
            }
            Container::Run(r) if array => {
                Container::Array(ArrayContainer::from_sorted_unchecked(r.to_array_values()))
            }
            Container::Run(r) => Container::Bitset(r.to_bitset()),
            dense => dense,
        }
    }

    /// Converts to the variant with the smallest serialized size.
    ///
    /// Runs are only a candidate when `consider_run` is set; on a tie an
    /// existing run container stays a run.
    pub fn normalize(self, consider_run: bool) -> Self {
        if self.is_empty() {
            return Container::default();
        }
        match self.normalized_kind(consider_run) {
            ContainerKind::Run => self.into_run(),
            _ => self.into_dense(),
        }
    }

    /// The variant [`normalize`](Self::normalize) would convert to
    pub fn normalized_kind(&self, consider_run: bool) -> ContainerKind {
        if self.is_empty() {
            return ContainerKind::Array;
        }
        if consider_run {
            let runs = run_size(self.num_runs());
            let dense = dense_size(self.cardinality());
            if runs < dense || (self.is_run() && runs <= dense) {
                return ContainerKind::Run;
            }
        }
        if self.cardinality() as usize <= ARRAY_LIMIT {
            ContainerKind::Array
        } else {
            ContainerKind::Bitset
        }
    }

    /// Picks the smallest variant, runs included. Returns whether the result
    /// is a run container.
    pub fn optimize(&mut self) -> bool {
        *self = std::mem::take(self).normalize(true);
        self.is_run()
    }

    /// Converts a run container to an array or bitset. Returns whether
    /// anything changed.
    pub fn remove_run_encoding(&mut self) -> bool {
        if !self.is_run() {
            return false;
        }
        *self = std::mem::take(self).into_dense();
        true
    }

    /// Recounts a lazily computed bitset and restores the size policy
    pub fn repair(&mut self) {
        if let Container::Bitset(b) = self {
            b.recount();
            *self = std::mem::take(self).normalize(false);
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a.intersects(b),
            (Container::Bitset(a), Container::Bitset(b)) => a.intersects(b),
            (Container::Run(a), Container::Run(b)) => a.intersects(b),
            (Container::Array(a), other) | (other, Container::Array(a)) => {
                a.iter().any(|v| other.contains(v))
            }
            (Container::Bitset(b), Container::Run(r)) | (Container::Run(r), Container::Bitset(b)) => r
                .runs()
                .iter()
                .any(|run| b.range_cardinality(run.start, run.end()) > 0),
        }
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        if self.cardinality() > other.cardinality() {
            return false;
        }
        match (self, other) {
            (Container::Bitset(a), Container::Bitset(b)) => a.is_subset(b),
            (Container::Run(a), Container::Run(b)) => a.difference(b).is_empty(),
            (Container::Run(a), other) => a
                .runs()
                .iter()
                .all(|run| other.contains_range(run.start, run.end())),
            _ => self.iter().all(|v| other.contains(v)),
        }
    }

    /// Union of two or more containers with a single recount
    pub fn union_many(containers: &[&Container]) -> Container {
        match containers {
            [] => Container::default(),
            [one] => (*one).clone(),
            _ => {
                if containers.iter().any(|c| c.is_full()) {
                    return Container::full();
                }
                let consider_run = containers.iter().any(|c| c.is_run());
                let total: usize = containers.iter().map(|c| c.cardinality() as usize).sum();
                let all_arrays = containers
                    .iter()
                    .all(|c| matches!(c, Container::Array(_)));
                if all_arrays && total <= ARRAY_LIMIT {
                    let mut values = Vec::with_capacity(total);
                    for c in containers {
                        values.extend(c.iter());
                    }
                    values.sort_unstable();
                    values.dedup();
                    return Container::Array(ArrayContainer::from_sorted_unchecked(values));
                }
                let mut bits = BitsetContainer::new();
                for c in containers {
                    match c {
                        Container::Array(a) => bits.apply_array_lazy(a.as_slice(), SetOp::Or),
                        Container::Bitset(b) => bits.apply_lazy(b, SetOp::Or),
                        Container::Run(r) => bits.apply_runs_lazy(r.runs(), SetOp::Or),
                    }
                }
                bits.recount();
                Container::Bitset(bits).normalize(consider_run)
            }
        }
    }

    /// Returns the number of bytes reclaimed
    pub fn shrink_to_fit(&mut self) -> usize {
        match self {
            Container::Array(a) => a.shrink_to_fit(),
            Container::Bitset(_) => 0,
            Container::Run(r) => r.shrink_to_fit(),
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a == b,
            (Container::Bitset(a), Container::Bitset(b)) => a == b,
            (Container::Run(a), Container::Run(b)) => a == b,
            _ => self.cardinality() == other.cardinality() && self.iter().eq(other.iter()),
        }
    }
}

impl Eq for Container {}

/// Ascending iterator over a container's values
#[derive(Clone)]
pub(crate) enum Iter<'a> {
    Array(Copied<slice::Iter<'a, u16>>),
    Bitset(BitsetIter<'a>),
    Run(RunIter<'a>),
}

impl Iterator for Iter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        match self {
            Iter::Array(it) => it.next(),
            Iter::Bitset(it) => it.next(),
            Iter::Run(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn array_bitset_threshold() {
        let mut c = Container::default();
        for v in 0..ARRAY_LIMIT as u16 {
            assert!(c.add(v * 2));
        }
        assert_eq!(c.kind(), ContainerKind::Array);
        c.add(1);
        assert_eq!(c.kind(), ContainerKind::Bitset);
        assert_eq!(c.cardinality() as usize, ARRAY_LIMIT + 1);
        c.remove(1);
        assert_eq!(c.kind(), ContainerKind::Array);
    }

    #[test]
    fn variants_are_equivalent() {
        let values: Vec<u16> = (100..1000).chain(5000..5010).collect();
        let array = Container::Array(ArrayContainer::from_sorted_unchecked(values.clone()));
        let bitset = Container::Bitset(array.to_bitset());
        let run = array.clone().into_run();
        for c in [&array, &bitset, &run] {
            assert_eq!(c.cardinality(), 910);
            assert!(c.contains(500));
            assert!(!c.contains(1000));
            assert_eq!(c.iter().collect::<Vec<_>>(), values);
            assert_eq!(c.select(900), Some(5000));
            assert_eq!(c.rank(5000), 901);
        }
        assert_eq!(array, bitset);
        assert_eq!(bitset, run);
    }

    #[test]
    fn normalize_picks_smallest() {
        let mut c = Container::from_sorted_values((100..1000).collect());
        assert_eq!(c.kind(), ContainerKind::Array);
        assert_eq!(c.serialized_size(), 1800);
        assert!(c.optimize());
        assert_eq!(c.serialized_size(), 6);
        assert!(c.optimize());

        assert!(c.remove_run_encoding());
        assert_eq!(c.kind(), ContainerKind::Array);
        assert!(!c.remove_run_encoding());

        let sparse = Container::from_sorted_values((0..100).map(|v| v * 3).collect());
        let mut optimized = sparse.clone();
        assert!(!optimized.optimize());
        assert_eq!(optimized.kind(), ContainerKind::Array);
    }

    #[test]
    fn range_mutations() {
        let mut c = Container::default();
        c.add_range(0, 9999);
        assert_eq!(c.kind(), ContainerKind::Run);
        assert_eq!(c.cardinality(), 10000);
        c.remove_range(10, 19);
        assert_eq!(c.cardinality(), 9990);
        c.flip_range(0, 19);
        assert_eq!(c.range_cardinality(0, 19), 10);
        assert!(c.contains_range(10, 19));
        assert!(!c.contains(0));

        let mut full = Container::default();
        full.flip_range(0, u16::MAX);
        assert!(full.is_full());
    }

    #[test]
    fn many_way_union() {
        let a = Container::from_sorted_values(vec![1, 2, 3]);
        let b = Container::from_sorted_values(vec![3, 4]);
        let c = Container::from_range(1000, 9000);
        assert_eq!(
            Container::union_many(&[&a, &b]).iter().collect::<Vec<_>>(),
            [1, 2, 3, 4]
        );
        let all = Container::union_many(&[&a, &b, &c]);
        assert_eq!(all.cardinality(), 4 + 8001);
        assert_eq!(all, a.op(&b, SetOp::Or).op(&c, SetOp::Or));
        assert!(Container::union_many(&[&a, &Container::full()]).is_full());
    }

    #[test]
    fn subset_and_intersects() {
        let small = Container::from_sorted_values(vec![5, 6, 7]);
        let range = Container::from_range(0, 100);
        assert!(small.is_subset(&range));
        assert!(!range.is_subset(&small));
        assert!(small.intersects(&range));
        assert!(!small.intersects(&Container::from_range(8, 50)));
    }

    #[test]
    fn normalized_kind_matches_conversion() {
        let mut run = Container::from_range(0, 9_999);
        for low in (20_000..30_000).step_by(2) {
            run.add(low);
        }
        let candidates = [
            Container::from_sorted_values((100..1000).collect()),
            Container::from_sorted_values((0..10_000).map(|v| v * 3).collect()),
            Container::from_range(0, 5),
            run,
        ];
        for c in candidates {
            for consider_run in [true, false] {
                let kind = c.normalized_kind(consider_run);
                assert_eq!(c.clone().normalize(consider_run).kind(), kind);
            }
        }
    }
}
