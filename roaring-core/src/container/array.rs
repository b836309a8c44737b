use std::cmp::Ordering;
use std::slice;

use super::bitset::BitsetContainer;
use super::ops::SetOp;
use super::run::RunContainer;

/// Sorted, deduplicated 16-bit values
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ArrayContainer {
    values: Vec<u16>,
}

impl ArrayContainer {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// `values` must be strictly increasing
    pub fn from_sorted_unchecked(values: Vec<u16>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
        Self { values }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.values
    }

    #[inline]
    pub fn cardinality(&self) -> u32 {
        self.values.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    pub fn add(&mut self, value: u16) -> bool {
        // Appending in order is the common case for bulk loads
        match self.values.last() {
            None => {
                self.values.push(value);
                return true;
            }
            Some(&last) if last < value => {
                self.values.push(value);
                return true;
            }
            _ => {}
        }
        match self.values.binary_search(&value) {
            Ok(_) => false,
            Err(loc) => {
                self.values.insert(loc, value);
                true
            }
        }
    }

    pub fn remove(&mut self, value: u16) -> bool {
        match self.values.binary_search(&value) {
            Ok(loc) => {
                self.values.remove(loc);
                true
            }
            Err(_) => false,
        }
    }

    pub fn minimum(&self) -> Option<u16> {
        self.values.first().copied()
    }

    pub fn maximum(&self) -> Option<u16> {
        self.values.last().copied()
    }

    /// Number of values `<= value`
    pub fn rank(&self, value: u16) -> u32 {
        self.values.partition_point(|&v| v <= value) as u32
    }

    pub fn select(&self, n: u32) -> Option<u16> {
        self.values.get(n as usize).copied()
    }

    pub fn range_cardinality(&self, start: u16, end: u16) -> u32 {
        let lo = self.values.partition_point(|&v| v < start);
        let hi = self.values.partition_point(|&v| v <= end);
        (hi - lo) as u32
    }

    pub fn contains_range(&self, start: u16, end: u16) -> bool {
        self.range_cardinality(start, end) == u32::from(end - start) + 1
    }

    pub fn num_runs(&self) -> usize {
        self.values
            .iter()
            .enumerate()
            .filter(|&(i, &v)| i == 0 || self.values[i - 1] + 1 != v)
            .count()
    }

    #[inline]
    pub fn iter(&self) -> std::iter::Copied<slice::Iter<'_, u16>> {
        self.values.iter().copied()
    }

    /// Iterate over values `>= from`
    pub fn iter_from(&self, from: u16) -> std::iter::Copied<slice::Iter<'_, u16>> {
        let skip = self.values.partition_point(|&v| v < from);
        self.values[skip..].iter().copied()
    }

    pub fn retain<F: FnMut(u16) -> bool>(&mut self, mut f: F) {
        self.values.retain(|&v| f(v));
    }

    pub fn to_bitset(&self) -> BitsetContainer {
        let mut bits = BitsetContainer::new();
        for &value in &self.values {
            bits.add(value);
        }
        bits
    }

    pub fn to_run(&self) -> RunContainer {
        RunContainer::from_sorted_values(&self.values)
    }

    /// Returns the number of bytes reclaimed
    pub fn shrink_to_fit(&mut self) -> usize {
        let before = self.values.capacity();
        self.values.shrink_to_fit();
        (before - self.values.capacity()) * std::mem::size_of::<u16>()
    }

    /// Two-pointer merge of two sorted arrays
    pub fn merge(&self, other: &Self, op: SetOp) -> Self {
        let (a, b) = (self.as_slice(), other.as_slice());
        let capacity = match op {
            SetOp::And => a.len().min(b.len()),
            SetOp::AndNot => a.len(),
            SetOp::Or | SetOp::Xor => a.len() + b.len(),
        };
        let mut out = Vec::with_capacity(capacity);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    if op.keeps_left() {
                        out.push(a[i]);
                    }
                    i += 1;
                }
                Ordering::Greater => {
                    if op.keeps_right() {
                        out.push(b[j]);
                    }
                    j += 1;
                }
                Ordering::Equal => {
                    if op.keeps_both() {
                        out.push(a[i]);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        if op.keeps_left() {
            out.extend_from_slice(&a[i..]);
        }
        if op.keeps_right() {
            out.extend_from_slice(&b[j..]);
        }
        Self { values: out }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        let (a, b) = (self.as_slice(), other.as_slice());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return true,
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn array(values: &[u16]) -> ArrayContainer {
        ArrayContainer::from_sorted_unchecked(values.to_vec())
    }

    #[test]
    fn add_remove() {
        let mut a = ArrayContainer::new();
        assert!(a.add(5));
        assert!(a.add(1));
        assert!(a.add(9));
        assert!(!a.add(5));
        assert_eq!(a.as_slice(), [1, 5, 9]);
        assert!(a.remove(5));
        assert!(!a.remove(5));
        assert_eq!(a.as_slice(), [1, 9]);
    }

    #[test]
    fn merges() {
        let a = array(&[1, 2, 3, 10]);
        let b = array(&[2, 10, 11]);
        assert_eq!(a.merge(&b, SetOp::And).as_slice(), [2, 10]);
        assert_eq!(a.merge(&b, SetOp::Or).as_slice(), [1, 2, 3, 10, 11]);
        assert_eq!(a.merge(&b, SetOp::Xor).as_slice(), [1, 3, 11]);
        assert_eq!(a.merge(&b, SetOp::AndNot).as_slice(), [1, 3]);
        assert_eq!(b.merge(&a, SetOp::AndNot).as_slice(), [11]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&array(&[4, 5])));
    }

    #[test]
    fn rank_select_runs() {
        let a = array(&[1, 2, 3, 7, 8, 100]);
        assert_eq!(a.rank(0), 0);
        assert_eq!(a.rank(3), 3);
        assert_eq!(a.rank(50), 5);
        assert_eq!(a.select(3), Some(7));
        assert_eq!(a.select(6), None);
        assert_eq!(a.num_runs(), 3);
        assert_eq!(a.range_cardinality(2, 8), 4);
        assert!(a.contains_range(1, 3));
        assert!(!a.contains_range(1, 4));
        assert_eq!(a.iter_from(4).collect::<Vec<_>>(), [7, 8, 100]);
    }
}
