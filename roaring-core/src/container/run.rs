use std::slice;

use super::bitset::BitsetContainer;

/// A closed interval `[start, start + length]`
///
/// `length` is one less than the number of values, matching the portable
/// wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Run {
    pub start: u16,
    pub length: u16,
}

impl Run {
    #[inline]
    pub fn new(start: u16, end: u16) -> Self {
        debug_assert!(start <= end);
        Self {
            start,
            length: end - start,
        }
    }

    #[inline]
    pub fn end(&self) -> u16 {
        self.start + self.length
    }

    #[inline]
    pub fn cardinality(&self) -> u32 {
        u32::from(self.length) + 1
    }

    #[inline]
    fn bounds(&self) -> (u32, u32) {
        (u32::from(self.start), u32::from(self.end()))
    }
}

/// Appends `[start, end]`, coalescing with the last run when they touch.
/// Intervals must arrive ordered by `start`.
fn push_interval(out: &mut Vec<Run>, start: u32, end: u32) {
    if let Some(last) = out.last_mut() {
        let (last_start, last_end) = last.bounds();
        if start <= last_end + 1 {
            if end > last_end {
                *last = Run::new(last_start as u16, end as u16);
            }
            return;
        }
    }
    out.push(Run::new(start as u16, end as u16));
}

/// Sorted, non-overlapping, non-adjacent runs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RunContainer {
    runs: Vec<Run>,
}

impl RunContainer {
    pub fn from_range(start: u16, end: u16) -> Self {
        Self {
            runs: vec![Run::new(start, end)],
        }
    }

    /// `runs` must be sorted, non-overlapping and non-adjacent
    pub fn from_runs_unchecked(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// `values` must be strictly increasing
    pub fn from_sorted_values(values: &[u16]) -> Self {
        let mut runs: Vec<Run> = Vec::new();
        for &value in values {
            match runs.last_mut() {
                Some(last) if u32::from(last.end()) + 1 == u32::from(value) => last.length += 1,
                _ => runs.push(Run::new(value, value)),
            }
        }
        Self { runs }
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    #[inline]
    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn cardinality(&self) -> u32 {
        self.runs.iter().map(Run::cardinality).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Index of the first run starting after `value`
    #[inline]
    fn upper(&self, value: u16) -> usize {
        self.runs.partition_point(|r| r.start <= value)
    }

    pub fn contains(&self, value: u16) -> bool {
        let index = self.upper(value);
        index > 0 && self.runs[index - 1].end() >= value
    }

    pub fn add(&mut self, value: u16) -> bool {
        let index = self.upper(value);
        if index > 0 && self.runs[index - 1].end() >= value {
            return false;
        }
        let value32 = u32::from(value);
        let joins_left = index > 0 && u32::from(self.runs[index - 1].end()) + 1 == value32;
        let joins_right =
            index < self.runs.len() && u32::from(self.runs[index].start) == value32 + 1;
        match (joins_left, joins_right) {
            (true, true) => {
                let end = self.runs[index].end();
                self.runs[index - 1] = Run::new(self.runs[index - 1].start, end);
                self.runs.remove(index);
            }
            (true, false) => self.runs[index - 1].length += 1,
            (false, true) => {
                let run = &mut self.runs[index];
                run.start = value;
                run.length += 1;
            }
            (false, false) => self.runs.insert(index, Run::new(value, value)),
        }
        true
    }

    pub fn remove(&mut self, value: u16) -> bool {
        let index = self.upper(value);
        if index == 0 {
            return false;
        }
        let run = self.runs[index - 1];
        if run.end() < value {
            return false;
        }
        match (run.start == value, run.end() == value) {
            (true, true) => {
                self.runs.remove(index - 1);
            }
            (true, false) => self.runs[index - 1] = Run::new(value + 1, run.end()),
            (false, true) => self.runs[index - 1] = Run::new(run.start, value - 1),
            (false, false) => {
                self.runs[index - 1] = Run::new(run.start, value - 1);
                self.runs.insert(index, Run::new(value + 1, run.end()));
            }
        }
        true
    }

    pub fn minimum(&self) -> Option<u16> {
        self.runs.first().map(|r| r.start)
    }

    pub fn maximum(&self) -> Option<u16> {
        self.runs.last().map(Run::end)
    }

    /// Number of values `<= value`
    pub fn rank(&self, value: u16) -> u32 {
        self.runs[..self.upper(value)]
            .iter()
            .map(|r| u32::from(r.end().min(value) - r.start) + 1)
            .sum()
    }

    pub fn select(&self, n: u32) -> Option<u16> {
        let mut remaining = n;
        for run in &self.runs {
            if remaining <= u32::from(run.length) {
                return Some(run.start + remaining as u16);
            }
            remaining -= run.cardinality();
        }
        None
    }

    pub fn range_cardinality(&self, start: u16, end: u16) -> u32 {
        self.runs
            .iter()
            .filter(|r| r.end() >= start && r.start <= end)
            .map(|r| u32::from(r.end().min(end) - r.start.max(start)) + 1)
            .sum()
    }

    pub fn contains_range(&self, start: u16, end: u16) -> bool {
        let index = self.upper(start);
        index > 0 && self.runs[index - 1].end() >= end
    }

    pub fn iter(&self) -> RunIter<'_> {
        RunIter {
            runs: self.runs.iter(),
            current: 1,
            end: 0,
        }
    }

    /// Iterate over values `>= from`
    pub fn iter_from(&self, from: u16) -> RunIter<'_> {
        let index = self.runs.partition_point(|r| r.end() < from);
        match self.runs.get(index) {
            Some(run) => RunIter {
                runs: self.runs[index + 1..].iter(),
                current: u32::from(run.start.max(from)),
                end: u32::from(run.end()),
            },
            None => RunIter {
                runs: [].iter(),
                current: 1,
                end: 0,
            },
        }
    }

    pub fn to_bitset(&self) -> BitsetContainer {
        let mut bits = BitsetContainer::new();
        for run in &self.runs {
            bits.add_range(run.start, run.end());
        }
        bits
    }

    pub fn to_array_values(&self) -> Vec<u16> {
        let mut values = Vec::with_capacity(self.cardinality() as usize);
        values.extend(self.iter());
        values
    }

    /// Values of a sorted slice that are (`inside`) or are not contained
    pub fn filter_values(&self, values: &[u16], inside: bool) -> Vec<u16> {
        let mut out = Vec::with_capacity(values.len());
        let mut runs = self.runs.iter().peekable();
        for &value in values {
            while runs.next_if(|r| r.end() < value).is_some() {}
            let contained = runs.peek().is_some_and(|r| r.start <= value);
            if contained == inside {
                out.push(value);
            }
        }
        out
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = Vec::with_capacity(self.runs.len() + other.runs.len());
        let (a, b) = (&self.runs, &other.runs);
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            let next = if j >= b.len() || (i < a.len() && a[i].start <= b[j].start) {
                i += 1;
                a[i - 1]
            } else {
                j += 1;
                b[j - 1]
            };
            let (start, end) = next.bounds();
            push_interval(&mut out, start, end);
        }
        Self { runs: out }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = Vec::new();
        let (a, b) = (&self.runs, &other.runs);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (a_start, a_end) = a[i].bounds();
            let (b_start, b_end) = b[j].bounds();
            let start = a_start.max(b_start);
            let end = a_end.min(b_end);
            if start <= end {
                out.push(Run::new(start as u16, end as u16));
            }
            if a_end < b_end {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { runs: out }
    }

    /// Values in `self` but not in `other`
    pub fn difference(&self, other: &Self) -> Self {
        let mut out = Vec::with_capacity(self.runs.len());
        let b = &other.runs;
        let mut j = 0;
        for run in &self.runs {
            let (mut start, end) = run.bounds();
            while j < b.len() && u32::from(b[j].end()) < start {
                j += 1;
            }
            let mut k = j;
            while start <= end {
                match b.get(k) {
                    Some(cut) if u32::from(cut.start) <= end => {
                        let (cut_start, cut_end) = cut.bounds();
                        if cut_start > start {
                            out.push(Run::new(start as u16, (cut_start - 1) as u16));
                        }
                        start = cut_end + 1;
                        k += 1;
                    }
                    _ => {
                        out.push(Run::new(start as u16, end as u16));
                        break;
                    }
                }
            }
        }
        Self { runs: out }
    }

    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.difference(other).union(&other.difference(self))
    }

    pub fn intersects(&self, other: &Self) -> bool {
        let (a, b) = (&self.runs, &other.runs);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if a[i].start.max(b[j].start) <= a[i].end().min(b[j].end()) {
                return true;
            }
            if a[i].end() < b[j].end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    pub fn add_range(&mut self, start: u16, end: u16) {
        *self = self.union(&Self::from_range(start, end));
    }

    pub fn remove_range(&mut self, start: u16, end: u16) {
        *self = self.difference(&Self::from_range(start, end));
    }

    /// Returns the number of bytes reclaimed
    pub fn shrink_to_fit(&mut self) -> usize {
        let before = self.runs.capacity();
        self.runs.shrink_to_fit();
        (before - self.runs.capacity()) * std::mem::size_of::<Run>()
    }
}

/// Ascending iterator over the values of a [`RunContainer`]
#[derive(Clone)]
pub(crate) struct RunIter<'a> {
    runs: slice::Iter<'a, Run>,
    current: u32,
    end: u32,
}

impl Iterator for RunIter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        if self.current > self.end {
            let run = self.runs.next()?;
            (self.current, self.end) = run.bounds();
        }
        let value = self.current as u16;
        self.current += 1;
        Some(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn runs(bounds: &[(u16, u16)]) -> RunContainer {
        RunContainer::from_runs_unchecked(bounds.iter().map(|&(s, e)| Run::new(s, e)).collect())
    }

    #[test]
    fn add_joins_neighbours() {
        let mut r = runs(&[(1, 3), (5, 7)]);
        assert!(r.add(4));
        assert_eq!(r, runs(&[(1, 7)]));
        assert!(!r.add(4));
        assert!(r.add(0));
        assert!(r.add(9));
        assert!(r.add(8));
        assert_eq!(r, runs(&[(0, 9)]));
        assert!(r.add(65535));
        assert_eq!(r.cardinality(), 11);
    }

    #[test]
    fn remove_splits() {
        let mut r = runs(&[(10, 20)]);
        assert!(r.remove(15));
        assert_eq!(r, runs(&[(10, 14), (16, 20)]));
        assert!(r.remove(10));
        assert!(r.remove(20));
        assert!(!r.remove(20));
        assert_eq!(r, runs(&[(11, 14), (16, 19)]));
    }

    #[test]
    fn interval_merges() {
        let a = runs(&[(0, 10), (20, 30)]);
        let b = runs(&[(5, 25), (31, 40)]);
        assert_eq!(a.union(&b), runs(&[(0, 40)]));
        assert_eq!(a.intersect(&b), runs(&[(5, 10), (20, 25)]));
        assert_eq!(a.difference(&b), runs(&[(0, 4), (26, 30)]));
        assert_eq!(b.difference(&a), runs(&[(11, 19), (31, 40)]));
        assert_eq!(
            a.symmetric_difference(&b),
            runs(&[(0, 4), (11, 19), (26, 40)])
        );
        assert!(a.intersects(&b));
        assert!(!a.intersects(&runs(&[(11, 19)])));
    }

    #[test]
    fn rank_select_iter() {
        let r = runs(&[(2, 4), (10, 11), (65534, 65535)]);
        assert_eq!(r.rank(3), 2);
        assert_eq!(r.rank(10), 4);
        assert_eq!(r.rank(65535), 7);
        assert_eq!(r.select(4), Some(11));
        assert_eq!(r.select(7), None);
        assert_eq!(r.range_cardinality(3, 10), 3);
        assert!(r.contains_range(2, 4));
        assert!(!r.contains_range(4, 10));
        assert_eq!(
            r.iter().collect::<Vec<_>>(),
            [2, 3, 4, 10, 11, 65534, 65535]
        );
        assert_eq!(r.iter_from(4).collect::<Vec<_>>(), [4, 10, 11, 65534, 65535]);
        assert_eq!(r.iter_from(12).collect::<Vec<_>>(), [65534, 65535]);
        assert_eq!(r.filter_values(&[1, 3, 10, 12], true), [3, 10]);
        assert_eq!(r.filter_values(&[1, 3, 10, 12], false), [1, 12]);
    }
}
