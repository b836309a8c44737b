use std::cmp::Ordering;
use std::mem;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use tracing::trace;

use super::index::ChunkIndex;
use super::{join, split, Bitmap, Deserializer, Serializer, Statistics};
use crate::container::{Container, ContainerKind, SetOp};
use crate::{Error, Native, Portable};

impl Bitmap {
    #[inline]
    pub(crate) fn from_index(index: ChunkIndex, copy_on_write: bool) -> Self {
        Bitmap {
            index,
            copy_on_write,
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// Builds a bitmap from values in strictly ascending order
    pub(crate) fn from_sorted_iter<I: IntoIterator<Item = u32>>(values: I) -> Self {
        let mut index = ChunkIndex::new();
        let mut current: Option<u16> = None;
        let mut lows = Vec::new();
        for value in values {
            let (key, low) = split(value);
            if current != Some(key) {
                if let Some(previous) = current {
                    index.push(previous, Container::from_sorted_values(mem::take(&mut lows)));
                }
                current = Some(key);
            }
            lows.push(low);
        }
        if let Some(previous) = current {
            index.push(previous, Container::from_sorted_values(lows));
        }
        Bitmap::from_index(index, false)
    }

    /// Two-pointer merge of both chunk indexes by ascending key
    fn merge(&self, other: &Self, op: SetOp) -> Self {
        let (a, b) = (&self.index, &other.index);
        let mut out = ChunkIndex::with_capacity(match op {
            SetOp::And => a.len().min(b.len()),
            SetOp::AndNot => a.len(),
            SetOp::Or | SetOp::Xor => a.len() + b.len(),
        });
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (key_a, key_b) = (a.key_at(i), b.key_at(j));
            match key_a.cmp(&key_b) {
                Ordering::Less => {
                    if op.keeps_left() {
                        out.push_copy(key_a, a.shared_at(i), self.copy_on_write);
                    }
                    i += 1;
                }
                Ordering::Greater => {
                    if op.keeps_right() {
                        out.push_copy(key_b, b.shared_at(j), other.copy_on_write);
                    }
                    j += 1;
                }
                Ordering::Equal => {
                    let container = a.container_at(i).op(b.container_at(j), op);
                    if !container.is_empty() {
                        out.push(key_a, container);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        if op.keeps_left() {
            for i in i..a.len() {
                out.push_copy(a.key_at(i), a.shared_at(i), self.copy_on_write);
            }
        }
        if op.keeps_right() {
            for j in j..b.len() {
                out.push_copy(b.key_at(j), b.shared_at(j), other.copy_on_write);
            }
        }
        Bitmap::from_index(out, self.copy_on_write && other.copy_on_write)
    }

    /// In-place form of [`merge`](Self::merge): containers of `self` are
    /// reused, unsharing them only when they are modified
    fn merge_inplace(&mut self, other: &Self, op: SetOp) {
        self.merge_inplace_with(other, op, true, |mine, theirs| {
            if let Some(mine) = Arc::get_mut(mine) {
                mine.op_inplace(theirs, op);
            } else {
                // Still shared: build the result fresh rather than copying first
                *mine = Arc::new(mine.op(theirs, op));
            }
        });
    }

    /// Walks both indexes by key, handing each pair of matching containers to
    /// `combine`. Emptied containers are only dropped when `drop_empty` is set,
    /// since a lazily combined bitset reports a stale cardinality.
    pub(super) fn merge_inplace_with<F>(&mut self, other: &Self, op: SetOp, drop_empty: bool, mut combine: F)
    where
        F: FnMut(&mut Arc<Container>, &Container),
    {
        let old = mem::take(&mut self.index);
        let b = &other.index;
        let mut out = ChunkIndex::with_capacity(old.len().max(b.len()));
        let mut left = old.into_entries().peekable();
        for j in 0..b.len() {
            let key_b = b.key_at(j);
            while let Some((key, container)) = left.next_if(|(key, _)| *key < key_b) {
                if op.keeps_left() {
                    out.push_shared(key, container);
                }
            }
            if let Some((key, mut container)) = left.next_if(|(key, _)| *key == key_b) {
                combine(&mut container, b.container_at(j));
                if !(drop_empty && container.is_empty()) {
                    out.push_shared(key, container);
                }
            } else if op.keeps_right() {
                out.push_copy(key_b, b.shared_at(j), other.copy_on_write);
            }
        }
        if op.keeps_left() {
            for (key, container) in left {
                out.push_shared(key, container);
            }
        }
        self.index = out;
    }

    /// Recounts every container touched by lazy operations and drops the
    /// ones that ended up empty
    pub(super) fn repair_after_lazy(&mut self) {
        for container in self.index.unique_containers_mut() {
            container.repair();
        }
        self.index.retain_nonempty();
    }

    /// Rebuilds the index, handing each chunk overlapping `[start, end]` to
    /// `apply` together with its local bounds
    fn modify_range<F>(&mut self, start: u32, end: u32, mut apply: F)
    where
        F: FnMut(Option<Arc<Container>>, u16, u16) -> Option<Arc<Container>>,
    {
        if start > end {
            return;
        }
        let (start_key, start_low) = split(start);
        let (end_key, end_low) = split(end);
        let old = mem::take(&mut self.index);
        let mut out = ChunkIndex::with_capacity(old.len());
        let mut entries = old.into_entries().peekable();
        while let Some((key, container)) = entries.next_if(|(key, _)| *key < start_key) {
            out.push_shared(key, container);
        }
        for key in start_key..=end_key {
            let low = if key == start_key { start_low } else { 0 };
            let high = if key == end_key { end_low } else { u16::MAX };
            let existing = entries.next_if(|(k, _)| *k == key).map(|(_, c)| c);
            if let Some(container) = apply(existing, low, high) {
                if !container.is_empty() {
                    out.push_shared(key, container);
                }
            }
        }
        for (key, container) in entries {
            out.push_shared(key, container);
        }
        self.index = out;
    }

    /// Creates a new bitmap (initially empty)
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::create();
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn create() -> Self {
        Self::create_with_capacity(0)
    }

    /// Creates a new bitmap (initially empty) with a provided
    /// container-storage capacity (it is a performance hint).
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::create_with_capacity(100_000);
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn create_with_capacity(capacity: u32) -> Self {
        Bitmap::from_index(ChunkIndex::with_capacity(capacity as usize), false)
    }

    /// Add the integer elements to the bitmap
    ///
    /// Consecutive elements sharing a chunk reuse the same container lookup,
    /// so sorted input is cheapest.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// bitmap.add_many(&[1, 2, 3]);
    ///
    /// assert!(!bitmap.is_empty());
    /// assert!(bitmap.contains(1));
    /// assert!(bitmap.contains(2));
    /// assert!(bitmap.contains(3));
    /// ```
    pub fn add_many(&mut self, elements: &[u32]) {
        let mut cached: Option<(u16, usize)> = None;
        // Run containers can outgrow their encoding one value at a time
        let mut touched_runs = Vec::new();
        for &element in elements {
            let (key, low) = split(element);
            let index = match cached {
                Some((cached_key, index)) if cached_key == key => index,
                _ => {
                    let index = self.index.get_or_insert(key);
                    if self.index.container_at(index).is_run() {
                        touched_runs.push(key);
                    }
                    index
                }
            };
            self.index.container_mut(index).add(low);
            cached = Some((key, index));
        }
        touched_runs.sort_unstable();
        touched_runs.dedup();
        for key in touched_runs {
            if let Ok(i) = self.index.position(key) {
                self.index.container_mut(i).optimize();
            }
        }
    }

    /// Add the integer element to the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// assert!(bitmap.is_empty());
    /// bitmap.add(1);
    /// assert!(!bitmap.is_empty());
    /// ```
    #[inline]
    pub fn add(&mut self, element: u32) {
        self.add_checked(element);
    }

    /// Add the integer element to the bitmap. Returns true if the value was
    /// added, false if the value was already in the bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// assert!(bitmap.add_checked(1));
    /// assert!(!bitmap.add_checked(1));
    /// ```
    pub fn add_checked(&mut self, element: u32) -> bool {
        let (key, low) = split(element);
        match self.index.position(key) {
            Ok(i) => {
                if self.index.container_at(i).contains(low) {
                    return false;
                }
                self.index.container_mut(i).add(low)
            }
            Err(i) => {
                self.index
                    .insert_at(i, key, Container::from_sorted_values(vec![low]));
                true
            }
        }
    }

    /// Add all values in range
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::create();
    /// bitmap1.add_range((1..3));
    ///
    /// assert!(!bitmap1.is_empty());
    /// assert!(bitmap1.contains(1));
    /// assert!(bitmap1.contains(2));
    /// assert!(!bitmap1.contains(3));
    ///
    /// let mut bitmap2 = Bitmap::create();
    /// bitmap2.add_range((3..1));
    /// assert!(bitmap2.is_empty());
    ///
    /// let mut bitmap3 = Bitmap::create();
    /// bitmap3.add_range((3..3));
    /// assert!(bitmap3.is_empty());
    ///
    /// let mut bitmap4 = Bitmap::create();
    /// bitmap4.add_range(..=2);
    /// bitmap4.add_range(u32::MAX..=u32::MAX);
    /// assert!(bitmap4.contains(0));
    /// assert!(bitmap4.contains(1));
    /// assert!(bitmap4.contains(2));
    /// assert!(bitmap4.contains(u32::MAX));
    /// assert_eq!(bitmap4.cardinality(), 4);
    /// ```
    pub fn add_range<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = range_to_inclusive(range);
        self.modify_range(start, end, |existing, low, high| match existing {
            Some(mut container) => {
                Arc::make_mut(&mut container).add_range(low, high);
                Some(container)
            }
            None => Some(Arc::new(Container::from_range(low, high))),
        });
    }

    /// Remove all values in range
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// bitmap.add_range((1..4));
    /// assert!(!bitmap.is_empty());
    ///
    /// bitmap.remove_range((1..3));
    ///
    /// assert!(!bitmap.contains(1));
    /// assert!(!bitmap.contains(2));
    /// assert!(bitmap.contains(3));
    ///
    /// bitmap.add_range(u32::MAX..=u32::MAX);
    /// assert!(bitmap.contains(u32::MAX));
    /// ```
    pub fn remove_range<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = range_to_inclusive(range);
        self.modify_range(start, end, |existing, low, high| {
            let mut container = existing?;
            Arc::make_mut(&mut container).remove_range(low, high);
            Some(container)
        });
    }

    /// Check whether a range of values of range are present
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1, 2]);
    /// assert!(bitmap.contains_range((1..3)));
    ///
    /// let mut bitmap = bitmap.clone();
    /// bitmap.add(u32::MAX - 1);
    /// bitmap.add(u32::MAX);
    /// assert!(bitmap.contains_range((u32::MAX - 1)..=u32::MAX))
    /// ```
    pub fn contains_range<R: RangeBounds<u32>>(&self, range: R) -> bool {
        let (start, end) = range_to_inclusive(range);
        if start > end {
            return true;
        }
        let (start_key, start_low) = split(start);
        let (end_key, end_low) = split(end);
        (start_key..=end_key).all(|key| {
            let low = if key == start_key { start_low } else { 0 };
            let high = if key == end_key { end_low } else { u16::MAX };
            self.index
                .get(key)
                .is_some_and(|container| container.contains_range(low, high))
        })
    }

    /// Empties the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// bitmap.add(1);
    /// bitmap.add(2);
    /// bitmap.clear();
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Clear the integer element from the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// bitmap.add(1);
    /// bitmap.remove(1);
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn remove(&mut self, element: u32) {
        self.remove_checked(element);
    }

    /// Remove the integer element from the bitmap. Returns true if a the value
    /// was removed, false if the value was present in the bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// bitmap.add(1);
    /// assert!(bitmap.remove_checked(1));
    /// assert!(!bitmap.remove_checked(1));
    /// ```
    pub fn remove_checked(&mut self, element: u32) -> bool {
        let (key, low) = split(element);
        let Ok(i) = self.index.position(key) else {
            return false;
        };
        if !self.index.container_at(i).contains(low) {
            return false;
        }
        self.index.container_mut(i).remove(low);
        self.index.remove_if_empty(i);
        true
    }

    /// Contains returns true if the integer element is contained in the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1]);
    ///
    /// assert!(bitmap.contains(1));
    /// assert!(!bitmap.contains(2));
    /// ```
    #[inline]
    pub fn contains(&self, element: u32) -> bool {
        let (key, low) = split(element);
        self.index
            .get(key)
            .is_some_and(|container| container.contains(low))
    }

    /// Compute a new bitmap, which contains all values from this bitmap, but shifted by `offset`
    ///
    /// Any values which would be `< 0`, or `> u32::MAX` are dropped.
    ///
    /// # Examples
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[0, 1, 1000, u32::MAX]);
    /// let shifted_down = bitmap1.add_offset(-1);
    /// assert_eq!(shifted_down.to_vec(), [0, 999, u32::MAX - 1]);
    /// let shifted_up = bitmap1.add_offset(1);
    /// assert_eq!(shifted_up.to_vec(), [1, 2, 1001]);
    /// let big_shifted = bitmap1.add_offset(i64::from(u32::MAX) + 1);
    /// assert!(big_shifted.is_empty());
    /// ```
    pub fn add_offset(&self, offset: i64) -> Self {
        if offset % (1 << 16) == 0 {
            let key_offset = offset >> 16;
            let mut index = ChunkIndex::with_capacity(self.index.len());
            for i in 0..self.index.len() {
                let key = i64::from(self.index.key_at(i)) + key_offset;
                if let Ok(key) = u16::try_from(key) {
                    index.push_copy(key, self.index.shared_at(i), self.copy_on_write);
                }
            }
            return Bitmap::from_index(index, self.copy_on_write);
        }
        Bitmap::from_sorted_iter(self.iter().filter_map(|value| {
            i64::from(value)
                .checked_add(offset)
                .and_then(|shifted| u32::try_from(shifted).ok())
        }))
    }

    /// Returns number of elements in range
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1, 3, 4]);
    ///
    /// assert_eq!(bitmap.range_cardinality((..1)), 0);
    /// assert_eq!(bitmap.range_cardinality((..2)), 1);
    /// assert_eq!(bitmap.range_cardinality((2..5)), 2);
    /// assert_eq!(bitmap.range_cardinality((..5)), 3);
    /// assert_eq!(bitmap.range_cardinality((1..=4)), 3);
    /// ```
    pub fn range_cardinality<R: RangeBounds<u32>>(&self, range: R) -> u64 {
        let (start, end) = range_to_inclusive(range);
        if start > end {
            return 0;
        }
        let (start_key, start_low) = split(start);
        let (end_key, end_low) = split(end);
        self.index
            .iter()
            .skip_while(|&(key, _)| key < start_key)
            .take_while(|&(key, _)| key <= end_key)
            .map(|(key, container)| {
                let low = if key == start_key { start_low } else { 0 };
                let high = if key == end_key { end_low } else { u16::MAX };
                u64::from(container.range_cardinality(low, high))
            })
            .sum()
    }

    /// Returns the number of integers contained in the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1]);
    ///
    /// assert_eq!(bitmap.cardinality(), 1);
    ///
    /// let mut bitmap = bitmap.clone();
    ///
    /// bitmap.add(2);
    ///
    /// assert_eq!(bitmap.cardinality(), 2);
    /// ```
    #[inline]
    pub fn cardinality(&self) -> u64 {
        self.index
            .iter()
            .map(|(_, container)| u64::from(container.cardinality()))
            .sum()
    }

    /// And computes the intersection between two bitmaps and returns the result
    /// as a new bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1]);
    /// let bitmap2 = Bitmap::of(&[1, 2]);
    ///
    /// let bitmap3 = bitmap1.and(&bitmap2);
    ///
    /// assert!(bitmap3.contains(1));
    /// assert!(!bitmap3.contains(2));
    /// ```
    #[inline]
    pub fn and(&self, other: &Self) -> Self {
        self.merge(other, SetOp::And)
    }

    /// Computes the intersection between two bitmaps and stores the result
    /// in the current bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    /// let mut bitmap3 = Bitmap::of(&[15]);
    /// let bitmap4 = Bitmap::of(&[15, 25]);
    ///
    /// bitmap1.and_inplace(&bitmap2);
    ///
    /// assert_eq!(bitmap1.cardinality(), 0);
    /// assert!(!bitmap1.contains(15));
    /// assert!(!bitmap1.contains(25));
    ///
    /// bitmap3.and_inplace(&bitmap4);
    ///
    /// assert_eq!(bitmap3.cardinality(), 1);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// ```
    #[inline]
    pub fn and_inplace(&mut self, other: &Self) {
        self.merge_inplace(other, SetOp::And);
    }

    /// Or computes the union between two bitmaps and returns the result
    /// as a new bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// let bitmap3 = bitmap1.or(&bitmap2);
    ///
    /// assert_eq!(bitmap3.cardinality(), 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(bitmap3.contains(25));
    /// ```
    #[inline]
    pub fn or(&self, other: &Self) -> Self {
        self.merge(other, SetOp::Or)
    }

    /// Computes the union between two bitmaps and stores the result in
    /// the current bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// bitmap1.or_inplace(&bitmap2);
    ///
    /// assert_eq!(bitmap1.cardinality(), 2);
    /// assert!(bitmap1.contains(15));
    /// assert!(bitmap1.contains(25));
    /// ```
    #[inline]
    pub fn or_inplace(&mut self, other: &Self) {
        self.merge_inplace(other, SetOp::Or);
    }

    /// Computes the symmetric difference (xor) between two bitmaps
    /// and returns new bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = bitmap1.xor(&bitmap2);
    ///
    /// assert_eq!(bitmap3.cardinality(), 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// assert!(bitmap3.contains(35));
    /// ```
    #[inline]
    pub fn xor(&self, other: &Self) -> Self {
        self.merge(other, SetOp::Xor)
    }

    /// Inplace version of [`xor`](Self::xor), stores result in current bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// bitmap1.xor_inplace(&bitmap2);
    ///
    /// assert_eq!(bitmap1.cardinality(), 2);
    /// assert!(bitmap1.contains(15));
    /// assert!(!bitmap1.contains(25));
    /// assert!(bitmap1.contains(35));
    /// ```
    #[inline]
    pub fn xor_inplace(&mut self, other: &Self) {
        self.merge_inplace(other, SetOp::Xor);
    }

    /// Computes the difference between two bitmaps and returns the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = bitmap1.andnot(&bitmap2);
    ///
    /// assert_eq!(bitmap3.cardinality(), 1);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// assert!(!bitmap3.contains(35));
    /// ```
    #[inline]
    pub fn andnot(&self, other: &Self) -> Self {
        self.merge(other, SetOp::AndNot)
    }

    /// Computes the difference between two bitmaps and stores the result
    /// in the current bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// bitmap1.andnot_inplace(&bitmap2);
    ///
    /// assert_eq!(bitmap1.cardinality(), 1);
    /// assert!(bitmap1.contains(15));
    /// assert!(!bitmap1.contains(25));
    /// assert!(!bitmap1.contains(35));
    ///
    /// let mut bitmap3 = Bitmap::of(&[15]);
    /// let bitmap4 = Bitmap::create();
    /// bitmap3.andnot_inplace(&bitmap4);
    /// assert_eq!(bitmap3.cardinality(), 1);
    /// assert!(bitmap3.contains(15));
    /// ```
    #[inline]
    pub fn andnot_inplace(&mut self, other: &Self) {
        self.merge_inplace(other, SetOp::AndNot);
    }

    /// Negates the bits in the given range
    /// any integer present in this range and in the bitmap is removed.
    /// Returns result as a new bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[4]);
    ///
    /// let bitmap2 = bitmap1.flip(1..3);
    ///
    /// assert_eq!(bitmap2.cardinality(), 3);
    /// assert!(bitmap2.contains(1));
    /// assert!(bitmap2.contains(2));
    /// assert!(!bitmap2.contains(3));
    /// assert!(bitmap2.contains(4));
    ///
    /// let bitmap3 = bitmap1.flip(1..=5);
    /// assert_eq!(bitmap3.to_vec(), [1, 2, 3, 5])
    /// ```
    pub fn flip<R: RangeBounds<u32>>(&self, range: R) -> Self {
        let mut flipped = self.clone();
        flipped.flip_inplace(range);
        flipped
    }

    /// Negates the bits in the given range
    /// any integer present in this range and in the bitmap is removed.
    /// Stores the result in the current bitmap.
    ///
    /// Chunks wholly inside the range that had no container become full.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[4]);
    /// bitmap1.flip_inplace(1..3);
    ///
    /// assert_eq!(bitmap1.cardinality(), 3);
    /// assert!(bitmap1.contains(1));
    /// assert!(bitmap1.contains(2));
    /// assert!(!bitmap1.contains(3));
    /// assert!(bitmap1.contains(4));
    /// bitmap1.flip_inplace(4..=4);
    /// assert_eq!(bitmap1.to_vec(), [1, 2]);
    ///
    /// let mut bitmap2 = Bitmap::create();
    /// bitmap2.flip_inplace(65_000..200_000);
    /// assert_eq!(bitmap2.cardinality(), 135_000);
    /// ```
    pub fn flip_inplace<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = range_to_inclusive(range);
        self.modify_range(start, end, |existing, low, high| match existing {
            Some(mut container) => {
                Arc::make_mut(&mut container).flip_range(low, high);
                Some(container)
            }
            None => Some(Arc::new(Container::from_range(low, high))),
        });
    }

    /// Returns a vector containing all of the integers stored in the Bitmap
    /// in sorted order.
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[15, 25]);
    ///
    /// assert_eq!(bitmap.to_vec(), [15, 25]);
    /// ```
    pub fn to_vec(&self) -> Vec<u32> {
        let mut values = Vec::with_capacity(self.cardinality() as usize);
        values.extend(self.iter());
        values
    }

    /// Like [`to_vec`](Self::to_vec), but reports a failed allocation
    /// instead of aborting.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[15, 25]);
    ///
    /// assert_eq!(bitmap.try_to_vec().unwrap(), [15, 25]);
    /// ```
    pub fn try_to_vec(&self) -> Result<Vec<u32>, Error> {
        let len = usize::try_from(self.cardinality()).map_err(|_| Error::Allocation)?;
        let mut values = Vec::new();
        values.try_reserve_exact(len)?;
        values.extend(self.iter());
        Ok(values)
    }

    /// Computes the serialized size in bytes of the Bitmap in format `S`.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::{Bitmap, Native, Portable};
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 3]);
    ///
    /// assert_eq!(bitmap.get_serialized_size_in_bytes::<Portable>(), 22);
    /// assert_eq!(bitmap.get_serialized_size_in_bytes::<Native>(), 17);
    /// ```
    #[inline]
    pub fn get_serialized_size_in_bytes<S: Serializer>(&self) -> usize {
        S::get_serialized_size_in_bytes(self)
    }

    /// Serializes a bitmap to a vector of bytes in format `S`.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::{Bitmap, Portable};
    ///
    /// let original_bitmap: Bitmap = (1..5).collect();
    ///
    /// let serialized_buffer = original_bitmap.serialize::<Portable>();
    ///
    /// let deserialized_bitmap = Bitmap::deserialize::<Portable>(&serialized_buffer);
    ///
    /// assert_eq!(original_bitmap, deserialized_bitmap);
    /// ```
    pub fn serialize<S: Serializer>(&self) -> Vec<u8> {
        let mut dst = Vec::new();
        self.serialize_into::<S>(&mut dst);
        dst
    }

    /// Serializes a bitmap to the end of `dst` in format `S`, returning the
    /// newly written bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::{Bitmap, Native, Portable};
    ///
    /// let bitmap: Bitmap = (1..5).collect();
    ///
    /// let mut buf = Vec::new();
    /// let data: &[u8] = bitmap.serialize_into::<Portable>(&mut buf);
    /// assert_eq!(data.len(), bitmap.get_serialized_size_in_bytes::<Portable>());
    ///
    /// buf.clear();
    /// let data: &[u8] = bitmap.serialize_into::<Native>(&mut buf);
    /// assert_eq!(Bitmap::try_deserialize::<Native>(data).unwrap(), bitmap);
    /// ```
    #[inline]
    pub fn serialize_into<'a, S: Serializer>(&self, dst: &'a mut Vec<u8>) -> &'a [u8] {
        S::serialize_into(self, dst)
    }

    /// Given a serialized bitmap as slice of bytes in format `D`, returns a
    /// bitmap instance.
    ///
    /// Bytes past the end of the encoded bitmap are ignored.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is truncated or structurally invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::{Bitmap, Error, Portable};
    ///
    /// let original_bitmap: Bitmap = (1..5).collect();
    /// let serialized_buffer = original_bitmap.serialize::<Portable>();
    ///
    /// let deserialized_bitmap = Bitmap::try_deserialize::<Portable>(&serialized_buffer);
    /// assert_eq!(original_bitmap, deserialized_bitmap.unwrap());
    ///
    /// let invalid_buffer: Vec<u8> = vec![3];
    /// let deserialized_bitmap = Bitmap::try_deserialize::<Portable>(&invalid_buffer);
    /// assert!(matches!(deserialized_bitmap, Err(Error::Truncated { .. })));
    /// ```
    #[inline]
    pub fn try_deserialize<D: Deserializer>(buffer: &[u8]) -> Result<Self, Error> {
        D::try_deserialize(buffer)
    }

    /// Given a serialized bitmap as slice of bytes in format `D`, returns a
    /// bitmap instance.
    ///
    /// On invalid input returns empty bitmap.
    #[inline]
    pub fn deserialize<D: Deserializer>(buffer: &[u8]) -> Self {
        Self::try_deserialize::<D>(buffer).unwrap_or_default()
    }

    /// Appends the bitmap to `buffer`, in the portable format when `portable`
    /// is set and the native format otherwise. Returns the number of bytes
    /// written, always [`get_size_in_bytes(portable)`](Self::get_size_in_bytes).
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap: Bitmap = (100..1000).collect();
    ///
    /// for portable in [true, false] {
    ///     let mut buffer = Vec::new();
    ///     let written = bitmap.write(&mut buffer, portable);
    ///     assert_eq!(written, bitmap.get_size_in_bytes(portable));
    ///     assert_eq!(Bitmap::read(&buffer, portable).unwrap(), bitmap);
    /// }
    /// ```
    pub fn write(&self, buffer: &mut Vec<u8>, portable: bool) -> usize {
        if portable {
            self.serialize_into::<Portable>(buffer).len()
        } else {
            self.serialize_into::<Native>(buffer).len()
        }
    }

    /// Reads a bitmap written by [`write`](Self::write) with the same
    /// `portable` flag.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is truncated or structurally invalid.
    pub fn read(buffer: &[u8], portable: bool) -> Result<Self, Error> {
        if portable {
            Self::try_deserialize::<Portable>(buffer)
        } else {
            Self::try_deserialize::<Native>(buffer)
        }
    }

    /// Exact number of bytes [`write`](Self::write) produces
    pub fn get_size_in_bytes(&self, portable: bool) -> usize {
        if portable {
            self.get_serialized_size_in_bytes::<Portable>()
        } else {
            self.get_serialized_size_in_bytes::<Native>()
        }
    }

    /// Creates a new bitmap from a slice of u32 integers
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let elements = vec![1, 2];
    ///
    /// let bitmap = Bitmap::of(&elements);
    ///
    /// let mut bitmap2 = Bitmap::create();
    ///
    /// for element in &elements {
    ///     bitmap2.add(*element);
    /// }
    ///
    /// assert!(bitmap.contains(1));
    /// assert!(bitmap.contains(2));
    /// assert!(!bitmap.contains(3));
    /// assert_eq!(bitmap, bitmap2);
    /// ```
    pub fn of(elements: &[u32]) -> Self {
        let mut bitmap = Bitmap::create();
        bitmap.add_many(elements);
        bitmap
    }

    /// Compresses of the bitmap. Returns true if the result has at least one
    /// run container.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (100..1000).collect();
    ///
    /// assert_eq!(bitmap.cardinality(), 900);
    /// let old_size = bitmap.get_size_in_bytes(true);
    /// assert!(bitmap.run_optimize());
    /// let new_size = bitmap.get_size_in_bytes(true);
    /// assert!(new_size < old_size);
    /// ```
    pub fn run_optimize(&mut self) -> bool {
        let mut has_run = false;
        for i in 0..self.index.len() {
            let container = self.index.container_at(i);
            let before = container.kind();
            let after = container.normalized_kind(true);
            // Untouched containers stay shared with copy-on-write clones
            if before != after {
                self.index.container_mut(i).optimize();
                trace!(key = self.index.key_at(i), ?before, ?after, "container converted");
            }
            has_run |= after == ContainerKind::Run;
        }
        has_run
    }

    /// Removes run-length encoding even when it is more space efficient. Returns
    /// true if a change was applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (100..1000).collect();
    ///
    /// assert_eq!(bitmap.cardinality(), 900);
    ///
    /// bitmap.run_optimize();
    ///
    /// assert!(bitmap.remove_run_compression());
    /// assert!(!bitmap.remove_run_compression());
    /// ```
    pub fn remove_run_compression(&mut self) -> bool {
        let mut changed = false;
        for i in 0..self.index.len() {
            if !self.index.container_at(i).is_run() {
                continue;
            }
            self.index.container_mut(i).remove_run_encoding();
            trace!(
                key = self.index.key_at(i),
                after = ?self.index.container_at(i).kind(),
                "run container expanded"
            );
            changed = true;
        }
        changed
    }

    /// Returns true if the Bitmap is empty.
    /// Faster than doing: bitmap.cardinality() == 0)
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    ///
    /// assert!(bitmap.is_empty());
    ///
    /// bitmap.add(1);
    ///
    /// assert!(!bitmap.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Return true if all the elements of Self are in &other.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1: Bitmap = (5..10).collect();
    /// let bitmap2: Bitmap = (5..8).collect();
    /// let bitmap3: Bitmap = (5..10).collect();
    /// let bitmap4: Bitmap = (9..11).collect();
    ///
    /// assert!(bitmap2.is_subset(&bitmap1));
    /// assert!(bitmap3.is_subset(&bitmap1));
    /// assert!(!bitmap4.is_subset(&bitmap1));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        self.index.len() <= other.index.len()
            && self.index.iter().all(|(key, container)| {
                other
                    .index
                    .get(key)
                    .is_some_and(|theirs| container.is_subset(theirs))
            })
    }

    /// Return true if all the elements of Self are in &other and &other is strictly greater
    /// than Self.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1: Bitmap = (5..9).collect();
    /// let bitmap2: Bitmap = (5..8).collect();
    /// let bitmap3: Bitmap = (5..10).collect();
    /// let bitmap4: Bitmap = (9..11).collect();
    ///
    /// assert!(bitmap2.is_strict_subset(&bitmap1));
    /// assert!(!bitmap1.is_strict_subset(&bitmap1));
    /// assert!(!bitmap3.is_strict_subset(&bitmap1));
    /// assert!(!bitmap4.is_strict_subset(&bitmap1));
    /// ```
    pub fn is_strict_subset(&self, other: &Self) -> bool {
        self.is_subset(other) && self.cardinality() < other.cardinality()
    }

    /// Return true if Self and &other intersect
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1: Bitmap = (1..5).collect();
    /// let bitmap2: Bitmap = (5..9).collect();
    /// let bitmap3: Bitmap = (3..7).collect();
    ///
    /// assert_eq!(bitmap1.intersect(&bitmap2), false);
    /// assert_eq!(bitmap1.intersect(&bitmap3), true);
    /// assert_eq!(bitmap2.intersect(&bitmap3), true);
    /// ```
    pub fn intersect(&self, other: &Self) -> bool {
        let (a, b) = (&self.index, &other.index);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a.key_at(i).cmp(&b.key_at(j)) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if a.container_at(i).intersects(b.container_at(j)) {
                        return true;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        false
    }

    /// Return the Jaccard index between Self and &other
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1: Bitmap = (1..5).collect();
    /// let bitmap2: Bitmap = (5..9).collect();
    /// let bitmap3: Bitmap = (3..9).collect();
    ///
    /// assert_eq!(bitmap1.jaccard_index(&bitmap2), 0.0);
    /// assert_eq!(bitmap1.jaccard_index(&bitmap3), 0.25);
    /// assert_eq!(bitmap2.jaccard_index(&bitmap3), 0.6666666666666666);
    /// ```
    pub fn jaccard_index(&self, other: &Self) -> f64 {
        let intersection = self.and_cardinality(other);
        let union = self.cardinality() + other.cardinality() - intersection;
        intersection as f64 / union as f64
    }

    /// Return the size of the intersection between Self and &other
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1]);
    /// let bitmap2 = Bitmap::of(&[1, 2]);
    ///
    /// assert_eq!(bitmap1.and_cardinality(&bitmap2), 1);
    /// ```
    pub fn and_cardinality(&self, other: &Self) -> u64 {
        let (a, b) = (&self.index, &other.index);
        let (mut i, mut j) = (0, 0);
        let mut cardinality = 0;
        while i < a.len() && j < b.len() {
            match a.key_at(i).cmp(&b.key_at(j)) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    let both = a.container_at(i).op(b.container_at(j), SetOp::And);
                    cardinality += u64::from(both.cardinality());
                    i += 1;
                    j += 1;
                }
            }
        }
        cardinality
    }

    /// Return the size of the union between Self and &other
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// assert_eq!(bitmap1.or_cardinality(&bitmap2), 2);
    /// ```
    pub fn or_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() + other.cardinality() - self.and_cardinality(other)
    }

    /// Return the size of the difference between Self and &other
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.andnot_cardinality(&bitmap2), 1);
    /// ```
    pub fn andnot_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() - self.and_cardinality(other)
    }

    /// Return the size of the symmetric difference between Self and &other
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.xor_cardinality(&bitmap2), 2);
    /// ```
    pub fn xor_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() + other.cardinality() - 2 * self.and_cardinality(other)
    }

    /// Returns the smallest value in the set.
    ///
    /// Returns `None` if the set is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (5..10).collect();
    /// let empty_bitmap: Bitmap = Bitmap::create();
    ///
    /// assert_eq!(bitmap.minimum(), Some(5));
    /// assert_eq!(empty_bitmap.minimum(), None);
    ///
    /// bitmap.add(3);
    ///
    /// assert_eq!(bitmap.minimum(), Some(3));
    /// ```
    pub fn minimum(&self) -> Option<u32> {
        let (key, container) = self.index.iter().next()?;
        container.minimum().map(|low| join(key, low))
    }

    /// Returns the greatest value in the set.
    ///
    /// Returns `None` if the set is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (5..10).collect();
    /// let empty_bitmap: Bitmap = Bitmap::create();
    ///
    /// assert_eq!(bitmap.maximum(), Some(9));
    /// assert_eq!(empty_bitmap.maximum(), None);
    ///
    /// bitmap.add(15);
    ///
    /// assert_eq!(bitmap.maximum(), Some(15));
    /// ```
    pub fn maximum(&self) -> Option<u32> {
        let (key, container) = self.index.iter().next_back()?;
        container.maximum().map(|low| join(key, low))
    }

    /// Rank returns the number of values smaller or equal to x.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (5..10).collect();
    ///
    /// assert_eq!(bitmap.rank(8), 4);
    ///
    /// bitmap.add(15);
    ///
    /// assert_eq!(bitmap.rank(11), 5);
    /// assert_eq!(bitmap.rank(15), 6);
    /// ```
    pub fn rank(&self, x: u32) -> u64 {
        let (x_key, x_low) = split(x);
        let mut rank = 0;
        for (key, container) in self.index.iter() {
            match key.cmp(&x_key) {
                Ordering::Less => rank += u64::from(container.cardinality()),
                Ordering::Equal => return rank + u64::from(container.rank(x_low)),
                Ordering::Greater => break,
            }
        }
        rank
    }

    /// Select returns the element having the designated rank, if it exists
    /// If the size of the roaring bitmap is strictly greater than rank,
    /// then this function returns element of given rank wrapped in Some.
    /// Otherwise, it returns None.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap: Bitmap = (5..10).collect();
    ///
    /// assert_eq!(bitmap.select(0), Some(5));
    /// assert_eq!(bitmap.select(1), Some(6));
    /// assert_eq!(bitmap.select(2), Some(7));
    /// assert_eq!(bitmap.select(3), Some(8));
    /// assert_eq!(bitmap.select(4), Some(9));
    /// assert_eq!(bitmap.select(5), None);
    /// ```
    pub fn select(&self, rank: u32) -> Option<u32> {
        let mut remaining = rank;
        for (key, container) in self.index.iter() {
            let cardinality = container.cardinality();
            if remaining < cardinality {
                return container.select(remaining).map(|low| join(key, low));
            }
            remaining -= cardinality;
        }
        None
    }

    /// Enables or disables copy-on-write sharing for clones of this bitmap
    ///
    /// While enabled, [`Clone`] shares container storage; a container is
    /// copied privately the first time either side mutates it.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (0..100_000).collect();
    /// bitmap.set_copy_on_write(true);
    /// assert!(bitmap.get_copy_on_write());
    ///
    /// let mut copy = bitmap.clone();
    /// assert!(copy.get_copy_on_write());
    /// copy.add(200_000);
    ///
    /// assert!(!bitmap.contains(200_000));
    /// assert_eq!(copy.cardinality(), bitmap.cardinality() + 1);
    /// ```
    #[inline]
    pub fn set_copy_on_write(&mut self, copy_on_write: bool) {
        self.copy_on_write = copy_on_write;
    }

    /// Whether clones of this bitmap share container storage
    #[inline]
    pub fn get_copy_on_write(&self) -> bool {
        self.copy_on_write
    }

    /// Releases unused capacity. Returns the number of bytes reclaimed.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create_with_capacity(100);
    /// bitmap.add(1);
    /// assert!(bitmap.shrink_to_fit() > 0);
    /// assert_eq!(bitmap.shrink_to_fit(), 0);
    /// ```
    pub fn shrink_to_fit(&mut self) -> usize {
        self.index.shrink_to_fit()
    }

    /// Returns statistics about the composition of a roaring bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (1..100).collect();
    /// let statistics = bitmap.statistics();
    ///
    /// assert_eq!(statistics.n_containers, 1);
    /// assert_eq!(statistics.n_array_containers, 1);
    /// assert_eq!(statistics.n_run_containers, 0);
    /// assert_eq!(statistics.n_bitset_containers, 0);
    /// assert_eq!(statistics.n_values_array_containers, 99);
    /// assert_eq!(statistics.n_values_run_containers, 0);
    /// assert_eq!(statistics.n_values_bitset_containers, 0);
    /// assert_eq!(statistics.n_bytes_array_containers, 198);
    /// assert_eq!(statistics.n_bytes_run_containers, 0);
    /// assert_eq!(statistics.n_bytes_bitset_containers, 0);
    /// assert_eq!(statistics.max_value, 99);
    /// assert_eq!(statistics.min_value, 1);
    /// assert_eq!(statistics.sum_value, 4950);
    /// assert_eq!(statistics.cardinality, 99);
    ///
    /// bitmap.run_optimize();
    /// let statistics = bitmap.statistics();
    ///
    /// assert_eq!(statistics.n_containers, 1);
    /// assert_eq!(statistics.n_array_containers, 0);
    /// assert_eq!(statistics.n_run_containers, 1);
    /// assert_eq!(statistics.n_bitset_containers, 0);
    /// assert_eq!(statistics.n_values_array_containers, 0);
    /// assert_eq!(statistics.n_values_run_containers, 99);
    /// assert_eq!(statistics.n_values_bitset_containers, 0);
    /// assert_eq!(statistics.n_bytes_array_containers, 0);
    /// assert_eq!(statistics.n_bytes_run_containers, 6);
    /// assert_eq!(statistics.n_bytes_bitset_containers, 0);
    /// assert_eq!(statistics.max_value, 99);
    /// assert_eq!(statistics.min_value, 1);
    /// assert_eq!(statistics.sum_value, 4950);
    /// assert_eq!(statistics.cardinality, 99);
    /// ```
    pub fn statistics(&self) -> Statistics {
        let mut statistics = Statistics {
            min_value: self.minimum().unwrap_or(u32::MAX),
            max_value: self.maximum().unwrap_or(0),
            ..Statistics::default()
        };
        for (key, container) in self.index.iter() {
            let values = u64::from(container.cardinality());
            let bytes = container.serialized_size() as u64;
            statistics.n_containers += 1;
            statistics.cardinality += values;
            statistics.sum_value += container
                .iter()
                .map(|low| u64::from(join(key, low)))
                .sum::<u64>();
            match container.kind() {
                ContainerKind::Array => {
                    statistics.n_array_containers += 1;
                    statistics.n_values_array_containers += values;
                    statistics.n_bytes_array_containers += bytes;
                }
                ContainerKind::Bitset => {
                    statistics.n_bitset_containers += 1;
                    statistics.n_values_bitset_containers += values;
                    statistics.n_bytes_bitset_containers += bytes;
                }
                ContainerKind::Run => {
                    statistics.n_run_containers += 1;
                    statistics.n_values_run_containers += values;
                    statistics.n_bytes_run_containers += bytes;
                }
            }
        }
        statistics
    }
}

fn range_to_inclusive<R: RangeBounds<u32>>(range: R) -> (u32, u32) {
    let start = match range.start_bound() {
        Bound::Included(&i) => i,
        Bound::Excluded(&i) => match i.checked_add(1) {
            Some(i) => i,
            None => return (1, 0),
        },
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&i) => i,
        Bound::Excluded(&i) => match i.checked_sub(1) {
            Some(i) => i,
            None => return (1, 0),
        },
        Bound::Unbounded => u32::MAX,
    };
    (start, end)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranges_split_at_chunk_boundaries() {
        let mut bitmap = Bitmap::create();
        bitmap.add_range(65_530..=131_080);
        assert_eq!(bitmap.index.len(), 3);
        assert_eq!(bitmap.cardinality(), 131_080 - 65_530 + 1);
        assert!(bitmap.contains_range(65_530..=131_080));
        assert!(!bitmap.contains_range(65_529..=131_080));

        bitmap.remove_range(65_536..131_072);
        assert_eq!(bitmap.index.len(), 2);
        assert_eq!(bitmap.range_cardinality(..65_536), 6);
        assert_eq!(bitmap.range_cardinality(131_072..), 9);

        bitmap.flip_inplace(0..=u32::MAX);
        assert_eq!(bitmap.cardinality(), (1u64 << 32) - 15);
        assert!(!bitmap.contains(65_530));
        assert!(bitmap.contains(65_536));
        assert!(bitmap.index.iter().all(|(_, c)| !c.is_empty()));
    }

    #[test]
    fn no_empty_containers_after_ops() {
        let a = Bitmap::of(&[1, 2, 70_000]);
        let b = Bitmap::of(&[1, 2, 140_000]);
        let xor = a.xor(&b);
        assert_eq!(xor.to_vec(), [70_000, 140_000]);
        assert_eq!(xor.index.keys(), [1, 2]);

        let mut c = a.clone();
        c.and_inplace(&b);
        assert_eq!(c.index.keys(), [0]);
        c.remove(1);
        c.remove(2);
        assert!(c.index.is_empty());
    }

    #[test]
    fn full_universe_cardinality() {
        let mut bitmap = Bitmap::create();
        bitmap.add_range(..);
        assert_eq!(bitmap.cardinality(), 1 << 32);
        assert_eq!(bitmap.select(u32::MAX), Some(u32::MAX));
        assert_eq!(bitmap.rank(u32::MAX), 1 << 32);
        assert_eq!(bitmap.index.len(), 1 << 16);
    }

    #[test]
    fn copy_on_write_shares_until_mutation() {
        let mut bitmap: Bitmap = (0..10_000).collect();
        bitmap.set_copy_on_write(true);
        let mut copy = bitmap.clone();
        assert!(Arc::ptr_eq(bitmap.index.shared_at(0), copy.index.shared_at(0)));

        copy.add(10_000);
        assert!(!Arc::ptr_eq(bitmap.index.shared_at(0), copy.index.shared_at(0)));
        assert_eq!(bitmap.cardinality(), 10_000);

        bitmap.set_copy_on_write(false);
        let deep = bitmap.clone();
        assert!(!Arc::ptr_eq(bitmap.index.shared_at(0), deep.index.shared_at(0)));
    }

    #[test]
    fn add_many_reencodes_outgrown_runs() {
        let mut bitmap = Bitmap::create();
        bitmap.add_range(0..10_000);
        assert_eq!(bitmap.statistics().n_run_containers, 1);

        bitmap.add_many(&[10_000, 10_001]);
        assert_eq!(bitmap.statistics().n_run_containers, 1);

        let scattered: Vec<u32> = (20_000..30_000).step_by(2).collect();
        bitmap.add_many(&scattered);
        let statistics = bitmap.statistics();
        assert_eq!(statistics.n_run_containers, 0);
        assert_eq!(statistics.n_bitset_containers, 1);
        assert_eq!(bitmap.cardinality(), 10_002 + 5_000);

        let mut optimized = bitmap.clone();
        optimized.run_optimize();
        assert_eq!(bitmap.get_size_in_bytes(true), optimized.get_size_in_bytes(true));
        assert_eq!(bitmap.get_size_in_bytes(true), 8208);
    }

    #[test]
    fn run_optimize_keeps_settled_containers_shared() {
        let mut bitmap: Bitmap = (0..100_000).step_by(3).collect();
        bitmap.add_range(200_000..210_000);
        bitmap.set_copy_on_write(true);

        let mut copy = bitmap.clone();
        assert!(copy.run_optimize());
        assert_eq!(copy.index.len(), bitmap.index.len());
        for i in 0..copy.index.len() {
            assert!(Arc::ptr_eq(copy.index.shared_at(i), bitmap.index.shared_at(i)));
        }
    }

    #[test]
    fn inplace_ops_rebuild_shared_containers() {
        let mut bitmap: Bitmap = (0..10_000).chain(70_000..70_010).collect();
        bitmap.set_copy_on_write(true);
        let other = Bitmap::of(&[5, 6, 200_000]);

        let mut copy = bitmap.clone();
        copy.or_inplace(&other);
        assert_eq!(copy.cardinality(), 10_011);
        assert_eq!(bitmap.cardinality(), 10_010);
        assert_eq!(Arc::strong_count(bitmap.index.shared_at(0)), 1);
        assert!(Arc::ptr_eq(copy.index.shared_at(1), bitmap.index.shared_at(1)));

        copy.and_inplace(&other);
        assert_eq!(copy.to_vec(), [5, 6, 200_000]);
        assert!(bitmap.contains_range(0..10_000));
    }
}
