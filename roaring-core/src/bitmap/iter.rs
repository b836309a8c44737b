use std::iter::{FromIterator, FusedIterator, IntoIterator};

use super::index::ChunkIndex;
use super::{join, split, Bitmap};
use crate::container::Iter;

/// Ascending iterator over the values of a [`Bitmap`]
#[derive(Clone)]
pub struct BitmapIterator<'a> {
    index: &'a ChunkIndex,
    // Next container to load once `current` runs dry
    position: usize,
    current: Option<(u16, Iter<'a>)>,
}

impl<'a> BitmapIterator<'a> {
    fn new(bitmap: &'a Bitmap) -> Self {
        BitmapIterator {
            index: bitmap.index(),
            position: 0,
            current: None,
        }
    }

    /// Attempt to read many values from the iterator into `dst`
    ///
    /// Returns the number of items read from the iterator, may be `< dst.len()` iff
    /// the iterator is exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap: Bitmap = Bitmap::create();
    /// bitmap.add_range(0..100);
    /// bitmap.add(222);
    /// bitmap.add(555);
    ///
    /// let mut buf = [0; 100];
    /// let mut iter = bitmap.iter();
    /// assert_eq!(iter.next_many(&mut buf), 100);
    /// // Get the first 100 items, from the original range added
    /// for (i, item) in buf.iter().enumerate() {
    ///     assert_eq!(*item, i as u32);
    /// }
    /// // Calls to next_many() can be interleaved with calls to next()
    /// assert_eq!(iter.next(), Some(222));
    /// assert_eq!(iter.next_many(&mut buf), 1);
    /// assert_eq!(buf[0], 555);
    ///
    /// assert_eq!(iter.next(), None);
    /// assert_eq!(iter.next_many(&mut buf), 0);
    /// ```
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// fn print_by_chunks(bitmap: &Bitmap) {
    ///     let mut buf = [0; 1024];
    ///     let mut iter = bitmap.iter();
    ///     loop {
    ///         let n = iter.next_many(&mut buf);
    ///         if n == 0 {
    ///             break;
    ///         }
    ///         println!("{:?}", &buf[..n]);
    ///     }
    /// }
    ///
    /// # print_by_chunks(&Bitmap::of(&[1, 2, 8, 20, 1000]));
    /// ```
    pub fn next_many(&mut self, dst: &mut [u32]) -> usize {
        let mut count = 0;
        for (slot, value) in dst.iter_mut().zip(self.by_ref()) {
            *slot = value;
            count += 1;
        }
        count
    }

    /// Reset the iterator to the first value `>= val`
    ///
    /// This can move the iterator forwards or backwards.
    ///
    /// # Examples
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[0, 1, 100, 1000, u32::MAX]);
    /// let mut iter = bitmap.iter();
    /// iter.reset_at_or_after(0);
    /// assert_eq!(iter.next(), Some(0));
    /// iter.reset_at_or_after(0);
    /// assert_eq!(iter.next(), Some(0));
    ///
    /// iter.reset_at_or_after(101);
    /// assert_eq!(iter.next(), Some(1000));
    /// assert_eq!(iter.next(), Some(u32::MAX));
    /// assert_eq!(iter.next(), None);
    /// iter.reset_at_or_after(u32::MAX);
    /// assert_eq!(iter.next(), Some(u32::MAX));
    /// assert_eq!(iter.next(), None);
    /// ```
    pub fn reset_at_or_after(&mut self, val: u32) {
        let index = self.index;
        let (key, low) = split(val);
        match index.position(key) {
            Ok(i) => {
                self.current = Some((key, index.container_at(i).iter_from(low)));
                self.position = i + 1;
            }
            Err(i) => {
                self.current = None;
                self.position = i;
            }
        }
    }
}

impl<'a> Iterator for BitmapIterator<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index;
        loop {
            if let Some((key, values)) = &mut self.current {
                if let Some(low) = values.next() {
                    return Some(join(*key, low));
                }
            }
            if self.position >= index.len() {
                self.current = None;
                return None;
            }
            self.current = Some((
                index.key_at(self.position),
                index.container_at(self.position).iter(),
            ));
            self.position += 1;
        }
    }
}

impl FusedIterator for BitmapIterator<'_> {}

impl Bitmap {
    /// Returns an iterator over each value stored in the bitmap.
    /// Returned values are ordered in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap = Bitmap::create();
    /// bitmap.add(4);
    /// bitmap.add(3);
    /// bitmap.add(2);
    /// let mut iterator = bitmap.iter();
    ///
    /// assert_eq!(iterator.next(), Some(2));
    /// assert_eq!(iterator.next(), Some(3));
    /// assert_eq!(iterator.next(), Some(4));
    /// assert_eq!(iterator.next(), None);
    /// ```
    pub fn iter(&self) -> BitmapIterator<'_> {
        BitmapIterator::new(self)
    }
}

impl<'a> IntoIterator for &'a Bitmap {
    type Item = u32;
    type IntoIter = BitmapIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<u32> for Bitmap {
    /// Convenience method for creating bitmap from iterator.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap: Bitmap = (1..3).collect();
    ///
    /// assert!(!bitmap.is_empty());
    /// assert!(bitmap.contains(1));
    /// assert!(bitmap.contains(2));
    /// assert_eq!(bitmap.cardinality(), 2);
    /// ```
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Bitmap::of(&Vec::from_iter(iter))
    }
}

impl Extend<u32> for Bitmap {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        self.add_many(&Vec::from_iter(iter));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iterates_every_container_kind() {
        let mut bitmap = Bitmap::of(&[3, 70_000]);
        bitmap.add_range(200_000..210_000);
        bitmap.add_range(300_000..=310_000);
        bitmap.run_optimize();
        bitmap.extend((400_000..410_000).step_by(2));

        let expected: Vec<u32> = [3, 70_000]
            .into_iter()
            .chain(200_000..210_000)
            .chain(300_000..=310_000)
            .chain((400_000..410_000).step_by(2))
            .collect();
        assert_eq!(bitmap.iter().collect::<Vec<_>>(), expected);
        assert_eq!((&bitmap).into_iter().count() as u64, bitmap.cardinality());
    }

    #[test]
    fn reset_between_chunks() {
        let bitmap = Bitmap::of(&[5, 131_072, 131_073]);
        let mut iter = bitmap.iter();
        iter.reset_at_or_after(6);
        assert_eq!(iter.next(), Some(131_072));
        iter.reset_at_or_after(131_073);
        assert_eq!(iter.collect::<Vec<_>>(), [131_073]);
    }
}
