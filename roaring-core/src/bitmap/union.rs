use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::index::ChunkIndex;
use super::Bitmap;
use crate::container::Container;

impl Bitmap {
    /// Appends the union of the containers sharing `key`, copying a lone
    /// container through instead of recomputing it
    fn push_union(out: &mut ChunkIndex, key: u16, sources: &[(&Bitmap, usize)]) {
        match sources {
            [] => {}
            [(bitmap, position)] => {
                out.push_copy(key, bitmap.index.shared_at(*position), bitmap.copy_on_write);
            }
            _ => {
                let containers: Vec<&Container> = sources
                    .iter()
                    .map(|(bitmap, position)| bitmap.index.container_at(*position))
                    .collect();
                out.push(key, Container::union_many(&containers));
            }
        }
    }

    /// Computes the union between many bitmaps quickly, as opposed to having
    /// to call or repeatedly. Returns the result as a new bitmap.
    ///
    /// Each chunk key is merged once across every input, so intermediate
    /// containers are never normalized.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    /// let bitmap3 = Bitmap::of(&[35]);
    ///
    /// let bitmap4 = Bitmap::fast_or(&[&bitmap1, &bitmap2, &bitmap3]);
    ///
    /// assert_eq!(bitmap4.cardinality(), 3);
    /// assert!(bitmap4.contains(15));
    /// assert!(bitmap4.contains(25));
    /// assert!(bitmap4.contains(35));
    /// ```
    pub fn fast_or(bitmaps: &[&Bitmap]) -> Self {
        match bitmaps {
            [] => return Bitmap::create(),
            [bitmap] => return Bitmap::clone(bitmap),
            _ => {}
        }
        let mut cursors = vec![0usize; bitmaps.len()];
        let mut out = ChunkIndex::new();
        let mut sources = Vec::with_capacity(bitmaps.len());
        loop {
            let next_key = bitmaps
                .iter()
                .zip(&cursors)
                .filter(|(bitmap, &cursor)| cursor < bitmap.index.len())
                .map(|(bitmap, &cursor)| bitmap.index.key_at(cursor))
                .min();
            let Some(key) = next_key else {
                break;
            };
            sources.clear();
            for (bitmap, cursor) in bitmaps.iter().zip(cursors.iter_mut()) {
                if *cursor < bitmap.index.len() && bitmap.index.key_at(*cursor) == key {
                    sources.push((*bitmap, *cursor));
                    *cursor += 1;
                }
            }
            Self::push_union(&mut out, key, &sources);
        }
        Bitmap::from_index(out, bitmaps.iter().all(|b| b.copy_on_write))
    }

    /// Compute the union of 'number' bitmaps using a heap. This can
    /// sometimes be faster than Bitmap::fast_or.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    /// let bitmap3 = Bitmap::of(&[35]);
    ///
    /// let bitmap4 = Bitmap::fast_or_heap(&[&bitmap1, &bitmap2, &bitmap3]);
    ///
    /// assert_eq!(bitmap4.cardinality(), 3);
    /// assert!(bitmap4.contains(15));
    /// assert!(bitmap4.contains(25));
    /// assert!(bitmap4.contains(35));
    /// ```
    pub fn fast_or_heap(bitmaps: &[&Bitmap]) -> Self {
        match bitmaps {
            [] => return Bitmap::create(),
            [bitmap] => return Bitmap::clone(bitmap),
            _ => {}
        }
        let mut cursors = vec![0usize; bitmaps.len()];
        let mut heap: BinaryHeap<Reverse<(u16, usize)>> = bitmaps
            .iter()
            .enumerate()
            .filter(|(_, bitmap)| !bitmap.is_empty())
            .map(|(i, bitmap)| Reverse((bitmap.index.key_at(0), i)))
            .collect();
        let mut out = ChunkIndex::new();
        let mut sources = Vec::with_capacity(bitmaps.len());
        while let Some(&Reverse((key, _))) = heap.peek() {
            sources.clear();
            while let Some(&Reverse((top, i))) = heap.peek() {
                if top != key {
                    break;
                }
                heap.pop();
                let bitmap = bitmaps[i];
                sources.push((bitmap, cursors[i]));
                cursors[i] += 1;
                if cursors[i] < bitmap.index.len() {
                    heap.push(Reverse((bitmap.index.key_at(cursors[i]), i)));
                }
            }
            Self::push_union(&mut out, key, &sources);
        }
        Bitmap::from_index(out, bitmaps.iter().all(|b| b.copy_on_write))
    }

    /// Computes the symmetric difference (xor) between multiple bitmaps quickly,
    /// returning the result as a new bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    /// let bitmap3 = Bitmap::of(&[35, 15]);
    ///
    /// let bitmap4 = Bitmap::fast_xor(&[&bitmap1, &bitmap2, &bitmap3]);
    ///
    /// assert_eq!(bitmap4.cardinality(), 2);
    /// assert!(!bitmap4.contains(15));
    /// assert!(bitmap4.contains(25));
    /// assert!(bitmap4.contains(35));
    /// ```
    pub fn fast_xor(bitmaps: &[&Bitmap]) -> Self {
        let mut result = Bitmap::create();
        result.lazy_batch(|lazy| {
            for bitmap in bitmaps {
                lazy.xor_inplace(bitmap);
            }
        });
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn inputs() -> Vec<Bitmap> {
        let mut full = Bitmap::create();
        full.add_range(0..65_536);
        vec![
            (0..3000).map(|i| i * 7).collect(),
            (10_000..200_000).step_by(3).collect(),
            Bitmap::of(&[5, 70_000, 4_000_000]),
            full,
            Bitmap::create(),
        ]
    }

    #[test]
    fn many_way_unions_agree() {
        let inputs = inputs();
        let refs: Vec<&Bitmap> = inputs.iter().collect();
        let mut expected = Bitmap::create();
        for bitmap in &inputs {
            expected.or_inplace(bitmap);
        }
        assert_eq!(Bitmap::fast_or(&refs), expected);
        assert_eq!(Bitmap::fast_or_heap(&refs), expected);
        assert!(Bitmap::fast_or(&[]).is_empty());
    }

    #[test]
    fn many_way_xor_agrees() {
        let inputs = inputs();
        let refs: Vec<&Bitmap> = inputs.iter().collect();
        let mut expected = Bitmap::create();
        for bitmap in &inputs {
            expected.xor_inplace(bitmap);
        }
        assert_eq!(Bitmap::fast_xor(&refs), expected);
    }
}
