//! A compressed bitmap over the 32-bit universe
//!
//! Each value is split into a 16-bit chunk key and a 16-bit low half; the low
//! halves sharing a key live in one container.
//!
//! # Example
//!
//! ```rust
//! use roaring_core::Bitmap;
//!
//! let mut rb1 = Bitmap::create();
//! rb1.add(1);
//! rb1.add(2);
//! rb1.add(3);
//! rb1.add(4);
//! rb1.add(5);
//! rb1.add(100);
//! rb1.add(1000);
//! rb1.run_optimize();
//!
//! let mut rb2 = Bitmap::create();
//! rb2.add(3);
//! rb2.add(4);
//! rb2.add(1000);
//! rb2.run_optimize();
//!
//! let mut rb3 = Bitmap::create();
//!
//! assert_eq!(rb1.cardinality(), 7);
//! assert!(rb1.contains(3));
//!
//! rb1.and_inplace(&rb2);
//! rb3.add(5);
//! rb3.or_inplace(&rb1);
//!
//! let rb4 = Bitmap::fast_or(&[&rb1, &rb2, &rb3]);
//!
//! assert_eq!(rb4.to_vec(), [3, 4, 5, 1000]);
//! println!("{:?}", rb4);
//! ```

mod imp;
mod index;
mod iter;
mod lazy;
mod ops;
mod serialization;
mod union;

use self::index::ChunkIndex;

pub use self::iter::BitmapIterator;
pub use self::lazy::LazyBitmap;
pub use self::serialization::{Deserializer, Serializer};

/// A compressed bitmap
///
/// With copy-on-write enabled, clones share container storage until one side
/// mutates a shared container.
pub struct Bitmap {
    index: ChunkIndex,
    copy_on_write: bool,
}

/// Detailed statistics on the composition of a bitmap
///
/// Byte counts are the containers' payload sizes in the portable format. For
/// an empty bitmap `min_value` is `u32::MAX` and `max_value` is `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub n_containers: u32,
    pub n_array_containers: u32,
    pub n_run_containers: u32,
    pub n_bitset_containers: u32,
    pub n_values_array_containers: u64,
    pub n_values_run_containers: u64,
    pub n_values_bitset_containers: u64,
    pub n_bytes_array_containers: u64,
    pub n_bytes_run_containers: u64,
    pub n_bytes_bitset_containers: u64,
    pub max_value: u32,
    pub min_value: u32,
    pub sum_value: u64,
    pub cardinality: u64,
}

#[inline]
fn split(value: u32) -> (u16, u16) {
    ((value >> 16) as u16, value as u16)
}

#[inline]
fn join(key: u16, low: u16) -> u32 {
    (u32::from(key) << 16) | u32::from(low)
}
