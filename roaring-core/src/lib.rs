//! Compressed bitmaps over 32-bit integers
//!
//! A [`Bitmap`] splits each value into a 16-bit chunk key and a 16-bit low
//! half. The low halves of a chunk are kept in whichever of three containers
//! (a sorted array, a 65536-bit bitset or a list of runs) serializes smallest.
//!
//! Bitmaps read and write the [`Portable`] format shared with the Java, Go and
//! C implementations, as well as the [`Native`] format.
//!
//! ```
//! use roaring_core::{Bitmap, Portable};
//!
//! let mut bitmap: Bitmap = (1..=5).collect();
//! bitmap.add_range(1_000_000..2_000_000);
//! bitmap.run_optimize();
//!
//! let bytes = bitmap.serialize::<Portable>();
//! let copy = Bitmap::try_deserialize::<Portable>(&bytes)?;
//! assert_eq!(copy, bitmap);
//! assert_eq!(copy.cardinality(), 1_000_005);
//! # Ok::<(), roaring_core::Error>(())
//! ```

pub mod bitmap;
mod container;
mod error;
mod serialization;

pub use bitmap::Bitmap;
pub use bitmap::BitmapIterator;
pub use bitmap::{Deserializer, LazyBitmap, Serializer, Statistics};
pub use container::{ARRAY_LIMIT, BITMAP_WORDS};
pub use error::Error;
pub use serialization::{Native, Portable};

mod sealed {
    pub trait Sealed {}
}
