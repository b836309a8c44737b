/// The `Portable` format is meant to be compatible with other roaring bitmap libraries, such as Go or Java.
///
/// Every integer is written little-endian, whatever the host byte order.
///
/// It's defined here: <https://github.com/RoaringBitmap/RoaringFormatSpec>
pub enum Portable {}

/// The `Native` format format can sometimes be more space efficient than [`Portable`],
///
/// e.g. when the data is sparse. It's not compatible with Java and Go implementations.
/// Use [`Portable`] for that purpose.
///
/// A one byte tag picks the layout: `1` is followed by the cardinality and
/// every value as `u32`, `2` by a [`Portable`] bitmap.
pub enum Native {}

impl crate::sealed::Sealed for Portable {}
impl crate::sealed::Sealed for Native {}
