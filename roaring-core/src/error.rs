//! Error types for bitmap operations

use std::collections::TryReserveError;

use thiserror::Error;

/// Error type for fallible bitmap operations
///
/// Only deserialization and a few materializing operations can fail; every
/// other operation on a [`Bitmap`](crate::Bitmap) is infallible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("buffer truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("invalid cookie: {0:#010x}")]
    InvalidCookie(u32),
    #[error("invalid container count: {0}")]
    InvalidContainerCount(u32),
    #[error("unknown format tag: {0}")]
    UnknownFormatTag(u8),
    #[error("invalid container for key {key}: {reason}")]
    InvalidContainer { key: u16, reason: &'static str },
    #[error("chunk keys out of order: {key} follows {previous}")]
    UnsortedKeys { previous: u16, key: u16 },
    #[error("allocation failed")]
    Allocation,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::Allocation
    }
}
