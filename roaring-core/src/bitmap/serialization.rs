use std::mem;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use super::index::ChunkIndex;
use super::Bitmap;
use crate::container::{
    ArrayContainer, BitsetContainer, Container, Run, RunContainer, ARRAY_LIMIT, BITMAP_WORDS,
    BITSET_BYTES,
};
use crate::{Error, Native, Portable};

/// Cookie of a portable bitmap with at least one run container; the high
/// 16 bits carry the container count minus one
const SERIAL_COOKIE: u32 = 12347;
/// Cookie of a portable bitmap without run containers
const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;
/// Run-bearing bitmaps with fewer containers omit the offset table
const NO_OFFSET_THRESHOLD: usize = 4;
const MAX_CONTAINERS: u32 = 1 << 16;

const NATIVE_ARRAY_TAG: u8 = 1;
const NATIVE_PORTABLE_TAG: u8 = 2;

pub trait Serializer: crate::sealed::Sealed {
    fn serialize_into<'a>(bitmap: &Bitmap, dst: &'a mut Vec<u8>) -> &'a [u8];
    fn get_serialized_size_in_bytes(bitmap: &Bitmap) -> usize;
}

pub trait Deserializer: crate::sealed::Sealed {
    fn try_deserialize(buffer: &[u8]) -> Result<Bitmap, Error>;
}

/// Forward-only little-endian writer over a pre-sized buffer
struct Writer<'a> {
    buf: &'a mut [u8],
}

impl<'a> Writer<'a> {
    fn advance(&mut self, len: usize) -> &'a mut [u8] {
        let (head, rest) = mem::take(&mut self.buf).split_at_mut(len);
        self.buf = rest;
        head
    }

    fn u8(&mut self, value: u8) {
        self.advance(1)[0] = value;
    }

    fn u16(&mut self, value: u16) {
        LittleEndian::write_u16(self.advance(2), value);
    }

    fn u32(&mut self, value: u32) {
        LittleEndian::write_u32(self.advance(4), value);
    }

    fn bytes(&mut self, src: &[u8]) {
        self.advance(src.len()).copy_from_slice(src);
    }

    fn u16s(&mut self, values: &[u16]) {
        LittleEndian::write_u16_into(values, self.advance(2 * values.len()));
    }

    fn u64s(&mut self, values: &[u64]) {
        LittleEndian::write_u64_into(values, self.advance(8 * values.len()));
    }
}

/// Bounds-checked little-endian reader
struct Reader<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, consumed: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() < len {
            let error = Error::Truncated {
                needed: self.consumed.saturating_add(len),
                available: self.consumed + self.buf.len(),
            };
            debug!(%error, "rejecting serialized bitmap");
            return Err(error);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        self.consumed += len;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, Error> {
        self.take(2).map(LittleEndian::read_u16)
    }

    fn u32(&mut self) -> Result<u32, Error> {
        self.take(4).map(LittleEndian::read_u32)
    }

    fn u16s(&mut self, count: usize) -> Result<Vec<u16>, Error> {
        let bytes = self.take(2 * count)?;
        let mut values = Vec::new();
        values.try_reserve_exact(count)?;
        values.resize(count, 0);
        LittleEndian::read_u16_into(bytes, &mut values);
        Ok(values)
    }

    fn words(&mut self) -> Result<Box<[u64; BITMAP_WORDS]>, Error> {
        let bytes = self.take(BITSET_BYTES)?;
        let mut words = Box::new([0u64; BITMAP_WORDS]);
        LittleEndian::read_u64_into(bytes, &mut words[..]);
        Ok(words)
    }
}

fn invalid(key: u16, reason: &'static str) -> Error {
    debug!(key, reason, "rejecting serialized container");
    Error::InvalidContainer { key, reason }
}

fn has_run_container(index: &ChunkIndex) -> bool {
    index.iter().any(|(_, container)| container.is_run())
}

/// Size of the cookie, run flags, descriptors and offsets
fn portable_header_size(containers: usize, has_run: bool) -> usize {
    if has_run {
        let offsets = if containers >= NO_OFFSET_THRESHOLD {
            4 * containers
        } else {
            0
        };
        4 + (containers + 7) / 8 + 4 * containers + offsets
    } else {
        8 + 8 * containers
    }
}

fn portable_size(index: &ChunkIndex) -> usize {
    let header = portable_header_size(index.len(), has_run_container(index));
    header
        + index
            .iter()
            .map(|(_, container)| container.serialized_size())
            .sum::<usize>()
}

fn write_portable(index: &ChunkIndex, w: &mut Writer<'_>) {
    let containers = index.len();
    let has_run = has_run_container(index);
    if has_run {
        w.u32(SERIAL_COOKIE | ((containers as u32 - 1) << 16));
        let mut flags = vec![0u8; (containers + 7) / 8];
        for (i, (_, container)) in index.iter().enumerate() {
            if container.is_run() {
                flags[i / 8] |= 1 << (i % 8);
            }
        }
        w.bytes(&flags);
    } else {
        w.u32(SERIAL_COOKIE_NO_RUNCONTAINER);
        w.u32(containers as u32);
    }
    for (key, container) in index.iter() {
        w.u16(key);
        w.u16((container.cardinality() - 1) as u16);
    }
    if !has_run || containers >= NO_OFFSET_THRESHOLD {
        let mut offset = portable_header_size(containers, has_run) as u32;
        for (_, container) in index.iter() {
            w.u32(offset);
            offset += container.serialized_size() as u32;
        }
    }
    for (_, container) in index.iter() {
        match container {
            Container::Array(array) => w.u16s(array.as_slice()),
            Container::Bitset(bits) => w.u64s(&bits.words()[..]),
            Container::Run(runs) => {
                w.u16(runs.num_runs() as u16);
                for run in runs.runs() {
                    w.u16(run.start);
                    w.u16(run.length);
                }
            }
        }
    }
}

fn read_container(
    r: &mut Reader<'_>,
    key: u16,
    cardinality: u32,
    is_run: bool,
) -> Result<Container, Error> {
    if is_run {
        let n_runs = usize::from(r.u16()?);
        if n_runs == 0 {
            return Err(invalid(key, "run container without runs"));
        }
        let raw = r.u16s(2 * n_runs)?;
        let mut runs: Vec<Run> = Vec::new();
        runs.try_reserve_exact(n_runs)?;
        let mut total = 0u32;
        for pair in raw.chunks_exact(2) {
            let (start, length) = (pair[0], pair[1]);
            let end = u32::from(start) + u32::from(length);
            if end > u32::from(u16::MAX) {
                return Err(invalid(key, "run extends past the chunk"));
            }
            match runs.last_mut() {
                Some(last) if start <= last.end() => {
                    return Err(invalid(key, "runs overlap or are unsorted"));
                }
                Some(last) if u32::from(start) == u32::from(last.end()) + 1 => {
                    *last = Run::new(last.start, end as u16);
                }
                _ => runs.push(Run { start, length }),
            }
            total += u32::from(length) + 1;
        }
        if total != cardinality {
            return Err(invalid(key, "run cardinality mismatch"));
        }
        Ok(Container::Run(RunContainer::from_runs_unchecked(runs)))
    } else if cardinality as usize <= ARRAY_LIMIT {
        let values = r.u16s(cardinality as usize)?;
        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid(key, "array values not strictly increasing"));
        }
        Ok(Container::Array(ArrayContainer::from_sorted_unchecked(
            values,
        )))
    } else {
        let bits = BitsetContainer::from_words(r.words()?);
        if bits.cardinality() != cardinality {
            return Err(invalid(key, "bitset cardinality mismatch"));
        }
        Ok(Container::Bitset(bits))
    }
}

fn read_portable(r: &mut Reader<'_>) -> Result<Bitmap, Error> {
    let cookie = r.u32()?;
    let (containers, run_flags) = if cookie & 0xFFFF == SERIAL_COOKIE {
        let containers = (cookie >> 16) as usize + 1;
        (containers, Some(r.take((containers + 7) / 8)?))
    } else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
        let containers = r.u32()?;
        if containers > MAX_CONTAINERS {
            debug!(containers, "rejecting portable bitmap: too many containers");
            return Err(Error::InvalidContainerCount(containers));
        }
        (containers as usize, None)
    } else {
        debug!(cookie, "rejecting portable bitmap: unknown cookie");
        return Err(Error::InvalidCookie(cookie));
    };

    let descriptors = r.take(4 * containers)?;
    if run_flags.is_none() || containers >= NO_OFFSET_THRESHOLD {
        // Containers are read in order, so offsets carry no information
        r.take(4 * containers)?;
    }

    let mut index = ChunkIndex::with_capacity(containers);
    let mut previous: Option<u16> = None;
    for (i, descriptor) in descriptors.chunks_exact(4).enumerate() {
        let key = LittleEndian::read_u16(&descriptor[..2]);
        let cardinality = u32::from(LittleEndian::read_u16(&descriptor[2..])) + 1;
        if let Some(previous) = previous {
            if key <= previous {
                debug!(previous, key, "rejecting portable bitmap: unsorted keys");
                return Err(Error::UnsortedKeys { previous, key });
            }
        }
        previous = Some(key);
        let is_run = run_flags.is_some_and(|flags| flags[i / 8] & (1 << (i % 8)) != 0);
        index.push(key, read_container(r, key, cardinality, is_run)?);
    }
    Ok(Bitmap::from_index(index, false))
}

impl Serializer for Portable {
    /// Serializes a bitmap to a slice of bytes in portable format.
    /// See [`Bitmap::serialize_into`] for examples.
    fn serialize_into<'a>(bitmap: &Bitmap, dst: &'a mut Vec<u8>) -> &'a [u8] {
        let start = dst.len();
        dst.resize(start + Self::get_serialized_size_in_bytes(bitmap), 0);
        let mut w = Writer {
            buf: &mut dst[start..],
        };
        write_portable(bitmap.index(), &mut w);
        debug_assert!(w.buf.is_empty());
        &dst[start..]
    }

    /// Computes the serialized size in bytes of the Bitmap in portable format.
    /// See [`Bitmap::get_serialized_size_in_bytes`] for examples.
    fn get_serialized_size_in_bytes(bitmap: &Bitmap) -> usize {
        portable_size(bitmap.index())
    }
}

impl Deserializer for Portable {
    /// Given a serialized bitmap as slice of bytes in portable format, returns a `Bitmap` instance.
    /// See [`Bitmap::try_deserialize`] for examples.
    fn try_deserialize(buffer: &[u8]) -> Result<Bitmap, Error> {
        read_portable(&mut Reader::new(buffer))
    }
}

/// Whether the native format stores `bitmap` as a flat value list
fn native_uses_array(bitmap: &Bitmap) -> bool {
    4 + 4 * bitmap.cardinality() <= portable_size(bitmap.index()) as u64
}

impl Serializer for Native {
    /// Serializes a bitmap to a slice of bytes in native format.
    /// See [`Bitmap::serialize_into`] for examples.
    fn serialize_into<'a>(bitmap: &Bitmap, dst: &'a mut Vec<u8>) -> &'a [u8] {
        let start = dst.len();
        dst.resize(start + Self::get_serialized_size_in_bytes(bitmap), 0);
        let mut w = Writer {
            buf: &mut dst[start..],
        };
        if native_uses_array(bitmap) {
            w.u8(NATIVE_ARRAY_TAG);
            w.u32(bitmap.cardinality() as u32);
            for value in bitmap.iter() {
                w.u32(value);
            }
        } else {
            w.u8(NATIVE_PORTABLE_TAG);
            write_portable(bitmap.index(), &mut w);
        }
        debug_assert!(w.buf.is_empty());
        &dst[start..]
    }

    /// Computes the serialized size in bytes of the Bitmap in native format.
    /// See [`Bitmap::get_serialized_size_in_bytes`] for examples.
    fn get_serialized_size_in_bytes(bitmap: &Bitmap) -> usize {
        if native_uses_array(bitmap) {
            1 + 4 + 4 * bitmap.cardinality() as usize
        } else {
            1 + portable_size(bitmap.index())
        }
    }
}

impl Deserializer for Native {
    /// Given a serialized bitmap as slice of bytes in native format, returns a `Bitmap` instance.
    /// See [`Bitmap::try_deserialize`] for examples.
    fn try_deserialize(buffer: &[u8]) -> Result<Bitmap, Error> {
        let mut r = Reader::new(buffer);
        match r.u8()? {
            NATIVE_ARRAY_TAG => {
                let cardinality = r.u32()? as usize;
                let bytes = r.take(cardinality.saturating_mul(4))?;
                let mut previous: Option<u32> = None;
                for chunk in bytes.chunks_exact(4) {
                    let value = LittleEndian::read_u32(chunk);
                    if previous.is_some_and(|previous| value <= previous) {
                        debug!(value, "rejecting native bitmap: values not strictly increasing");
                        return Err(invalid((value >> 16) as u16, "values not strictly increasing"));
                    }
                    previous = Some(value);
                }
                Ok(Bitmap::from_sorted_iter(
                    bytes.chunks_exact(4).map(LittleEndian::read_u32),
                ))
            }
            NATIVE_PORTABLE_TAG => read_portable(&mut r),
            tag => {
                debug!(tag, "rejecting native bitmap: unknown format tag");
                Err(Error::UnknownFormatTag(tag))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn portable_array_layout() {
        let bitmap = Bitmap::of(&[1, 2, 3]);
        let bytes = bitmap.serialize::<Portable>();
        assert_eq!(
            bytes,
            [
                0x3A, 0x30, 0x00, 0x00, // cookie
                0x01, 0x00, 0x00, 0x00, // container count
                0x00, 0x00, 0x02, 0x00, // key 0, cardinality 3
                0x10, 0x00, 0x00, 0x00, // offset 16
                0x01, 0x00, 0x02, 0x00, 0x03, 0x00,
            ]
        );
    }

    #[test]
    fn portable_run_layout() {
        let mut bitmap: Bitmap = (100..1000).collect();
        bitmap.run_optimize();
        let bytes = bitmap.serialize::<Portable>();
        assert_eq!(
            bytes,
            [
                0x3B, 0x30, 0x00, 0x00, // cookie, one container
                0x01, // run flags
                0x00, 0x00, 0x83, 0x03, // key 0, cardinality 900
                0x01, 0x00, 0x64, 0x00, 0x83, 0x03,
            ]
        );
        assert_eq!(Bitmap::try_deserialize::<Portable>(&bytes).unwrap(), bitmap);
    }

    #[test]
    fn offsets_appear_with_four_run_bitmaps() {
        let mut bitmap = Bitmap::create();
        for key in 0..4u32 {
            bitmap.add_range(key << 16..(key << 16) + 100);
        }
        assert!(bitmap.run_optimize());
        let bytes = bitmap.serialize::<Portable>();
        assert_eq!(bytes.len(), 4 + 1 + 16 + 16 + 4 * 6);
        assert_eq!(LittleEndian::read_u32(&bytes[21..]), 37);
        assert_eq!(Bitmap::try_deserialize::<Portable>(&bytes).unwrap(), bitmap);
    }

    #[test]
    fn every_prefix_is_truncated() {
        let mut bitmap: Bitmap = (0..10_000).chain([100_000, 200_000]).collect();
        bitmap.add_range(300_000..400_000);
        bitmap.run_optimize();
        for portable in [true, false] {
            let mut bytes = Vec::new();
            bitmap.write(&mut bytes, portable);
            for len in 0..bytes.len() {
                assert!(
                    matches!(Bitmap::read(&bytes[..len], portable), Err(Error::Truncated { .. })),
                    "prefix {len} accepted"
                );
            }
            bytes.extend_from_slice(b"trailing");
            assert_eq!(Bitmap::read(&bytes, portable).unwrap(), bitmap);
        }
    }

    #[test]
    fn rejects_structural_errors() {
        let good = Bitmap::of(&[1, 2, 3]).serialize::<Portable>();

        let mut bad_cookie = good.clone();
        bad_cookie[0] = 0;
        assert_eq!(
            Bitmap::try_deserialize::<Portable>(&bad_cookie),
            Err(Error::InvalidCookie(0x3000))
        );

        let mut too_many = good.clone();
        LittleEndian::write_u32(&mut too_many[4..], 70_000);
        assert_eq!(
            Bitmap::try_deserialize::<Portable>(&too_many),
            Err(Error::InvalidContainerCount(70_000))
        );

        let mut unsorted = good.clone();
        unsorted[18] = 1;
        assert!(matches!(
            Bitmap::try_deserialize::<Portable>(&unsorted),
            Err(Error::InvalidContainer { key: 0, .. })
        ));

        let two_keys = Bitmap::of(&[1, 70_000]).serialize::<Portable>();
        let mut swapped = two_keys.clone();
        swapped[12] = 0;
        assert_eq!(
            Bitmap::try_deserialize::<Portable>(&swapped),
            Err(Error::UnsortedKeys {
                previous: 0,
                key: 0
            })
        );
    }

    #[test]
    fn rejects_bad_runs_and_bitsets() {
        // two overlapping runs [10, 20] and [15, 25]
        let overlapping = [
            0x3B, 0x30, 0x00, 0x00, 0x01, 0x00, 0x00, 0x15, 0x00, 0x02, 0x00, 0x0A, 0x00,
            0x0A, 0x00, 0x0F, 0x00, 0x0A, 0x00,
        ];
        assert!(matches!(
            Bitmap::try_deserialize::<Portable>(&overlapping),
            Err(Error::InvalidContainer { key: 0, .. })
        ));

        // adjacent runs [10, 20] and [21, 30] coalesce
        let adjacent = [
            0x3B, 0x30, 0x00, 0x00, 0x01, 0x00, 0x00, 0x14, 0x00, 0x02, 0x00, 0x0A, 0x00,
            0x0A, 0x00, 0x15, 0x00, 0x09, 0x00,
        ];
        let bitmap = Bitmap::try_deserialize::<Portable>(&adjacent).unwrap();
        assert_eq!(bitmap.to_vec(), (10..=30).collect::<Vec<_>>());
        assert_eq!(bitmap.statistics().n_bytes_run_containers, 6);

        let dense: Bitmap = (0..5000).collect();
        let mut bytes = dense.serialize::<Portable>();
        let last = bytes.len() - 1;
        bytes[last] = 0xFF;
        assert!(matches!(
            Bitmap::try_deserialize::<Portable>(&bytes),
            Err(Error::InvalidContainer { key: 0, .. })
        ));
    }

    #[test]
    fn native_picks_smaller_layout() {
        let sparse = Bitmap::of(&[1, 2, 3]);
        let bytes = sparse.serialize::<Native>();
        assert_eq!(bytes[0], NATIVE_ARRAY_TAG);
        assert_eq!(bytes.len(), 17);
        assert_eq!(Bitmap::try_deserialize::<Native>(&bytes).unwrap(), sparse);

        let dense: Bitmap = (0..100_000).collect();
        let bytes = dense.serialize::<Native>();
        assert_eq!(bytes[0], NATIVE_PORTABLE_TAG);
        assert_eq!(bytes.len(), dense.get_serialized_size_in_bytes::<Portable>() + 1);
        assert_eq!(Bitmap::try_deserialize::<Native>(&bytes).unwrap(), dense);

        assert_eq!(
            Bitmap::try_deserialize::<Native>(&[7]),
            Err(Error::UnknownFormatTag(7))
        );
        let descending = [1, 2, 0, 0, 0, 5, 0, 0, 0, 4, 0, 0, 0];
        assert!(Bitmap::try_deserialize::<Native>(&descending).is_err());
    }

    #[test]
    fn empty_bitmap_round_trips() {
        let empty = Bitmap::create();
        assert_eq!(empty.serialize::<Portable>(), [0x3A, 0x30, 0, 0, 0, 0, 0, 0]);
        assert_eq!(empty.serialize::<Native>(), [1, 0, 0, 0, 0]);
        assert!(Bitmap::deserialize::<Portable>(&[0x3A, 0x30, 0, 0, 0, 0, 0, 0]).is_empty());
    }
}
