use std::u32;

use proptest::prelude::*;
use roaring_core::{Bitmap, Error, Native, Portable};

// borrowed and adapted from https://github.com/Nemo157/roaring-rs/blob/5089f180ca7e17db25f5c58023f4460d973e747f/tests/lib.rs#L7-L37
#[test]
fn smoke1() {
    let mut bitmap = Bitmap::create();
    assert_eq!(bitmap.cardinality(), 0);
    assert!(bitmap.is_empty());
    bitmap.remove(0);
    assert_eq!(bitmap.cardinality(), 0);
    assert!(bitmap.is_empty());
    bitmap.add(1);
    assert!(bitmap.contains(1));
    assert_eq!(bitmap.cardinality(), 1);
    assert!(!bitmap.is_empty());
    bitmap.add(u32::MAX - 2);
    assert!(bitmap.contains(u32::MAX - 2));
    assert_eq!(bitmap.cardinality(), 2);
    bitmap.add(u32::MAX);
    assert!(bitmap.contains(u32::MAX));
    assert_eq!(bitmap.cardinality(), 3);
    bitmap.add(2);
    assert!(bitmap.contains(2));
    assert_eq!(bitmap.cardinality(), 4);
    bitmap.remove(2);
    assert!(!bitmap.contains(2));
    assert_eq!(bitmap.cardinality(), 3);
    assert!(!bitmap.contains(0));
    assert!(bitmap.contains(1));
    assert!(!bitmap.contains(100));
    assert!(bitmap.contains(u32::MAX - 2));
    assert!(!bitmap.contains(u32::MAX - 1));
    assert!(bitmap.contains(u32::MAX));
    bitmap.clear();
    assert_eq!(bitmap.cardinality(), 0);
    assert!(bitmap.is_empty());
}

// borrowed and adapted from https://github.com/RoaringBitmap/gocroaring/blob/4a2fc02f79b1c36b904301e7d052f7f0017b6973/gocroaring_test.go#L24-L64
#[test]
fn smoke2() {
    let mut rb1 = Bitmap::create();
    rb1.add(1);
    rb1.add(2);
    rb1.add(3);
    rb1.add(4);
    rb1.add(5);
    rb1.add(100);
    rb1.add(1000);
    rb1.run_optimize();

    let mut rb2 = Bitmap::create();
    rb2.add(3);
    rb2.add(4);
    rb2.add(1000);
    rb2.run_optimize();

    let mut rb3 = Bitmap::create();

    assert_eq!(rb1.cardinality(), 7);
    assert!(rb1.contains(3));

    rb1.and_inplace(&rb2);
    rb3.add(5);
    rb3.or_inplace(&rb1);

    let mut rb4 = Bitmap::fast_or(&[&rb1, &rb2, &rb3]);
    assert_eq!(rb4.to_vec(), [3, 4, 5, 1000]);

    rb1.and_inplace(&rb2);
    assert_eq!(rb1.to_vec(), [3, 4, 1000]);

    rb3.add(5);
    rb3.or_inplace(&rb1);
    assert_eq!(rb3.to_vec(), [3, 4, 5, 1000]);

    rb4 = Bitmap::fast_or(&[&rb1, &rb2, &rb3]);
    assert_eq!(rb4, rb3);
}

#[test]
fn end_to_end() {
    let mut b1 = Bitmap::create();
    for value in 100..1000 {
        b1.add(value);
    }
    assert!(b1.contains(500));
    assert_eq!(b1.cardinality(), 900);

    let b2 = Bitmap::of(&[1, 2, 3, 5, 6]);
    let b3 = Bitmap::of(&[2, 3, 4]);
    assert_eq!((&b1 | &b2) | &b3, Bitmap::fast_or(&[&b1, &b2, &b3]));
    assert_eq!((&b1 & &b2).cardinality(), 0);

    let bytes = b1.serialize::<Portable>();
    assert_eq!(Bitmap::try_deserialize::<Portable>(&bytes).unwrap(), b1);

    let before = b1.get_size_in_bytes(true);
    assert!(b1.run_optimize());
    assert!(b1.get_size_in_bytes(true) < before);
}

#[test]
fn flip_creates_full_chunks() {
    let mut bitmap = Bitmap::of(&[10, 200_000]);
    bitmap.flip_inplace(5..=200_000);
    assert_eq!(bitmap.cardinality(), 200_000 - 5 - 1);
    assert!(!bitmap.contains(10));
    assert!(!bitmap.contains(200_000));
    assert!(bitmap.contains(5));
    assert!(bitmap.contains(65_536));
    assert!(bitmap.contains(199_999));
    assert!(!bitmap.contains(4));

    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_containers, 4);
    assert_eq!(statistics.min_value, 5);
    assert_eq!(statistics.max_value, 199_999);
}

#[test]
fn select_and_rank_across_chunks() {
    let bitmap = Bitmap::of(&[7, 65_536, 65_537, 4_000_000_000]);
    assert_eq!(bitmap.select(0), Some(7));
    assert_eq!(bitmap.select(2), Some(65_537));
    assert_eq!(bitmap.select(3), Some(4_000_000_000));
    assert_eq!(bitmap.select(4), None);
    assert_eq!(bitmap.rank(65_536), 2);
    assert_eq!(bitmap.rank(u32::MAX), 4);
}

#[test]
fn copy_on_write_clones_are_independent() {
    let mut original: Bitmap = (0..100_000).step_by(3).collect();
    original.set_copy_on_write(true);

    let mut copy = original.clone();
    copy.remove_range(..50_000);
    copy |= Bitmap::of(&[1]);
    copy.run_optimize();

    assert_eq!(original.cardinality(), 33_334);
    assert_eq!(original.minimum(), Some(0));
    assert_eq!(copy.minimum(), Some(1));

    let mut target = Bitmap::of(&[42]);
    target.clone_from(&original);
    assert_eq!(target, original);
    target.add(1);
    assert!(!original.contains(1));
}

#[test]
fn empty_statistics() {
    let statistics = Bitmap::create().statistics();
    assert_eq!(statistics.n_containers, 0);
    assert_eq!(statistics.min_value, u32::MAX);
    assert_eq!(statistics.max_value, 0);
    assert_eq!(statistics.cardinality, 0);
}

#[test]
fn deserialize_rejects_garbage() {
    assert!(matches!(
        Bitmap::try_deserialize::<Portable>(&[]),
        Err(Error::Truncated { .. })
    ));
    assert!(matches!(
        Bitmap::try_deserialize::<Portable>(&[1, 2, 3, 4, 5, 6, 7, 8]),
        Err(Error::InvalidCookie(_))
    ));
    assert!(Bitmap::deserialize::<Native>(&[9, 9, 9]).is_empty());
}

#[test]
fn portable_matches_roaring_rs() {
    let values: Vec<u32> = (0..10_000)
        .map(|i| i * 3)
        .chain(100_000..105_000)
        .chain([1 << 20, u32::MAX])
        .collect();
    let ours = Bitmap::of(&values);
    let theirs: roaring::RoaringBitmap = values.iter().copied().collect();

    let mut expected = Vec::new();
    theirs.serialize_into(&mut expected).unwrap();
    assert_eq!(ours.serialize::<Portable>(), expected);

    let read_back = roaring::RoaringBitmap::deserialize_from(&ours.serialize::<Portable>()[..]).unwrap();
    assert_eq!(read_back, theirs);
    assert_eq!(Bitmap::try_deserialize::<Portable>(&expected).unwrap(), ours);
}

fn bitmap_strategy() -> impl Strategy<Value = Bitmap> {
    (
        prop::collection::vec(prop_oneof![any::<u32>(), 0u32..300_000], 0..2000),
        prop::collection::vec((0u32..400_000, 0u32..70_000), 0..3),
        any::<bool>(),
    )
        .prop_map(|(values, ranges, optimize)| {
            let mut bitmap = Bitmap::of(&values);
            for (start, len) in ranges {
                bitmap.add_range(start..start + len);
            }
            if optimize {
                bitmap.run_optimize();
            }
            bitmap
        })
}

proptest! {
    #[test]
    fn bitmap_cardinality_roundtrip(
        indices in prop::collection::vec(proptest::num::u32::ANY, 1..3000)
    ) {
        let original = Bitmap::of(&indices);
        let mut a = indices;
        a.sort_unstable();
        a.dedup();
        prop_assert_eq!(a.len(), original.cardinality() as usize);
        prop_assert_eq!(a, original.to_vec());
    }

    #[test]
    fn test_bitmap_serialization_roundtrip(original in bitmap_strategy()) {
        for portable in [true, false] {
            let mut buffer = Vec::new();
            let written = original.write(&mut buffer, portable);
            prop_assert_eq!(written, original.get_size_in_bytes(portable));
            prop_assert_eq!(buffer.len(), written);
            let deserialized = Bitmap::read(&buffer, portable).unwrap();
            prop_assert_eq!(&original, &deserialized);
        }
    }

    #[test]
    fn run_optimize_is_idempotent(original in bitmap_strategy()) {
        let mut bitmap = original.clone();
        let before = bitmap.get_size_in_bytes(true);
        bitmap.run_optimize();
        let once = bitmap.serialize::<Portable>();
        prop_assert!(once.len() <= before);
        bitmap.run_optimize();
        prop_assert_eq!(once, bitmap.serialize::<Portable>());
        prop_assert_eq!(&bitmap, &original);

        bitmap.remove_run_compression();
        prop_assert_eq!(&bitmap, &original);
        prop_assert_eq!(bitmap.statistics().n_run_containers, 0);
    }

    #[test]
    fn set_algebra_laws(a in bitmap_strategy(), b in bitmap_strategy(), c in bitmap_strategy()) {
        prop_assert_eq!(&a | &b, &b | &a);
        prop_assert_eq!(&a & &b, &b & &a);
        prop_assert_eq!(&(&a | &b) & &a, a.clone());
        prop_assert!((&a ^ &a).is_empty());
        prop_assert_eq!(Bitmap::fast_or(&[&a, &b, &c]), &(&a | &b) | &c);
        prop_assert_eq!(Bitmap::fast_or_heap(&[&a, &b, &c]), &(&a | &b) | &c);
        prop_assert_eq!(Bitmap::fast_xor(&[&a, &b, &c]), &(&a ^ &b) ^ &c);

        prop_assert_eq!((&a & &b).cardinality(), a.and_cardinality(&b));
        prop_assert_eq!((&a | &b).cardinality(), a.or_cardinality(&b));
        prop_assert_eq!((&a ^ &b).cardinality(), a.xor_cardinality(&b));
        prop_assert_eq!((&a - &b).cardinality(), a.andnot_cardinality(&b));
        prop_assert_eq!(a.intersect(&b), !(&a & &b).is_empty());
        prop_assert!((&a & &b).is_subset(&a));

        let mut inplace = a.clone();
        inplace ^= &b;
        inplace -= &c;
        prop_assert_eq!(inplace, &(&a ^ &b) - &c);
    }

    #[test]
    fn select_matches_sorted_values(bitmap in bitmap_strategy(), picks in prop::collection::vec(any::<prop::sample::Index>(), 1..20)) {
        let values = bitmap.to_vec();
        prop_assert_eq!(bitmap.select(values.len() as u32), None);
        if !values.is_empty() {
            for pick in picks {
                let rank = pick.index(values.len());
                prop_assert_eq!(bitmap.select(rank as u32), Some(values[rank]));
                prop_assert_eq!(bitmap.rank(values[rank]), rank as u64 + 1);
            }
        }
    }

    #[test]
    fn flip_complements_range(bitmap in bitmap_strategy(), start in 0u32..300_000, len in 0u32..200_000) {
        let end = start + len;
        let flipped = bitmap.flip(start..end);
        prop_assert_eq!(
            flipped.range_cardinality(start..end),
            u64::from(len) - bitmap.range_cardinality(start..end)
        );
        prop_assert_eq!(flipped.range_cardinality(..start), bitmap.range_cardinality(..start));
        prop_assert_eq!(flipped.range_cardinality(end..), bitmap.range_cardinality(end..));
        prop_assert_eq!(flipped.flip(start..end), bitmap);
    }
}
