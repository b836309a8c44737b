use libfuzzer_sys::arbitrary::{self, Arbitrary, Unstructured};
use roaring_core::Bitmap;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Num(pub u32);

pub const MAX_NUM: u32 = 0x1_0000 * 4;

impl<'a> Arbitrary<'a> for Num {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(u.int_in_range(0..=(MAX_NUM - 1))?))
    }
}

#[derive(Arbitrary, Debug)]
pub enum MutableBitmapOperation {
    Add(Num),
    AddChecked(Num),
    AddMany(Vec<Num>),
    AddRange(RangeInclusive<Num>),
    RemoveRange(RangeInclusive<Num>),
    Clear,
    Remove(Num),
    RemoveChecked(Num),
    FlipInplace(RangeInclusive<Num>),
    ShrinkToFit,
    RunOptimize,
    RemoveRunCompression,
    SetCopyOnWrite(bool),
    // Probably turn it into a bitmap
    MakeBitmap { key: u16 },
    MakeRange { key: u16 },
}

#[derive(Arbitrary, Debug)]
pub enum ReadBitmapOp {
    ContainsRange(RangeInclusive<Num>),
    Contains(Num),
    RangeCardinality(RangeInclusive<Num>),
    Cardinality,
    Flip(RangeInclusive<Num>),
    ToVec,
    GetSerializedSizeInBytes,
    GetNativeSerializedSizeInBytes,
    IsEmpty,
    AddOffset(i64),
    Minimum,
    Maximum,
    Rank(Num),
    Select(Num),
    Statistics,
    Clone,
    Debug,
    WithIter(Vec<IterOperation>),
}

#[derive(Arbitrary, Debug)]
pub enum BitmapCompOperation {
    Eq,
    IsSubset,
    IsStrictSubset,
    Intersect,
    JacardIndex,
    And,
    Or,
    Xor,
    AndNot,
    LazyOr { force_bitsets: bool },
    LazyXor,
}

#[derive(Arbitrary, Debug)]
pub enum IterOperation {
    ResetAtOrAfter(u32),
    ReadNext,
    NextMany(u16),
}

impl MutableBitmapOperation {
    pub fn on_roaring(&self, b: &mut Bitmap) {
        match *self {
            MutableBitmapOperation::Add(i) => {
                b.add(i.0);
            }
            MutableBitmapOperation::AddChecked(i) => {
                b.add_checked(i.0);
            }
            MutableBitmapOperation::AddMany(ref items) => {
                let items: Vec<u32> = items.iter().map(|i| i.0).collect();
                b.add_many(&items);
            }
            MutableBitmapOperation::AddRange(ref r) => {
                b.add_range(r.start().0..=r.end().0);
            }
            MutableBitmapOperation::RemoveRange(ref r) => {
                b.remove_range(r.start().0..=r.end().0);
            }
            MutableBitmapOperation::Clear => {
                b.clear();
            }
            MutableBitmapOperation::Remove(i) => {
                b.remove(i.0);
            }
            MutableBitmapOperation::RemoveChecked(i) => {
                b.remove_checked(i.0);
            }
            MutableBitmapOperation::FlipInplace(ref r) => {
                b.flip_inplace(r.start().0..=r.end().0);
            }
            MutableBitmapOperation::ShrinkToFit => {
                b.shrink_to_fit();
            }
            MutableBitmapOperation::RunOptimize => {
                b.run_optimize();
            }
            MutableBitmapOperation::RemoveRunCompression => {
                b.remove_run_compression();
            }
            MutableBitmapOperation::SetCopyOnWrite(flag) => {
                b.set_copy_on_write(flag);
            }
            MutableBitmapOperation::MakeBitmap { key } => {
                let key = u32::from(key);
                let start = key * 0x1_0000;
                let end = start + 9 * 1024;
                for i in (start..end).step_by(2) {
                    b.add(i);
                }
            }
            MutableBitmapOperation::MakeRange { key } => {
                let key = u32::from(key);
                let start = key * 0x1_0000;
                let end = start + 0x0_FFFF;
                b.add_range(start..=end)
            }
        }
        b.remove_range(MAX_NUM..);
    }
}

impl BitmapCompOperation {
    pub fn on_roaring(&self, lhs: &mut Bitmap, rhs: &Bitmap) {
        match *self {
            BitmapCompOperation::Eq => {
                drop(lhs == rhs);
                assert_eq!(lhs, lhs);
            }
            BitmapCompOperation::IsSubset => {
                lhs.is_subset(rhs);
                assert!(lhs.is_subset(lhs));
            }
            BitmapCompOperation::IsStrictSubset => {
                lhs.is_strict_subset(rhs);
                assert!(!lhs.is_strict_subset(lhs));
            }
            BitmapCompOperation::Intersect => {
                lhs.intersect(rhs);
                assert!(lhs.is_empty() || lhs.intersect(lhs));
            }
            BitmapCompOperation::JacardIndex => {
                lhs.jaccard_index(rhs);
                lhs.jaccard_index(lhs);
            }
            BitmapCompOperation::And => {
                assert_eq!(lhs.and(lhs), *lhs);

                let res = lhs.and(rhs);
                assert_eq!(res.cardinality(), lhs.and_cardinality(rhs));
                lhs.and_inplace(rhs);
                assert_eq!(*lhs, res);
            }
            BitmapCompOperation::Or => {
                assert_eq!(lhs.or(lhs), *lhs);

                let res = lhs.or(rhs);
                assert_eq!(res.cardinality(), lhs.or_cardinality(rhs));
                assert_eq!(res, Bitmap::fast_or(&[lhs, rhs]));
                assert_eq!(res, Bitmap::fast_or_heap(&[lhs, rhs]));

                lhs.or_inplace(rhs);
                assert_eq!(*lhs, res);
            }
            BitmapCompOperation::Xor => {
                assert!(lhs.xor(lhs).is_empty());

                let res = lhs.xor(rhs);
                assert_eq!(res.cardinality(), lhs.xor_cardinality(rhs));
                assert_eq!(res, Bitmap::fast_xor(&[lhs, rhs]));

                lhs.xor_inplace(rhs);
                assert_eq!(*lhs, res);
            }
            BitmapCompOperation::AndNot => {
                assert!(lhs.andnot(lhs).is_empty());

                let res = lhs.andnot(rhs);
                assert_eq!(res.cardinality(), lhs.andnot_cardinality(rhs));

                lhs.andnot_inplace(rhs);
                assert_eq!(*lhs, res);
            }
            BitmapCompOperation::LazyOr { force_bitsets } => {
                let res = lhs.or(rhs);
                lhs.lazy_batch(|lazy| {
                    lazy.or_inplace(rhs, force_bitsets);
                });
                assert_eq!(*lhs, res);
            }
            BitmapCompOperation::LazyXor => {
                let res = lhs.xor(rhs);
                lhs.lazy_batch(|lazy| {
                    lazy.xor_inplace(rhs);
                });
                assert_eq!(*lhs, res);
            }
        }
    }
}

impl MutableBitmapOperation {
    /// Mirrors the operation on an ordered set model
    pub fn on_model(&self, model: &mut BTreeSet<u32>) {
        match *self {
            MutableBitmapOperation::Add(i) | MutableBitmapOperation::AddChecked(i) => {
                model.insert(i.0);
            }
            MutableBitmapOperation::AddMany(ref items) => {
                model.extend(items.iter().map(|i| i.0));
            }
            MutableBitmapOperation::AddRange(ref r) => {
                model.extend(r.start().0..=r.end().0);
            }
            MutableBitmapOperation::RemoveRange(ref r) => {
                model.retain(|v| !(r.start().0..=r.end().0).contains(v));
            }
            MutableBitmapOperation::Clear => model.clear(),
            MutableBitmapOperation::Remove(i) | MutableBitmapOperation::RemoveChecked(i) => {
                model.remove(&i.0);
            }
            MutableBitmapOperation::FlipInplace(ref r) => {
                for v in r.start().0..=r.end().0 {
                    if !model.remove(&v) {
                        model.insert(v);
                    }
                }
            }
            MutableBitmapOperation::ShrinkToFit
            | MutableBitmapOperation::RunOptimize
            | MutableBitmapOperation::RemoveRunCompression
            | MutableBitmapOperation::SetCopyOnWrite(_) => {}
            MutableBitmapOperation::MakeBitmap { key } => {
                let start = u32::from(key) * 0x1_0000;
                model.extend((start..start + 9 * 1024).step_by(2));
            }
            MutableBitmapOperation::MakeRange { key } => {
                let start = u32::from(key) * 0x1_0000;
                model.extend(start..=start + 0x0_FFFF);
            }
        }
        model.retain(|&v| v < MAX_NUM);
    }
}
