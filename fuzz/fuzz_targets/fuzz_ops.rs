#![no_main]

use crate::arbitrary_ops::*;
use roaring_core::{Bitmap, Native, Portable};
use std::collections::BTreeSet;
use libfuzzer_sys::arbitrary;
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

mod arbitrary_ops;

fuzz_target!(|input: FuzzInput| {
    let mut lhs = Bitmap::create();
    let mut rhs = Bitmap::create();
    let mut model = BTreeSet::new();

    for op in &input.lhs_ops {
        op.on_roaring(&mut lhs);
        op.on_model(&mut model);
    }
    assert!(lhs.iter().eq(model.iter().copied()));
    for op in &input.rhs_ops {
        op.on_roaring(&mut rhs);
    }

    let shared = lhs.clone();
    for op in &input.comp_ops {
        op.on_roaring(&mut lhs, &rhs);
    }
    assert!(shared.iter().eq(model.iter().copied()));

    for op in &input.view_ops {
        op.on_roaring(&rhs);
        op.on_roaring(&lhs);
    }

    check_serialized(&lhs);
    check_serialized(&rhs);
});

fn check_serialized(bitmap: &Bitmap) {
    for portable in [true, false] {
        let mut v = Vec::new();
        let written = bitmap.write(&mut v, portable);
        assert_eq!(written, bitmap.get_size_in_bytes(portable));
        assert_eq!(Bitmap::read(&v, portable).unwrap(), *bitmap);
    }
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    lhs_ops: Vec<MutableBitmapOperation>,
    rhs_ops: Vec<MutableBitmapOperation>,
    comp_ops: Vec<BitmapCompOperation>,
    view_ops: Vec<ReadBitmapOp>,
}

impl ReadBitmapOp {
    pub fn on_roaring(&self, b: &Bitmap) {
        match *self {
            ReadBitmapOp::ContainsRange(ref r) => {
                b.contains_range(r.start().0..=r.end().0);
            }
            ReadBitmapOp::Contains(i) => {
                b.contains(i.0);
            }
            ReadBitmapOp::RangeCardinality(ref r) => {
                b.range_cardinality(r.start().0..=r.end().0);
            }
            ReadBitmapOp::Cardinality => {
                b.cardinality();
            }
            ReadBitmapOp::Flip(ref r) => {
                b.flip(r.start().0..=r.end().0);
            }
            ReadBitmapOp::ToVec => {
                drop(b.to_vec());
            }
            ReadBitmapOp::GetSerializedSizeInBytes => {
                assert_eq!(
                    b.get_serialized_size_in_bytes::<Portable>(),
                    b.serialize::<Portable>().len()
                );
            }
            ReadBitmapOp::GetNativeSerializedSizeInBytes => {
                assert!(
                    b.get_serialized_size_in_bytes::<Native>()
                        <= b.get_serialized_size_in_bytes::<Portable>() + 1
                );
            }
            ReadBitmapOp::IsEmpty => {
                assert_eq!(b.is_empty(), b.cardinality() == 0);
            }
            ReadBitmapOp::Minimum => {
                b.minimum();
            }
            ReadBitmapOp::Maximum => {
                b.maximum();
            }
            ReadBitmapOp::Rank(i) => {
                b.rank(i.0);
            }
            ReadBitmapOp::Select(i) => {
                if let Some(value) = b.select(i.0) {
                    assert_eq!(b.rank(value), u64::from(i.0) + 1);
                }
            }
            ReadBitmapOp::Statistics => {
                b.statistics();
            }
            ReadBitmapOp::Clone => {
                drop(b.clone());
            }
            ReadBitmapOp::Debug => {
                use std::io::Write;
                write!(std::io::sink(), "{:?}", b).unwrap();
            }
            ReadBitmapOp::WithIter(ref iter_ops) => {
                let mut iter = b.iter();
                for op in iter_ops {
                    match *op {
                        IterOperation::ResetAtOrAfter(i) => {
                            iter.reset_at_or_after(i);
                        }
                        IterOperation::ReadNext => {
                            iter.next();
                        }
                        IterOperation::NextMany(n) => {
                            let mut v = vec![0; n as usize];
                            assert!(iter.next_many(&mut v) <= n as usize);
                        }
                    }
                }
            }
            ReadBitmapOp::AddOffset(i) => {
                b.add_offset(i);
            }
        }
    }
}
