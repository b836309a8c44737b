#![no_main]

use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use roaring_core::{Bitmap, Deserializer, Native, Portable, Serializer};

fn check_bitmap<D: Deserializer + Serializer>(input: &[u8]) {
    let bitmap = Bitmap::try_deserialize::<D>(input);
    if let Ok(mut bitmap) = bitmap {
        let reserialized = bitmap.serialize::<D>();
        assert_eq!(
            Bitmap::try_deserialize::<D>(&reserialized).as_ref(),
            Ok(&bitmap),
            "Round trip mismatch in {}",
            std::any::type_name::<D>()
        );

        let start_cardinality = bitmap.cardinality();
        let mut new_cardinality = start_cardinality;
        for i in 100..1000 {
            if !bitmap.contains(i) {
                bitmap.add(i);
                new_cardinality += 1;
            }
        }
        assert_eq!(
            new_cardinality,
            bitmap.cardinality(),
            "Cardinality mismatch in {}",
            std::any::type_name::<D>()
        );
    }
}

#[derive(Arbitrary, Debug)]
enum BitmapType {
    Portable,
    Native,
}

fuzz_target!(|input: (BitmapType, &[u8])| {
    let (ty, input) = input;
    match ty {
        BitmapType::Portable => check_bitmap::<Portable>(input),
        BitmapType::Native => check_bitmap::<Native>(input),
    }
});
