use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};
use std::sync::Arc;

use super::Bitmap;

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cardinality() < 32 {
            return write!(f, "Bitmap<{:?}>", self.to_vec());
        }
        match (self.minimum(), self.maximum()) {
            (Some(min), Some(max)) => write!(
                f,
                "Bitmap<{:?} values between {:?} and {:?}>",
                self.cardinality(),
                min,
                max
            ),
            _ => write!(f, "Bitmap<[]>"),
        }
    }
}

impl PartialEq for Bitmap {
    /// Bitmaps are equal when they hold the same values, whatever the
    /// container variants storing them.
    fn eq(&self, other: &Bitmap) -> bool {
        let (a, b) = (self.index(), other.index());
        a.keys() == b.keys()
            && (0..a.len()).all(|i| {
                Arc::ptr_eq(a.shared_at(i), b.shared_at(i)) || a.container_at(i) == b.container_at(i)
            })
    }
}

impl Eq for Bitmap {}

impl Default for Bitmap {
    #[inline]
    fn default() -> Self {
        Bitmap::create()
    }
}

impl Clone for Bitmap {
    /// Create a copy of a Bitmap
    ///
    /// With copy-on-write enabled the copy shares container storage with the
    /// original; otherwise every container is duplicated.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::create();
    /// bitmap1.add(11);
    ///
    /// let bitmap2 = bitmap1.clone();
    ///
    /// assert_eq!(bitmap1, bitmap2);
    /// ```
    fn clone(&self) -> Bitmap {
        let index = if self.copy_on_write {
            self.index.shallow_clone()
        } else {
            self.index.deep_clone()
        };
        Bitmap::from_index(index, self.copy_on_write)
    }

    /// Replaces the contents of `self` with a copy of `source`, adopting its
    /// copy-on-write flag
    fn clone_from(&mut self, source: &Bitmap) {
        self.copy_on_write = source.copy_on_write;
        self.index = if source.copy_on_write {
            source.index.shallow_clone()
        } else {
            source.index.deep_clone()
        };
    }
}

impl BitAnd for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.and`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1]);
    /// let bitmap2 = Bitmap::of(&[1, 2]);
    ///
    /// let bitmap3 = bitmap1 & bitmap2;
    ///
    /// assert!(bitmap3.contains(1));
    /// assert!(!bitmap3.contains(2));
    /// ```
    #[inline]
    fn bitand(mut self, other: Bitmap) -> Bitmap {
        self.and_inplace(&other);
        self
    }
}

impl<'a> BitAnd<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    #[inline]
    fn bitand(mut self, other: &'a Bitmap) -> Bitmap {
        self.and_inplace(other);
        self
    }
}

impl<'a, 'b> BitAnd<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.and`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1]);
    /// let bitmap2 = Bitmap::of(&[1, 2]);
    ///
    /// let bitmap3 = &bitmap1 & &bitmap2;
    ///
    /// assert!(bitmap3.contains(1));
    /// assert!(!bitmap3.contains(2));
    /// ```
    #[inline]
    fn bitand(self, other: &'a Bitmap) -> Bitmap {
        self.and(other)
    }
}

impl BitAndAssign for Bitmap {
    /// Syntactic sugar for `.and_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    /// let mut bitmap3 = Bitmap::of(&[15]);
    /// let bitmap4 = Bitmap::of(&[15, 25]);
    ///
    /// bitmap1 &= bitmap2;
    ///
    /// assert!(bitmap1.cardinality() == 0);
    /// assert!(!bitmap1.contains(15));
    /// assert!(!bitmap1.contains(25));
    ///
    /// bitmap3 &= bitmap4;
    ///
    /// assert!(bitmap3.cardinality() == 1);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// ```
    #[inline]
    fn bitand_assign(&mut self, other: Bitmap) {
        self.and_inplace(&other);
    }
}

impl<'a> BitAndAssign<&'a Bitmap> for Bitmap {
    #[inline]
    fn bitand_assign(&mut self, other: &'a Bitmap) {
        self.and_inplace(other);
    }
}

impl BitOr for Bitmap {
    type Output = Bitmap;

    /// Syntatic sugar for `.or`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// let bitmap3 = bitmap1 | bitmap2;
    ///
    /// assert!(bitmap3.cardinality() == 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(bitmap3.contains(25));
    /// ```
    #[inline]
    fn bitor(mut self, other: Bitmap) -> Bitmap {
        self.or_inplace(&other);
        self
    }
}

impl<'a> BitOr<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    #[inline]
    fn bitor(mut self, other: &'a Bitmap) -> Bitmap {
        self.or_inplace(other);
        self
    }
}

impl<'a, 'b> BitOr<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntatic sugar for `.or`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// let bitmap3 = &bitmap1 | &bitmap2;
    ///
    /// assert!(bitmap3.cardinality() == 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(bitmap3.contains(25));
    /// ```
    #[inline]
    fn bitor(self, other: &'a Bitmap) -> Bitmap {
        self.or(other)
    }
}

impl BitOrAssign for Bitmap {
    /// Syntatic sugar for `.or_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// bitmap1 |= bitmap2;
    ///
    /// assert!(bitmap1.cardinality() == 2);
    /// assert!(bitmap1.contains(15));
    /// assert!(bitmap1.contains(25));
    /// ```
    #[inline]
    fn bitor_assign(&mut self, other: Bitmap) {
        self.or_inplace(&other);
    }
}

impl<'a> BitOrAssign<&'a Bitmap> for Bitmap {
    #[inline]
    fn bitor_assign(&mut self, other: &'a Bitmap) {
        self.or_inplace(other);
    }
}

impl BitXor for Bitmap {
    type Output = Bitmap;

    /// Syntatic sugar for `.xor`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = bitmap1 ^ bitmap2;
    ///
    /// assert!(bitmap3.cardinality() == 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// assert!(bitmap3.contains(35));
    /// ```
    #[inline]
    fn bitxor(mut self, other: Bitmap) -> Bitmap {
        self.xor_inplace(&other);
        self
    }
}

impl<'a> BitXor<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    #[inline]
    fn bitxor(mut self, other: &'a Bitmap) -> Bitmap {
        self.xor_inplace(other);
        self
    }
}

impl<'a, 'b> BitXor<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntatic sugar for `.xor`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = &bitmap1 ^ &bitmap2;
    ///
    /// assert!(bitmap3.cardinality() == 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// assert!(bitmap3.contains(35));
    /// ```
    #[inline]
    fn bitxor(self, other: &'a Bitmap) -> Bitmap {
        self.xor(other)
    }
}

impl BitXorAssign for Bitmap {
    /// Syntatic sugar for `.xor_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// bitmap1 ^= bitmap2;
    ///
    /// assert!(bitmap1.cardinality() == 2);
    /// assert!(bitmap1.contains(15));
    /// assert!(!bitmap1.contains(25));
    /// assert!(bitmap1.contains(35));
    /// ```
    #[inline]
    fn bitxor_assign(&mut self, other: Bitmap) {
        self.xor_inplace(&other);
    }
}

impl<'a> BitXorAssign<&'a Bitmap> for Bitmap {
    #[inline]
    fn bitxor_assign(&mut self, other: &'a Bitmap) {
        self.xor_inplace(other);
    }
}

impl Sub for Bitmap {
    type Output = Bitmap;

    /// Syntatic sugar for `.andnot`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = bitmap1 - bitmap2;
    ///
    /// assert_eq!(bitmap3.cardinality(), 1);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// assert!(!bitmap3.contains(35));
    /// ```
    #[inline]
    fn sub(mut self, other: Bitmap) -> Bitmap {
        self.andnot_inplace(&other);
        self
    }
}

impl<'a> Sub<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    #[inline]
    fn sub(mut self, other: &'a Bitmap) -> Bitmap {
        self.andnot_inplace(other);
        self
    }
}

impl<'a, 'b> Sub<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntatic sugar for `.andnot`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = &bitmap1 - &bitmap2;
    ///
    /// assert_eq!(bitmap3.cardinality(), 1);
    /// assert!(bitmap3.contains(15));
    /// assert!(!bitmap3.contains(25));
    /// assert!(!bitmap3.contains(35));
    /// ```
    #[inline]
    fn sub(self, other: &'a Bitmap) -> Bitmap {
        self.andnot(other)
    }
}

impl SubAssign for Bitmap {
    /// Syntatic sugar for `.andnot_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// bitmap1 -= bitmap2;
    ///
    /// assert_eq!(bitmap1.cardinality(), 1);
    /// assert!(bitmap1.contains(15));
    /// assert!(!bitmap1.contains(25));
    /// assert!(!bitmap1.contains(35));
    /// ```
    #[inline]
    fn sub_assign(&mut self, other: Bitmap) {
        self.andnot_inplace(&other);
    }
}

impl<'a> SubAssign<&'a Bitmap> for Bitmap {
    #[inline]
    fn sub_assign(&mut self, other: &'a Bitmap) {
        self.andnot_inplace(other);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equality_ignores_container_kind() {
        let mut runs: Bitmap = (0..5000).collect();
        let plain = runs.clone();
        assert!(runs.run_optimize());
        assert_eq!(runs, plain);

        let mut other = plain.clone();
        other.remove(4999);
        assert_ne!(runs, other);
    }

    #[test]
    fn clone_from_adopts_source_flag() {
        let mut source = Bitmap::of(&[1, 2, 3]);
        source.set_copy_on_write(true);
        let mut target = Bitmap::of(&[9]);
        target.clone_from(&source);
        assert_eq!(target, source);
        assert!(target.get_copy_on_write());
        assert!(Arc::ptr_eq(source.index.shared_at(0), target.index.shared_at(0)));
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", Bitmap::of(&[1, 2])), "Bitmap<[1, 2]>");
        let big: Bitmap = (10..110).collect();
        assert_eq!(format!("{:?}", big), "Bitmap<100 values between 10 and 109>");
    }
}
