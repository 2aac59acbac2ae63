//! Fixed-size bit vector over route indexes.

use std::fmt;

use fixedbitset::FixedBitSet;

/// A fixed-size bit vector.
///
/// All binary operations require both operands to have the same size; the
/// size is fixed at construction and never changes.
///
/// Not safe for concurrent mutation. Build rows independently and combine
/// them afterwards.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Bitmap {
    bits: FixedBitSet,
}

impl Bitmap {
    /// Create an empty bitmap able to hold `size` bits.
    pub fn with_size(size: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(size),
        }
    }

    /// Create a bitmap with the given bits set.
    pub fn from_indexes(size: usize, indexes: impl IntoIterator<Item = usize>) -> Self {
        let mut result = Self::with_size(size);
        for index in indexes {
            result.set(index);
        }
        result
    }

    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Set a bit. Panics if `index` is outside the bitmap.
    pub fn set(&mut self, index: usize) {
        self.bits.insert(index);
    }

    /// Get a bit. Indexes outside the bitmap read as unset.
    pub fn get(&self, index: usize) -> bool {
        self.bits.contains(index)
    }

    /// Keep only the bits also set in `other`.
    pub fn and(&mut self, other: &Bitmap) {
        self.bits.intersect_with(&other.bits);
    }

    /// Add all bits set in `other`.
    pub fn or(&mut self, other: &Bitmap) {
        self.bits.union_with(&other.bits);
    }

    /// Remove all bits set in `other`.
    pub fn and_not(&mut self, other: &Bitmap) {
        self.bits.difference_with(&other.bits);
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.bits.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    /// Indexes of set bits, ascending.
    pub fn bit_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.ones()
    }

    /// Check if any bit is set in both bitmaps.
    pub fn intersects(&self, other: &Bitmap) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bit_indexes()).finish()
    }
}
