//! Square bit matrix, one row per route index.

use std::fmt;

use super::bitmap::Bitmap;

/// An N×N bit matrix stored as one [`Bitmap`] row per index.
///
/// Each row is an independent object so rows can be computed on separate
/// threads and inserted afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct IndexedBitSet {
    size: usize,
    rows: Vec<Bitmap>,
}

impl IndexedBitSet {
    /// Create an empty `size`×`size` matrix.
    pub fn square(size: usize) -> Self {
        Self {
            size,
            rows: (0..size).map(|_| Bitmap::with_size(size)).collect(),
        }
    }

    /// Create a matrix with only the diagonal set.
    pub fn identity(size: usize) -> Self {
        let mut result = Self::square(size);
        for index in 0..size {
            result.set(index, index);
        }
        result
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set(&mut self, row: usize, column: usize) {
        self.rows[row].set(column);
    }

    /// Indexes outside the matrix read as unset.
    pub fn is_set(&self, row: usize, column: usize) -> bool {
        self.rows.get(row).is_some_and(|bits| bits.get(column))
    }

    pub fn row(&self, row: usize) -> &Bitmap {
        &self.rows[row]
    }

    /// Replace a row. The new row must have the matrix's size.
    pub fn insert_row(&mut self, row: usize, bits: Bitmap) {
        debug_assert_eq!(bits.size(), self.size, "row size mismatch");
        self.rows[row] = bits;
    }

    /// AND a row with a mask, in place.
    pub fn and_row(&mut self, row: usize, mask: &Bitmap) {
        self.rows[row].and(mask);
    }

    /// OR a row with other bits, in place.
    pub fn or_row(&mut self, row: usize, bits: &Bitmap) {
        self.rows[row].or(bits);
    }

    /// Total number of set bits across all rows.
    pub fn number_of_bits_set(&self) -> u64 {
        self.rows.iter().map(|row| row.cardinality() as u64).sum()
    }

    /// All set positions as `(row, column)`, row-major.
    pub fn set_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, bits)| bits.bit_indexes().map(move |column| (row, column)))
    }
}

impl fmt::Debug for IndexedBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedBitSet")
            .field("size", &self.size)
            .field("bits_set", &self.number_of_bits_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_starts_empty() {
        let matrix = IndexedBitSet::square(5);
        assert_eq!(matrix.size(), 5);
        assert_eq!(matrix.number_of_bits_set(), 0);
    }

    #[test]
    fn identity_sets_diagonal() {
        let matrix = IndexedBitSet::identity(4);
        assert_eq!(matrix.number_of_bits_set(), 4);
        for i in 0..4 {
            assert!(matrix.is_set(i, i));
        }
        assert!(!matrix.is_set(0, 1));
    }

    #[test]
    fn set_and_rows() {
        let mut matrix = IndexedBitSet::square(4);
        matrix.set(1, 2);
        matrix.set(1, 3);
        matrix.set(2, 0);

        assert!(matrix.is_set(1, 2));
        assert!(!matrix.is_set(2, 1));
        assert!(!matrix.is_set(10, 1));
        assert_eq!(matrix.row(1).bit_indexes().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(
            matrix.set_positions().collect::<Vec<_>>(),
            vec![(1, 2), (1, 3), (2, 0)]
        );
    }

    #[test]
    fn and_row_applies_mask() {
        let mut matrix = IndexedBitSet::square(4);
        matrix.set(0, 1);
        matrix.set(0, 2);
        matrix.and_row(0, &Bitmap::from_indexes(4, [2, 3]));
        assert_eq!(matrix.row(0).bit_indexes().collect::<Vec<_>>(), vec![2]);
        matrix.or_row(0, &Bitmap::from_indexes(4, [0]));
        assert_eq!(matrix.row(0).bit_indexes().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn insert_row_replaces() {
        let mut matrix = IndexedBitSet::square(3);
        matrix.set(1, 0);
        matrix.insert_row(1, Bitmap::from_indexes(3, [2]));
        assert!(!matrix.is_set(1, 0));
        assert!(matrix.is_set(1, 2));
    }
}
