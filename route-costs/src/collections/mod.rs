//! Bitmap primitives the connectivity matrices are built from.

mod bitmap;
mod indexed_bitset;

pub use bitmap::Bitmap;
pub use indexed_bitset::IndexedBitSet;
