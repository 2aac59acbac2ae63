//! Static date and day overlap between routes.

use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::collections::{Bitmap, IndexedBitSet};

use super::index::RouteIndex;

/// For every route, which routes could ever run on the same date.
///
/// A route always overlaps itself. Computed once from the route index.
#[derive(Debug)]
pub struct RouteDateAndDayOverlap {
    overlaps: IndexedBitSet,
}

impl RouteDateAndDayOverlap {
    pub fn populate(index: &RouteIndex) -> Self {
        let started = Instant::now();
        let routes: Vec<_> = index.routes().collect();
        let size = routes.len();

        let rows: Vec<Vec<usize>> = routes
            .par_iter()
            .enumerate()
            .map(|(i, route)| {
                routes
                    .iter()
                    .enumerate()
                    .filter(|(j, other)| i == *j || route.is_date_overlap(other))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();

        let mut overlaps = IndexedBitSet::square(size);
        for (row, columns) in rows.into_iter().enumerate() {
            overlaps.insert_row(row, Bitmap::from_indexes(size, columns));
        }

        info!(
            routes = size,
            overlaps = overlaps.number_of_bits_set(),
            took_ms = started.elapsed().as_millis() as u64,
            "populated route date overlaps"
        );
        Self { overlaps }
    }

    pub fn overlaps_for(&self, index: usize) -> &Bitmap {
        self.overlaps.row(index)
    }

    pub fn is_overlap(&self, first: usize, second: usize) -> bool {
        self.overlaps.is_set(first, second)
    }

    pub fn size(&self) -> usize {
        self.overlaps.size()
    }

    pub fn number_of_bits_set(&self) -> u64 {
        self.overlaps.number_of_bits_set()
    }
}
