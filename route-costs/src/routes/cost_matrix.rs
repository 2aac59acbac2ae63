//! Route to route connectivity by number of changes.
//!
//! Degree 1 holds every pair of routes with an interchange where the first
//! sets down and the second picks up. Degree `d + 1` extends every degree
//! `d` connection by one more interchange. A pair is recorded only at the
//! smallest degree that reaches it, so the degree of a pair is the length of
//! the shortest interchange chain between the two routes.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::CacheError;
use crate::collections::{Bitmap, IndexedBitSet};
use crate::domain::{RouteId, TransportModes};
use crate::repository::InterchangeRepository;

use super::error::RouteMatrixError;
use super::index::{RouteIndex, RouteIndexPair};
use super::overlap::RouteDateAndDayOverlap;

/// Deepest degree computed.
pub const MAX_DEPTH: u8 = 5;

/// Degree reported for pairs not connected within [`MAX_DEPTH`].
pub const MAX_VALUE: u8 = u8::MAX;

/// One cached row of one degree's matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostsPerDegreeRecord {
    /// Zero based, so degree 1 is stored as 0.
    pub degree: u8,
    pub route_index: u16,
    pub set_bits: Vec<u16>,
}

/// One bit matrix per degree, `1..=MAX_DEPTH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostsPerDegree {
    bit_sets: Vec<IndexedBitSet>,
}

impl CostsPerDegree {
    fn new(size: usize) -> Self {
        Self {
            bit_sets: (0..MAX_DEPTH).map(|_| IndexedBitSet::square(size)).collect(),
        }
    }

    pub fn degree(&self, degree: u8) -> Result<&IndexedBitSet, RouteMatrixError> {
        if degree == 0 || degree > MAX_DEPTH {
            return Err(RouteMatrixError::DepthOutOfRange {
                degree,
                max: MAX_DEPTH,
            });
        }
        Ok(&self.bit_sets[degree as usize - 1])
    }

    fn is_set(&self, degree: u8, pair: RouteIndexPair) -> bool {
        self.bit_sets[degree as usize - 1].is_set(pair.first() as usize, pair.second() as usize)
    }

    pub fn number_of_bits_set(&self) -> u64 {
        self.bit_sets.iter().map(|m| m.number_of_bits_set()).sum()
    }

    /// Non-empty rows only.
    fn to_records(&self) -> Vec<CostsPerDegreeRecord> {
        let mut records = Vec::new();
        for (degree, matrix) in self.bit_sets.iter().enumerate() {
            for route_index in 0..matrix.size() {
                let row = matrix.row(route_index);
                if row.is_empty() {
                    continue;
                }
                records.push(CostsPerDegreeRecord {
                    degree: degree as u8,
                    route_index: route_index as u16,
                    set_bits: row.bit_indexes().map(|bit| bit as u16).collect(),
                });
            }
        }
        records
    }

    fn from_records(size: usize, records: Vec<CostsPerDegreeRecord>) -> Result<Self, CacheError> {
        let mut costs = Self::new(size);
        for record in records {
            let in_range = record.degree < MAX_DEPTH
                && (record.route_index as usize) < size
                && record.set_bits.iter().all(|&bit| (bit as usize) < size);
            if !in_range {
                return Err(CacheError::load(
                    RouteCostMatrix::CACHE_NAME,
                    format!(
                        "record for degree {} route {} is outside {} routes",
                        record.degree, record.route_index, size
                    ),
                ));
            }
            let row = Bitmap::from_indexes(size, record.set_bits.iter().map(|&bit| bit as usize));
            costs.bit_sets[record.degree as usize].insert_row(record.route_index as usize, row);
        }
        Ok(costs)
    }
}

/// Multi-degree route connectivity matrix.
#[derive(Debug)]
pub struct RouteCostMatrix {
    index: Arc<RouteIndex>,
    costs: CostsPerDegree,
}

impl RouteCostMatrix {
    pub const CACHE_NAME: &'static str = "costs_per_degree.json";

    /// Seed degree 1 from interchanges, then fill higher degrees.
    pub fn build(
        index: Arc<RouteIndex>,
        overlaps: &RouteDateAndDayOverlap,
        interchanges: &dyn InterchangeRepository,
    ) -> Result<Self, RouteMatrixError> {
        let mut matrix = Self {
            costs: CostsPerDegree::new(index.len()),
            index,
        };
        matrix.add_initial_connections(overlaps, interchanges)?;
        matrix.populate_costs(overlaps);
        Ok(matrix)
    }

    /// Restore a matrix previously saved with [`RouteCostMatrix::to_records`].
    pub fn from_records(
        index: Arc<RouteIndex>,
        records: Vec<CostsPerDegreeRecord>,
    ) -> Result<Self, CacheError> {
        let costs = CostsPerDegree::from_records(index.len(), records)?;
        info!(
            connections = costs.number_of_bits_set(),
            "restored route cost matrix from cache"
        );
        Ok(Self { index, costs })
    }

    pub fn to_records(&self) -> Vec<CostsPerDegreeRecord> {
        self.costs.to_records()
    }

    fn add_initial_connections(
        &mut self,
        overlaps: &RouteDateAndDayOverlap,
        interchanges: &dyn InterchangeRepository,
    ) -> Result<(), RouteMatrixError> {
        let interchanges = interchanges.all_interchanges();
        info!(
            interchanges = interchanges.len(),
            "seeding route costs from interchanges"
        );

        let degree_one = &mut self.costs.bit_sets[0];
        for interchange in &interchanges {
            for dropoff in interchange.dropoff_routes() {
                let dropoff_index = self.index.index_for(dropoff.id())? as usize;
                for pickup in interchange.pickup_routes() {
                    if dropoff.id() != pickup.id() && pickup.is_date_overlap(dropoff) {
                        let pickup_index = self.index.index_for(pickup.id())? as usize;
                        degree_one.set(dropoff_index, pickup_index);
                    }
                }
                degree_one.and_row(dropoff_index, overlaps.overlaps_for(dropoff_index));
            }
        }

        info!(
            connections = degree_one.number_of_bits_set(),
            "added connections for interchanges"
        );
        Ok(())
    }

    fn populate_costs(&mut self, overlaps: &RouteDateAndDayOverlap) {
        let size = self.index.len();
        let fully_connected = (size * size.saturating_sub(1)) as u64;

        // everything already recorded for each route, including itself
        let mut reached = IndexedBitSet::identity(size);
        for route in 0..size {
            reached.or_row(route, self.costs.bit_sets[0].row(route));
        }
        let mut total = self.costs.bit_sets[0].number_of_bits_set();

        for degree in 2..=MAX_DEPTH {
            if total >= fully_connected {
                break;
            }
            let started = Instant::now();
            let rows = self.next_degree_rows(degree, overlaps, &reached);
            let added: u64 = rows.iter().map(|row| row.cardinality() as u64).sum();
            if added == 0 {
                warn!(degree, total, "no improvement in connections");
                break;
            }

            let matrix = &mut self.costs.bit_sets[degree as usize - 1];
            for (route, row) in rows.into_iter().enumerate() {
                reached.or_row(route, &row);
                matrix.insert_row(route, row);
            }
            total += added;
            info!(
                degree,
                added,
                total,
                took_ms = started.elapsed().as_millis() as u64,
                "added connections"
            );
        }

        if total < fully_connected {
            warn!(
                connections = total,
                fully_connected,
                percent = percent(total, fully_connected),
                "not fully connected"
            );
        } else {
            info!(connections = total, "fully connected");
        }
    }

    /// Rows for `degree`: every route reachable in one more change from a
    /// route reached at `degree - 1`, excluding anything already reached.
    fn next_degree_rows(
        &self,
        degree: u8,
        overlaps: &RouteDateAndDayOverlap,
        reached: &IndexedBitSet,
    ) -> Vec<Bitmap> {
        let size = self.index.len();
        let previous = &self.costs.bit_sets[degree as usize - 2];
        let degree_one = &self.costs.bit_sets[0];

        (0..size)
            .into_par_iter()
            .map(|route| {
                let mut row = Bitmap::with_size(size);
                for connected in previous.row(route).bit_indexes() {
                    row.or(degree_one.row(connected));
                }
                row.and(overlaps.overlaps_for(route));
                row.and_not(reached.row(route));
                row
            })
            .collect()
    }

    pub fn index(&self) -> &Arc<RouteIndex> {
        &self.index
    }

    /// Number of routes covered.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// The minimum number of changes between two routes.
    ///
    /// `0` for the same route, [`MAX_VALUE`] if not connected within
    /// [`MAX_DEPTH`].
    pub fn degree_of(&self, pair: RouteIndexPair) -> u8 {
        if pair.is_same() {
            return 0;
        }
        (1..=MAX_DEPTH)
            .find(|&degree| self.costs.is_set(degree, pair))
            .unwrap_or(MAX_VALUE)
    }

    /// Every degree at which a pair is recorded. At most one after a build.
    pub fn all_degrees(&self, pair: RouteIndexPair) -> Result<Vec<u8>, RouteMatrixError> {
        if pair.is_same() {
            let route = self.index.route_for(pair.first())?;
            return Err(RouteMatrixError::SameRoute {
                route: route.id().clone(),
            });
        }
        Ok((1..=MAX_DEPTH)
            .filter(|&degree| self.costs.is_set(degree, pair))
            .collect())
    }

    /// Degree between two routes by id.
    pub fn connection_depth_for(
        &self,
        first: &RouteId,
        second: &RouteId,
    ) -> Result<u8, RouteMatrixError> {
        Ok(self.degree_of(self.index.pair_for(first, second)?))
    }

    /// The matrix holding pairs at exactly `degree`.
    pub fn costs_for_degree(&self, degree: u8) -> Result<&IndexedBitSet, RouteMatrixError> {
        self.costs.degree(degree)
    }

    /// Union of a route's connections over degrees `1..=up_to_degree`.
    pub fn existing_bits_for_route(&self, route: usize, up_to_degree: u8) -> Bitmap {
        let mut result = Bitmap::with_size(self.index.len());
        for matrix in self.costs.bit_sets.iter().take(up_to_degree as usize) {
            result.or(matrix.row(route));
        }
        result
    }

    /// Pairs of routes both running on `date` in one of `modes`.
    ///
    /// Queries AND against this to gate the static matrix by date and mode
    /// without modifying it.
    pub fn create_overlap_matrix_for(&self, date: NaiveDate, modes: &TransportModes) -> IndexedBitSet {
        let size = self.index.len();
        let available = Bitmap::from_indexes(
            size,
            self.index
                .routes()
                .enumerate()
                .filter(|(_, route)| {
                    route.is_available_on(date) && modes.contains(&route.transport_mode())
                })
                .map(|(index, _)| index),
        );

        let mut result = IndexedBitSet::square(size);
        for route in available.bit_indexes() {
            result.insert_row(route, available.clone());
        }
        debug!(
            %date,
            routes = available.cardinality(),
            entries = result.number_of_bits_set(),
            "created overlap matrix"
        );
        result
    }

    /// Total recorded connections across all degrees.
    pub fn number_of_bits_set(&self) -> u64 {
        self.costs.number_of_bits_set()
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportMode;
    use crate::repository::InMemoryNetwork;
    use crate::routes::test_network::{chain, date, id, query_date, route_between};

    fn build(net: &InMemoryNetwork) -> RouteCostMatrix {
        let index = Arc::new(RouteIndex::build(net).unwrap());
        let overlaps = RouteDateAndDayOverlap::populate(&index);
        RouteCostMatrix::build(index, &overlaps, net).unwrap()
    }

    fn pair(matrix: &RouteCostMatrix, a: &str, b: &str) -> RouteIndexPair {
        matrix.index().pair_for(&id(a), &id(b)).unwrap()
    }

    #[test]
    fn degrees_along_chain() {
        let matrix = build(&chain());

        assert_eq!(matrix.degree_of(pair(&matrix, "R1", "R1")), 0);
        assert_eq!(matrix.degree_of(pair(&matrix, "R1", "R2")), 1);
        assert_eq!(matrix.degree_of(pair(&matrix, "R1", "R3")), 2);
        assert_eq!(matrix.degree_of(pair(&matrix, "R1", "R4")), 3);
        assert_eq!(matrix.degree_of(pair(&matrix, "R4", "R1")), 3);
        assert_eq!(matrix.degree_of(pair(&matrix, "R1", "R5")), MAX_VALUE);
        assert_eq!(
            matrix.connection_depth_for(&id("R2"), &id("R4")).unwrap(),
            2
        );
    }

    #[test]
    fn each_pair_at_one_degree() {
        let matrix = build(&chain());
        for a in ["R1", "R2", "R3", "R4", "R5"] {
            for b in ["R1", "R2", "R3", "R4", "R5"] {
                if a == b {
                    continue;
                }
                let p = pair(&matrix, a, b);
                let degrees = matrix.all_degrees(p).unwrap();
                assert!(degrees.len() <= 1, "{a}->{b} at {degrees:?}");
                if let Some(&degree) = degrees.first() {
                    assert_eq!(matrix.degree_of(p), degree);
                }
            }
        }
    }

    #[test]
    fn same_route_degrees_is_error() {
        let matrix = build(&chain());
        assert!(matches!(
            matrix.all_degrees(pair(&matrix, "R2", "R2")),
            Err(RouteMatrixError::SameRoute { .. })
        ));
    }

    #[test]
    fn higher_degrees_exclude_lower() {
        let matrix = build(&chain());
        let r1 = matrix.index().index_for(&id("R1")).unwrap() as usize;

        let up_to_one = matrix.existing_bits_for_route(r1, 1);
        let at_two = matrix.costs_for_degree(2).unwrap().row(r1);
        assert!(!up_to_one.intersects(at_two));

        let up_to_three = matrix.existing_bits_for_route(r1, 3);
        assert_eq!(up_to_three.cardinality(), 3);
        assert!(!up_to_three.get(r1));
    }

    #[test]
    fn degree_range_checked() {
        let matrix = build(&chain());
        assert!(matrix.costs_for_degree(0).is_err());
        assert!(matrix.costs_for_degree(MAX_DEPTH + 1).is_err());
        assert!(matrix.costs_for_degree(MAX_DEPTH).is_ok());
    }

    #[test]
    fn bits_set_counts_all_degrees() {
        let matrix = build(&chain());
        // R1..R4 fully connected among themselves, R5 isolated
        assert_eq!(matrix.number_of_bits_set(), 12);
    }

    #[test]
    fn no_connection_without_date_overlap() {
        let net = InMemoryNetwork::builder()
            .route(route_between("EARLY", date(1, 1), date(3, 31)))
            .route(route_between("LATE", date(6, 1), date(9, 30)))
            .stop("X", "EARLY")
            .stop("X", "LATE")
            .build();
        let matrix = build(&net);
        assert_eq!(matrix.degree_of(pair(&matrix, "EARLY", "LATE")), MAX_VALUE);
        assert_eq!(matrix.number_of_bits_set(), 0);
    }

    #[test]
    fn overlap_matrix_gates_by_date_and_mode() {
        let net = InMemoryNetwork::builder()
            .route(route_between("EARLY", date(1, 1), date(3, 31)))
            .route(route_between("LATE", date(6, 1), date(9, 30)))
            .route(route_between("ALL", date(1, 1), date(12, 31)))
            .build();
        let matrix = build(&net);
        let early = matrix.index().index_for(&id("EARLY")).unwrap() as usize;
        let late = matrix.index().index_for(&id("LATE")).unwrap() as usize;
        let all = matrix.index().index_for(&id("ALL")).unwrap() as usize;

        let trams: TransportModes = [TransportMode::Tram].into_iter().collect();
        let gate = matrix.create_overlap_matrix_for(query_date(), &trams);
        assert!(gate.is_set(early, all));
        assert!(gate.is_set(all, early));
        assert!(gate.is_set(early, early));
        assert!(!gate.is_set(late, all));
        assert!(!gate.is_set(all, late));
        assert_eq!(gate.number_of_bits_set(), 4);

        let buses: TransportModes = [TransportMode::Bus].into_iter().collect();
        let gate = matrix.create_overlap_matrix_for(query_date(), &buses);
        assert_eq!(gate.number_of_bits_set(), 0);
    }

    #[test]
    fn records_round_trip() {
        let matrix = build(&chain());
        let records = matrix.to_records();
        assert!(records.iter().all(|r| r.degree < MAX_DEPTH));

        let restored =
            RouteCostMatrix::from_records(matrix.index().clone(), records).unwrap();
        assert_eq!(restored.costs, matrix.costs);
    }

    #[test]
    fn restore_rejects_out_of_range() {
        let matrix = build(&chain());
        let records = vec![CostsPerDegreeRecord {
            degree: 0,
            route_index: 0,
            set_bits: vec![99],
        }];
        assert!(matches!(
            RouteCostMatrix::from_records(matrix.index().clone(), records),
            Err(CacheError::Load { .. })
        ));
    }
}
