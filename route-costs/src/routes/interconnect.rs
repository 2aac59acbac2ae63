//! Intermediate routes behind multi-change connections.
//!
//! For a pair `(A, B)` recorded at degree `d > 1`, the interconnects are the
//! routes `X` with `(A, X)` at degree `d - 1` and `(X, B)` at degree 1. They
//! let a connection be expanded back into concrete interchange stations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::cache::CacheError;
use crate::collections::{Bitmap, IndexedBitSet};
use crate::domain::{RouteId, TransportModes};

use super::cost_matrix::{MAX_DEPTH, MAX_VALUE, RouteCostMatrix};
use super::error::RouteMatrixError;
use super::index::RouteIndexPair;
use super::interchanges::RoutePairToInterchangeRepository;
use super::overlap::RouteDateAndDayOverlap;
use super::query_path::{PathResults, QueryPath};

/// A pair of routes by id, first to second.
pub type RouteIdPair = (RouteId, RouteId);

/// One cached interconnect entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInterconnectRecord {
    /// Degree of the `route_a` to `route_b` connection.
    pub depth: u8,
    pub route_a: u16,
    pub route_b: u16,
    pub links: Vec<u16>,
}

type Links = HashMap<RouteIndexPair, Bitmap>;

pub struct RouteInterconnectRepository {
    matrix: Arc<RouteCostMatrix>,
    interchanges: Arc<RoutePairToInterchangeRepository>,
    /// Indexed by degree - 1. Degree 1 has no intermediates and stays empty.
    links: Vec<Links>,
}

impl RouteInterconnectRepository {
    pub const CACHE_NAME: &'static str = "route_interconnects.json";

    pub fn build(
        matrix: Arc<RouteCostMatrix>,
        overlaps: &RouteDateAndDayOverlap,
        interchanges: Arc<RoutePairToInterchangeRepository>,
    ) -> Result<Self, RouteMatrixError> {
        let size = matrix.size();
        let mut links: Vec<Links> = (0..MAX_DEPTH).map(|_| Links::new()).collect();

        for degree in 2..=MAX_DEPTH {
            let at_degree = matrix.costs_for_degree(degree)?;
            if at_degree.number_of_bits_set() == 0 {
                debug!(degree, "no connections at degree");
                continue;
            }
            let started = Instant::now();
            let previous = matrix.costs_for_degree(degree - 1)?;
            let degree_one = matrix.costs_for_degree(1)?;

            let found: Vec<(usize, usize, Vec<usize>)> = (0..size)
                .into_par_iter()
                .flat_map_iter(|route| {
                    links_from(route, at_degree, previous, degree_one, overlaps)
                })
                .collect();

            let for_degree = &mut links[degree as usize - 1];
            for (first, second, intermediates) in found {
                for_degree.insert(
                    RouteIndexPair::new(first as u16, second as u16),
                    Bitmap::from_indexes(size, intermediates),
                );
            }
            info!(
                degree,
                links = for_degree.len(),
                took_ms = started.elapsed().as_millis() as u64,
                "added interconnects"
            );
        }

        Ok(Self {
            matrix,
            interchanges,
            links,
        })
    }

    /// Restore interconnects saved with [`RouteInterconnectRepository::to_records`].
    pub fn from_records(
        matrix: Arc<RouteCostMatrix>,
        interchanges: Arc<RoutePairToInterchangeRepository>,
        records: Vec<RouteInterconnectRecord>,
    ) -> Result<Self, CacheError> {
        let size = matrix.size();
        let mut links: Vec<Links> = (0..MAX_DEPTH).map(|_| Links::new()).collect();
        for record in records {
            let valid = (2..=MAX_DEPTH).contains(&record.depth)
                && (record.route_a as usize) < size
                && (record.route_b as usize) < size
                && record.links.iter().all(|&link| (link as usize) < size);
            if !valid {
                return Err(CacheError::load(
                    Self::CACHE_NAME,
                    format!(
                        "record for degree {} routes {}->{} is invalid for {} routes",
                        record.depth, record.route_a, record.route_b, size
                    ),
                ));
            }
            links[record.depth as usize - 1].insert(
                RouteIndexPair::new(record.route_a, record.route_b),
                Bitmap::from_indexes(size, record.links.iter().map(|&link| link as usize)),
            );
        }
        info!(
            links = links.iter().map(HashMap::len).sum::<usize>(),
            "restored interconnects from cache"
        );
        Ok(Self {
            matrix,
            interchanges,
            links,
        })
    }

    /// Records ordered by degree then pair, so saved files are stable.
    pub fn to_records(&self) -> Vec<RouteInterconnectRecord> {
        let mut records: Vec<RouteInterconnectRecord> = self
            .links
            .iter()
            .enumerate()
            .flat_map(|(slot, links)| {
                links.iter().map(move |(pair, bits)| RouteInterconnectRecord {
                    depth: slot as u8 + 1,
                    route_a: pair.first(),
                    route_b: pair.second(),
                    links: bits.bit_indexes().map(|bit| bit as u16).collect(),
                })
            })
            .collect();
        records.sort_by_key(|r| (r.depth, r.route_a, r.route_b));
        records
    }

    /// Number of pairs with recorded intermediates at `degree`.
    pub fn number_of_links(&self, degree: u8) -> usize {
        if degree == 0 || degree > MAX_DEPTH {
            return 0;
        }
        self.links[degree as usize - 1].len()
    }

    /// Intermediate routes for a pair recorded at `degree`.
    ///
    /// A missing entry means the matrix and the interconnects disagree.
    pub fn links_for(
        &self,
        degree: u8,
        pair: RouteIndexPair,
    ) -> Result<&Bitmap, RouteMatrixError> {
        if !(2..=MAX_DEPTH).contains(&degree) {
            return Err(RouteMatrixError::DepthOutOfRange {
                degree,
                max: MAX_DEPTH,
            });
        }
        match self.links[degree as usize - 1].get(&pair) {
            Some(links) => Ok(links),
            None => {
                let (first, second) = self.matrix.index().routes_for(pair)?;
                error!(
                    degree,
                    first = %first.id(),
                    second = %second.id(),
                    matrix_degree = self.matrix.degree_of(pair),
                    date_overlap = first.is_date_overlap(second),
                    interchange = self.interchanges.has_interchanges_for(pair),
                    "no interconnect recorded for connected routes"
                );
                Err(RouteMatrixError::MissingInterconnect {
                    degree,
                    first: first.id().clone(),
                    second: second.id().clone(),
                })
            }
        }
    }

    /// Each decomposition of a pair into `(A, X)` and `(X, B)`, by route id.
    pub fn backtracks_for(
        &self,
        degree: u8,
        pair: RouteIndexPair,
    ) -> Result<Vec<(RouteIdPair, RouteIdPair)>, RouteMatrixError> {
        let index = self.matrix.index();
        let first = index.route_for(pair.first())?.id().clone();
        let second = index.route_for(pair.second())?.id().clone();
        self.links_for(degree, pair)?
            .bit_indexes()
            .map(|link| {
                let via = index.route_for(link as u16)?.id().clone();
                Ok(((first.clone(), via.clone()), (via, second.clone())))
            })
            .collect()
    }

    /// Expand a pair into its interchange paths for one query.
    ///
    /// `date_overlaps` comes from [`RouteCostMatrix::create_overlap_matrix_for`]
    /// and removes routes not running on the query date or modes.
    pub fn path_results_for(
        &self,
        pair: RouteIndexPair,
        date_overlaps: &IndexedBitSet,
        modes: &TransportModes,
    ) -> Result<PathResults, RouteMatrixError> {
        let degree = self.matrix.degree_of(pair);
        if degree == 0 || degree == MAX_VALUE {
            return Ok(PathResults::none());
        }
        if !date_overlaps.is_set(pair.first() as usize, pair.second() as usize) {
            return Ok(PathResults::none());
        }
        let path = self.path_for(pair, degree, date_overlaps, modes)?;
        Ok(PathResults::new(path))
    }

    fn path_for(
        &self,
        pair: RouteIndexPair,
        degree: u8,
        date_overlaps: &IndexedBitSet,
        modes: &TransportModes,
    ) -> Result<QueryPath, RouteMatrixError> {
        if degree == 1 {
            if !self.interchanges.has_interchanges_for(pair) {
                let (dropoff, pickup) = self.matrix.index().routes_for(pair)?;
                error!(
                    dropoff = %dropoff.id(),
                    pickup = %pickup.id(),
                    date_overlap = dropoff.is_date_overlap(pickup),
                    "no interchange for single change connection"
                );
                return Err(RouteMatrixError::MissingInterchange {
                    dropoff: dropoff.id().clone(),
                    pickup: pickup.id().clone(),
                });
            }
            return Ok(QueryPath::of(self.interchanges.interchanges(pair, modes)));
        }

        let start = pair.first();
        let mut paths = Vec::new();
        for link in self.links_for(degree, pair)?.bit_indexes() {
            if !date_overlaps.is_set(start as usize, link) {
                continue;
            }
            let via = link as u16;
            let lower = self.path_for(
                RouteIndexPair::new(start, via),
                degree - 1,
                date_overlaps,
                modes,
            )?;
            if lower == QueryPath::ZeroPaths {
                continue;
            }
            let last = self.path_for(
                RouteIndexPair::new(via, pair.second()),
                1,
                date_overlaps,
                modes,
            )?;
            paths.push(QueryPath::both_of(lower, last));
        }
        Ok(QueryPath::any_of(paths))
    }
}

/// Interconnects for every degree `d` connection from `route`.
fn links_from(
    route: usize,
    at_degree: &IndexedBitSet,
    previous: &IndexedBitSet,
    degree_one: &IndexedBitSet,
    overlaps: &RouteDateAndDayOverlap,
) -> Vec<(usize, usize, Vec<usize>)> {
    let targets = at_degree.row(route);
    if targets.is_empty() {
        return Vec::new();
    }

    let mut found: HashMap<usize, Vec<usize>> = HashMap::new();
    for via in previous.row(route).bit_indexes() {
        if !overlaps.is_overlap(route, via) {
            continue;
        }
        let mut reached = degree_one.row(via).clone();
        reached.and(targets);
        for target in reached.bit_indexes() {
            if overlaps.is_overlap(via, target) {
                found.entry(target).or_default().push(via);
            }
        }
    }

    found
        .into_iter()
        .map(|(target, vias)| (route, target, vias))
        .collect()
}
