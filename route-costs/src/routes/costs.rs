//! Query facade: minimum changes between locations or routes.
//!
//! Answers come from the static connectivity matrix, gated by the routes
//! running on the query date and modes, then verified against which
//! interchange stations are actually operating.

use std::sync::Arc;

use chrono::NaiveDate;
use moka::sync::Cache;
use tracing::{debug, info, warn};

use crate::collections::IndexedBitSet;
use crate::domain::{
    HasRouteId, InterchangeStation, LocationSet, Route, RouteId, StationId, TimeRange,
    TransportModes,
};
use crate::repository::{
    ClosedStationsRepository, NeighboursRepository, StationAvailabilityRepository,
};

use super::config::RouteMatrixConfig;
use super::cost_matrix::RouteCostMatrix;
use super::error::RouteMatrixError;
use super::index::{RouteIndex, RouteIndexPair};
use super::interconnect::RouteInterconnectRepository;

/// Number of changes reported when no route chain is available.
pub const UNREACHABLE: u32 = u32::MAX;

/// Whether interchanges operate for one date, time range and set of modes.
///
/// Remembers each station's answer for the life of one query.
pub struct InterchangeOperating {
    availability: Arc<dyn StationAvailabilityRepository>,
    closed: Arc<dyn ClosedStationsRepository>,
    date: NaiveDate,
    time_range: TimeRange,
    modes: TransportModes,
    cache: Cache<StationId, bool>,
}

impl InterchangeOperating {
    pub fn new(
        availability: Arc<dyn StationAvailabilityRepository>,
        closed: Arc<dyn ClosedStationsRepository>,
        date: NaiveDate,
        time_range: TimeRange,
        modes: TransportModes,
        capacity: u64,
    ) -> Self {
        Self {
            availability,
            closed,
            date,
            time_range,
            modes,
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn is_operating(&self, station: &InterchangeStation) -> bool {
        self.cache.get_with(station.station_id().clone(), || {
            !self.closed.is_closed(station.station_id(), self.date)
                && self
                    .availability
                    .is_available(station, self.date, &self.time_range, &self.modes)
        })
    }
}

/// Changes needed for one pair of routes, verified against live interchanges.
fn changes_for_pair(
    interconnects: &RouteInterconnectRepository,
    pair: RouteIndexPair,
    date_overlaps: &IndexedBitSet,
    modes: &TransportModes,
    operating: &InterchangeOperating,
) -> Result<u32, RouteMatrixError> {
    if pair.is_same() {
        return Ok(0);
    }
    let results = interconnects.path_results_for(pair, date_overlaps, modes)?;
    if results.has_any(&|station: &InterchangeStation| operating.is_operating(station)) {
        Ok(results.depth())
    } else {
        Ok(UNREACHABLE)
    }
}

/// Minimum changes between routes and locations.
pub struct RouteToRouteCosts {
    index: Arc<RouteIndex>,
    matrix: Arc<RouteCostMatrix>,
    interconnects: Arc<RouteInterconnectRepository>,
    availability: Arc<dyn StationAvailabilityRepository>,
    closed: Arc<dyn ClosedStationsRepository>,
    neighbours: Arc<dyn NeighboursRepository>,
    config: RouteMatrixConfig,
}

impl RouteToRouteCosts {
    pub fn new(
        matrix: Arc<RouteCostMatrix>,
        interconnects: Arc<RouteInterconnectRepository>,
        availability: Arc<dyn StationAvailabilityRepository>,
        closed: Arc<dyn ClosedStationsRepository>,
        neighbours: Arc<dyn NeighboursRepository>,
        config: RouteMatrixConfig,
    ) -> Self {
        Self {
            index: matrix.index().clone(),
            matrix,
            interconnects,
            availability,
            closed,
            neighbours,
            config,
        }
    }

    fn interchange_operating(
        &self,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> InterchangeOperating {
        InterchangeOperating::new(
            self.availability.clone(),
            self.closed.clone(),
            date,
            *time_range,
            modes.clone(),
            self.config.availability_cache_capacity,
        )
    }

    /// Minimum changes from one station to another.
    pub fn number_of_changes(
        &self,
        start: &StationId,
        destination: &StationId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Result<u32, RouteMatrixError> {
        self.number_of_changes_for_sets(
            &LocationSet::singleton(start.clone()),
            &LocationSet::singleton(destination.clone()),
            date,
            time_range,
            modes,
        )
    }

    /// Minimum changes from any start location to any destination.
    ///
    /// [`UNREACHABLE`] when nothing picks up at the start, nothing sets
    /// down at the destination, or no chain of operating interchanges joins
    /// them. Each fully closed end adds one change to a reachable result.
    pub fn number_of_changes_for_sets(
        &self,
        starts: &LocationSet,
        destinations: &LocationSet,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Result<u32, RouteMatrixError> {
        if self.neighbours.are_neighbours_set(starts, destinations) {
            info!(%starts, %destinations, "starts and destinations are neighbours");
            return Ok(0);
        }

        let pickups = self
            .availability
            .pickup_routes_for_set(starts, date, time_range, modes);
        if pickups.is_empty() {
            warn!(%starts, %date, %time_range, "no pick-up routes at start");
            return Ok(UNREACHABLE);
        }
        let dropoffs = self
            .availability
            .dropoff_routes_for_set(destinations, date, time_range, modes);
        if dropoffs.is_empty() {
            warn!(%destinations, %date, %time_range, "no drop-off routes at destination");
            return Ok(UNREACHABLE);
        }

        let changes = self.fewest_changes_between(&pickups, &dropoffs, date, time_range, modes)?;
        if changes == UNREACHABLE {
            return Ok(UNREACHABLE);
        }

        let offset = u32::from(self.closed.all_closed(starts, date))
            + u32::from(self.closed.all_closed(destinations, date));
        if offset > 0 {
            debug!(offset, "adding changes for closed locations");
        }
        Ok(changes + offset)
    }

    /// Minimum changes between two specific routes.
    pub fn number_of_changes_for_routes(
        &self,
        first: &RouteId,
        second: &RouteId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Result<u32, RouteMatrixError> {
        let pair = self.index.pair_for(first, second)?;
        if pair.is_same() {
            return Ok(0);
        }
        let date_overlaps = self.matrix.create_overlap_matrix_for(date, modes);
        let operating = self.interchange_operating(date, time_range, modes);
        changes_for_pair(&self.interconnects, pair, &date_overlaps, modes, &operating)
    }

    fn fewest_changes_between(
        &self,
        starts: &[Arc<Route>],
        destinations: &[Arc<Route>],
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Result<u32, RouteMatrixError> {
        let date_overlaps = self.matrix.create_overlap_matrix_for(date, modes);
        let operating = self.interchange_operating(date, time_range, modes);

        let mut fewest = UNREACHABLE;
        'search: for start in starts {
            let start_index = self.index.index_for(start.id())?;
            for destination in destinations {
                let pair = RouteIndexPair::new(start_index, self.index.index_for(destination.id())?);
                let changes =
                    changes_for_pair(&self.interconnects, pair, &date_overlaps, modes, &operating)?;
                fewest = fewest.min(changes);
                if fewest == 0 {
                    break 'search;
                }
            }
        }

        info!(
            starts = starts.len(),
            destinations = destinations.len(),
            %date,
            changes = fewest,
            "computed number of changes"
        );
        Ok(fewest)
    }

    /// Ranking helper for a fixed set of destination locations.
    pub fn lowest_cost_calculator_for(
        &self,
        destinations: &LocationSet,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Result<LowestCostForDestinations, RouteMatrixError> {
        let routes = self
            .availability
            .dropoff_routes_for_set(destinations, date, time_range, modes);
        if routes.is_empty() {
            warn!(%destinations, %date, "no drop-off routes at destinations");
        }
        self.lowest_cost_calculator_for_routes(
            routes.iter().map(|route| route.id()),
            date,
            time_range,
            modes,
        )
    }

    /// Ranking helper for a fixed set of destination routes.
    pub fn lowest_cost_calculator_for_routes<'a>(
        &self,
        destinations: impl IntoIterator<Item = &'a RouteId>,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Result<LowestCostForDestinations, RouteMatrixError> {
        let mut indexes = destinations
            .into_iter()
            .map(|route| self.index.index_for(route))
            .collect::<Result<Vec<u16>, _>>()?;
        indexes.sort_unstable();
        indexes.dedup();

        Ok(LowestCostForDestinations {
            index: self.index.clone(),
            interconnects: self.interconnects.clone(),
            destinations: indexes,
            date_overlaps: self.matrix.create_overlap_matrix_for(date, modes),
            modes: modes.clone(),
            operating: self.interchange_operating(date, time_range, modes),
        })
    }

    /// Total recorded route connections.
    pub fn size(&self) -> u64 {
        self.matrix.number_of_bits_set()
    }
}

/// Fewest changes to one fixed set of destination routes.
///
/// Built once per search and asked repeatedly as candidates are explored,
/// so the date gate and availability answers are computed up front or
/// remembered.
pub struct LowestCostForDestinations {
    index: Arc<RouteIndex>,
    interconnects: Arc<RouteInterconnectRepository>,
    /// Sorted, distinct.
    destinations: Vec<u16>,
    date_overlaps: IndexedBitSet,
    modes: TransportModes,
    operating: InterchangeOperating,
}

impl LowestCostForDestinations {
    /// Fewest changes from `route` to any destination route.
    pub fn fewest_changes(&self, route: &RouteId) -> Result<u32, RouteMatrixError> {
        let start = self.index.index_for(route)?;
        if self.destinations.binary_search(&start).is_ok() {
            return Ok(0);
        }
        let mut fewest = UNREACHABLE;
        for &destination in &self.destinations {
            let changes = changes_for_pair(
                &self.interconnects,
                RouteIndexPair::new(start, destination),
                &self.date_overlaps,
                &self.modes,
                &self.operating,
            )?;
            fewest = fewest.min(changes);
        }
        Ok(fewest)
    }

    /// Order items by fewest changes to the destinations, closest first.
    /// Ties keep their input order.
    pub fn sort_by_destinations<T: HasRouteId>(
        &self,
        items: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>, RouteMatrixError> {
        let mut ranked = items
            .into_iter()
            .map(|item| Ok((self.fewest_changes(item.route_id())?, item)))
            .collect::<Result<Vec<(u32, T)>, RouteMatrixError>>()?;
        ranked.sort_by_key(|(changes, _)| *changes);
        Ok(ranked.into_iter().map(|(_, item)| item).collect())
    }

    pub fn number_of_destinations(&self) -> usize {
        self.destinations.len()
    }
}

#[cfg(test)]
#[path = "costs_tests.rs"]
mod costs_tests;
