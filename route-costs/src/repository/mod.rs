//! Collaborator interfaces consumed by the connectivity engine.
//!
//! The transport network itself (routes, stations, timetables, closures)
//! lives elsewhere; the engine only sees it through these narrow traits.
//! An in-memory implementation is provided for tests and the demo binary.

mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{
    InterchangeStation, LocationSet, Route, RouteId, StationId, TimeRange, TransportModes,
};

pub use memory::{InMemoryNetwork, InMemoryNetworkBuilder};

/// Source of all routes known at build time.
pub trait RouteRepository: Send + Sync {
    fn routes(&self) -> Vec<Arc<Route>>;

    fn number_of_routes(&self) -> usize;

    fn route_by_id(&self, id: &RouteId) -> Option<Arc<Route>>;

    fn has_route_id(&self, id: &RouteId) -> bool {
        self.route_by_id(id).is_some()
    }
}

/// Source of the stations where passengers can change routes.
pub trait InterchangeRepository: Send + Sync {
    fn all_interchanges(&self) -> Vec<Arc<InterchangeStation>>;
}

/// Live, per-station availability for a date, time window and set of modes.
pub trait StationAvailabilityRepository: Send + Sync {
    /// Routes that pick passengers up at `station`.
    fn pickup_routes_for(
        &self,
        station: &StationId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Vec<Arc<Route>>;

    /// Routes that set passengers down at `station`.
    fn dropoff_routes_for(
        &self,
        station: &StationId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Vec<Arc<Route>>;

    /// Check if an interchange is operating.
    fn is_available(
        &self,
        station: &InterchangeStation,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> bool;

    /// Union of pick-up routes over a set of locations.
    fn pickup_routes_for_set(
        &self,
        locations: &LocationSet,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Vec<Arc<Route>> {
        union_of(
            locations
                .iter()
                .map(|station| self.pickup_routes_for(station, date, time_range, modes)),
        )
    }

    /// Union of drop-off routes over a set of locations.
    fn dropoff_routes_for_set(
        &self,
        locations: &LocationSet,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Vec<Arc<Route>> {
        union_of(
            locations
                .iter()
                .map(|station| self.dropoff_routes_for(station, date, time_range, modes)),
        )
    }
}

/// Station closures by date.
pub trait ClosedStationsRepository: Send + Sync {
    fn is_closed(&self, station: &StationId, date: NaiveDate) -> bool;

    /// True only for a non-empty set whose every location is closed.
    fn all_closed(&self, locations: &LocationSet, date: NaiveDate) -> bool {
        !locations.is_empty() && locations.iter().all(|station| self.is_closed(station, date))
    }
}

/// Stations close enough to walk between directly.
pub trait NeighboursRepository: Send + Sync {
    fn are_neighbours(&self, first: &StationId, second: &StationId) -> bool;

    /// True if any location in `first` neighbours any location in `second`.
    fn are_neighbours_set(&self, first: &LocationSet, second: &LocationSet) -> bool {
        first
            .iter()
            .any(|a| second.iter().any(|b| self.are_neighbours(a, b)))
    }
}

/// Shared handles to every collaborator the connectivity engine needs.
#[derive(Clone)]
pub struct Repositories {
    pub routes: Arc<dyn RouteRepository>,
    pub interchanges: Arc<dyn InterchangeRepository>,
    pub availability: Arc<dyn StationAvailabilityRepository>,
    pub closed: Arc<dyn ClosedStationsRepository>,
    pub neighbours: Arc<dyn NeighboursRepository>,
}

impl Repositories {
    /// Use one implementation for every collaborator.
    pub fn from_network<N>(network: N) -> Self
    where
        N: RouteRepository
            + InterchangeRepository
            + StationAvailabilityRepository
            + ClosedStationsRepository
            + NeighboursRepository
            + 'static,
    {
        let network = Arc::new(network);
        Self {
            routes: network.clone(),
            interchanges: network.clone(),
            availability: network.clone(),
            closed: network.clone(),
            neighbours: network,
        }
    }
}

/// Merge route lists, dropping duplicates. Ordered by route id.
fn union_of(lists: impl Iterator<Item = Vec<Arc<Route>>>) -> Vec<Arc<Route>> {
    let merged: BTreeMap<RouteId, Arc<Route>> = lists
        .flatten()
        .map(|route| (route.id().clone(), route))
        .collect();
    merged.into_values().collect()
}
