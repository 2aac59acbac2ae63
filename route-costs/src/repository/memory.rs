//! In-memory transport network for tests and demos.
//!
//! Holds routes, the stations they call at, closures and walking
//! neighbours, and serves them through every collaborator trait.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{
    DateRange, InterchangeStation, Route, RouteId, StationId, TimeRange, TransportModes,
};

use super::{
    ClosedStationsRepository, InterchangeRepository, NeighboursRepository, RouteRepository,
    StationAvailabilityRepository,
};

/// One route calling at one station.
#[derive(Debug, Clone)]
struct StopCall {
    route: Arc<Route>,
    pickup: bool,
    dropoff: bool,
    window: TimeRange,
}

/// A complete network held in memory.
///
/// A station becomes an interchange when at least two distinct routes call
/// there. Pick-up and drop-off route queries ignore closures; the
/// interchange availability check honours them.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    routes: BTreeMap<RouteId, Arc<Route>>,
    calls: HashMap<StationId, Vec<StopCall>>,
    interchanges: Vec<Arc<InterchangeStation>>,
    closures: HashMap<StationId, Vec<DateRange>>,
    neighbours: HashSet<(StationId, StationId)>,
}

impl InMemoryNetwork {
    pub fn builder() -> InMemoryNetworkBuilder {
        InMemoryNetworkBuilder::default()
    }

    /// Number of stations with at least one call.
    pub fn number_of_stations(&self) -> usize {
        self.calls.len()
    }

    fn routes_at(
        &self,
        station: &StationId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
        wanted: impl Fn(&StopCall) -> bool,
    ) -> Vec<Arc<Route>> {
        let Some(calls) = self.calls.get(station) else {
            return Vec::new();
        };
        let mut routes: Vec<Arc<Route>> = calls
            .iter()
            .filter(|call| wanted(call))
            .filter(|call| call.window.overlaps(time_range))
            .filter(|call| modes.contains(&call.route.transport_mode()))
            .filter(|call| call.route.is_available_on(date))
            .map(|call| call.route.clone())
            .collect();
        routes.sort_by(|a, b| a.id().cmp(b.id()));
        routes.dedup_by(|a, b| a.id() == b.id());
        routes
    }
}

impl RouteRepository for InMemoryNetwork {
    fn routes(&self) -> Vec<Arc<Route>> {
        self.routes.values().cloned().collect()
    }

    fn number_of_routes(&self) -> usize {
        self.routes.len()
    }

    fn route_by_id(&self, id: &RouteId) -> Option<Arc<Route>> {
        self.routes.get(id).cloned()
    }
}

impl InterchangeRepository for InMemoryNetwork {
    fn all_interchanges(&self) -> Vec<Arc<InterchangeStation>> {
        self.interchanges.clone()
    }
}

impl StationAvailabilityRepository for InMemoryNetwork {
    fn pickup_routes_for(
        &self,
        station: &StationId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Vec<Arc<Route>> {
        self.routes_at(station, date, time_range, modes, |call| call.pickup)
    }

    fn dropoff_routes_for(
        &self,
        station: &StationId,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> Vec<Arc<Route>> {
        self.routes_at(station, date, time_range, modes, |call| call.dropoff)
    }

    fn is_available(
        &self,
        station: &InterchangeStation,
        date: NaiveDate,
        time_range: &TimeRange,
        modes: &TransportModes,
    ) -> bool {
        let id = station.station_id();
        if self.is_closed(id, date) {
            return false;
        }
        !self
            .routes_at(id, date, time_range, modes, |_| true)
            .is_empty()
    }
}

impl ClosedStationsRepository for InMemoryNetwork {
    fn is_closed(&self, station: &StationId, date: NaiveDate) -> bool {
        self.closures
            .get(station)
            .is_some_and(|ranges| ranges.iter().any(|range| range.contains(date)))
    }
}

impl NeighboursRepository for InMemoryNetwork {
    fn are_neighbours(&self, first: &StationId, second: &StationId) -> bool {
        self.neighbours.contains(&(first.clone(), second.clone()))
    }
}

/// Builder for an [`InMemoryNetwork`].
///
/// Station and route ids are given as strings; calls naming a route that
/// was not added first, or an invalid id, are ignored.
#[derive(Debug, Default)]
pub struct InMemoryNetworkBuilder {
    routes: BTreeMap<RouteId, Arc<Route>>,
    calls: HashMap<StationId, Vec<StopCall>>,
    closures: HashMap<StationId, Vec<DateRange>>,
    neighbours: HashSet<(StationId, StationId)>,
}

impl InMemoryNetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.insert(route.id().clone(), Arc::new(route));
        self
    }

    /// The route picks up and sets down at the station all day.
    pub fn stop(self, station: &str, route: &str) -> Self {
        self.add_call(station, route, true, true, TimeRange::all_day())
    }

    /// The route picks up and sets down at the station within a window.
    pub fn stop_between(self, station: &str, route: &str, window: TimeRange) -> Self {
        self.add_call(station, route, true, true, window)
    }

    /// The route only picks up at the station (e.g. its first stop).
    pub fn pickup_only(self, station: &str, route: &str) -> Self {
        self.add_call(station, route, true, false, TimeRange::all_day())
    }

    /// The route only sets down at the station (e.g. its last stop).
    pub fn dropoff_only(self, station: &str, route: &str) -> Self {
        self.add_call(station, route, false, true, TimeRange::all_day())
    }

    /// Close a station for a range of dates.
    pub fn closed(mut self, station: &str, dates: DateRange) -> Self {
        if let Ok(id) = StationId::new(station) {
            self.closures.entry(id).or_default().push(dates);
        }
        self
    }

    /// Make two stations walkable. Stored in both directions.
    pub fn neighbours(mut self, first: &str, second: &str) -> Self {
        if let (Ok(a), Ok(b)) = (StationId::new(first), StationId::new(second)) {
            self.neighbours.insert((a.clone(), b.clone()));
            self.neighbours.insert((b, a));
        }
        self
    }

    fn add_call(
        mut self,
        station: &str,
        route: &str,
        pickup: bool,
        dropoff: bool,
        window: TimeRange,
    ) -> Self {
        let route = RouteId::new(route)
            .ok()
            .and_then(|id| self.routes.get(&id).cloned());
        if let (Ok(station), Some(route)) = (StationId::new(station), route) {
            self.calls.entry(station).or_default().push(StopCall {
                route,
                pickup,
                dropoff,
                window,
            });
        }
        self
    }

    /// Build the network, deriving interchanges from the calls.
    pub fn build(self) -> InMemoryNetwork {
        let mut interchanges: Vec<Arc<InterchangeStation>> = self
            .calls
            .iter()
            .filter_map(|(station, calls)| interchange_for(station, calls))
            .map(Arc::new)
            .collect();
        interchanges.sort_by(|a, b| a.station_id().cmp(b.station_id()));

        InMemoryNetwork {
            routes: self.routes,
            calls: self.calls,
            interchanges,
            closures: self.closures,
            neighbours: self.neighbours,
        }
    }
}

fn interchange_for(station: &StationId, calls: &[StopCall]) -> Option<InterchangeStation> {
    let distinct: HashSet<&RouteId> = calls.iter().map(|call| call.route.id()).collect();
    if distinct.len() < 2 {
        return None;
    }
    let dropoffs = calls
        .iter()
        .filter(|call| call.dropoff)
        .map(|call| call.route.clone())
        .collect();
    let pickups = calls
        .iter()
        .filter(|call| call.pickup)
        .map(|call| call.route.clone())
        .collect();
    Some(InterchangeStation::new(station.clone(), dropoffs, pickups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DaysOfWeek, LocationSet, TransportMode};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn route(id: &str, mode: TransportMode) -> Route {
        Route::new(
            RouteId::new(id).unwrap(),
            id,
            mode,
            DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap(),
            DaysOfWeek::all(),
        )
    }

    fn station(s: &str) -> StationId {
        StationId::new(s).unwrap()
    }

    fn network() -> InMemoryNetwork {
        InMemoryNetwork::builder()
            .route(route("T1", TransportMode::Tram))
            .route(route("B1", TransportMode::Bus))
            .pickup_only("A", "T1")
            .stop("X", "T1")
            .stop("X", "B1")
            .dropoff_only("Z", "B1")
            .stop("Q", "UNKNOWN")
            .closed("X", DateRange::single(date(2024, 3, 16)))
            .neighbours("A", "Q")
            .build()
    }

    #[test]
    fn routes_are_ordered_by_id() {
        let net = network();
        let ids: Vec<String> = net.routes().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["B1", "T1"]);
        assert_eq!(net.number_of_routes(), 2);
        assert!(net.has_route_id(&RouteId::new("T1").unwrap()));
        assert!(!net.has_route_id(&RouteId::new("UNKNOWN").unwrap()));
    }

    #[test]
    fn interchanges_need_two_routes() {
        let net = network();
        let interchanges = net.all_interchanges();
        assert_eq!(interchanges.len(), 1);
        assert_eq!(interchanges[0].station_id(), &station("X"));
        assert_eq!(interchanges[0].dropoff_routes().len(), 2);
        assert_eq!(interchanges[0].pickup_routes().len(), 2);
    }

    #[test]
    fn unknown_route_calls_are_ignored() {
        assert_eq!(network().number_of_stations(), 3);
    }

    #[test]
    fn pickup_and_dropoff_respect_direction_and_modes() {
        let net = network();
        let all = TransportMode::all();
        let day = date(2024, 3, 15);
        let window = TimeRange::all_day();

        assert_eq!(net.pickup_routes_for(&station("A"), day, &window, &all).len(), 1);
        assert!(net.dropoff_routes_for(&station("A"), day, &window, &all).is_empty());
        assert_eq!(net.dropoff_routes_for(&station("Z"), day, &window, &all).len(), 1);

        let trams: TransportModes = [TransportMode::Tram].into_iter().collect();
        let at_x = net.pickup_routes_for(&station("X"), day, &window, &trams);
        assert_eq!(at_x.len(), 1);
        assert_eq!(at_x[0].id().as_str(), "T1");
    }

    #[test]
    fn set_queries_union_routes() {
        let net = network();
        let set: LocationSet = [station("A"), station("X")].into_iter().collect();
        let routes = net.pickup_routes_for_set(
            &set,
            date(2024, 3, 15),
            &TimeRange::all_day(),
            &TransportMode::all(),
        );
        let ids: Vec<&str> = routes.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["B1", "T1"]);
    }

    #[test]
    fn closures_make_interchange_unavailable() {
        let net = network();
        let interchange = net.all_interchanges()[0].clone();
        let all = TransportMode::all();
        let window = TimeRange::all_day();

        assert!(net.is_available(&interchange, date(2024, 3, 15), &window, &all));
        assert!(!net.is_available(&interchange, date(2024, 3, 16), &window, &all));
        assert!(net.is_closed(&station("X"), date(2024, 3, 16)));

        let set: LocationSet = [station("X")].into_iter().collect();
        assert!(net.all_closed(&set, date(2024, 3, 16)));
        assert!(!net.all_closed(&LocationSet::new(), date(2024, 3, 16)));
    }

    #[test]
    fn neighbours_are_symmetric() {
        let net = network();
        assert!(net.are_neighbours(&station("A"), &station("Q")));
        assert!(net.are_neighbours(&station("Q"), &station("A")));
        assert!(!net.are_neighbours(&station("A"), &station("Z")));
    }
}
