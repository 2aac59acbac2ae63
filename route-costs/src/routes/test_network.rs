//! Small networks shared by the connectivity tests.

use chrono::NaiveDate;

use crate::domain::{DateRange, DaysOfWeek, Route, RouteId, TransportMode};
use crate::repository::{InMemoryNetwork, InMemoryNetworkBuilder};

pub fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

/// A Friday inside every fixture route's dates.
pub fn query_date() -> NaiveDate {
    date(3, 15)
}

pub fn id(s: &str) -> RouteId {
    RouteId::new(s).unwrap()
}

pub fn route(name: &str, mode: TransportMode) -> Route {
    Route::new(
        id(name),
        name,
        mode,
        DateRange::new(date(1, 1), date(12, 31)).unwrap(),
        DaysOfWeek::all(),
    )
}

pub fn route_between(name: &str, start: NaiveDate, end: NaiveDate) -> Route {
    Route::new(
        id(name),
        name,
        TransportMode::Tram,
        DateRange::new(start, end).unwrap(),
        DaysOfWeek::all(),
    )
}

/// Four tram routes in a line, plus an unconnected bus route.
///
/// ```text
/// A -R1- I1 -R2- I2 -R3- I3 -R4- Z      P -R5- Q
/// ```
///
/// `A` and `Z` are terminal stops, `M2` is a plain stop on R2.
pub fn chain_builder() -> InMemoryNetworkBuilder {
    InMemoryNetwork::builder()
        .route(route("R1", TransportMode::Tram))
        .route(route("R2", TransportMode::Tram))
        .route(route("R3", TransportMode::Tram))
        .route(route("R4", TransportMode::Tram))
        .route(route("R5", TransportMode::Bus))
        .pickup_only("A", "R1")
        .stop("I1", "R1")
        .stop("I1", "R2")
        .stop("M2", "R2")
        .stop("I2", "R2")
        .stop("I2", "R3")
        .stop("I3", "R3")
        .stop("I3", "R4")
        .dropoff_only("Z", "R4")
        .pickup_only("P", "R5")
        .dropoff_only("Q", "R5")
}

pub fn chain() -> InMemoryNetwork {
    chain_builder().build()
}
