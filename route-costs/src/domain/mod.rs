//! Domain types for the route connectivity engine.
//!
//! This module contains the validated value types shared by every layer:
//! routes, stations, interchanges, and the date/time windows queries are
//! scoped to. All types enforce their invariants at construction time.

mod dates;
mod route;
mod station;
mod time;

pub use dates::{DateError, DateRange, DaysOfWeek};
pub use route::{HasRouteId, InvalidRouteId, Route, RouteId, TransportMode, TransportModes};
pub use station::{InterchangeStation, InvalidStationId, LocationSet, StationId};
pub use time::{TimeError, TimeRange};
