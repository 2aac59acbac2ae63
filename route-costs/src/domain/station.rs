//! Stations, interchanges and location sets.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::route::{Route, TransportMode, TransportModes};

/// Error returned when constructing an invalid station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {reason}")]
pub struct InvalidStationId {
    reason: &'static str,
}

/// A station identifier.
///
/// # Examples
///
/// ```
/// use route_costs::domain::StationId;
///
/// let id = StationId::new("9400ZZMAPIC").unwrap();
/// assert_eq!(id.to_string(), "9400ZZMAPIC");
/// assert!(StationId::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidStationId> {
        let s = s.into();
        if s.is_empty() {
            return Err(InvalidStationId {
                reason: "station id cannot be empty",
            });
        }
        Ok(StationId(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StationId {
    type Error = InvalidStationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StationId::new(value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A station where passengers can change between routes.
///
/// Routes that set down here and routes that pick up here are held
/// separately; a change is only possible from a drop-off route to a
/// pick-up route. Equality and hashing use the station id alone.
#[derive(Debug, Clone)]
pub struct InterchangeStation {
    station: StationId,
    modes: TransportModes,
    dropoff_routes: Vec<Arc<Route>>,
    pickup_routes: Vec<Arc<Route>>,
}

impl InterchangeStation {
    /// Create an interchange. Its modes are those of the routes calling there.
    pub fn new(
        station: StationId,
        dropoff_routes: Vec<Arc<Route>>,
        pickup_routes: Vec<Arc<Route>>,
    ) -> Self {
        let modes = dropoff_routes
            .iter()
            .chain(pickup_routes.iter())
            .map(|route| route.transport_mode())
            .collect();
        Self {
            station,
            modes,
            dropoff_routes,
            pickup_routes,
        }
    }

    pub fn station_id(&self) -> &StationId {
        &self.station
    }

    pub fn transport_modes(&self) -> &TransportModes {
        &self.modes
    }

    /// Check if any of the requested modes call here.
    pub fn serves_any(&self, modes: &TransportModes) -> bool {
        self.modes.iter().any(|mode| modes.contains(mode))
    }

    pub fn serves(&self, mode: TransportMode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn dropoff_routes(&self) -> &[Arc<Route>] {
        &self.dropoff_routes
    }

    pub fn pickup_routes(&self) -> &[Arc<Route>] {
        &self.pickup_routes
    }
}

impl PartialEq for InterchangeStation {
    fn eq(&self, other: &Self) -> bool {
        self.station == other.station
    }
}

impl Eq for InterchangeStation {}

impl std::hash::Hash for InterchangeStation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.station.hash(state);
    }
}

impl fmt::Display for InterchangeStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interchange({})", self.station)
    }
}

/// A set of locations treated as one origin or destination, e.g. the
/// platforms of a station group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSet(BTreeSet<StationId>);

impl LocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(station: StationId) -> Self {
        Self([station].into_iter().collect())
    }

    pub fn insert(&mut self, station: StationId) {
        self.0.insert(station);
    }

    pub fn contains(&self, station: &StationId) -> bool {
        self.0.contains(station)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<StationId> for LocationSet {
    fn from_iter<I: IntoIterator<Item = StationId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for LocationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.0.iter().map(|id| id.as_str()).collect();
        write!(f, "[{}]", ids.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateRange, DaysOfWeek, RouteId};
    use chrono::NaiveDate;

    fn route(id: &str, mode: TransportMode) -> Arc<Route> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        Arc::new(Route::new(
            RouteId::new(id).unwrap(),
            id,
            mode,
            DateRange::new(start, end).unwrap(),
            DaysOfWeek::all(),
        ))
    }

    fn station(s: &str) -> StationId {
        StationId::new(s).unwrap()
    }

    #[test]
    fn interchange_modes_come_from_routes() {
        let interchange = InterchangeStation::new(
            station("PIC"),
            vec![route("T1", TransportMode::Tram)],
            vec![route("B1", TransportMode::Bus)],
        );

        assert!(interchange.serves(TransportMode::Tram));
        assert!(interchange.serves(TransportMode::Bus));
        assert!(!interchange.serves(TransportMode::Train));

        let train_only: TransportModes = [TransportMode::Train].into_iter().collect();
        assert!(!interchange.serves_any(&train_only));
        assert!(interchange.serves_any(&TransportMode::all()));
    }

    #[test]
    fn interchange_equality_by_station() {
        let a = InterchangeStation::new(station("PIC"), vec![route("T1", TransportMode::Tram)], vec![]);
        let b = InterchangeStation::new(station("PIC"), vec![], vec![route("T2", TransportMode::Tram)]);
        let c = InterchangeStation::new(station("VIC"), vec![], vec![]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "Interchange(PIC)");
    }

    #[test]
    fn location_set_ordering_and_display() {
        let set: LocationSet = [station("B"), station("A"), station("B")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&station("A")));
        assert_eq!(set.to_string(), "[A,B]");
        assert!(LocationSet::new().is_empty());
    }

    #[test]
    fn station_id_rejects_empty() {
        assert_eq!(
            StationId::new("").unwrap_err().to_string(),
            "invalid station id: station id cannot be empty"
        );
    }
}
