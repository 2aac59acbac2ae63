//! Routes and the transport modes they run in.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::dates::{DateRange, DaysOfWeek, any_date_on};

/// Error returned when constructing an invalid route identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route id: {reason}")]
pub struct InvalidRouteId {
    reason: &'static str,
}

/// A stable route identifier.
///
/// Route ids are opaque strings; the only validation is that they are
/// non-empty. Ordering is by string, which gives the route index its
/// deterministic layout.
///
/// # Examples
///
/// ```
/// use route_costs::domain::RouteId;
///
/// let id = RouteId::new("METROLINK:Blue").unwrap();
/// assert_eq!(id.as_str(), "METROLINK:Blue");
///
/// // Empty strings are rejected
/// assert!(RouteId::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RouteId(String);

impl RouteId {
    /// Create a new route id.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidRouteId> {
        let s = s.into();
        if s.is_empty() {
            return Err(InvalidRouteId {
                reason: "route id cannot be empty",
            });
        }
        Ok(RouteId(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RouteId {
    type Error = InvalidRouteId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RouteId::new(value)
    }
}

impl From<RouteId> for String {
    fn from(id: RouteId) -> Self {
        id.0
    }
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({})", self.0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of vehicle operating a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Tram,
    Bus,
    Train,
    Subway,
    Ferry,
}

impl TransportMode {
    /// Every mode, in declaration order.
    pub fn all() -> TransportModes {
        [
            TransportMode::Tram,
            TransportMode::Bus,
            TransportMode::Train,
            TransportMode::Subway,
            TransportMode::Ferry,
        ]
        .into_iter()
        .collect()
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::Tram => "tram",
            TransportMode::Bus => "bus",
            TransportMode::Train => "train",
            TransportMode::Subway => "subway",
            TransportMode::Ferry => "ferry",
        };
        f.write_str(name)
    }
}

/// A set of permitted transport modes.
pub type TransportModes = BTreeSet<TransportMode>;

/// A scheduled transit service, independent of any specific trip.
///
/// Routes are immutable once constructed and shared as `Arc<Route>`.
#[derive(Debug, Clone)]
pub struct Route {
    id: RouteId,
    name: String,
    mode: TransportMode,
    date_range: DateRange,
    days: DaysOfWeek,
}

impl Route {
    pub fn new(
        id: RouteId,
        name: impl Into<String>,
        mode: TransportMode,
        date_range: DateRange,
        days: DaysOfWeek,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            mode,
            date_range,
            days,
        }
    }

    pub fn id(&self) -> &RouteId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.mode
    }

    pub fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    pub fn days(&self) -> DaysOfWeek {
        self.days
    }

    /// Check if the route runs on the given date.
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        self.date_range.contains(date) && self.days.contains(date.weekday())
    }

    /// Check if this route and `other` could ever run on the same calendar date.
    ///
    /// True iff some date lies inside both date ranges and falls on a day of
    /// the week both routes operate. Symmetric.
    pub fn is_date_overlap(&self, other: &Route) -> bool {
        match self.date_range.intersection(&other.date_range) {
            Some(shared) => any_date_on(&shared, self.days.intersection(other.days)),
            None => false,
        }
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Route {}

impl std::hash::Hash for Route {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Anything that can report the route it belongs to.
pub trait HasRouteId {
    fn route_id(&self) -> &RouteId;
}

impl HasRouteId for Route {
    fn route_id(&self) -> &RouteId {
        &self.id
    }
}

impl HasRouteId for RouteId {
    fn route_id(&self) -> &RouteId {
        self
    }
}

impl<T: HasRouteId + ?Sized> HasRouteId for Arc<T> {
    fn route_id(&self) -> &RouteId {
        (**self).route_id()
    }
}

impl<T: HasRouteId + ?Sized> HasRouteId for &T {
    fn route_id(&self) -> &RouteId {
        (**self).route_id()
    }
}
