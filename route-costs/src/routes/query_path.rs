//! Interchange chains behind a connection, checked against live availability.

use std::fmt;
use std::sync::Arc;

use crate::domain::InterchangeStation;

/// Depth reported for [`QueryPath::ZeroPaths`].
pub const NO_DEPTH: u32 = u32::MAX;

/// Error for an interchange set too small to be a choice.
#[derive(Debug, Clone, thiserror::Error)]
#[error("any of interchanges needs at least two stations, got {count}")]
pub struct TooFewInterchanges {
    pub count: usize,
}

/// The ways two routes can be joined by a chain of interchanges.
///
/// `BothOf` needs both halves; `AnyOf` and `AnyOfInterchanges` need one
/// alternative. Built per query and evaluated against a caller supplied
/// "is this interchange operating" predicate.
#[derive(Clone, PartialEq, Eq)]
pub enum QueryPath {
    ZeroPaths,
    SingleInterchange(Arc<InterchangeStation>),
    AnyOfInterchanges(Vec<Arc<InterchangeStation>>),
    BothOf(Box<QueryPath>, Box<QueryPath>),
    AnyOf(Vec<QueryPath>),
}

impl QueryPath {
    /// A choice of stations. Use [`QueryPath::of`] when there may be fewer
    /// than two.
    pub fn any_of_interchanges(
        stations: Vec<Arc<InterchangeStation>>,
    ) -> Result<Self, TooFewInterchanges> {
        if stations.len() < 2 {
            return Err(TooFewInterchanges {
                count: stations.len(),
            });
        }
        Ok(Self::AnyOfInterchanges(stations))
    }

    /// The simplest path for a set of stations.
    pub fn of(mut stations: Vec<Arc<InterchangeStation>>) -> Self {
        match stations.len() {
            0 => Self::ZeroPaths,
            1 => Self::SingleInterchange(stations.remove(0)),
            _ => Self::AnyOfInterchanges(stations),
        }
    }

    pub fn both_of(first: QueryPath, second: QueryPath) -> Self {
        Self::BothOf(Box::new(first), Box::new(second))
    }

    /// Alternatives, dropping any that can never succeed.
    pub fn any_of(paths: Vec<QueryPath>) -> Self {
        let paths: Vec<QueryPath> = paths
            .into_iter()
            .filter(|path| !matches!(path, Self::ZeroPaths))
            .collect();
        if paths.is_empty() {
            Self::ZeroPaths
        } else {
            Self::AnyOf(paths)
        }
    }

    /// Check if the path can be travelled given which interchanges operate.
    pub fn has_any<F>(&self, operating: &F) -> bool
    where
        F: Fn(&InterchangeStation) -> bool,
    {
        match self {
            Self::ZeroPaths => false,
            Self::SingleInterchange(station) => operating(&**station),
            Self::AnyOfInterchanges(stations) => stations.iter().any(|s| operating(&**s)),
            Self::BothOf(first, second) => first.has_any(operating) && second.has_any(operating),
            Self::AnyOf(paths) => paths.iter().any(|path| path.has_any(operating)),
        }
    }

    /// Number of changes along the path.
    pub fn depth(&self) -> u32 {
        match self {
            Self::ZeroPaths => NO_DEPTH,
            Self::SingleInterchange(_) | Self::AnyOfInterchanges(_) => 1,
            Self::BothOf(first, second) => first.depth().saturating_add(second.depth()),
            Self::AnyOf(paths) => paths.iter().map(QueryPath::depth).max().unwrap_or(NO_DEPTH),
        }
    }

    /// Number of top level alternatives.
    pub fn size(&self) -> usize {
        match self {
            Self::ZeroPaths => 0,
            Self::SingleInterchange(_) | Self::BothOf(..) => 1,
            Self::AnyOfInterchanges(stations) => stations.len(),
            Self::AnyOf(paths) => paths.len(),
        }
    }
}

impl fmt::Debug for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPaths => write!(f, "ZeroPaths"),
            Self::SingleInterchange(station) => write!(f, "Single({})", station.station_id()),
            Self::AnyOfInterchanges(stations) => f
                .debug_tuple("AnyOfInterchanges")
                .field(&stations.iter().map(|s| s.station_id()).collect::<Vec<_>>())
                .finish(),
            Self::BothOf(first, second) => f.debug_tuple("BothOf").field(first).field(second).finish(),
            Self::AnyOf(paths) => f.debug_tuple("AnyOf").field(paths).finish(),
        }
    }
}

/// The interchange paths found for one pair of routes.
#[derive(Debug, Clone)]
pub struct PathResults {
    path: QueryPath,
}

impl PathResults {
    pub fn new(path: QueryPath) -> Self {
        Self { path }
    }

    pub fn none() -> Self {
        Self::new(QueryPath::ZeroPaths)
    }

    pub fn path(&self) -> &QueryPath {
        &self.path
    }

    pub fn has_any<F>(&self, operating: &F) -> bool
    where
        F: Fn(&InterchangeStation) -> bool,
    {
        self.path.has_any(operating)
    }

    /// Verified number of changes; [`NO_DEPTH`] when there is no path.
    pub fn depth(&self) -> u32 {
        self.path.depth()
    }

    pub fn number_possible(&self) -> usize {
        self.path.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationId;

    fn station(name: &str) -> Arc<InterchangeStation> {
        Arc::new(InterchangeStation::new(
            StationId::new(name).unwrap(),
            Vec::new(),
            Vec::new(),
        ))
    }

    fn open_except<'a>(closed: &'a [&'a str]) -> impl Fn(&InterchangeStation) -> bool + 'a {
        move |s: &InterchangeStation| !closed.iter().any(|c| *c == s.station_id().as_str())
    }

    #[test]
    fn any_of_interchanges_needs_two() {
        assert!(QueryPath::any_of_interchanges(Vec::new()).is_err());
        assert!(QueryPath::any_of_interchanges(vec![station("A")]).is_err());
        assert!(QueryPath::any_of_interchanges(vec![station("A"), station("B")]).is_ok());
    }

    #[test]
    fn of_collapses_small_sets() {
        assert_eq!(QueryPath::of(Vec::new()), QueryPath::ZeroPaths);
        assert!(matches!(
            QueryPath::of(vec![station("A")]),
            QueryPath::SingleInterchange(_)
        ));
        assert!(matches!(
            QueryPath::of(vec![station("A"), station("B")]),
            QueryPath::AnyOfInterchanges(_)
        ));
    }

    #[test]
    fn zero_paths_never_succeed() {
        let path = QueryPath::ZeroPaths;
        assert!(!path.has_any(&|_: &InterchangeStation| true));
        assert_eq!(path.depth(), NO_DEPTH);
        assert_eq!(path.size(), 0);
    }

    #[test]
    fn both_of_needs_both() {
        let path = QueryPath::both_of(
            QueryPath::of(vec![station("I1")]),
            QueryPath::of(vec![station("I2")]),
        );
        assert!(path.has_any(&open_except(&[])));
        assert!(!path.has_any(&open_except(&["I2"])));
        assert!(!path.has_any(&open_except(&["I1"])));
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn any_of_needs_one() {
        let path = QueryPath::any_of(vec![
            QueryPath::both_of(QueryPath::of(vec![station("A")]), QueryPath::of(vec![station("B")])),
            QueryPath::both_of(QueryPath::of(vec![station("C")]), QueryPath::of(vec![station("D")])),
        ]);
        assert!(path.has_any(&open_except(&["A"])));
        assert!(!path.has_any(&open_except(&["A", "D"])));
        assert_eq!(path.depth(), 2);
        assert_eq!(path.size(), 2);
    }

    #[test]
    fn any_of_drops_zero_paths() {
        assert_eq!(
            QueryPath::any_of(vec![QueryPath::ZeroPaths, QueryPath::ZeroPaths]),
            QueryPath::ZeroPaths
        );
        assert_eq!(
            QueryPath::any_of(vec![QueryPath::ZeroPaths, QueryPath::of(vec![station("A")])]).size(),
            1
        );
    }

    #[test]
    fn interchange_choice() {
        let path = QueryPath::of(vec![station("A"), station("B")]);
        assert!(path.has_any(&open_except(&["A"])));
        assert!(!path.has_any(&open_except(&["A", "B"])));
        assert_eq!(path.depth(), 1);
        assert_eq!(path.size(), 2);
    }

    #[test]
    fn nested_chain_depth() {
        let three = QueryPath::both_of(
            QueryPath::both_of(QueryPath::of(vec![station("A")]), QueryPath::of(vec![station("B")])),
            QueryPath::of(vec![station("C")]),
        );
        let results = PathResults::new(three);
        assert_eq!(results.depth(), 3);
        assert_eq!(results.number_possible(), 1);
        assert!(results.has_any(&open_except(&[])));

        let none = PathResults::none();
        assert!(!none.has_any(&open_except(&[])));
    }

    #[test]
    fn debug_shows_stations() {
        let path = QueryPath::both_of(
            QueryPath::of(vec![station("A")]),
            QueryPath::of(vec![station("B"), station("C")]),
        );
        assert_eq!(
            format!("{path:?}"),
            "BothOf(Single(A), AnyOfInterchanges([StationId(B), StationId(C)]))"
        );
    }
}
