//! Dense numbering of routes.
//!
//! Every route known at build time gets an index in `0..N`, assigned in
//! route id order so that two builds over the same routes agree. All the
//! connectivity matrices are addressed by these indexes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cache::CacheError;
use crate::domain::{Route, RouteId, TransportMode};
use crate::repository::RouteRepository;

use super::error::RouteMatrixError;

/// Largest number of routes an index can hold.
pub const MAX_ROUTES: usize = u16::MAX as usize;

/// An ordered pair of route indexes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteIndexPair {
    first: u16,
    second: u16,
}

impl RouteIndexPair {
    pub fn new(first: u16, second: u16) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> u16 {
        self.first
    }

    pub fn second(&self) -> u16 {
        self.second
    }

    /// Both ends are the same route.
    pub fn is_same(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Debug for RouteIndexPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteIndexPair({},{})", self.first, self.second)
    }
}

/// One cached index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteIndexRecord {
    pub index: u16,
    pub route_id: RouteId,
}

/// Bijection between routes and indexes.
#[derive(Debug)]
pub struct RouteIndex {
    routes: Vec<Arc<Route>>,
    indexes: HashMap<RouteId, u16>,
}

impl RouteIndex {
    pub const CACHE_NAME: &'static str = "route_index.json";

    /// Index every route in the repository, ordered by route id.
    pub fn build(repository: &dyn RouteRepository) -> Result<Self, RouteMatrixError> {
        let mut routes = repository.routes();
        if routes.len() > MAX_ROUTES {
            return Err(RouteMatrixError::TooManyRoutes {
                count: routes.len(),
                max: MAX_ROUTES,
            });
        }
        routes.sort_by(|a, b| a.id().cmp(b.id()));

        let indexes = routes
            .iter()
            .enumerate()
            .map(|(index, route)| (route.id().clone(), index as u16))
            .collect();

        let index = Self { routes, indexes };
        info!(routes = index.len(), "built route index");
        Ok(index)
    }

    /// Restore an index from cached records.
    ///
    /// Fails if any cached route no longer exists, if the number of routes
    /// differs from the repository, or if the indexes are not exactly `0..N`.
    pub fn from_records(
        repository: &dyn RouteRepository,
        records: Vec<RouteIndexRecord>,
    ) -> Result<Self, CacheError> {
        let expected = repository.number_of_routes();
        if records.len() != expected {
            return Err(CacheError::load(
                Self::CACHE_NAME,
                format!(
                    "cached {} routes but repository has {}",
                    records.len(),
                    expected
                ),
            ));
        }

        let mut slots: Vec<Option<Arc<Route>>> = vec![None; records.len()];
        let mut indexes = HashMap::with_capacity(records.len());
        for record in records {
            let route = repository.route_by_id(&record.route_id).ok_or_else(|| {
                CacheError::load(
                    Self::CACHE_NAME,
                    format!("route {} is no longer present", record.route_id),
                )
            })?;
            let slot = slots
                .get_mut(record.index as usize)
                .filter(|slot| slot.is_none())
                .ok_or_else(|| {
                    CacheError::load(
                        Self::CACHE_NAME,
                        format!("index {} is out of range or repeated", record.index),
                    )
                })?;
            *slot = Some(route);
            indexes.insert(record.route_id, record.index);
        }

        // every slot is filled since there are N distinct indexes below N
        let routes: Vec<Arc<Route>> = slots.into_iter().flatten().collect();
        if routes.len() != indexes.len() {
            return Err(CacheError::load(
                Self::CACHE_NAME,
                "duplicate route ids in cache",
            ));
        }

        info!(routes = routes.len(), "restored route index from cache");
        Ok(Self { routes, indexes })
    }

    pub fn to_records(&self) -> Vec<RouteIndexRecord> {
        self.routes
            .iter()
            .enumerate()
            .map(|(index, route)| RouteIndexRecord {
                index: index as u16,
                route_id: route.id().clone(),
            })
            .collect()
    }

    /// Number of indexed routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Look up the index of a route.
    ///
    /// A miss means the index was built from a different route set.
    pub fn index_for(&self, route: &RouteId) -> Result<u16, RouteMatrixError> {
        self.indexes.get(route).copied().ok_or_else(|| {
            error!(%route, "no index for route, cache may be stale");
            RouteMatrixError::NoIndexForRoute {
                route: route.clone(),
            }
        })
    }

    pub fn has_index_for(&self, route: &RouteId) -> bool {
        self.indexes.contains_key(route)
    }

    pub fn route_for(&self, index: u16) -> Result<&Arc<Route>, RouteMatrixError> {
        self.routes
            .get(index as usize)
            .ok_or(RouteMatrixError::IndexOutOfRange {
                index: index as usize,
                size: self.routes.len(),
            })
    }

    pub fn pair_for(
        &self,
        first: &RouteId,
        second: &RouteId,
    ) -> Result<RouteIndexPair, RouteMatrixError> {
        Ok(RouteIndexPair::new(
            self.index_for(first)?,
            self.index_for(second)?,
        ))
    }

    /// Resolve both ends of a pair back to routes.
    pub fn routes_for(
        &self,
        pair: RouteIndexPair,
    ) -> Result<(&Arc<Route>, &Arc<Route>), RouteMatrixError> {
        Ok((self.route_for(pair.first())?, self.route_for(pair.second())?))
    }

    /// All routes in index order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    /// Number of indexed routes of the given mode.
    pub fn size_for(&self, mode: TransportMode) -> usize {
        self.routes
            .iter()
            .filter(|route| route.transport_mode() == mode)
            .count()
    }

    /// Check both directions of the mapping agree.
    pub fn validate(&self) -> bool {
        if self.routes.len() != self.indexes.len() {
            error!(
                routes = self.routes.len(),
                indexes = self.indexes.len(),
                "route index size mismatch"
            );
            return false;
        }
        self.routes.iter().enumerate().all(|(index, route)| {
            let matches = self.indexes.get(route.id()) == Some(&(index as u16));
            if !matches {
                error!(route = %route.id(), index, "route index mismatch");
            }
            matches
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{DateRange, DaysOfWeek};
    use crate::repository::InMemoryNetwork;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn network(ids: &[String]) -> InMemoryNetwork {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ids.iter()
            .fold(InMemoryNetwork::builder(), |builder, id| {
                builder.route(Route::new(
                    RouteId::new(id.clone()).unwrap(),
                    id,
                    TransportMode::Bus,
                    DateRange::single(date),
                    DaysOfWeek::all(),
                ))
            })
            .build()
    }

    proptest! {
        /// route_for(index_for(r)) == r and indexes cover 0..N exactly
        #[test]
        fn index_is_a_bijection(ids in proptest::collection::btree_set("[A-Z][0-9]{1,3}", 0..40)) {
            let ids: Vec<String> = ids.into_iter().collect();
            let index = RouteIndex::build(&network(&ids)).unwrap();

            prop_assert_eq!(index.len(), ids.len());
            let mut seen: Vec<u16> = Vec::new();
            for id in &ids {
                let route_id = RouteId::new(id.clone()).unwrap();
                let i = index.index_for(&route_id).unwrap();
                prop_assert_eq!(index.route_for(i).unwrap().id(), &route_id);
                seen.push(i);
            }
            seen.sort();
            let expected: Vec<u16> = (0..ids.len() as u16).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
