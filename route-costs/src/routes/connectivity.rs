//! Start-up and shut-down of the route connectivity data.
//!
//! Everything is built (or restored from the file cache) once in
//! [`RouteConnectivity::start`], shared read-only while serving queries,
//! and written back to the cache in [`RouteConnectivity::stop`].
//!
//! The cache is tagged with a fingerprint of the routes and interchanges it
//! was built from, and cleared when the network changes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::cache::{CacheError, FileDataCache};
use crate::domain::RouteId;
use crate::repository::Repositories;

use super::config::RouteMatrixConfig;
use super::cost_matrix::RouteCostMatrix;
use super::costs::RouteToRouteCosts;
use super::error::RouteMatrixError;
use super::index::RouteIndex;
use super::interchanges::RoutePairToInterchangeRepository;
use super::interconnect::RouteInterconnectRepository;
use super::overlap::RouteDateAndDayOverlap;

/// Which components were restored rather than built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedFromCache {
    pub index: bool,
    pub matrix: bool,
    pub interconnects: bool,
}

impl LoadedFromCache {
    pub fn all(&self) -> bool {
        self.index && self.matrix && self.interconnects
    }
}

/// Owner of the built connectivity data for the life of the process.
pub struct RouteConnectivity {
    repositories: Repositories,
    cache: FileDataCache,
    config: RouteMatrixConfig,
    index: Arc<RouteIndex>,
    matrix: Arc<RouteCostMatrix>,
    interconnects: Arc<RouteInterconnectRepository>,
    loaded: LoadedFromCache,
}

impl RouteConnectivity {
    /// Build or restore every component.
    ///
    /// Cached data is only used when the route set is not filtered, and a
    /// component is only restored if everything it depends on was too. The
    /// cache is cleared first if the routes or interchanges have changed
    /// since it was written. A cache that fails validation is discarded and
    /// rebuilt. Any other inconsistency fails start-up.
    pub fn start(
        repositories: Repositories,
        cache: FileDataCache,
        config: RouteMatrixConfig,
    ) -> Result<Self, RouteMatrixError> {
        let started = Instant::now();
        let use_cache = config.use_cache();
        info!(use_cache, cache_dir = %cache.dir().display(), "starting route connectivity");
        if use_cache {
            cache.clear_if_data_refreshed(&data_version(&repositories))?;
        }

        let routes = repositories.routes.clone();
        let restored_index = try_load(&cache, use_cache, RouteIndex::CACHE_NAME, |records| {
            let index = RouteIndex::from_records(routes.as_ref(), records)?;
            if index.validate() {
                Ok(index)
            } else {
                Err(CacheError::load(RouteIndex::CACHE_NAME, "index failed validation"))
            }
        });
        let mut loaded = LoadedFromCache {
            index: restored_index.is_some(),
            ..LoadedFromCache::default()
        };
        let index = Arc::new(match restored_index {
            Some(index) => index,
            None => RouteIndex::build(repositories.routes.as_ref())?,
        });

        let interchanges = Arc::new(RoutePairToInterchangeRepository::build(
            &index,
            repositories.interchanges.as_ref(),
        )?);

        let mut overlaps: Option<RouteDateAndDayOverlap> = None;

        let restored_matrix = try_load(
            &cache,
            use_cache && loaded.index,
            RouteCostMatrix::CACHE_NAME,
            |records| RouteCostMatrix::from_records(index.clone(), records),
        );
        loaded.matrix = restored_matrix.is_some();
        let matrix = Arc::new(match restored_matrix {
            Some(matrix) => matrix,
            None => {
                let overlaps =
                    overlaps.get_or_insert_with(|| RouteDateAndDayOverlap::populate(&index));
                RouteCostMatrix::build(index.clone(), overlaps, repositories.interchanges.as_ref())?
            }
        });

        let restored_interconnects = try_load(
            &cache,
            use_cache && loaded.matrix,
            RouteInterconnectRepository::CACHE_NAME,
            |records| {
                RouteInterconnectRepository::from_records(matrix.clone(), interchanges.clone(), records)
            },
        );
        loaded.interconnects = restored_interconnects.is_some();
        let interconnects = Arc::new(match restored_interconnects {
            Some(interconnects) => interconnects,
            None => {
                let overlaps =
                    overlaps.get_or_insert_with(|| RouteDateAndDayOverlap::populate(&index));
                RouteInterconnectRepository::build(matrix.clone(), overlaps, interchanges.clone())?
            }
        });

        info!(
            routes = index.len(),
            connections = matrix.number_of_bits_set(),
            from_cache = loaded.all(),
            took_ms = started.elapsed().as_millis() as u64,
            "started route connectivity"
        );

        Ok(Self {
            repositories,
            cache,
            config,
            index,
            matrix,
            interconnects,
            loaded,
        })
    }

    /// Save anything that was built to the cache, then release the data.
    pub fn stop(self) -> Result<(), RouteMatrixError> {
        info!("stopping route connectivity");
        if self.config.use_cache() {
            if !self.loaded.index {
                self.cache
                    .save(RouteIndex::CACHE_NAME, &self.index.to_records())?;
            }
            if !self.loaded.matrix {
                self.cache
                    .save(RouteCostMatrix::CACHE_NAME, &self.matrix.to_records())?;
            }
            if !self.loaded.interconnects {
                self.cache.save(
                    RouteInterconnectRepository::CACHE_NAME,
                    &self.interconnects.to_records(),
                )?;
            }
        }
        info!("stopped route connectivity");
        Ok(())
    }

    /// Query facade over the built data.
    pub fn costs(&self) -> RouteToRouteCosts {
        RouteToRouteCosts::new(
            self.matrix.clone(),
            self.interconnects.clone(),
            self.repositories.availability.clone(),
            self.repositories.closed.clone(),
            self.repositories.neighbours.clone(),
            self.config.clone(),
        )
    }

    pub fn index(&self) -> &Arc<RouteIndex> {
        &self.index
    }

    pub fn matrix(&self) -> &Arc<RouteCostMatrix> {
        &self.matrix
    }

    pub fn interconnects(&self) -> &Arc<RouteInterconnectRepository> {
        &self.interconnects
    }

    pub fn loaded_from_cache(&self) -> LoadedFromCache {
        self.loaded
    }
}

/// Fingerprint of everything the cached components are derived from.
///
/// Stable for the same routes and interchanges regardless of the order the
/// repositories return them in.
pub fn data_version(repositories: &Repositories) -> String {
    let mut routes = repositories.routes.routes();
    routes.sort_by(|a, b| a.id().cmp(b.id()));

    let mut interchanges: Vec<_> = repositories
        .interchanges
        .all_interchanges()
        .iter()
        .map(|interchange| {
            let mut dropoffs: Vec<RouteId> =
                interchange.dropoff_routes().iter().map(|r| r.id().clone()).collect();
            let mut pickups: Vec<RouteId> =
                interchange.pickup_routes().iter().map(|r| r.id().clone()).collect();
            dropoffs.sort();
            pickups.sort();
            (interchange.station_id().clone(), dropoffs, pickups)
        })
        .collect();
    interchanges.sort();

    let mut hasher = DefaultHasher::new();
    routes.len().hash(&mut hasher);
    for route in &routes {
        route.id().hash(&mut hasher);
        route.transport_mode().hash(&mut hasher);
        route.date_range().hash(&mut hasher);
        route.days().hash(&mut hasher);
    }
    interchanges.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Restore a component from the cache, or `None` to build it.
fn try_load<T, R, F>(cache: &FileDataCache, enabled: bool, name: &str, restore: F) -> Option<T>
where
    R: DeserializeOwned,
    F: FnOnce(Vec<R>) -> Result<T, CacheError>,
{
    if !enabled || !cache.has_cache(name) {
        return None;
    }
    match cache.load(name).and_then(restore) {
        Ok(restored) => Some(restored),
        Err(e) => {
            warn!(name, error = %e, "discarding cached data, rebuilding");
            None
        }
    }
}
