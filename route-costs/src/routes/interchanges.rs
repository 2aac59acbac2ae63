//! Which interchange stations realise each single-change connection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::domain::{InterchangeStation, TransportModes};
use crate::repository::InterchangeRepository;

use super::error::RouteMatrixError;
use super::index::{RouteIndex, RouteIndexPair};

/// Map from a (drop-off route, pick-up route) pair to the stations where
/// that change can be made.
///
/// Built with the same rule that seeds degree 1 of the cost matrix.
#[derive(Debug, Default)]
pub struct RoutePairToInterchangeRepository {
    interchanges: HashMap<RouteIndexPair, Vec<Arc<InterchangeStation>>>,
}

impl RoutePairToInterchangeRepository {
    pub fn build(
        index: &RouteIndex,
        repository: &dyn InterchangeRepository,
    ) -> Result<Self, RouteMatrixError> {
        let mut interchanges: HashMap<RouteIndexPair, Vec<Arc<InterchangeStation>>> =
            HashMap::new();

        for interchange in repository.all_interchanges() {
            for dropoff in interchange.dropoff_routes() {
                let dropoff_index = index.index_for(dropoff.id())?;
                for pickup in interchange.pickup_routes() {
                    if dropoff.id() == pickup.id() || !pickup.is_date_overlap(dropoff) {
                        continue;
                    }
                    let pair = RouteIndexPair::new(dropoff_index, index.index_for(pickup.id())?);
                    let stations = interchanges.entry(pair).or_default();
                    if !stations.contains(&interchange) {
                        stations.push(interchange.clone());
                    }
                }
            }
        }

        info!(pairs = interchanges.len(), "mapped route pairs to interchanges");
        Ok(Self { interchanges })
    }

    pub fn has_interchanges_for(&self, pair: RouteIndexPair) -> bool {
        self.interchanges.contains_key(&pair)
    }

    /// Stations for a pair serving any of `modes`. Empty for unknown pairs.
    pub fn interchanges(
        &self,
        pair: RouteIndexPair,
        modes: &TransportModes,
    ) -> Vec<Arc<InterchangeStation>> {
        self.interchanges
            .get(&pair)
            .map(|stations| {
                stations
                    .iter()
                    .filter(|station| station.serves_any(modes))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of route pairs with at least one interchange.
    pub fn number_of_pairs(&self) -> usize {
        self.interchanges.len()
    }
}
