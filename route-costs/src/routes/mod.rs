//! Route to route connectivity.
//!
//! Answers "how many changes are needed to get from the routes serving one
//! place to the routes serving another" cheaply enough to use as a search
//! heuristic. Connectivity between routes is precomputed once as a bit
//! matrix per number of changes, then checked per query against the routes
//! running on the day and the interchanges actually open.

mod config;
mod connectivity;
mod cost_matrix;
mod costs;
mod error;
mod index;
mod interchanges;
mod interconnect;
mod overlap;
mod query_path;

#[cfg(test)]
mod test_network;

pub use config::RouteMatrixConfig;
pub use connectivity::{LoadedFromCache, RouteConnectivity, data_version};
pub use cost_matrix::{CostsPerDegreeRecord, MAX_DEPTH, MAX_VALUE, RouteCostMatrix};
pub use costs::{InterchangeOperating, LowestCostForDestinations, RouteToRouteCosts, UNREACHABLE};
pub use error::RouteMatrixError;
pub use index::{MAX_ROUTES, RouteIndex, RouteIndexPair, RouteIndexRecord};
pub use interchanges::RoutePairToInterchangeRepository;
pub use interconnect::{RouteIdPair, RouteInterconnectRecord, RouteInterconnectRepository};
pub use overlap::RouteDateAndDayOverlap;
pub use query_path::{NO_DEPTH, PathResults, QueryPath, TooFewInterchanges};
