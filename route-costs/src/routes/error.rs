//! Route connectivity error types.

use crate::cache::CacheError;
use crate::domain::RouteId;

/// Inconsistencies between the connectivity data and the live route set.
///
/// None of these are ordinary "no result" outcomes. They mean the built or
/// cached data disagrees with itself or with the repositories.
#[derive(Debug, thiserror::Error)]
pub enum RouteMatrixError {
    /// A route was not indexed, usually because a cache is stale
    #[error("no index for route {route}")]
    NoIndexForRoute { route: RouteId },

    /// An index outside the route index was used
    #[error("route index {index} out of range for {size} routes")]
    IndexOutOfRange { index: usize, size: usize },

    /// The route set does not fit the index type
    #[error("{count} routes exceed the maximum of {max}")]
    TooManyRoutes { count: usize, max: usize },

    /// A pair of identical routes where distinct routes are required
    #[error("same route {route} given for both ends of a pair")]
    SameRoute { route: RouteId },

    /// A degree outside 1..=MAX_DEPTH
    #[error("degree {degree} out of range 1..={max}")]
    DepthOutOfRange { degree: u8, max: u8 },

    /// The matrix records a connection the interconnect index cannot explain
    #[error("no interconnect for {first} to {second} at degree {degree}")]
    MissingInterconnect {
        degree: u8,
        first: RouteId,
        second: RouteId,
    },

    /// A single-change connection with no interchange station behind it
    #[error("no interchange from {dropoff} to {pickup}")]
    MissingInterchange { dropoff: RouteId, pickup: RouteId },

    /// Reading or writing cached connectivity data failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}
