//! Route connectivity configuration.

/// Default bound on the per-query interchange availability cache.
const DEFAULT_AVAILABILITY_CACHE_CAPACITY: u64 = 1000;

/// Configuration for building and querying route connectivity.
#[derive(Debug, Clone)]
pub struct RouteMatrixConfig {
    /// The route set has been artificially reduced (e.g. a test subset).
    /// Caching is skipped entirely because the result is only valid for
    /// this exact subset.
    pub filtered: bool,

    /// Maximum number of stations held in a query's availability cache.
    pub availability_cache_capacity: u64,
}

impl RouteMatrixConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the route set as filtered.
    pub fn with_filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    pub fn with_availability_cache_capacity(mut self, capacity: u64) -> Self {
        self.availability_cache_capacity = capacity;
        self
    }

    /// Whether built data may be read from or written to the cache.
    pub fn use_cache(&self) -> bool {
        !self.filtered
    }
}

impl Default for RouteMatrixConfig {
    fn default() -> Self {
        Self {
            filtered: false,
            availability_cache_capacity: DEFAULT_AVAILABILITY_CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_cache() {
        let config = RouteMatrixConfig::default();
        assert!(config.use_cache());
        assert_eq!(config.availability_cache_capacity, 1000);
    }

    #[test]
    fn filtered_skips_cache() {
        let config = RouteMatrixConfig::new()
            .with_filtered(true)
            .with_availability_cache_capacity(10);
        assert!(!config.use_cache());
        assert_eq!(config.availability_cache_capacity, 10);
    }
}
