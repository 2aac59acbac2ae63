//! File cache error types.

/// Errors that can occur when reading or writing the data cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading, writing or creating a cache file failed
    #[error("cache I/O error for {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Cache file content could not be encoded or decoded
    #[error("cache JSON error for {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Cached data no longer matches the live data it was built from
    #[error("could not load {name} from cache: {message}")]
    Load { name: String, message: String },
}

impl CacheError {
    pub fn load(name: &str, message: impl Into<String>) -> Self {
        Self::Load {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
