//! Keyed disk cache for built connectivity data.
//!
//! Each cached component is stored as one JSON file named after it, holding
//! a write timestamp and a flat list of records. Loading is all-or-nothing:
//! a file that cannot be read or decoded is reported as an error and the
//! caller rebuilds.
//!
//! A data version file records which source data the cache was built from.
//! When the version changes every cached file is removed.

mod error;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use error::CacheError;

/// On-disk wrapper around a list of records.
/// Written from a borrowed slice, read back into a `Vec`.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRecords<R> {
    /// Unix timestamp when the cache was written.
    cached_at_secs: u64,
    records: R,
}

/// Configuration for the data cache.
#[derive(Debug, Clone)]
pub struct FileCacheConfig {
    /// Directory holding one file per cached component.
    pub dir: PathBuf,
}

impl FileCacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self::new("cache")
    }
}

/// Disk cache for named record lists.
#[derive(Debug, Clone)]
pub struct FileDataCache {
    config: FileCacheConfig,
}

impl FileDataCache {
    /// File holding the version of the data the cache was built from.
    pub const DATA_VERSION_NAME: &'static str = "data_version.json";

    pub fn new(config: FileCacheConfig) -> Self {
        Self { config }
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.config.dir.join(name)
    }

    /// Check if a cache file exists for `name`.
    pub fn has_cache(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Save records under `name`, replacing any existing file.
    ///
    /// Creates the cache directory if it doesn't exist.
    pub fn save<T: Serialize>(&self, name: &str, records: &[T]) -> Result<(), CacheError> {
        let cached_at_secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        if !self.config.dir.as_os_str().is_empty() && !self.config.dir.exists() {
            std::fs::create_dir_all(&self.config.dir).map_err(|source| CacheError::Io {
                name: name.to_string(),
                source,
            })?;
        }

        let json = serde_json::to_string(&CachedRecords {
            cached_at_secs,
            records,
        })
        .map_err(|source| CacheError::Json {
            name: name.to_string(),
            source,
        })?;

        std::fs::write(self.path_for(name), json).map_err(|source| CacheError::Io {
            name: name.to_string(),
            source,
        })?;

        debug!(name, records = records.len(), "saved cache");
        Ok(())
    }

    /// Load all records saved under `name`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, CacheError> {
        let contents =
            std::fs::read_to_string(self.path_for(name)).map_err(|source| CacheError::Io {
                name: name.to_string(),
                source,
            })?;
        let cached: CachedRecords<Vec<T>> =
            serde_json::from_str(&contents).map_err(|source| CacheError::Json {
                name: name.to_string(),
                source,
            })?;

        debug!(
            name,
            records = cached.records.len(),
            cached_at_secs = cached.cached_at_secs,
            "loaded cache"
        );
        Ok(cached.records)
    }

    /// Clear the whole cache unless it was built from data at `version`.
    ///
    /// Returns true if the cache was cleared. A missing or unreadable version
    /// file counts as a change. The new version is recorded either way.
    pub fn clear_if_data_refreshed(&self, version: &str) -> Result<bool, CacheError> {
        let cached_version = if self.has_cache(Self::DATA_VERSION_NAME) {
            self.load::<String>(Self::DATA_VERSION_NAME)
                .ok()
                .and_then(|versions| versions.into_iter().next())
        } else {
            None
        };

        if cached_version.as_deref() == Some(version) {
            info!(version, "cached data is current");
            return Ok(false);
        }

        warn!(
            cached = cached_version.as_deref().unwrap_or("none"),
            version, "source data refreshed, clearing cache"
        );
        self.clear_files()?;
        self.save(Self::DATA_VERSION_NAME, &[version])?;
        Ok(true)
    }

    /// Delete every file in the cache directory.
    pub fn clear_files(&self) -> Result<(), CacheError> {
        let entries = match std::fs::read_dir(&self.config.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(CacheError::Io {
                    name: self.config.dir.display().to_string(),
                    source,
                });
            }
        };
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Io {
                name: self.config.dir.display().to_string(),
                source,
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            self.remove(&name)?;
            debug!(name, "removed cache file");
        }
        Ok(())
    }

    /// Delete the cache file for `name`, if present.
    pub fn remove(&self, name: &str) -> Result<(), CacheError> {
        match std::fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}
