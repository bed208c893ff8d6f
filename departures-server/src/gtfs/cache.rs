//! Disk cache for the downloaded feed archive.
//!
//! Static feeds are republished every few weeks, so there is no point in
//! downloading tens of megabytes on every restart. The archive is kept as a
//! plain file; its modification time says how old it is.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::error::FeedError;

/// Default cache TTL: 6 hours.
const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Configuration for the feed archive cache.
#[derive(Debug, Clone)]
pub struct FeedCacheConfig {
    /// Path to the cached archive.
    pub path: PathBuf,
    /// How long a cached archive is used instead of fetching.
    pub ttl: Duration,
}

impl FeedCacheConfig {
    /// Create a new cache config with the given path and default TTL (6 hours).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Disk cache for the feed archive.
#[derive(Debug, Clone)]
pub struct FeedCache {
    config: FeedCacheConfig,
}

impl FeedCache {
    pub fn new(config: FeedCacheConfig) -> Self {
        Self { config }
    }

    /// Load the cached archive if it is younger than the TTL.
    pub fn load_fresh(&self) -> Option<Vec<u8>> {
        let modified = std::fs::metadata(&self.config.path).ok()?.modified().ok()?;
        // A modification time in the future counts as fresh.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.config.ttl {
            return None;
        }
        std::fs::read(&self.config.path).ok()
    }

    /// Load the cached archive regardless of age.
    ///
    /// Used as a fallback when the publisher is unreachable.
    pub fn load_any(&self) -> Option<Vec<u8>> {
        std::fs::read(&self.config.path).ok()
    }

    /// Save an archive to the cache.
    ///
    /// Creates parent directories if they don't exist. The archive is
    /// written next to the target and renamed into place, so a reader never
    /// sees a half-written file.
    pub fn save(&self, bytes: &[u8]) -> Result<(), FeedError> {
        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| FeedError::Cache {
                message: format!("failed to create cache directory: {}", e),
            })?;
        }

        let tmp = self.config.path.with_extension("partial");
        std::fs::write(&tmp, bytes).map_err(|e| FeedError::Cache {
            message: format!("failed to write cache file: {}", e),
        })?;
        std::fs::rename(&tmp, &self.config.path).map_err(|e| FeedError::Cache {
            message: format!("failed to move cache file into place: {}", e),
        })?;

        Ok(())
    }

    /// Get the cache file path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }
}
