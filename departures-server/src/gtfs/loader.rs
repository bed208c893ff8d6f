//! Feed loading from a URL or a local path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use tracing::{debug, info, warn};

use super::build::build_tables;
use super::cache::{FeedCache, FeedCacheConfig};
use super::client::{DEFAULT_TIMEOUT_SECS, FeedClient};
use super::error::FeedError;
use super::source::{DirTables, ZipTables};
use super::tables::FeedTables;

/// Feed published by Bluestar. Publishers rotate these links per period,
/// so deployments are expected to set `GTFS_URL`.
pub const DEFAULT_FEED_URL: &str =
    "https://www.bluestarbus.co.uk/open-data/download/gtfs-2025-08-11-to-2025-08-31.zip";

/// Where the feed comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// A zip archive served over HTTP(S).
    Http { url: String },

    /// A local zip archive or an extracted feed directory.
    Path(PathBuf),
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Http { url } => f.write_str(url),
            FeedSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration for the feed loader.
#[derive(Debug, Clone)]
pub struct FeedLoaderConfig {
    pub source: FeedSource,
    /// Fetch timeout in seconds
    pub timeout_secs: u64,
    /// On-disk copy of downloaded archives (HTTP sources only)
    pub cache: Option<FeedCacheConfig>,
    /// Timezone used when the feed doesn't name one
    pub default_timezone: Tz,
}

impl FeedLoaderConfig {
    /// Create a new config for the given source.
    pub fn new(source: FeedSource) -> Self {
        Self {
            source,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache: None,
            default_timezone: chrono_tz::Europe::London,
        }
    }

    /// Set fetch timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Keep downloaded archives on disk.
    pub fn with_cache(mut self, cache: FeedCacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the fallback timezone.
    pub fn with_default_timezone(mut self, tz: Tz) -> Self {
        self.default_timezone = tz;
        self
    }
}

/// Loads complete feed snapshots from the configured source.
#[derive(Debug, Clone)]
pub struct FeedLoader {
    source: FeedSource,
    client: FeedClient,
    cache: Option<FeedCache>,
    default_timezone: Tz,
}

impl FeedLoader {
    pub fn new(config: FeedLoaderConfig) -> Result<Self, FeedError> {
        let client = FeedClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            source: config.source,
            client,
            cache: config.cache.map(FeedCache::new),
            default_timezone: config.default_timezone,
        })
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// Fetch and parse the whole feed.
    ///
    /// An HTTP source is served from a fresh disk cache when there is one.
    /// Parsing runs on the blocking pool; a large `stop_times.txt` takes a
    /// while.
    pub async fn load(&self) -> Result<FeedTables, FeedError> {
        self.load_with(true).await
    }

    /// Like [`FeedLoader::load`], but always asks the publisher first.
    ///
    /// The cache still receives the new archive and still backs a failed
    /// fetch.
    pub async fn load_latest(&self) -> Result<FeedTables, FeedError> {
        self.load_with(false).await
    }

    async fn load_with(&self, prefer_cache: bool) -> Result<FeedTables, FeedError> {
        match &self.source {
            FeedSource::Http { url } => self.load_http(url, prefer_cache).await,
            FeedSource::Path(path) => self.load_path(path).await,
        }
    }

    async fn load_path(&self, path: &Path) -> Result<FeedTables, FeedError> {
        let tz = self.default_timezone;
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| FeedError::Unavailable {
                message: format!("{}: {}", path.display(), e),
            })?;

        if meta.is_dir() {
            let dir = path.to_path_buf();
            run_blocking(move || build_tables(&mut DirTables::new(dir), tz)).await
        } else {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| FeedError::Unavailable {
                    message: format!("{}: {}", path.display(), e),
                })?;
            parse_archive(bytes, tz).await
        }
    }

    /// Cache, then publisher, then whatever the cache holds.
    ///
    /// Only an archive that parsed is written to the cache.
    async fn load_http(&self, url: &str, prefer_cache: bool) -> Result<FeedTables, FeedError> {
        let tz = self.default_timezone;

        if prefer_cache
            && let Some(cache) = &self.cache
            && let Some(bytes) = cache.load_fresh()
        {
            match parse_archive(bytes, tz).await {
                Ok(tables) => {
                    debug!(path = %cache.path().display(), "using cached feed archive");
                    return Ok(tables);
                }
                Err(e) => warn!(error = %e, "cached feed archive unreadable, fetching"),
            }
        }

        info!(%url, "fetching feed");
        let bytes = match self.client.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => return self.stale_fallback(e).await,
        };
        info!(bytes = bytes.len(), "fetched feed archive");

        let copy = self.cache.is_some().then(|| bytes.clone());
        let tables = match parse_archive(bytes, tz).await {
            Ok(tables) => tables,
            Err(e) => return self.stale_fallback(e).await,
        };

        if let (Some(cache), Some(bytes)) = (&self.cache, copy)
            && let Err(e) = cache.save(&bytes)
        {
            warn!(error = %e, "failed to cache feed archive");
        }
        Ok(tables)
    }

    /// Parse the cached archive regardless of age, or give back `err`.
    async fn stale_fallback(&self, err: FeedError) -> Result<FeedTables, FeedError> {
        let Some(bytes) = self.cache.as_ref().and_then(FeedCache::load_any) else {
            return Err(err);
        };
        match parse_archive(bytes, self.default_timezone).await {
            Ok(tables) => {
                warn!(error = %err, "no usable download, using stale cached archive");
                Ok(tables)
            }
            Err(stale) => {
                warn!(error = %stale, "stale cached archive unreadable");
                Err(err)
            }
        }
    }
}

async fn parse_archive(bytes: Vec<u8>, tz: Tz) -> Result<FeedTables, FeedError> {
    run_blocking(move || {
        let mut tables = ZipTables::new(bytes)?;
        build_tables(&mut tables, tz)
    })
    .await
}

async fn run_blocking<F>(f: F) -> Result<FeedTables, FeedError>
where
    F: FnOnce() -> Result<FeedTables, FeedError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FeedError::Unavailable {
            message: format!("feed parsing task failed: {e}"),
        })?
}
