//! Process configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::feed::{RefreshPolicy, StartupLoad};
use crate::gtfs::{
    DEFAULT_FEED_URL, DEFAULT_TIMEOUT_SECS, FeedCacheConfig, FeedLoaderConfig, FeedSource,
};

/// Default refresh period: 6 hours.
const DEFAULT_REFRESH_SECS: u64 = 6 * 60 * 60;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where the feed is loaded from
    pub source: FeedSource,
    /// Disk cache for downloaded archives
    pub cache: Option<FeedCacheConfig>,
    /// Feed fetch timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Timezone used when the feed doesn't name one
    pub default_timezone: Tz,
    pub refresh: RefreshPolicy,
    pub startup_load: StartupLoad,
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: FeedSource::Http {
                url: DEFAULT_FEED_URL.to_string(),
            },
            cache: None,
            fetch_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_timezone: chrono_tz::Europe::London,
            refresh: RefreshPolicy::Every(Duration::from_secs(DEFAULT_REFRESH_SECS)),
            startup_load: StartupLoad::Eager,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `GTFS_URL` | the Bluestar feed |
    /// | `GTFS_PATH` | unset; overrides `GTFS_URL` |
    /// | `GTFS_CACHE_PATH` | unset (no cache) |
    /// | `GTFS_CACHE_TTL_SECS` | 21600 |
    /// | `FEED_REFRESH_SECS` | 21600; `0` loads once |
    /// | `FEED_LOAD` | `eager` |
    /// | `FEED_FETCH_TIMEOUT_SECS` | 60 |
    /// | `FEED_TIMEZONE` | `Europe/London` |
    /// | `BIND_ADDR` | `127.0.0.1:3000` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("GTFS_PATH") {
            config.source = FeedSource::Path(path.into());
        } else if let Some(url) = get("GTFS_URL") {
            config.source = FeedSource::Http { url };
        }

        if let Some(path) = get("GTFS_CACHE_PATH") {
            let mut cache = FeedCacheConfig::new(path);
            if let Some(raw) = get("GTFS_CACHE_TTL_SECS") {
                cache = cache.with_ttl(Duration::from_secs(parse("GTFS_CACHE_TTL_SECS", raw)?));
            }
            config.cache = Some(cache);
        }

        if let Some(raw) = get("FEED_REFRESH_SECS") {
            config.refresh = RefreshPolicy::from_secs(parse("FEED_REFRESH_SECS", raw)?);
        }

        if let Some(raw) = get("FEED_LOAD") {
            config.startup_load = match raw.trim().to_ascii_lowercase().as_str() {
                "eager" => StartupLoad::Eager,
                "lazy" => StartupLoad::Lazy,
                _ => {
                    return Err(ConfigError {
                        var: "FEED_LOAD",
                        value: raw,
                        reason: "expected eager or lazy".to_string(),
                    });
                }
            };
        }

        if let Some(raw) = get("FEED_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout_secs = parse("FEED_FETCH_TIMEOUT_SECS", raw)?;
        }

        if let Some(raw) = get("FEED_TIMEZONE") {
            config.default_timezone = parse("FEED_TIMEZONE", raw)?;
        }

        if let Some(raw) = get("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", raw)?;
        }

        Ok(config)
    }

    /// Loader settings derived from this configuration.
    pub fn loader_config(&self) -> FeedLoaderConfig {
        let mut loader = FeedLoaderConfig::new(self.source.clone())
            .with_timeout(self.fetch_timeout_secs)
            .with_default_timezone(self.default_timezone);
        if let Some(cache) = &self.cache {
            loader = loader.with_cache(cache.clone());
        }
        loader
    }
}

fn parse<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        reason: e.to_string(),
        value: raw,
    })
}
