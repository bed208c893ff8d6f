//! GTFS static feed ingestion.
//!
//! Fetches a feed archive (or reads a local copy), parses its CSV tables
//! and builds an immutable [`FeedTables`] snapshot with the indexes the
//! departure resolver needs.

mod build;
mod cache;
mod client;
mod error;
mod loader;
mod records;
mod source;
mod tables;

#[cfg(test)]
pub(crate) mod testing;

pub use build::build_tables;
pub use cache::{FeedCache, FeedCacheConfig};
pub use client::{DEFAULT_TIMEOUT_SECS, FeedClient};
pub use error::{FeedError, FeedErrorKind};
pub use loader::{DEFAULT_FEED_URL, FeedLoader, FeedLoaderConfig, FeedSource};
pub use source::{DirTables, TableSource, ZipTables};
pub use tables::FeedTables;
