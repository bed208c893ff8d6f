//! The shared, swappable feed snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::gtfs::{FeedError, FeedLoader, FeedTables};

/// Holds the currently active feed snapshot.
///
/// Readers take a cheap `Arc` clone of the snapshot and never block on a
/// refresh in progress. Refreshes are serialised: at most one load runs at
/// a time, and a failed load leaves the previous snapshot in place.
pub struct FeedStore {
    loader: FeedLoader,
    current: RwLock<Option<Arc<FeedTables>>>,
    refresh_lock: Mutex<()>,
    /// Completed load attempts, successful or not
    attempts: AtomicU64,
    last_error: RwLock<Option<Arc<FeedError>>>,
}

impl FeedStore {
    /// Create a store with no snapshot yet.
    pub fn new(loader: FeedLoader) -> Self {
        Self {
            loader,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Create a store that starts out with `tables` as its snapshot.
    pub fn with_tables(loader: FeedLoader, tables: FeedTables) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(tables))),
            ..Self::new(loader)
        }
    }

    /// The current snapshot, if one has been loaded.
    pub async fn snapshot(&self) -> Option<Arc<FeedTables>> {
        self.current.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// The most recent failed load, cleared by the next success.
    pub async fn last_error(&self) -> Option<Arc<FeedError>> {
        self.last_error.read().await.clone()
    }

    /// Load a snapshot and swap it in.
    ///
    /// Once a snapshot exists this always goes to the publisher, so a
    /// periodic refresh is never answered by the disk cache. On failure the
    /// existing snapshot is preserved and the error is returned.
    pub async fn refresh(&self) -> Result<Arc<FeedTables>, Arc<FeedError>> {
        let _guard = self.refresh_lock.lock().await;
        let latest = self.is_loaded().await;
        self.reload(latest).await
    }

    /// The current snapshot, loading one first if there is none.
    ///
    /// Concurrent callers that all find the store empty share a single load,
    /// and share its error if it fails.
    pub async fn current_or_load(&self) -> Result<Arc<FeedTables>, Arc<FeedError>> {
        if let Some(tables) = self.snapshot().await {
            return Ok(tables);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;
        if let Some(tables) = self.snapshot().await {
            return Ok(tables);
        }
        // A load finished while we queued for the lock and it failed.
        if self.attempts.load(Ordering::Acquire) != seen
            && let Some(e) = self.last_error().await
        {
            return Err(e);
        }
        self.reload(false).await
    }

    /// Spawn a task that refreshes the snapshot every `every`.
    ///
    /// The first refresh happens one full period after spawning.
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // First tick is immediate, skip it
            loop {
                interval.tick().await;
                // Failures are logged and recorded by `reload`.
                let _ = store.refresh().await;
            }
        })
    }

    /// Load and swap. Callers must hold `refresh_lock`.
    ///
    /// `latest` skips the disk cache's fresh copy.
    async fn reload(&self, latest: bool) -> Result<Arc<FeedTables>, Arc<FeedError>> {
        let result = if latest {
            self.loader.load_latest().await
        } else {
            self.loader.load().await
        };

        let outcome = match result {
            Ok(tables) => {
                let tables = Arc::new(tables);
                *self.current.write().await = Some(Arc::clone(&tables));
                *self.last_error.write().await = None;
                info!(
                    source = %self.loader.source(),
                    stops = tables.stop_count(),
                    trips = tables.trip_count(),
                    "feed snapshot loaded"
                );
                Ok(tables)
            }
            Err(e) => {
                let e = Arc::new(e);
                let keeping = self.is_loaded().await;
                warn!(
                    source = %self.loader.source(),
                    error = %e,
                    keeping_previous = keeping,
                    "feed load failed"
                );
                *self.last_error.write().await = Some(Arc::clone(&e));
                Err(e)
            }
        };
        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }
}
