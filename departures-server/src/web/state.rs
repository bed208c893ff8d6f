//! Application state for the web layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::feed::FeedStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Current feed snapshot and its loader
    pub feed: Arc<FeedStore>,

    clock: fn() -> DateTime<Utc>,
}

impl AppState {
    /// Create a new app state using the system clock.
    pub fn new(feed: Arc<FeedStore>) -> Self {
        Self {
            feed,
            clock: Utc::now,
        }
    }

    /// Replace the clock used as "now" for departure queries.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
