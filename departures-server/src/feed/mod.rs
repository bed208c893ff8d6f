//! Feed snapshot lifecycle: initial load, periodic refresh, atomic swap.

mod store;

use std::time::Duration;

pub use store::FeedStore;

/// How often the feed is reloaded after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Load once and keep that snapshot for the life of the process.
    LoadOnce,

    /// Reload on a fixed period.
    Every(Duration),
}

impl RefreshPolicy {
    /// `0` means load once.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            RefreshPolicy::LoadOnce
        } else {
            RefreshPolicy::Every(Duration::from_secs(secs))
        }
    }
}

/// When the first snapshot is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupLoad {
    /// Before the server starts accepting requests.
    #[default]
    Eager,

    /// On the first request that needs the feed.
    Lazy,
}
