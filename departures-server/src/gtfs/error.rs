//! Feed loading error types.

/// Broad class of a feed failure, used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// The feed could not be fetched or read at all.
    Unavailable,

    /// The feed was fetched but its contents are malformed.
    Malformed,
}

/// Errors that can occur while fetching or parsing a GTFS feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error fetching feed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed server returned an error status
    #[error("feed server returned {status}")]
    Status { status: u16 },

    /// Local feed file or directory could not be read
    #[error("feed unavailable: {message}")]
    Unavailable { message: String },

    /// Payload is not a readable zip archive
    #[error("invalid feed archive: {message}")]
    Archive { message: String },

    /// A required table is absent from the feed
    #[error("feed is missing required table {0}")]
    MissingTable(&'static str),

    /// A table row could not be parsed
    #[error("failed to parse {file}: {message}")]
    Parse { file: &'static str, message: String },

    /// On-disk archive cache operation failed
    #[error("feed cache error: {message}")]
    Cache { message: String },
}

impl FeedError {
    pub(crate) fn parse(file: &'static str, message: impl ToString) -> Self {
        FeedError::Parse {
            file,
            message: message.to_string(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> FeedErrorKind {
        match self {
            FeedError::Http(_)
            | FeedError::Status { .. }
            | FeedError::Unavailable { .. }
            | FeedError::Cache { .. } => FeedErrorKind::Unavailable,
            FeedError::Archive { .. } | FeedError::MissingTable(_) | FeedError::Parse { .. } => {
                FeedErrorKind::Malformed
            }
        }
    }
}
