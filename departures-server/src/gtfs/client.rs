//! HTTP client for the feed publisher.

use std::time::Duration;

use super::error::FeedError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Downloads feed archives.
///
/// The publisher is an opaque static file host; all we need is the body of
/// a GET, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
}

impl FeedClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { http })
    }

    /// Fetch the archive at `url`.
    ///
    /// Non-success statuses are reported as [`FeedError::Status`]; network
    /// failures and timeouts as [`FeedError::Http`].
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
