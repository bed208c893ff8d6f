//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::departures::Departure;
use crate::domain::{Direction, Stop};

/// Query string for `/next_departures/{stop_id}`.
///
/// `minutes` is kept as text so a malformed value gets our JSON error body
/// rather than the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct DeparturesQuery {
    /// Look-ahead window in minutes (defaults to 60)
    pub minutes: Option<String>,
}

/// A departure in `/next_departures` results.
#[derive(Debug, Serialize)]
pub struct DepartureResult {
    pub trip_id: String,

    /// Route label (e.g., "1")
    pub route: String,

    /// Destination shown on the vehicle
    pub headsign: Option<String>,

    /// GTFS `direction_id` (0 or 1)
    pub direction_id: Option<u8>,

    /// Stop the departure leaves from
    pub stop_id: String,

    /// RFC 3339 timestamp with the feed's local offset
    pub departs_at: String,

    /// Whole minutes until departure
    pub minutes_until: i64,
}

impl DepartureResult {
    pub fn from_departure(d: &Departure) -> Self {
        Self {
            trip_id: d.trip_id.to_string(),
            route: d.route.clone(),
            headsign: d.headsign.clone(),
            direction_id: d.direction.map(|dir| match dir {
                Direction::Outbound => 0,
                Direction::Inbound => 1,
            }),
            stop_id: d.stop_id.to_string(),
            departs_at: d.departs_at.to_rfc3339(),
            minutes_until: d.minutes_until,
        }
    }
}

/// Response from `/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Whether a feed snapshot is currently loaded
    pub feed_loaded: bool,

    /// When the current snapshot was loaded (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,

    /// Why the most recent load failed, until a load succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Query string for `/stops`.
#[derive(Debug, Default, Deserialize)]
pub struct StopSearchRequest {
    /// Search query (matched against stop names)
    pub q: Option<String>,

    /// Maximum results (default 10, max 50)
    pub limit: Option<String>,
}

/// Response from `/stops`.
#[derive(Debug, Serialize)]
pub struct StopSearchResponse {
    pub stops: Vec<StopSearchResult>,
}

/// A single stop search result.
#[derive(Debug, Serialize)]
pub struct StopSearchResult {
    pub stop_id: String,
    pub name: String,
}

impl StopSearchResult {
    pub fn from_stop(stop: &Stop) -> Self {
        Self {
            stop_id: stop.id.to_string(),
            name: stop.name.clone(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Machine-readable error code
    pub code: &'static str,
}
