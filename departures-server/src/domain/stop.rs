//! Stops and stations.

use super::StopId;

/// The `location_type` of a stop.
///
/// Entrances, generic nodes and boarding areas never have departures, so
/// they are folded into [`LocationType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationType {
    /// A stop or platform (location_type 0 or empty).
    #[default]
    Stop,

    /// A station containing child stops (location_type 1).
    Station,

    /// Entrance, generic node or boarding area (location_type 2-4).
    Other,
}

impl LocationType {
    /// Map a raw GTFS `location_type` value.
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            None | Some(0) => LocationType::Stop,
            Some(1) => LocationType::Station,
            Some(_) => LocationType::Other,
        }
    }
}

/// A physical location where passengers board or alight.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,

    pub name: String,

    /// Latitude in WGS84 degrees.
    pub lat: Option<f64>,

    /// Longitude in WGS84 degrees.
    pub lon: Option<f64>,

    pub location_type: LocationType,

    /// Station this stop belongs to, if any.
    pub parent_station: Option<StopId>,
}

impl Stop {
    /// Create a plain boarding stop with no coordinates or parent.
    pub fn new(id: StopId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            lat: None,
            lon: None,
            location_type: LocationType::Stop,
            parent_station: None,
        }
    }

    /// Whether the stop's name contains `needle_lower` (already lowercased).
    pub fn name_matches(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
    }
}
