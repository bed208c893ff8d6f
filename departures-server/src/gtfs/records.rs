//! GTFS table row DTOs.
//!
//! These types map directly to rows of the GTFS static text files. They use
//! `Option` liberally because optional GTFS columns are routinely left out
//! of the header entirely, and empty cells are common even in required
//! columns of real feeds. Validation happens when they are converted into
//! domain types.

use serde::Deserialize;

/// A row of `agency.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgencyRecord {
    pub agency_name: Option<String>,

    /// IANA timezone name, e.g. "Europe/London".
    pub agency_timezone: Option<String>,
}

/// A row of `stops.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopRecord {
    pub stop_id: String,

    pub stop_name: Option<String>,

    pub stop_lat: Option<f64>,

    pub stop_lon: Option<f64>,

    /// 0/empty = stop, 1 = station, 2-4 = entrances, nodes, boarding areas.
    pub location_type: Option<u8>,

    pub parent_station: Option<String>,
}

/// A row of `routes.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub route_id: String,

    pub route_short_name: Option<String>,

    pub route_long_name: Option<String>,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct TripRecord {
    pub route_id: String,

    pub service_id: String,

    pub trip_id: String,

    pub trip_headsign: Option<String>,

    /// 0 = outbound, 1 = inbound.
    pub direction_id: Option<u8>,
}

/// A row of `stop_times.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopTimeRecord {
    pub trip_id: String,

    /// `H:MM:SS`, may exceed 24:00:00. Empty for non-timepoints.
    pub arrival_time: Option<String>,

    /// `H:MM:SS`, may exceed 24:00:00. Empty for non-timepoints.
    pub departure_time: Option<String>,

    pub stop_id: String,

    pub stop_sequence: u32,

    /// 0/empty = regular, 1 = none, 2 = phone agency, 3 = ask driver.
    pub pickup_type: Option<u8>,
}

/// A row of `calendar.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarRecord {
    pub service_id: String,
    pub monday: u8,
    pub tuesday: u8,
    pub wednesday: u8,
    pub thursday: u8,
    pub friday: u8,
    pub saturday: u8,
    pub sunday: u8,

    /// `YYYYMMDD`.
    pub start_date: String,

    /// `YYYYMMDD`.
    pub end_date: String,
}

/// A row of `calendar_dates.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarDateRecord {
    pub service_id: String,

    /// `YYYYMMDD`.
    pub date: String,

    /// 1 = service added, 2 = service removed.
    pub exception_type: u8,
}
