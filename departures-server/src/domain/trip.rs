//! Routes, trips and stop times.

use std::ops::Range;

use super::{GtfsTime, RouteId, ServiceId, StopId, TripId};

/// A route: the line a passenger would recognise ("1", "Bluestar 4").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

impl Route {
    /// Label shown to riders: short name, else long name, else the ID.
    pub fn label(&self) -> &str {
        non_blank(self.short_name.as_deref())
            .or_else(|| non_blank(self.long_name.as_deref()))
            .unwrap_or_else(|| self.id.as_str())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Travel direction of a trip (`direction_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    /// Map a raw GTFS `direction_id` value. Anything but 0/1 is unknown.
    pub fn from_code(code: Option<u8>) -> Option<Self> {
        match code {
            Some(0) => Some(Direction::Outbound),
            Some(1) => Some(Direction::Inbound),
            _ => None,
        }
    }
}

/// Whether passengers may board at a stop time (`pickup_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pickup {
    /// Regularly scheduled pickup (0 or empty).
    #[default]
    Regular,

    /// No pickup available (1).
    None,

    /// Phone agency or coordinate with driver (2, 3).
    OnRequest,
}

impl Pickup {
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(1) => Pickup::None,
            Some(2) | Some(3) => Pickup::OnRequest,
            _ => Pickup::Regular,
        }
    }
}

/// One scheduled visit of a trip to a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub arrival: Option<GtfsTime>,
    pub departure: Option<GtfsTime>,
    pub stop_sequence: u32,
    pub pickup: Pickup,
}

impl StopTime {
    /// Scheduled departure, falling back to arrival for stops that only
    /// publish one of the two.
    pub fn departure_time(&self) -> Option<GtfsTime> {
        self.departure.or(self.arrival)
    }

    /// Whether riders can board here.
    pub fn allows_boarding(&self) -> bool {
        self.pickup != Pickup::None
    }
}

/// One scheduled run of a vehicle along a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
    pub service_id: ServiceId,

    /// Destination text shown on the vehicle.
    pub headsign: Option<String>,

    pub direction: Option<Direction>,

    /// This trip's entries in the feed's stop-time table, ordered by
    /// `stop_sequence`.
    pub stop_times: Range<usize>,
}
