//! Domain types for the departures server.
//!
//! This module contains the validated, read-only model of a GTFS static
//! feed. All types enforce their invariants at construction time, so code
//! that receives these types can trust their validity.

mod calendar;
mod ids;
mod stop;
mod time;
mod trip;

pub use calendar::{ServiceCalendar, WeeklyPattern};
pub use ids::{InvalidId, RouteId, ServiceId, StopId, TripId};
pub use stop::{LocationType, Stop};
pub use time::{GtfsTime, TimeError};
pub use trip::{Direction, Pickup, Route, StopTime, Trip};
