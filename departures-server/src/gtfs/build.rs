//! Conversion from GTFS rows to the feed snapshot.
//!
//! This module validates raw [`records`](super::records) and turns them
//! into domain types. Malformed values (bad times, dates, empty IDs) fail
//! the whole load; rows that merely reference something the feed doesn't
//! define are dropped and counted.

use std::collections::HashMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::domain::{
    Direction, GtfsTime, LocationType, Pickup, Route, RouteId, ServiceCalendar, ServiceId, Stop,
    StopId, StopTime, Trip, TripId, WeeklyPattern,
};

use super::error::FeedError;
use super::records::{
    AgencyRecord, CalendarDateRecord, CalendarRecord, RouteRecord, StopRecord, StopTimeRecord,
    TripRecord,
};
use super::source::TableSource;
use super::tables::FeedTables;

const AGENCY: &str = "agency.txt";
const STOPS: &str = "stops.txt";
const ROUTES: &str = "routes.txt";
const TRIPS: &str = "trips.txt";
const STOP_TIMES: &str = "stop_times.txt";
const CALENDAR: &str = "calendar.txt";
const CALENDAR_DATES: &str = "calendar_dates.txt";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read and validate every table from `source`.
///
/// `default_timezone` is used when `agency.txt` is absent or names no
/// timezone.
pub fn build_tables(
    source: &mut impl TableSource,
    default_timezone: Tz,
) -> Result<FeedTables, FeedError> {
    let agencies: Vec<AgencyRecord> = read_records(source, AGENCY)?.unwrap_or_default();
    let timezone = feed_timezone(&agencies, default_timezone)?;

    let stops = convert_stops(require(source, STOPS)?)?;
    let routes = convert_routes(require(source, ROUTES)?)?;

    let calendar: Option<Vec<CalendarRecord>> = read_records(source, CALENDAR)?;
    let calendar_dates: Option<Vec<CalendarDateRecord>> = read_records(source, CALENDAR_DATES)?;
    if calendar.is_none() && calendar_dates.is_none() {
        return Err(FeedError::MissingTable("calendar.txt or calendar_dates.txt"));
    }
    let calendars = convert_calendars(
        calendar.unwrap_or_default(),
        calendar_dates.unwrap_or_default(),
    )?;

    let trips = convert_trips(require(source, TRIPS)?, &routes)?;
    let stop_times = convert_stop_times(require(source, STOP_TIMES)?, &trips, &stops)?;

    let feed = FeedTables::assemble(timezone, stops, routes, trips, calendars, stop_times);

    info!(
        agency = agencies.first().and_then(|a| a.agency_name.as_deref()).unwrap_or("unknown"),
        timezone = %timezone,
        stops = feed.stop_count(),
        trips = feed.trip_count(),
        stop_times = feed.stop_time_count(),
        "built feed tables"
    );

    Ok(feed)
}

/// Deserialize every row of a table, or `None` if the table is absent.
fn read_records<T: DeserializeOwned>(
    source: &mut impl TableSource,
    file: &'static str,
) -> Result<Option<Vec<T>>, FeedError> {
    let Some(bytes) = source.read_table(file)? else {
        return Ok(None);
    };
    let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    reader
        .deserialize()
        .map(|row| row.map_err(|e| FeedError::parse(file, e)))
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
}

/// Like [`read_records`], but the table must be present.
fn require<T: DeserializeOwned>(
    source: &mut impl TableSource,
    file: &'static str,
) -> Result<Vec<T>, FeedError> {
    read_records(source, file)?.ok_or(FeedError::MissingTable(file))
}

fn feed_timezone(agencies: &[AgencyRecord], default: Tz) -> Result<Tz, FeedError> {
    let named = agencies
        .iter()
        .filter_map(|a| a.agency_timezone.as_deref())
        .find(|tz| !tz.is_empty());

    match named {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| FeedError::parse(AGENCY, format!("unknown timezone {name:?}"))),
        None => Ok(default),
    }
}

fn parse_date(file: &'static str, s: &str) -> Result<NaiveDate, FeedError> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| FeedError::parse(file, format!("invalid date {s:?}: {e}")))
}

fn parse_time(s: Option<&str>) -> Result<Option<GtfsTime>, FeedError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => GtfsTime::parse(s)
            .map(Some)
            .map_err(|e| FeedError::parse(STOP_TIMES, format!("{s:?}: {e}"))),
    }
}

fn convert_stops(records: Vec<StopRecord>) -> Result<HashMap<StopId, Stop>, FeedError> {
    let mut stops = HashMap::with_capacity(records.len());
    let mut duplicates = 0usize;
    for r in records {
        let id = StopId::new(r.stop_id).map_err(|e| FeedError::parse(STOPS, e))?;
        let parent_station = r
            .parent_station
            .filter(|p| !p.trim().is_empty())
            .map(StopId::new)
            .transpose()
            .map_err(|e| FeedError::parse(STOPS, e))?;

        let stop = Stop {
            id: id.clone(),
            name: r.stop_name.unwrap_or_default(),
            lat: r.stop_lat,
            lon: r.stop_lon,
            location_type: LocationType::from_code(r.location_type),
            parent_station,
        };
        if stops.insert(id, stop).is_some() {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(count = duplicates, "duplicate stop_id rows, keeping the last");
    }
    Ok(stops)
}

fn convert_routes(records: Vec<RouteRecord>) -> Result<HashMap<RouteId, Route>, FeedError> {
    let mut routes = HashMap::with_capacity(records.len());
    let mut duplicates = 0usize;
    for r in records {
        let id = RouteId::new(r.route_id).map_err(|e| FeedError::parse(ROUTES, e))?;
        let route = Route {
            id: id.clone(),
            short_name: r.route_short_name,
            long_name: r.route_long_name,
        };
        if routes.insert(id, route).is_some() {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(count = duplicates, "duplicate route_id rows, keeping the last");
    }
    Ok(routes)
}

fn convert_calendars(
    calendar: Vec<CalendarRecord>,
    calendar_dates: Vec<CalendarDateRecord>,
) -> Result<HashMap<ServiceId, ServiceCalendar>, FeedError> {
    let mut calendars: HashMap<ServiceId, ServiceCalendar> = HashMap::new();

    for r in calendar {
        let id = ServiceId::new(r.service_id).map_err(|e| FeedError::parse(CALENDAR, e))?;
        let weekly = WeeklyPattern {
            days: [
                r.monday == 1,
                r.tuesday == 1,
                r.wednesday == 1,
                r.thursday == 1,
                r.friday == 1,
                r.saturday == 1,
                r.sunday == 1,
            ],
            start_date: parse_date(CALENDAR, &r.start_date)?,
            end_date: parse_date(CALENDAR, &r.end_date)?,
        };
        calendars
            .entry(id.clone())
            .or_insert_with(|| ServiceCalendar::new(id))
            .weekly = Some(weekly);
    }

    for r in calendar_dates {
        let id = ServiceId::new(r.service_id).map_err(|e| FeedError::parse(CALENDAR_DATES, e))?;
        let date = parse_date(CALENDAR_DATES, &r.date)?;
        let cal = calendars
            .entry(id.clone())
            .or_insert_with(|| ServiceCalendar::new(id));

        match r.exception_type {
            1 => {
                cal.added.insert(date);
            }
            2 => {
                cal.removed.insert(date);
            }
            other => {
                return Err(FeedError::parse(
                    CALENDAR_DATES,
                    format!("invalid exception_type {other}"),
                ));
            }
        }
    }

    Ok(calendars)
}

fn convert_trips(
    records: Vec<TripRecord>,
    routes: &HashMap<RouteId, Route>,
) -> Result<HashMap<TripId, Trip>, FeedError> {
    let mut trips = HashMap::with_capacity(records.len());
    let mut unknown_route = 0usize;
    let mut duplicates = 0usize;

    for r in records {
        let route_id = RouteId::new(r.route_id).map_err(|e| FeedError::parse(TRIPS, e))?;
        if !routes.contains_key(&route_id) {
            unknown_route += 1;
            continue;
        }

        let id = TripId::new(r.trip_id).map_err(|e| FeedError::parse(TRIPS, e))?;
        let trip = Trip {
            id: id.clone(),
            route_id,
            service_id: ServiceId::new(r.service_id).map_err(|e| FeedError::parse(TRIPS, e))?,
            headsign: r.trip_headsign.filter(|h| !h.is_empty()),
            direction: Direction::from_code(r.direction_id),
            stop_times: 0..0,
        };
        if trips.insert(id, trip).is_some() {
            duplicates += 1;
        }
    }

    if unknown_route > 0 {
        warn!(count = unknown_route, "dropped trips referencing unknown routes");
    }
    if duplicates > 0 {
        warn!(count = duplicates, "duplicate trip_id rows, keeping the last");
    }

    Ok(trips)
}

fn convert_stop_times(
    records: Vec<StopTimeRecord>,
    trips: &HashMap<TripId, Trip>,
    stops: &HashMap<StopId, Stop>,
) -> Result<Vec<StopTime>, FeedError> {
    let mut stop_times = Vec::with_capacity(records.len());
    let mut unknown_trip = 0usize;
    let mut unknown_stop = 0usize;

    for r in records {
        if !trips.contains_key(r.trip_id.trim()) {
            unknown_trip += 1;
            continue;
        }
        if !stops.contains_key(r.stop_id.trim()) {
            unknown_stop += 1;
            continue;
        }

        stop_times.push(StopTime {
            trip_id: TripId::new(r.trip_id).map_err(|e| FeedError::parse(STOP_TIMES, e))?,
            stop_id: StopId::new(r.stop_id).map_err(|e| FeedError::parse(STOP_TIMES, e))?,
            arrival: parse_time(r.arrival_time.as_deref())?,
            departure: parse_time(r.departure_time.as_deref())?,
            stop_sequence: r.stop_sequence,
            pickup: Pickup::from_code(r.pickup_type),
        });
    }

    if unknown_trip > 0 {
        warn!(count = unknown_trip, "dropped stop times referencing unknown trips");
    }
    if unknown_stop > 0 {
        warn!(count = unknown_stop, "dropped stop times referencing unknown stops");
    }

    Ok(stop_times)
}
