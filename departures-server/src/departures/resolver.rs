//! Scheduled departures from a stop within a time window.

use chrono::{DateTime, Days, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::domain::{Direction, Route, StopId, StopTime, Trip, TripId};
use crate::gtfs::FeedTables;

/// Errors from departure resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No stop with this ID exists in the feed
    #[error("unknown stop: {0}")]
    StopNotFound(String),

    /// Window is non-positive or too large to represent
    #[error("window must be a positive number of minutes, got {0}")]
    InvalidWindow(i64),
}

/// One upcoming departure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub trip_id: TripId,

    /// Route label riders recognise.
    pub route: String,

    /// Destination text; falls back to the name of the trip's last stop.
    pub headsign: Option<String>,

    pub direction: Option<Direction>,

    /// Stop the vehicle departs from. Differs from the queried stop when
    /// the query named a station.
    pub stop_id: StopId,

    pub stop_sequence: u32,

    /// Scheduled departure in the feed's timezone.
    pub departs_at: DateTime<Tz>,

    /// Whole minutes from the query time, rounded down.
    pub minutes_until: i64,
}

/// Departures from `stop_id` in `[now, now + window_minutes)`.
///
/// Departures at a station's child stops are included. Stop times that
/// don't allow boarding are skipped. Results are ordered by departure
/// time, then trip ID, then stop sequence.
///
/// The stop is looked up before the window is checked, so an unknown
/// stop is always [`ResolveError::StopNotFound`].
pub fn next_departures(
    feed: &FeedTables,
    stop_id: &str,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Departure>, ResolveError> {
    let stop = feed
        .stop(stop_id)
        .ok_or_else(|| ResolveError::StopNotFound(stop_id.to_string()))?;

    if window_minutes <= 0 {
        return Err(ResolveError::InvalidWindow(window_minutes));
    }
    let end = TimeDelta::try_minutes(window_minutes)
        .and_then(|window| now.checked_add_signed(window))
        .ok_or(ResolveError::InvalidWindow(window_minutes))?;

    let tz = feed.timezone();
    let dates = candidate_dates(feed, now, end, tz);
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let mut departures = Vec::new();
    for served in feed.served_stops(stop) {
        for stop_time in feed.stop_times_at(served.as_str()) {
            if !stop_time.allows_boarding() {
                continue;
            }
            let Some(time) = stop_time.departure_time() else {
                continue;
            };
            let Some(trip) = feed.trip(&stop_time.trip_id) else {
                continue;
            };
            let Some(calendar) = feed.calendar(&trip.service_id) else {
                continue;
            };

            for &date in &dates {
                if !calendar.is_active(date) {
                    continue;
                }
                let Some(departs_at) = time.on_service_date(date, &tz) else {
                    continue;
                };
                let instant = departs_at.with_timezone(&Utc);
                if instant < now || instant >= end {
                    continue;
                }
                departures.push(departure(feed, trip, stop_time, departs_at, now));
            }
        }
    }

    departures.sort_by(|a, b| {
        a.departs_at
            .cmp(&b.departs_at)
            .then_with(|| a.trip_id.cmp(&b.trip_id))
            .then_with(|| a.stop_sequence.cmp(&b.stop_sequence))
    });

    Ok(departures)
}

/// Service dates whose trips could depart in `[now, end)`.
///
/// A stop time can reach `max_days_spanned` days past its service date,
/// so the range starts that many days before today. It ends a day after
/// the window's last local date: on a spring-forward day the reference
/// point is 23:00 the evening before. The range is clamped to the dates
/// the feed has any service on.
fn candidate_dates(
    feed: &FeedTables,
    now: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Vec<NaiveDate> {
    let Some((span_start, span_end)) = feed.service_span() else {
        return Vec::new();
    };

    let today = now.with_timezone(&tz).date_naive();
    let first = today
        .checked_sub_days(Days::new(u64::from(feed.max_days_spanned())))
        .unwrap_or(today)
        .max(span_start);

    let last_day = end.with_timezone(&tz).date_naive();
    let last = last_day
        .checked_add_days(Days::new(1))
        .unwrap_or(last_day)
        .min(span_end);

    first.iter_days().take_while(|d| *d <= last).collect()
}

fn departure(
    feed: &FeedTables,
    trip: &Trip,
    stop_time: &StopTime,
    departs_at: DateTime<Tz>,
    now: DateTime<Utc>,
) -> Departure {
    let route = feed
        .route(&trip.route_id)
        .map(Route::label)
        .unwrap_or_else(|| trip.route_id.as_str())
        .to_string();

    let headsign = trip
        .headsign
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| {
            feed.trip_stop_times(trip)
                .last()
                .and_then(|last| feed.stop(last.stop_id.as_str()))
                .map(|s| s.name.clone())
        });

    Departure {
        trip_id: trip.id.clone(),
        route,
        headsign,
        direction: trip.direction,
        stop_id: stop_time.stop_id.clone(),
        stop_sequence: stop_time.stop_sequence,
        departs_at,
        minutes_until: (departs_at.with_timezone(&Utc) - now).num_minutes(),
    }
}
