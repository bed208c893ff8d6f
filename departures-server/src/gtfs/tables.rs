//! The in-memory feed snapshot.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::domain::{
    GtfsTime, LocationType, Route, RouteId, ServiceCalendar, ServiceId, Stop, StopId, StopTime,
    Trip, TripId,
};

/// All tables of one loaded feed, plus the lookup indexes built over them.
///
/// A `FeedTables` is built once per refresh and never mutated afterwards;
/// request handlers share it behind an `Arc`.
#[derive(Debug)]
pub struct FeedTables {
    timezone: Tz,
    stops: HashMap<StopId, Stop>,
    routes: HashMap<RouteId, Route>,
    trips: HashMap<TripId, Trip>,
    calendars: HashMap<ServiceId, ServiceCalendar>,

    /// Sorted by (trip_id, stop_sequence) so each trip is a contiguous run.
    stop_times: Vec<StopTime>,

    /// Stop → indexes into `stop_times`.
    by_stop: HashMap<StopId, Vec<usize>>,

    /// Station → its child stops.
    children: HashMap<StopId, Vec<StopId>>,

    latest_time: Option<GtfsTime>,
    service_span: Option<(NaiveDate, NaiveDate)>,
    loaded_at: DateTime<Utc>,
}

impl FeedTables {
    /// Assemble the snapshot and build its indexes.
    ///
    /// Callers are expected to have dropped rows with dangling references
    /// already; `trips` are given their stop-time ranges here.
    pub(crate) fn assemble(
        timezone: Tz,
        stops: HashMap<StopId, Stop>,
        routes: HashMap<RouteId, Route>,
        mut trips: HashMap<TripId, Trip>,
        calendars: HashMap<ServiceId, ServiceCalendar>,
        mut stop_times: Vec<StopTime>,
    ) -> Self {
        stop_times.sort_by(|a, b| {
            a.trip_id
                .cmp(&b.trip_id)
                .then(a.stop_sequence.cmp(&b.stop_sequence))
        });

        let mut start = 0;
        while start < stop_times.len() {
            let trip_id = &stop_times[start].trip_id;
            let end = stop_times[start..]
                .iter()
                .position(|st| &st.trip_id != trip_id)
                .map_or(stop_times.len(), |n| start + n);
            if let Some(trip) = trips.get_mut(trip_id) {
                trip.stop_times = start..end;
            }
            start = end;
        }

        let mut by_stop: HashMap<StopId, Vec<usize>> = HashMap::new();
        for (idx, st) in stop_times.iter().enumerate() {
            by_stop.entry(st.stop_id.clone()).or_default().push(idx);
        }

        let mut children: HashMap<StopId, Vec<StopId>> = HashMap::new();
        for stop in stops.values() {
            if let Some(parent) = &stop.parent_station {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(stop.id.clone());
            }
        }
        for kids in children.values_mut() {
            kids.sort();
        }

        let latest_time = stop_times.iter().filter_map(StopTime::departure_time).max();

        let service_span = calendars
            .values()
            .filter_map(ServiceCalendar::span)
            .reduce(|(a_start, a_end), (b_start, b_end)| (a_start.min(b_start), a_end.max(b_end)));

        Self {
            timezone,
            stops,
            routes,
            trips,
            calendars,
            stop_times,
            by_stop,
            children,
            latest_time,
            service_span,
            loaded_at: Utc::now(),
        }
    }

    /// Timezone the feed's times are expressed in.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// When this snapshot was built.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn stop(&self, id: &str) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn trip(&self, id: &TripId) -> Option<&Trip> {
        self.trips.get(id)
    }

    pub fn calendar(&self, id: &ServiceId) -> Option<&ServiceCalendar> {
        self.calendars.get(id)
    }

    /// Stop times at exactly this stop, in no particular order.
    pub fn stop_times_at(&self, stop_id: &str) -> impl Iterator<Item = &StopTime> {
        self.by_stop
            .get(stop_id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.stop_times[idx])
    }

    /// A trip's stop times, ordered by stop sequence.
    pub fn trip_stop_times(&self, trip: &Trip) -> &[StopTime] {
        self.stop_times.get(trip.stop_times.clone()).unwrap_or(&[])
    }

    /// The stop itself followed by its child stops, if it is a station.
    pub fn served_stops<'a>(&'a self, stop: &'a Stop) -> Vec<&'a StopId> {
        let mut ids = vec![&stop.id];
        if let Some(kids) = self.children.get(stop.id.as_str()) {
            ids.extend(kids.iter());
        }
        ids
    }

    /// Case-insensitive substring search on stop names.
    ///
    /// Entrances and other non-boarding locations are skipped. Results are
    /// ordered by name, then ID.
    pub fn search_stops(&self, query: &str, limit: usize) -> Vec<&Stop> {
        let needle = query.trim().to_lowercase();
        let mut matches: Vec<&Stop> = self
            .stops
            .values()
            .filter(|s| s.location_type != LocationType::Other)
            .filter(|s| s.name_matches(&needle))
            .collect();

        matches.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(limit);
        matches
    }

    /// Whole days past its service date the latest stop time reaches.
    pub fn max_days_spanned(&self) -> u32 {
        self.latest_time.map_or(0, |t| t.days_spanned())
    }

    /// First and last date any service could run on.
    pub fn service_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.service_span
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn stop_time_count(&self) -> usize {
        self.stop_times.len()
    }
}
