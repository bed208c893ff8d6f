//! Shared fixtures for tests that need a feed.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Europe::London;
use zip::write::SimpleFileOptions;

use super::build::build_tables;
use super::error::FeedError;
use super::source::TableSource;
use super::tables::FeedTables;

/// A small Southampton-flavoured feed.
///
/// - `VW` is a station with child stops `1980SN12619E` and `1980HAA13371`.
/// - `WK` runs weekdays in August 2025, except the 25th (bank holiday).
/// - `SAT` runs Saturdays in August 2025, plus Saturday 6 September.
/// - `T2` leaves `1980SN12619E` at 25:10:00, i.e. 01:10 the next morning.
/// - `T1` drops off only at `PORTSWOOD`.
pub const SAMPLE_FEED: &[(&str, &str)] = &[
    (
        "agency.txt",
        "agency_id,agency_name,agency_url,agency_timezone\n\
         BLUESTAR,Bluestar,https://www.bluestarbus.co.uk,Europe/London\n",
    ),
    (
        "stops.txt",
        "stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station\n\
         VW,Vincent's Walk,50.9036,-1.4036,1,\n\
         1980SN12619E,Vincent's Walk [CK],50.9034,-1.4040,0,VW\n\
         1980HAA13371,Vincent's Walk [CM],50.9038,-1.4032,0,VW\n\
         PORTSWOOD,Portswood Broadway,50.9230,-1.3940,,\n",
    ),
    (
        "routes.txt",
        "route_id,agency_id,route_short_name,route_long_name,route_type\n\
         R1,BLUESTAR,1,City Centre - Winchester,3\n\
         R4,BLUESTAR,,Portswood Circular,3\n",
    ),
    (
        "calendar.txt",
        "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
         WK,1,1,1,1,1,0,0,20250801,20250831\n\
         SAT,0,0,0,0,0,1,0,20250801,20250831\n",
    ),
    (
        "calendar_dates.txt",
        "service_id,date,exception_type\n\
         WK,20250825,2\n\
         SAT,20250906,1\n",
    ),
    (
        "trips.txt",
        "route_id,service_id,trip_id,trip_headsign,direction_id\n\
         R1,WK,T1,Winchester,0\n\
         R1,WK,T2,,0\n\
         R4,WK,T3,Portswood,1\n\
         R1,SAT,T4,Winchester,0\n",
    ),
    (
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence,pickup_type\n\
         T1,08:14:00,08:15:00,1980SN12619E,1,0\n\
         T1,08:17:00,08:17:00,1980HAA13371,2,0\n\
         T1,08:30:00,08:30:00,PORTSWOOD,3,1\n\
         T2,25:09:00,25:10:00,1980SN12619E,1,\n\
         T3,08:15:00,08:15:00,1980SN12619E,1,\n\
         T3,08:40:00,08:40:00,PORTSWOOD,2,\n\
         T4,10:00:00,10:00:00,PORTSWOOD,1,\n",
    ),
];

/// Tables held in memory, keyed by file name.
pub struct MemoryTables {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryTables {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, body)| (name.to_string(), body.as_bytes().to_vec()))
                .collect(),
        }
    }
}

impl TableSource for MemoryTables {
    fn read_table(&mut self, name: &'static str) -> Result<Option<Vec<u8>>, FeedError> {
        Ok(self.files.get(name).cloned())
    }
}

/// Build a feed from in-memory tables, defaulting to Europe/London.
pub fn feed_from(files: &[(&str, &str)]) -> FeedTables {
    build_tables(&mut MemoryTables::new(files), London).unwrap()
}

/// Copy of `files` with one table's contents replaced (or added).
pub fn replace_table<'a>(
    files: &[(&'a str, &'a str)],
    name: &'a str,
    body: &'a str,
) -> Vec<(&'a str, &'a str)> {
    let mut out = without_table(files, name);
    out.push((name, body));
    out
}

/// Copy of `files` without the named table.
pub fn without_table<'a>(files: &[(&'a str, &'a str)], name: &str) -> Vec<(&'a str, &'a str)> {
    files.iter().filter(|(n, _)| *n != name).copied().collect()
}

/// Zip the given files into an in-memory archive.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in files {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write the given files into `dir` as an extracted feed.
pub fn write_dir(dir: &std::path::Path, files: &[(&str, &str)]) {
    for (name, body) in files {
        std::fs::write(dir.join(name), body).unwrap();
    }
}

/// A wall-clock time in Southampton, as a UTC instant.
pub fn london(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    London
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// A local stand-in for the feed publisher.
///
/// Serves one configurable response at `/gtfs.zip` and counts requests.
pub struct StubPublisher {
    pub url: String,
    state: StubState,
}

#[derive(Clone)]
struct StubState {
    hits: Arc<AtomicUsize>,
    response: Arc<Mutex<(StatusCode, Vec<u8>)>>,
    delay: Duration,
}

impl StubPublisher {
    pub async fn start(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    /// Like [`StubPublisher::start`], but every response is held back by `delay`.
    pub async fn start_with_delay(status: u16, body: impl Into<Vec<u8>>, delay: Duration) -> Self {
        let state = StubState {
            hits: Arc::new(AtomicUsize::new(0)),
            response: Arc::new(Mutex::new((
                StatusCode::from_u16(status).unwrap(),
                body.into(),
            ))),
            delay,
        };

        let app = Router::new()
            .route("/gtfs.zip", get(serve_archive))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/gtfs.zip"),
            state,
        }
    }

    /// Change what subsequent requests receive.
    pub fn respond_with(&self, status: u16, body: impl Into<Vec<u8>>) {
        *self.state.response.lock().unwrap() = (StatusCode::from_u16(status).unwrap(), body.into());
    }

    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_archive(State(state): State<StubState>) -> (StatusCode, Vec<u8>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;
    let response = state.response.lock().unwrap().clone();
    response
}
