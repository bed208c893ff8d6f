//! GTFS time-of-day handling.
//!
//! GTFS stop times are written as `H:MM:SS` or `HH:MM:SS` and are measured
//! from "noon minus 12 hours" on the service date. Trips that run past
//! midnight keep counting upwards, so `25:10:00` is a valid time meaning
//! 01:10 on the following calendar day. This module keeps those values
//! intact and only turns them into absolute timestamps once a service date
//! and timezone are known.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone};
use std::fmt;

/// Seconds in a calendar day.
const SECS_PER_DAY: u32 = 24 * 60 * 60;

/// Offset from noon back to the GTFS reference point.
const TWELVE_HOURS_SECS: i64 = 12 * 60 * 60;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A GTFS time of day, possibly beyond 24:00:00.
///
/// Stored as seconds since the service day's reference point. Ordering is
/// by that offset, so `24:05:00` sorts after `23:59:59`.
///
/// # Examples
///
/// ```
/// use departures_server::domain::GtfsTime;
///
/// let t = GtfsTime::parse("25:10:00").unwrap();
/// assert_eq!(t.to_string(), "25:10:00");
/// assert_eq!(t.days_spanned(), 1);
///
/// // Single-digit hours are allowed
/// assert_eq!(GtfsTime::parse("8:15:00").unwrap().to_string(), "08:15:00");
///
/// // Minutes and seconds must be in range
/// assert!(GtfsTime::parse("08:60:00").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GtfsTime(u32);

impl GtfsTime {
    /// Build a time from its components.
    ///
    /// Returns `None` if minutes or seconds are out of range.
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Option<Self> {
        if minutes > 59 || seconds > 59 {
            return None;
        }
        let total = hours
            .checked_mul(3600)?
            .checked_add(minutes * 60 + seconds)?;
        Some(Self(total))
    }

    /// Parse a time from `H:MM:SS` or `HH:MM:SS` format.
    ///
    /// Surrounding whitespace is ignored. Hours may exceed 23.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let s = s.trim();
        let mut parts = s.split(':');

        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected H:MM:SS format"));
        };

        if h.is_empty() || h.len() > 2 {
            return Err(TimeError::new("hour must be 1 or 2 digits"));
        }
        let hours = parse_digits(h).ok_or_else(|| TimeError::new("invalid hour digits"))?;

        if m.len() != 2 {
            return Err(TimeError::new("minute must be 2 digits"));
        }
        let minutes = parse_digits(m).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        if sec.len() != 2 {
            return Err(TimeError::new("second must be 2 digits"));
        }
        let seconds = parse_digits(sec).ok_or_else(|| TimeError::new("invalid second digits"))?;
        if seconds > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Self::from_hms(hours, minutes, seconds).ok_or_else(|| TimeError::new("time overflow"))
    }

    /// Seconds since the service day's reference point.
    pub fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Hours component (may be 24 or more).
    pub fn hours(&self) -> u32 {
        self.0 / 3600
    }

    /// Minutes component (0-59).
    pub fn minutes(&self) -> u32 {
        (self.0 / 60) % 60
    }

    /// Seconds component (0-59).
    pub fn seconds(&self) -> u32 {
        self.0 % 60
    }

    /// Number of whole days past the service date this time reaches.
    ///
    /// `08:00:00` spans 0 days, `25:10:00` spans 1.
    pub fn days_spanned(&self) -> u32 {
        self.0 / SECS_PER_DAY
    }

    /// Resolve this time against a service date in the given timezone.
    ///
    /// The result is "noon minus 12 hours" on `service_date` plus this
    /// offset, which is midnight on every day without a DST change and
    /// keeps the elapsed-time semantics on the days that have one.
    ///
    /// Returns `None` if the date cannot be represented in `tz`.
    ///
    /// # Examples
    ///
    /// ```
    /// use departures_server::domain::GtfsTime;
    /// use chrono::{NaiveDate, Utc};
    ///
    /// let date = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
    /// let t = GtfsTime::parse("25:10:00").unwrap();
    /// let at = t.on_service_date(date, &Utc).unwrap();
    ///
    /// assert_eq!(at.date_naive(), NaiveDate::from_ymd_opt(2025, 8, 21).unwrap());
    /// assert_eq!(at.format("%H:%M").to_string(), "01:10");
    /// ```
    pub fn on_service_date<Tz: TimeZone>(
        &self,
        service_date: NaiveDate,
        tz: &Tz,
    ) -> Option<DateTime<Tz>> {
        let noon = service_date.and_hms_opt(12, 0, 0)?;
        let noon = tz.from_local_datetime(&noon).earliest()?;
        let offset = TimeDelta::try_seconds(i64::from(self.0) - TWELVE_HOURS_SECS)?;
        noon.checked_add_signed(offset)
    }
}

impl fmt::Debug for GtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GtfsTime({})", self)
    }
}

impl fmt::Display for GtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

/// Parse a short run of ASCII digits into a u32.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
