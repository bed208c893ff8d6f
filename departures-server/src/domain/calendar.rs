//! Service calendars.
//!
//! A service runs on a weekly pattern between two dates (`calendar.txt`),
//! adjusted by per-date exceptions (`calendar_dates.txt`). Either part may
//! be absent: plenty of feeds describe every running day as an added
//! exception and ship no weekly pattern at all.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use super::ServiceId;

/// The weekly part of a service calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPattern {
    /// Running days, indexed Monday = 0 .. Sunday = 6.
    pub days: [bool; 7],

    /// First date of the pattern (inclusive).
    pub start_date: NaiveDate,

    /// Last date of the pattern (inclusive).
    pub end_date: NaiveDate,
}

impl WeeklyPattern {
    /// Whether the pattern covers `date`.
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date
            && date <= self.end_date
            && self.days[date.weekday().num_days_from_monday() as usize]
    }
}

/// Which days a service pattern operates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCalendar {
    pub service_id: ServiceId,

    /// Weekly pattern, if the feed has one for this service.
    pub weekly: Option<WeeklyPattern>,

    /// Dates explicitly added (exception_type 1).
    pub added: BTreeSet<NaiveDate>,

    /// Dates explicitly removed (exception_type 2).
    pub removed: BTreeSet<NaiveDate>,
}

impl ServiceCalendar {
    /// Create a calendar with no running days.
    pub fn new(service_id: ServiceId) -> Self {
        Self {
            service_id,
            weekly: None,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Set the weekly pattern.
    pub fn with_weekly(mut self, weekly: WeeklyPattern) -> Self {
        self.weekly = Some(weekly);
        self
    }

    /// Whether the service runs on `date`.
    ///
    /// Removals win over everything, then additions, then the weekly pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use departures_server::domain::{ServiceCalendar, ServiceId, WeeklyPattern};
    /// use chrono::NaiveDate;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2025, 8, day).unwrap();
    /// let mut cal = ServiceCalendar::new(ServiceId::new("weekdays").unwrap())
    ///     .with_weekly(WeeklyPattern {
    ///         days: [true, true, true, true, true, false, false],
    ///         start_date: d(1),
    ///         end_date: d(31),
    ///     });
    /// cal.removed.insert(d(25)); // bank holiday Monday
    ///
    /// assert!(cal.is_active(d(20)));   // Wednesday
    /// assert!(!cal.is_active(d(23)));  // Saturday
    /// assert!(!cal.is_active(d(25)));  // removed
    /// ```
    pub fn is_active(&self, date: NaiveDate) -> bool {
        if self.removed.contains(&date) {
            return false;
        }
        if self.added.contains(&date) {
            return true;
        }
        self.weekly.as_ref().is_some_and(|w| w.runs_on(date))
    }

    /// First and last date on which the service could possibly run.
    ///
    /// Returns `None` for a calendar with neither a weekly pattern nor
    /// added dates.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let weekly = self.weekly.as_ref().map(|w| (w.start_date, w.end_date));
        let added = self
            .added
            .first()
            .copied()
            .zip(self.added.last().copied());

        match (weekly, added) {
            (Some((ws, we)), Some((a_first, a_last))) => Some((ws.min(a_first), we.max(a_last))),
            (Some(span), None) | (None, Some(span)) => Some(span),
            (None, None) => None,
        }
    }
}
