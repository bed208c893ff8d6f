//! GTFS identifier types.
//!
//! GTFS identifiers are opaque, case-sensitive strings. Each table gets its
//! own newtype so a stop ID can never be used where a trip ID is expected.
//! The only validation is that they must be non-empty after trimming.

use std::borrow::Borrow;
use std::fmt;

/// Error returned when constructing an identifier from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: identifier cannot be empty")]
pub struct InvalidId {
    kind: &'static str,
}

macro_rules! gtfs_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, trimming surrounding whitespace.
            ///
            /// Returns an error if nothing is left after trimming.
            pub fn new(s: impl Into<String>) -> Result<Self, InvalidId> {
                let s = s.into();
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(InvalidId { kind: $kind });
                }
                if trimmed.len() == s.len() {
                    Ok(Self(s))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

gtfs_id!(
    /// A `stop_id` from `stops.txt`.
    ///
    /// # Examples
    ///
    /// ```
    /// use departures_server::domain::StopId;
    ///
    /// let stop = StopId::new("1980SN12619E").unwrap();
    /// assert_eq!(stop.as_str(), "1980SN12619E");
    ///
    /// // Empty identifiers are rejected
    /// assert!(StopId::new("  ").is_err());
    /// ```
    StopId,
    "stop_id"
);

gtfs_id!(
    /// A `trip_id` from `trips.txt`.
    TripId,
    "trip_id"
);

gtfs_id!(
    /// A `route_id` from `routes.txt`.
    RouteId,
    "route_id"
);

gtfs_id!(
    /// A `service_id` shared by `trips.txt`, `calendar.txt` and `calendar_dates.txt`.
    ServiceId,
    "service_id"
);
