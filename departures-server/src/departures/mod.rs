//! Departure resolution.
//!
//! Answers "what leaves this stop in the next N minutes?" from a loaded
//! feed snapshot. Resolution is a pure function of the snapshot, the stop,
//! the window and the current time.

mod resolver;


pub use resolver::{Departure, ResolveError, next_departures};
