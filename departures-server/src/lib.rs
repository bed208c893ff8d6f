//! Next-departures server for a static GTFS feed.
//!
//! Loads a transit schedule published as a GTFS archive and answers:
//! "what leaves this stop in the next N minutes?"

pub mod config;
pub mod departures;
pub mod domain;
pub mod feed;
pub mod gtfs;
pub mod web;
