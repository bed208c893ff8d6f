//! Web layer for the departures service.
//!
//! Provides the health check, next-departures and stop search endpoints.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, DEFAULT_WINDOW_MINUTES, create_router};
pub use state::AppState;
