//! HTTP route handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::departures::{self, ResolveError};
use crate::gtfs::{FeedError, FeedErrorKind};

use super::dto::*;
use super::state::AppState;

/// Look-ahead used when `minutes` is not given.
pub const DEFAULT_WINDOW_MINUTES: i64 = 60;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/next_departures/:stop_id", get(next_departures))
        .route("/stops", get(search_stops))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
///
/// Always 200, whether or not a feed is loaded.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.feed.snapshot().await;
    Json(HealthResponse {
        status: "ok",
        feed_loaded: snapshot.is_some(),
        loaded_at: snapshot.map(|feed| feed.loaded_at().to_rfc3339()),
        last_error: state.feed.last_error().await.map(|e| e.to_string()),
    })
}

/// Upcoming departures from a stop.
async fn next_departures(
    State(state): State<AppState>,
    Path(stop_id): Path<String>,
    Query(req): Query<DeparturesQuery>,
) -> Result<Json<Vec<DepartureResult>>, AppError> {
    let minutes = parse_param::<i64>("minutes", req.minutes.as_deref())?
        .unwrap_or(DEFAULT_WINDOW_MINUTES);

    let feed = state.feed.current_or_load().await?;
    let found = departures::next_departures(&feed, &stop_id, minutes, state.now())?;

    debug!(%stop_id, minutes, count = found.len(), "resolved departures");

    Ok(Json(
        found.iter().map(DepartureResult::from_departure).collect(),
    ))
}

/// Search stops by name.
async fn search_stops(
    State(state): State<AppState>,
    Query(req): Query<StopSearchRequest>,
) -> Result<Json<StopSearchResponse>, AppError> {
    let query = req.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::BadRequest {
            message: "missing search query q".to_string(),
        });
    }
    let limit = parse_param::<usize>("limit", req.limit.as_deref())?
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .min(MAX_SEARCH_LIMIT);

    let feed = state.feed.current_or_load().await?;
    let stops = feed
        .search_stops(query, limit)
        .into_iter()
        .map(StopSearchResult::from_stop)
        .collect();

    Ok(Json(StopSearchResponse { stops }))
}

/// Parse an optional integer query parameter. Blank counts as absent.
fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| AppError::BadRequest {
            message: format!("{name} must be an integer, got {s:?}"),
        }),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    InvalidWindow { message: String },
    NotFound { message: String },
    FeedUnavailable { message: String },
    FeedParse { message: String },
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::InvalidWindow { .. } => (StatusCode::BAD_REQUEST, "invalid_window"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "stop_not_found"),
            AppError::FeedUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "feed_unavailable")
            }
            AppError::FeedParse { .. } => (StatusCode::BAD_GATEWAY, "feed_parse_error"),
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::BadRequest { message }
            | AppError::InvalidWindow { message }
            | AppError::NotFound { message }
            | AppError::FeedUnavailable { message }
            | AppError::FeedParse { message } => message,
        }
    }
}

impl From<Arc<FeedError>> for AppError {
    fn from(e: Arc<FeedError>) -> Self {
        let message = e.to_string();
        match e.kind() {
            FeedErrorKind::Unavailable => AppError::FeedUnavailable { message },
            FeedErrorKind::Malformed => AppError::FeedParse { message },
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        let message = e.to_string();
        match e {
            ResolveError::StopNotFound(_) => AppError::NotFound { message },
            ResolveError::InvalidWindow(_) => AppError::InvalidWindow { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message().to_string();

        if status.is_server_error() {
            error!(%status, code, %message, "request failed");
        } else {
            debug!(%status, code, %message, "request rejected");
        }

        let body = Json(ErrorResponse {
            error: message,
            code,
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedStore;
    use crate::gtfs::testing::{SAMPLE_FEED, feed_from, london, write_dir};
    use crate::gtfs::{FeedLoader, FeedLoaderConfig, FeedSource};
    use chrono::{DateTime, Utc};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn wednesday_morning() -> DateTime<Utc> {
        london(2025, 8, 20, 8, 0)
    }

    fn loader(source: FeedSource) -> FeedLoader {
        FeedLoader::new(FeedLoaderConfig::new(source)).unwrap()
    }

    fn missing_source() -> FeedSource {
        FeedSource::Path("/nonexistent/gtfs.zip".into())
    }

    fn loaded_state() -> AppState {
        let store = FeedStore::with_tables(loader(missing_source()), feed_from(SAMPLE_FEED));
        AppState::new(Arc::new(store)).with_clock(wednesday_morning)
    }

    fn unloaded_state() -> AppState {
        let store = FeedStore::new(loader(missing_source()));
        AppState::new(Arc::new(store)).with_clock(wednesday_morning)
    }

    fn minutes(m: &str) -> Query<DeparturesQuery> {
        Query(DeparturesQuery {
            minutes: Some(m.to_string()),
        })
    }

    async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_feed_state() {
        let Json(body) = health(State(loaded_state())).await;
        assert_eq!(body.status, "ok");
        assert!(body.feed_loaded);
        assert!(body.loaded_at.is_some());
        assert!(body.last_error.is_none());

        let Json(body) = health(State(unloaded_state())).await;
        assert_eq!(body.status, "ok");
        assert!(!body.feed_loaded);
        assert!(body.loaded_at.is_none());
        assert!(body.last_error.is_none());
    }

    #[tokio::test]
    async fn health_reports_last_load_failure() {
        let state = unloaded_state();
        assert!(state.feed.current_or_load().await.is_err());

        let Json(body) = health(State(state)).await;
        assert!(!body.feed_loaded);
        assert!(body.last_error.unwrap().contains("/nonexistent/gtfs.zip"));
    }

    #[tokio::test]
    async fn departures_within_window() {
        let Json(body) = next_departures(
            State(loaded_state()),
            Path("1980SN12619E".to_string()),
            minutes("30"),
        )
        .await
        .unwrap();

        assert_eq!(body.len(), 2);
        assert_eq!(body[0].trip_id, "T1");
        assert_eq!(body[0].route, "1");
        assert_eq!(body[0].headsign.as_deref(), Some("Winchester"));
        assert_eq!(body[0].direction_id, Some(0));
        assert_eq!(body[0].departs_at, "2025-08-20T08:15:00+01:00");
        assert_eq!(body[0].minutes_until, 15);
        assert_eq!(body[1].trip_id, "T3");
    }

    #[tokio::test]
    async fn minutes_defaults_to_an_hour() {
        let Json(body) = next_departures(
            State(loaded_state()),
            Path("PORTSWOOD".to_string()),
            Query(DeparturesQuery::default()),
        )
        .await
        .unwrap();

        // T1 at 08:30 is set-down only; T3 at 08:40 is within the hour.
        let trips: Vec<_> = body.iter().map(|d| d.trip_id.as_str()).collect();
        assert_eq!(trips, vec!["T3"]);
    }

    #[tokio::test]
    async fn unknown_stop_is_404() {
        let err = next_departures(
            State(loaded_state()),
            Path("NOPE".to_string()),
            minutes("30"),
        )
        .await
        .unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "stop_not_found");
        assert!(body["error"].as_str().unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn non_positive_window_is_400() {
        for m in ["0", "-10"] {
            let err = next_departures(
                State(loaded_state()),
                Path("1980SN12619E".to_string()),
                minutes(m),
            )
            .await
            .unwrap_err();

            let (status, body) = error_body(err).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "invalid_window");
        }
    }

    #[tokio::test]
    async fn non_integer_window_is_400() {
        let err = next_departures(
            State(loaded_state()),
            Path("1980SN12619E".to_string()),
            minutes("soon"),
        )
        .await
        .unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn unavailable_feed_is_503() {
        let err = next_departures(
            State(unloaded_state()),
            Path("1980SN12619E".to_string()),
            minutes("30"),
        )
        .await
        .unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "feed_unavailable");
    }

    #[tokio::test]
    async fn malformed_feed_is_502() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gtfs.zip");
        std::fs::write(&path, "not a zip").unwrap();

        let store = FeedStore::new(loader(FeedSource::Path(path)));
        let state = AppState::new(Arc::new(store)).with_clock(wednesday_morning);

        let err = next_departures(State(state), Path("VW".to_string()), minutes("30"))
            .await
            .unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "feed_parse_error");
    }

    #[tokio::test]
    async fn lazy_load_on_first_request() {
        let dir = tempdir().unwrap();
        write_dir(dir.path(), SAMPLE_FEED);

        let store = FeedStore::new(loader(FeedSource::Path(dir.path().to_path_buf())));
        let state = AppState::new(Arc::new(store)).with_clock(wednesday_morning);
        assert!(!state.feed.is_loaded().await);

        let Json(body) = next_departures(
            State(state.clone()),
            Path("VW".to_string()),
            minutes("30"),
        )
        .await
        .unwrap();

        assert_eq!(body.len(), 3);
        assert!(state.feed.is_loaded().await);
    }

    #[tokio::test]
    async fn stop_search() {
        let Json(body) = search_stops(
            State(loaded_state()),
            Query(StopSearchRequest {
                q: Some("vincent".to_string()),
                limit: None,
            }),
        )
        .await
        .unwrap();

        let names: Vec<_> = body.stops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Vincent's Walk", "Vincent's Walk [CK]", "Vincent's Walk [CM]"]
        );
        assert_eq!(body.stops[0].stop_id, "VW");
    }

    #[tokio::test]
    async fn stop_search_respects_limit() {
        let Json(body) = search_stops(
            State(loaded_state()),
            Query(StopSearchRequest {
                q: Some("walk".to_string()),
                limit: Some("1".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.stops.len(), 1);
    }

    #[tokio::test]
    async fn stop_search_requires_query() {
        let err = search_stops(State(loaded_state()), Query(StopSearchRequest::default()))
            .await
            .unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[test]
    fn parse_param_handles_blank_and_garbage() {
        assert_eq!(parse_param::<i64>("minutes", None).unwrap(), None);
        assert_eq!(parse_param::<i64>("minutes", Some(" ")).unwrap(), None);
        assert_eq!(parse_param::<i64>("minutes", Some(" 45 ")).unwrap(), Some(45));
        assert!(parse_param::<i64>("minutes", Some("4.5")).is_err());
        assert!(parse_param::<usize>("limit", Some("-1")).is_err());
    }

    /// Serve the router on an ephemeral port and return its base URL.
    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn fetch_json(url: String) -> (u16, serde_json::Value) {
        let response = reqwest::get(url).await.unwrap();
        let status = response.status().as_u16();
        let text = response.text().await.unwrap();
        (status, serde_json::from_str(&text).unwrap())
    }

    #[tokio::test]
    async fn router_serves_json_over_http() {
        let base = serve(loaded_state()).await;

        let (status, body) = fetch_json(format!("{base}/health")).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["feed_loaded"], true);
        let loaded_at = body["loaded_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(loaded_at).is_ok());
        assert!(body.get("last_error").is_none());

        let (status, body) = fetch_json(format!("{base}/next_departures/1980SN12619E?minutes=30")).await;
        assert_eq!(status, 200);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["minutes_until"], 15);

        let (status, body) = fetch_json(format!("{base}/next_departures/NOPE")).await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "stop_not_found");
    }

    #[tokio::test]
    async fn health_stays_up_when_feed_fetch_fails() {
        let base = serve(unloaded_state()).await;

        let (status, body) = fetch_json(format!("{base}/next_departures/1980SN12619E?minutes=30")).await;
        assert_eq!(status, 503);
        assert_eq!(body["code"], "feed_unavailable");

        let (status, body) = fetch_json(format!("{base}/health")).await;
        assert_eq!(status, 200);
        assert_eq!(body["feed_loaded"], false);
        assert!(body.get("loaded_at").is_none());
        assert!(body["last_error"].as_str().is_some());
    }
}
