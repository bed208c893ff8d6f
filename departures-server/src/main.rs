use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use departures_server::config::AppConfig;
use departures_server::feed::{FeedStore, RefreshPolicy, StartupLoad};
use departures_server::gtfs::FeedLoader;
use departures_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let loader = FeedLoader::new(config.loader_config()).expect("Failed to create feed loader");
    info!(source = %loader.source(), "using GTFS feed");
    let store = Arc::new(FeedStore::new(loader));

    // A failed startup load is not fatal: requests retry it lazily.
    if config.startup_load == StartupLoad::Eager
        && let Err(e) = store.refresh().await
    {
        warn!(error = %e, "initial feed load failed, serving without a feed");
    }

    if let RefreshPolicy::Every(period) = config.refresh {
        info!(period_secs = period.as_secs(), "scheduling feed refresh");
        store.spawn_refresh(period);
    }

    let app = create_router(AppState::new(store));

    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");

    info!("departures server listening on http://{addr}");
    info!("  GET /health                              - Health check");
    info!("  GET /next_departures/{{stop_id}}?minutes=N - Upcoming departures");
    info!("  GET /stops?q=TEXT                        - Search stops by name");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
