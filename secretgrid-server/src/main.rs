//! Flattened, queryable view over JSON secrets

use std::{env, sync::Arc, time::Duration};

use axum::{Router, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{
    cache::{SecretCache, SweepConfig, Sweeper},
    routes::secret,
    state::AppState,
    vault::aws::AwsConnector,
};

mod cache;
mod error;
mod state;
mod sync;
mod tree;
mod vault;
mod routes {
    pub mod secret;
}

#[tokio::main]
#[expect(clippy::expect_used, reason = "allow in server main")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database = env::var("SECRETGRID_DATABASE").unwrap_or("sqlite::memory:".to_owned());
    let cache = SecretCache::connect(&database)
        .await
        .expect("Could not open the secret cache");

    let defaults = SweepConfig::default();
    let sweeper = Sweeper::start(
        cache.clone(),
        SweepConfig {
            interval: seconds_from_env("SECRETGRID_SWEEP_INTERVAL", defaults.interval),
            retention: seconds_from_env("SECRETGRID_RETENTION", defaults.retention),
        },
    );

    let state = Arc::new(AppState::new(cache, Arc::new(AwsConnector)));

    let port = env::var("SECRETGRID_PORT").unwrap_or("4338".to_owned());
    let host = env::var("SECRETGRID_HOST").unwrap_or("localhost".to_owned());

    let listener = TcpListener::bind(format!("{host}:{port}"))
        .await
        .expect("Could not bind to port");
    log::info!("Listening on {host}:{port}");
    axum::serve(listener, routes(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Could not start axum");

    sweeper.stop().await;
}

fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        // bind credentials / list flattened rows
        .route("/secrets", post(secret::login).get(secret::list))
        .route("/updateSecret", post(secret::update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn seconds_from_env(key: &str, default: Duration) -> Duration {
    let Ok(value) = env::var(key) else {
        return default;
    };
    match value.parse() {
        Ok(seconds) => Duration::from_secs(seconds),
        Err(err) => {
            log::warn!("Ignoring {key}={value}: {err}");
            default
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for ctrl-c: {err}");
        // never resolve so the server keeps running
        core::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

#[cfg(test)]
use axum_test::TestServer;

#[cfg(test)]
async fn test_server(vault: Arc<vault::memory::MemoryVault>) -> TestServer {
    let cache = SecretCache::connect("sqlite::memory:")
        .await
        .expect("Could not open the secret cache");
    let connector = Arc::new(vault::memory::MemoryConnector::new(vault));
    let app = routes(Arc::new(AppState::new(cache, connector)));
    TestServer::builder()
        .build(app)
}
