//! Furlough JSON API Server

use std::process;

use furlough_app::{
    context::{AppConfig, AppContext},
    rategate::RateTable,
};
use salvo::{
    affix_state::inject,
    catch_panic::CatchPanic,
    cors::Cors,
    http::Method,
    prelude::*,
    trailing_slash::remove_slash,
};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{ServerConfig, logging::LogFormat},
    state::State,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod audit;
mod auth;
mod config;
mod errors;
mod exports;
mod extensions;
mod healthcheck;
mod invites;
mod middleware;
mod org;
mod periods;
mod router;
mod shutdown;
mod state;
mod users;
mod vacations;

#[cfg(test)]
mod test_helpers;

/// Furlough JSON API Server entry point
///
/// # Panics
///
/// Panics if the server fails to bind or serve requests
#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    init_logging(&config);

    let app_config = AppConfig {
        database_url: config.database.database_url.clone(),
        signing_key: config.auth.signing_key.clone().into_bytes(),
        access_ttl_secs: config.auth.access_ttl_secs,
        hash_params: config.auth.hash_params(),
        rate_table: RateTable::default(),
    };

    let app = match AppContext::from_config(app_config).await {
        Ok(app) => app,
        Err(init_error) => {
            error!("failed to initialize application: {init_error}");
            process::exit(1);
        }
    };

    let state = State::from_app_context(app);

    // Idempotent hygiene ticker; on-read expiry checks already treat
    // expired tokens as dead, this just keeps the tables small.
    let ticker_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));

        loop {
            interval.tick().await;

            if let Err(purge_error) = ticker_state.app.sessions.purge_expired_tokens().await {
                warn!("token purge failed: {purge_error}");
            }
        }
    });

    let cors = Cors::new()
        .allow_origin(
            config
                .server
                .cors_origins
                .iter()
                .filter(|origin| !origin.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>(),
        )
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(vec!["authorization", "content-type"])
        .into_handler();

    let addr = config.socket_addr();
    tracing::info!("Starting server on {addr}");

    let listener = TcpListener::new(addr).bind().await;

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(cors)
        .hoop(middleware::security::handler)
        .hoop(inject(state))
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(router::app_router());

    let server = Server::new(listener);

    let handle = server.handle();

    // Listen for shutdown signal
    tokio::spawn(async move {
        if let Err(shutdown_error) = shutdown::listen(handle).await {
            error!("failed to listen for shutdown signal: {shutdown_error}");
        }
    });

    server.serve(router).await;
}

fn init_logging(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level));

    match config.logging.log_format {
        LogFormat::Compact => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}
