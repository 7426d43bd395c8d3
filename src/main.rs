#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::config::Config;
use crate::database::Database;
use crate::database::DatabaseConfig;
use crate::generator::AddressGenerator;
use crate::lifecycle::Lifecycle;
use crate::provider::Cloudflare;
use crate::provider::RuleProvider;
use crate::sweeper::SWEEP_INTERVAL;

mod aliases;
mod api;
mod config;
mod database;
mod generator;
mod graceful_shutdown;
mod lifecycle;
mod provider;
mod root;
mod sweeper;
#[cfg(test)]
mod tests;
mod utils;

const DEFAULT_RUST_LOG: &str = "ephemail=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let config = Config::from_env()?;

    let lifecycle = setup_lifecycle(&config).await?;

    let shutdown = CancellationToken::new();

    let sweeper = tokio::spawn(sweeper::run(
        lifecycle.clone(),
        SWEEP_INTERVAL,
        shutdown.clone(),
    ));

    let app = create_router(lifecycle);

    let listener = TcpListener::bind(config.address).await?;
    tracing::info!("Listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler(shutdown.clone()))
        .await?;

    shutdown.cancel();
    sweeper.await?;

    Ok(())
}

/// Create the lifecycle with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Database connection and migrations
/// - HTTP client for Cloudflare
async fn setup_lifecycle(config: &Config) -> Result<Lifecycle<Cloudflare>> {
    let database =
        Database::from_config(DatabaseConfig::Path(config.database_path.clone())).await?;

    let provider = Cloudflare::new(config.cloudflare.clone())?;

    let generator = AddressGenerator::from_os_rng(config.email_domain.clone());

    Ok(Lifecycle::new(database, provider, generator))
}

/// Create the router for Ephemail
fn create_router<P: RuleProvider>(lifecycle: Lifecycle<P>) -> Router {
    Router::new()
        .route("/", get(root::root::<P>))
        .nest("/api", api::router::<P>())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(lifecycle))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}
