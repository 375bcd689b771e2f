//! HTTP API entrypoint. Shaped after the teacher's `server/main.rs`: init
//! tracing, load config, connect, migrate, build the router, serve.

use anyhow::{Context, Result};
use qhse_core::config::Config;
use qhse_core::server::build_app;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    tracing::info!("starting qhse-supplychain api");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    qhse_core::MIGRATOR
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let app = build_app(pool, &config);

    let addr = "0.0.0.0:8000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    tracing::info!(%addr, "listening");

    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},sqlx=warn", config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
