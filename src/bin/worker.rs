//! Outbox drain-loop entrypoint. Runs the worker and a small metrics/health
//! HTTP surface on `WORKER_METRICS_PORT`, shutting down gracefully on
//! SIGINT/SIGTERM (spec.md §4.4, §6).

use anyhow::{Context, Result};
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use qhse_core::config::Config;
use qhse_core::outbox::metrics::OutboxMetrics;
use qhse_core::outbox::worker::OutboxWorker;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    tracing::info!("starting qhse-supplychain outbox worker");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let metrics = OutboxMetrics::new().context("failed to initialize outbox metrics")?;

    let worker = Arc::new(OutboxWorker::new(
        pool,
        metrics,
        config.outbox_batch_size,
        config.outbox_lock_timeout_sec,
        config.outbox_max_attempts,
    ));

    let shutdown = CancellationToken::new();

    let metrics_server = tokio::spawn(serve_metrics(worker.clone(), config.worker_metrics_port, shutdown.clone()));

    let worker_loop = {
        let worker = worker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received, draining in-flight work");
    shutdown.cancel();

    let _ = worker_loop.await;
    let _ = metrics_server.await;

    Ok(())
}

async fn serve_metrics(worker: Arc<OutboxWorker>, port: u16, shutdown: CancellationToken) {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .layer(Extension(worker));

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind worker metrics listener");
            return;
        }
    };

    tracing::info!(%addr, "worker metrics listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown.cancelled().await;
    });

    if let Err(e) = serve.await {
        tracing::error!(error = %e, "worker metrics server error");
    }
}

async fn metrics_handler(Extension(worker): Extension<Arc<OutboxWorker>>) -> Result<String, StatusCode> {
    worker
        .metrics()
        .encode()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
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
