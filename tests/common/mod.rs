//! Shared integration-test harness: one Postgres test container, migrated
//! once, reused by every test module in this crate.
//!
//! Grounded on the teacher's `tests/common/harness.rs` shared-container
//! pattern (a `OnceCell<SharedTestInfra>` that starts the container and runs
//! migrations on first use), simplified to this crate's scope — one
//! database, no Redis, no queue engine.

use anyhow::{Context, Result};
use qhse_core::config::Config;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedInfra {
    db_url: String,
    // Keeps the container alive for the whole test binary run.
    _container: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedInfra> = OnceCell::const_new();

impl SharedInfra {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let container = Postgres::default()
            .start()
            .await
            .context("failed to start postgres test container")?;

        let host = container.get_host().await.context("failed to read container host")?;
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .context("failed to read container port")?;
        let db_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&db_url)
            .await
            .context("failed to connect to test postgres")?;
        qhse_core::MIGRATOR
            .run(&pool)
            .await
            .context("failed to run migrations against test postgres")?;
        pool.close().await;

        Ok(Self {
            db_url,
            _container: container,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async { Self::init().await.expect("failed to init shared test postgres") })
            .await
    }
}

/// A fresh connection pool against the shared, already-migrated test
/// database. Every test gets its own pool (cheap, connection-level only);
/// the schema and container are shared.
pub async fn test_pool() -> PgPool {
    let infra = SharedInfra::get().await;
    PgPool::connect(&infra.db_url)
        .await
        .expect("failed to connect to shared test postgres")
}

/// A `Config` suitable for tests: `ENV=test` (so `/readyz` skips migration
/// alignment, spec.md §6) and a short lock timeout so reclaim tests don't
/// need to sleep 30 real seconds.
pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        jwt_alg: "HS256".to_string(),
        access_token_expire_min: 60,
        outbox_batch_size: 10,
        outbox_lock_timeout_sec: 1,
        outbox_max_attempts: 5,
        log_level: "info".to_string(),
        log_json: false,
        request_id_header: "X-Request-Id".to_string(),
        enable_tracing: false,
        trace_sampling: 1.0,
        otlp_endpoint: None,
        worker_metrics_port: 9100,
        env: "test".to_string(),
    }
}

/// A unique-enough string for test fixture names (supplier names, NC
/// descriptions) so concurrent test modules sharing one database don't
/// collide on unique constraints.
pub fn unique(label: &str) -> String {
    format!("{label}-{}", uuid::Uuid::new_v4())
}
