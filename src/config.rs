//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Configuration shared by the `api` and `worker` binaries.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,

    pub jwt_secret: String,
    pub jwt_alg: String,
    pub access_token_expire_min: i64,

    pub outbox_batch_size: i64,
    pub outbox_lock_timeout_sec: i64,
    pub outbox_max_attempts: i32,

    pub log_level: String,
    pub log_json: bool,
    pub request_id_header: String,

    pub enable_tracing: bool,
    pub trace_sampling: f64,
    pub otlp_endpoint: Option<String>,

    pub worker_metrics_port: u16,

    pub env: String,
}

impl Config {
    /// Load configuration from environment variables, applying the same
    /// defaults as the service's Python predecessor.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "change-me".to_string()),
            jwt_alg: env::var("JWT_ALG").unwrap_or_else(|_| "HS256".to_string()),
            access_token_expire_min: env::var("ACCESS_TOKEN_EXPIRE_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("ACCESS_TOKEN_EXPIRE_MIN must be a valid number")?,

            outbox_batch_size: env::var("OUTBOX_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("OUTBOX_BATCH_SIZE must be a valid number")?,
            outbox_lock_timeout_sec: env::var("OUTBOX_LOCK_TIMEOUT_SEC")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("OUTBOX_LOCK_TIMEOUT_SEC must be a valid number")?,
            outbox_max_attempts: env::var("OUTBOX_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("OUTBOX_MAX_ATTEMPTS must be a valid number")?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            request_id_header: env::var("REQUEST_ID_HEADER")
                .unwrap_or_else(|_| "X-Request-Id".to_string()),

            enable_tracing: env::var("ENABLE_TRACING")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            trace_sampling: env::var("TRACE_SAMPLING")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()
                .context("TRACE_SAMPLING must be a valid number")?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),

            worker_metrics_port: env::var("WORKER_METRICS_PORT")
                .unwrap_or_else(|_| "9100".to_string())
                .parse()
                .context("WORKER_METRICS_PORT must be a valid port number")?,

            env: env::var("ENV").unwrap_or_else(|_| "dev".to_string()),
        })
    }

    pub fn is_test(&self) -> bool {
        self.env == "test"
    }
}
