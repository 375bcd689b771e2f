//! Prometheus instrumentation for the outbox worker (spec.md §4.6).
//!
//! Grounded on the `prometheus` crate as used by `stateset-api` (a sibling
//! supply-chain-shaped service in the example pack); the teacher repo itself
//! has no metrics crate, so this is an enrichment from outside the teacher.

use anyhow::Result;
use chrono::Utc;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use sqlx::PgPool;

pub struct OutboxMetrics {
    registry: Registry,
    pub claims_total: IntCounterVec,
    pub jobs_total: IntCounterVec,
    pub poll_duration: Histogram,
    pub job_duration: HistogramVec,
    pub unprocessed_total: IntGauge,
    pub oldest_unprocessed_age_seconds: prometheus::Gauge,
}

impl OutboxMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            Opts::new("outbox_claims_total", "Outbox claim attempts by outcome"),
            &["outcome"],
        )?;
        let jobs_total = IntCounterVec::new(
            Opts::new("outbox_jobs_total", "Outbox jobs processed by status and event type"),
            &["status", "event_type"],
        )?;
        let poll_duration = Histogram::with_opts(HistogramOpts::new(
            "outbox_poll_duration_seconds",
            "Duration of one poll iteration",
        ))?;
        let job_duration = HistogramVec::new(
            HistogramOpts::new("outbox_job_duration_seconds", "Duration of one dispatched job"),
            &["event_type"],
        )?;
        let unprocessed_total = IntGauge::new(
            "outbox_unprocessed_total",
            "Rows currently in PENDING or PROCESSING",
        )?;
        let oldest_unprocessed_age_seconds = prometheus::Gauge::new(
            "outbox_oldest_unprocessed_age_seconds",
            "Age in seconds of the oldest unprocessed row",
        )?;

        registry.register(Box::new(claims_total.clone()))?;
        registry.register(Box::new(jobs_total.clone()))?;
        registry.register(Box::new(poll_duration.clone()))?;
        registry.register(Box::new(job_duration.clone()))?;
        registry.register(Box::new(unprocessed_total.clone()))?;
        registry.register(Box::new(oldest_unprocessed_age_seconds.clone()))?;

        Ok(Self {
            registry,
            claims_total,
            jobs_total,
            poll_duration,
            job_duration,
            unprocessed_total,
            oldest_unprocessed_age_seconds,
        })
    }

    /// Refresh the backlog gauges against the database. Called once per loop
    /// iteration (spec.md §4.4 step 3) so `outbox_unprocessed_total` always
    /// matches `count(status in {pending, processing})` (spec.md §8 property 9).
    pub async fn refresh_backlog_gauges(&self, pool: &PgPool) -> Result<()> {
        let unprocessed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM outbox_events WHERE status IN ('pending', 'processing')",
        )
        .fetch_one(pool)
        .await?;
        self.unprocessed_total.set(unprocessed);

        let oldest_created_at: Option<chrono::DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MIN(created_at) FROM outbox_events WHERE status IN ('pending', 'processing')",
        )
        .fetch_one(pool)
        .await?;

        let age = oldest_created_at
            .map(|ts| (Utc::now() - ts).num_seconds().max(0) as f64)
            .unwrap_or(0.0);
        self.oldest_unprocessed_age_seconds.set(age);

        Ok(())
    }

    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
