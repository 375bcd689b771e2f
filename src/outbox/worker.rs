//! The outbox drain loop.
//!
//! Shaped after the teacher's `JobWorker::run` (claim → process → sleep when
//! idle → stop on cancellation), but deliberately processes a claimed batch
//! sequentially rather than via `join_all` (spec.md §4.4, §5): this service
//! has no heartbeat-for-long-running-jobs concern, and sequential processing
//! keeps one worker's transactions from contending with each other for the
//! same audit/supplier rows a batch might touch. Horizontal scale-out is
//! multiple worker processes, coordinated purely by `FOR UPDATE SKIP LOCKED`
//! in `claim`, not concurrency within one worker.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::correlation::Correlation;

use super::claim::claim;
use super::dispatcher::{dispatch, DispatchOutcome};
use super::metrics::OutboxMetrics;
use super::model::EventStatus;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct OutboxWorker {
    pool: PgPool,
    metrics: OutboxMetrics,
    worker_id: String,
    batch_size: i64,
    lock_timeout_sec: i64,
    max_attempts: i32,
}

impl OutboxWorker {
    pub fn new(
        pool: PgPool,
        metrics: OutboxMetrics,
        batch_size: i64,
        lock_timeout_sec: i64,
        max_attempts: i32,
    ) -> Self {
        Self {
            pool,
            metrics,
            worker_id: format!("worker-{}", Uuid::new_v4()),
            batch_size,
            lock_timeout_sec,
            max_attempts,
        }
    }

    pub fn metrics(&self) -> &OutboxMetrics {
        &self.metrics
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Drain the outbox until `shutdown` fires. Cancellation only takes
    /// effect at a loop-top boundary — never mid-batch — so an in-flight
    /// event always finishes its transaction one way or the other.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(worker_id = %self.worker_id, batch_size = self.batch_size, "outbox worker starting");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.run_once().await {
                Ok(0) => sleep_or_stop(&shutdown, POLL_INTERVAL).await,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to claim outbox batch");
                    self.metrics.claims_total.with_label_values(&["error"]).inc();
                    sleep_or_stop(&shutdown, POLL_INTERVAL).await;
                }
            }
        }

        info!(worker_id = %self.worker_id, "outbox worker stopped");
    }

    /// Claim one batch and drive every claimed event to completion,
    /// returning the number of events claimed. This is one loop iteration's
    /// worth of work (spec.md §4.4 steps 1-3), extracted so tests can drive
    /// the worker deterministically instead of racing its 1-second poll
    /// (spec.md §8 scenarios S1, S2, S4, S6 all call this `run_once()`).
    pub async fn run_once(&self) -> anyhow::Result<usize> {
        let poll_timer = self.metrics.poll_duration.start_timer();
        let events = self.claim_batch().await;
        poll_timer.observe_duration();

        let events = events?;

        if events.is_empty() {
            self.metrics.claims_total.with_label_values(&["empty"]).inc();
        } else {
            self.metrics.claims_total.with_label_values(&["claimed"]).inc_by(events.len() as u64);
        }

        let claimed = events.len();

        for event in events {
            self.process_one(event).await;
        }

        if let Err(e) = self.metrics.refresh_backlog_gauges(&self.pool).await {
            warn!(error = %e, "failed to refresh outbox backlog gauges");
        }

        Ok(claimed)
    }

    async fn claim_batch(&self) -> anyhow::Result<Vec<super::model::OutboxEvent>> {
        let mut tx = self.pool.begin().await?;
        let events = claim(&mut tx, self.batch_size, &self.worker_id, self.lock_timeout_sec).await?;
        tx.commit().await?;
        Ok(events)
    }

    /// Run one claimed event to completion, applying the retry-then-FAILED
    /// policy on error (spec.md §4.4 steps 4-5). `attempts` was already
    /// incremented by `claim`, so this only needs to compare it to the limit.
    async fn process_one(&self, event: super::model::OutboxEvent) {
        let timer = self
            .metrics
            .job_duration
            .with_label_values(&[&event.event_type])
            .start_timer();

        let correlation = Correlation::from_event_meta(&event.meta, &event.event_id);

        let outcome = self.run_in_transaction(&correlation, &event).await;
        timer.observe_duration();

        match outcome {
            Ok(DispatchOutcome::Handled) => {
                self.metrics
                    .jobs_total
                    .with_label_values(&["done", &event.event_type])
                    .inc();
            }
            Ok(DispatchOutcome::AlreadyProcessed) => {
                self.metrics
                    .jobs_total
                    .with_label_values(&["already_processed", &event.event_type])
                    .inc();
            }
            Ok(DispatchOutcome::Dropped) => {
                warn!(event_id = %event.event_id, "claimed row no longer processing under our lock, dropping");
                self.metrics
                    .jobs_total
                    .with_label_values(&["dropped", &event.event_type])
                    .inc();
            }
            Err(e) => {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    attempts = event.attempts,
                    error = %e,
                    "outbox event failed"
                );
                if let Err(e) = self.retry_or_fail(&event).await {
                    error!(event_id = %event.event_id, error = %e, "failed to record outbox failure");
                }
                let label = if event.attempts >= self.max_attempts { "failed" } else { "retrying" };
                self.metrics.jobs_total.with_label_values(&[label, &event.event_type]).inc();
            }
        }
    }

    /// Re-verifies the row is still `Processing` under our lock before
    /// dispatching (spec.md §4.4 step 2: "load the row, verify its status is
    /// still PROCESSING (defensive — drop otherwise)"). A single worker's
    /// claim-then-dispatch sequence can't race itself, but this still guards
    /// against operator intervention or a future bug that re-claims before
    /// this transaction commits.
    async fn run_in_transaction(
        &self,
        correlation: &Correlation,
        event: &super::model::OutboxEvent,
    ) -> anyhow::Result<DispatchOutcome> {
        let mut tx = self.pool.begin().await?;

        let still_processing = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM outbox_events WHERE id = $1 AND status = 'processing' FOR UPDATE",
        )
        .bind(event.id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

        if !still_processing {
            tx.commit().await?;
            return Ok(DispatchOutcome::Dropped);
        }

        let outcome = dispatch(&mut tx, correlation, event).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// On handler failure, release the lock and either send the event back
    /// to PENDING (to be reclaimed on the next poll) or retire it to FAILED
    /// once `attempts` has reached the configured ceiling (spec.md §4.4,
    /// Testable Property: a poison event is retired, not retried forever).
    async fn retry_or_fail(&self, event: &super::model::OutboxEvent) -> anyhow::Result<()> {
        let next_status = if event.attempts >= self.max_attempts {
            EventStatus::Failed
        } else {
            EventStatus::Pending
        };

        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = $1, locked_by = NULL, locked_at = NULL
            WHERE id = $2
            "#,
        )
        .bind(next_status)
        .bind(event.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn sleep_or_stop(shutdown: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}
