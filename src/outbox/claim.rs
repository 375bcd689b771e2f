use anyhow::Result;
use sqlx::{Postgres, Transaction};

use super::model::OutboxEvent;

/// Atomically claim up to `limit` eligible outbox rows for `worker_id`.
///
/// A single `WITH ... FOR UPDATE SKIP LOCKED` CTE feeding an `UPDATE ...
/// RETURNING` makes the whole operation one round-trip: either every
/// returned row has been flipped to `processing` under this worker, or none
/// have (spec.md §4.2). `SKIP LOCKED` is what lets concurrent workers claim
/// disjoint batches without blocking each other.
///
/// Eligibility: `status = 'pending'`, or `status = 'processing'` whose
/// `locked_at` has aged past `lock_timeout_sec` — the stale-lock reclaim that
/// lets the queue recover from a worker that crashed mid-claim.
///
/// `attempts` is incremented on every claim, including reclaims, by design:
/// this bounds a crash-loop's retries without depending on the handler ever
/// running (spec.md §4.2).
pub async fn claim(
    tx: &mut Transaction<'_, Postgres>,
    limit: i64,
    worker_id: &str,
    lock_timeout_sec: i64,
) -> Result<Vec<OutboxEvent>> {
    let events = sqlx::query_as::<_, OutboxEvent>(
        r#"
        WITH next_events AS (
            SELECT id
            FROM outbox_events
            WHERE
                status = 'pending'
                OR (status = 'processing' AND (locked_at IS NULL OR locked_at < NOW() - ($3 || ' seconds')::INTERVAL))
            ORDER BY id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        UPDATE outbox_events
        SET
            status = 'processing',
            attempts = outbox_events.attempts + 1,
            locked_by = $2,
            locked_at = NOW()
        FROM next_events
        WHERE outbox_events.id = next_events.id
        RETURNING outbox_events.id, outbox_events.event_id, outbox_events.event_type,
                  outbox_events.payload, outbox_events.meta, outbox_events.status,
                  outbox_events.attempts, outbox_events.locked_by, outbox_events.locked_at,
                  outbox_events.created_at, outbox_events.processed_at
        "#,
    )
    .bind(limit)
    .bind(worker_id)
    .bind(lock_timeout_sec.to_string())
    .fetch_all(&mut **tx)
    .await?;

    Ok(events)
}
