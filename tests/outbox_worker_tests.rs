//! Outbox lifecycle scenarios S1-S4 (spec.md §8): happy path, idempotency,
//! transactional atomicity, and poison-event retirement.

mod common;

use qhse_core::correlation::Correlation;
use qhse_core::domains::non_conformities::service as nc_service;
use qhse_core::domains::suppliers::service as supplier_service;
use qhse_core::outbox::model::EventStatus;
use qhse_core::outbox::worker::OutboxWorker;
use qhse_core::outbox::{enqueue, metrics::OutboxMetrics, EventType};
use serde_json::json;
use serial_test::serial;
use sqlx::Row;

// `run_once()` claims across the whole outbox table, not scoped to one
// test's own rows, so these tests must not run concurrently against the
// shared test database (`#[serial]`, grounded on the outbox test file in
// other_examples/ that does the same for the same reason).

fn worker(pool: sqlx::PgPool) -> OutboxWorker {
    let metrics = OutboxMetrics::new().expect("metrics init");
    OutboxWorker::new(pool, metrics, 10, 1, 5)
}

async fn outbox_count(pool: &sqlx::PgPool) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM outbox_events")
        .fetch_one(pool)
        .await
        .unwrap()
        .get("n")
}

/// S1 Happy path: create a supplier, raise an NC against it, run the worker
/// once, and observe DONE + exactly one ProcessedEvent + one AuditLog row.
#[tokio::test]
#[serial]
async fn s1_happy_path_drains_to_done() {
    let pool = common::test_pool().await;
    let correlation = Correlation::empty();

    let mut tx = pool.begin().await.unwrap();
    let supplier = supplier_service::create_supplier(&mut tx, &common::unique("acme"), None)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let nc = nc_service::create_nc(&mut tx, &correlation, supplier.id, "low", "paperwork missing")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let w = worker(pool.clone());
    let claimed = w.run_once().await.unwrap();
    assert_eq!(claimed, 1);

    let row: (String, String) = sqlx::query_as("SELECT status::text, event_id FROM outbox_events WHERE event_type = 'NC_CREATED' ORDER BY id DESC LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, "done");

    // Scoped by this event's own event_id, not a table-wide count: other
    // tests in this file share the same database and leave their own rows
    // behind (#[serial] only rules out concurrent writes, not prior ones).
    let processed_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM processed_events WHERE event_id = $1")
        .bind(&row.1)
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(processed_count, 1);

    let audit_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM audit_log WHERE entity_id = $1")
        .bind(nc.id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(audit_count, 1);

    let audit_action: String = sqlx::query("SELECT action FROM audit_log WHERE entity_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(nc.id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("action");
    assert_eq!(audit_action, "NC_CREATED_HANDLED");
}

/// S2 Idempotency: running the worker again after everything is DONE claims
/// nothing further, and the ledger/audit counts don't move.
#[tokio::test]
#[serial]
async fn s2_second_run_once_is_a_noop() {
    let pool = common::test_pool().await;
    let correlation = Correlation::empty();

    let mut tx = pool.begin().await.unwrap();
    let supplier = supplier_service::create_supplier(&mut tx, &common::unique("acme"), None)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    nc_service::create_nc(&mut tx, &correlation, supplier.id, "low", "paperwork missing")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let w = worker(pool.clone());
    assert_eq!(w.run_once().await.unwrap(), 1);

    let processed_before: i64 = sqlx::query("SELECT COUNT(*) AS n FROM processed_events")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    let audit_before: i64 = sqlx::query("SELECT COUNT(*) AS n FROM audit_log")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");

    assert_eq!(w.run_once().await.unwrap(), 0);

    let processed_after: i64 = sqlx::query("SELECT COUNT(*) AS n FROM processed_events")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    let audit_after: i64 = sqlx::query("SELECT COUNT(*) AS n FROM audit_log")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");

    assert_eq!(processed_before, processed_after);
    assert_eq!(audit_before, audit_after);
}

/// S3 Transactional outbox: creating an NC against a nonexistent supplier
/// rolls the whole transaction back, so no outbox row is ever produced. The
/// 400-vs-404 status mapping for this same scenario is covered at the HTTP
/// layer by `creating_nc_against_missing_supplier_is_bad_request` in
/// `api_http_tests.rs`; this test only checks the outbox-row side effect.
#[tokio::test]
#[serial]
async fn s3_failed_business_transaction_produces_no_outbox_row() {
    let pool = common::test_pool().await;
    let correlation = Correlation::empty();
    let before = outbox_count(&pool).await;

    let mut tx = pool.begin().await.unwrap();
    let result = nc_service::create_nc(&mut tx, &correlation, 999_999_999, "low", "x").await;
    assert!(result.is_err());
    tx.rollback().await.unwrap();

    let after = outbox_count(&pool).await;
    assert_eq!(before, after);
}

/// S4 Poison retirement: an event whose type the dispatcher can never
/// recognize is retried exactly MAX_ATTEMPTS times, then permanently FAILED,
/// and never reclaimed again.
#[tokio::test]
#[serial]
async fn s4_unknown_event_type_is_retired_after_max_attempts() {
    let pool = common::test_pool().await;
    let correlation = Correlation::empty();

    let mut tx = pool.begin().await.unwrap();
    let event = enqueue(&mut tx, &correlation, EventType::NcCreated, json!({"nc_id": 1}))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    // Corrupt this one freshly-enqueued row's event_type so it no longer
    // parses into the closed `EventType` set, simulating a poison event from
    // a future producer this binary doesn't recognize. Scoped by event_id,
    // not event_type: other tests in this file share the same database and
    // may already have their own (by now DONE) NC_CREATED rows sitting
    // around, which this must not touch.
    sqlx::query("UPDATE outbox_events SET event_type = 'SOMETHING_UNKNOWN' WHERE event_id = $1")
        .bind(&event.event_id)
        .execute(&pool)
        .await
        .unwrap();

    let w = worker(pool.clone());

    for _ in 0..5 {
        assert_eq!(w.run_once().await.unwrap(), 1);
    }

    let row: (String, i32) = sqlx::query_as(
        "SELECT status::text, attempts FROM outbox_events WHERE event_id = $1",
    )
    .bind(&event.event_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.0, "failed");
    assert_eq!(row.1, 5);

    let processed_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM processed_events WHERE event_id = $1")
        .bind(&event.event_id)
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(processed_count, 0);

    // FAILED is terminal: a further run_once must not reclaim it.
    assert_eq!(w.run_once().await.unwrap(), 0);
}

/// Universal property 1 generalized over EventStatus's invariants: DONE
/// implies processed_at is set and lock fields are cleared.
#[tokio::test]
#[serial]
async fn done_rows_have_processed_at_and_cleared_locks() {
    let pool = common::test_pool().await;
    let correlation = Correlation::empty();

    let mut tx = pool.begin().await.unwrap();
    let supplier = supplier_service::create_supplier(&mut tx, &common::unique("acme"), None)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    supplier_service::update_supplier_certification(&mut tx, &correlation, supplier.id, Some("2000-01-01"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let w = worker(pool.clone());
    assert_eq!(w.run_once().await.unwrap(), 1);

    let row: (String, Option<chrono::DateTime<chrono::Utc>>, Option<String>, Option<chrono::DateTime<chrono::Utc>>) =
        sqlx::query_as(
            "SELECT status::text, processed_at, locked_by, locked_at FROM outbox_events WHERE event_type = 'SUPPLIER_CERT_UPDATED' ORDER BY id DESC LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(row.0, "done");
    assert!(row.1.is_some());
    assert!(row.2.is_none());
    assert!(row.3.is_none());
    let _ = EventStatus::Done; // keep the import meaningful if status repr changes
}
