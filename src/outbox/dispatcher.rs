use std::str::FromStr;

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::correlation::Correlation;
use crate::domains::audit::service::{build_meta, insert_audit_log};

use super::model::{EventStatus, EventType, OutboxEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("event payload missing required field: {0}")]
    MissingPayloadField(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// `event_id` was already in the processed ledger; retired without
    /// re-running the handler (the idempotency gate, spec.md §4.3 step 1).
    AlreadyProcessed,
    /// The handler ran and the event is now DONE.
    Handled,
    /// The row was no longer `Processing` under our lock by the time we
    /// re-loaded it inside the dispatch transaction; dropped without
    /// touching it further (spec.md §4.4 step 2's defensive re-check).
    Dropped,
}

/// Run one claimed outbox row to completion inside `tx`.
///
/// All five steps of spec.md §4.3 — idempotency check, handler dispatch,
/// audit write, ledger insert, DONE transition — execute in this one
/// transaction. If any step errors, the caller rolls back and nothing here
/// is visible: no audit row, no dedupe marker, no DONE (spec.md §4.3).
pub async fn dispatch(
    tx: &mut Transaction<'_, Postgres>,
    correlation: &Correlation,
    event: &OutboxEvent,
) -> Result<DispatchOutcome, DispatchError> {
    let already_processed = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM processed_events WHERE event_id = $1",
    )
    .bind(&event.event_id)
    .fetch_optional(&mut **tx)
    .await?
    .is_some();

    if already_processed {
        retire_as_done(tx, event.id).await?;
        return Ok(DispatchOutcome::AlreadyProcessed);
    }

    let event_type = EventType::from_str(&event.event_type)
        .map_err(|_| DispatchError::UnknownEventType(event.event_type.clone()))?;

    let (action, entity_type, entity_id) = match event_type {
        EventType::NcCreated => (
            "NC_CREATED_HANDLED",
            "NonConformity",
            require_field(&event.payload, "nc_id")?,
        ),
        EventType::NcClosed => (
            "NC_CLOSED_HANDLED",
            "NonConformity",
            require_field(&event.payload, "nc_id")?,
        ),
        EventType::SupplierCertUpdated => (
            "SUPPLIER_CERT_UPDATED_HANDLED",
            "Supplier",
            require_field(&event.payload, "supplier_id")?,
        ),
    };

    let meta = build_meta(&event.payload, &event.meta, correlation);
    insert_audit_log(tx, "system", action, entity_type, &entity_id, meta).await?;

    sqlx::query("INSERT INTO processed_events (event_id) VALUES ($1)")
        .bind(&event.event_id)
        .execute(&mut **tx)
        .await?;

    retire_as_done(tx, event.id).await?;

    Ok(DispatchOutcome::Handled)
}

fn require_field(payload: &serde_json::Value, field: &'static str) -> Result<String, DispatchError> {
    payload
        .get(field)
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .ok_or(DispatchError::MissingPayloadField(field))
}

async fn retire_as_done(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE outbox_events
        SET status = $1, processed_at = $2, locked_by = NULL, locked_at = NULL
        WHERE id = $3
        "#,
    )
    .bind(EventStatus::Done)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
