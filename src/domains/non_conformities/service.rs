//! Non-conformity lifecycle. Grounded on `nc_service.py`.

use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::correlation::Correlation;
use crate::error::ApiError;
use crate::outbox::{enqueue, EventType};

use super::model::{NonConformity, STATUS_CLOSED, STATUS_OPEN, VALID_SEVERITIES};

/// Create an NC and enqueue `NC_CREATED`, both inside `tx`.
///
/// If `supplier_id` doesn't exist, this returns `ApiError::Validation` (400)
/// before writing anything; the caller rolls the transaction back, so no NC
/// row and no outbox row are ever produced for a supplier-less NC (spec.md
/// §6, §8 property 1 / scenario S3). This mirrors `nc_service.py`, whose
/// missing-supplier `ValueError` is mapped to 400 by `routes_ncs.py` — unlike
/// `close_nc`'s missing-NC, which that same router maps to 404.
pub async fn create_nc(
    tx: &mut Transaction<'_, Postgres>,
    correlation: &Correlation,
    supplier_id: i64,
    severity: &str,
    description: &str,
) -> Result<NonConformity, ApiError> {
    if !VALID_SEVERITIES.contains(&severity) {
        return Err(ApiError::Validation(format!(
            "severity must be one of {:?}",
            VALID_SEVERITIES
        )));
    }

    let supplier_exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM suppliers WHERE id = $1")
        .bind(supplier_id)
        .fetch_optional(&mut **tx)
        .await?;
    if supplier_exists.is_none() {
        return Err(ApiError::Validation("supplier not found".to_string()));
    }

    let nc = sqlx::query_as::<_, NonConformity>(
        r#"
        INSERT INTO nonconformities (supplier_id, severity, status, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, supplier_id, severity, status, description, created_at
        "#,
    )
    .bind(supplier_id)
    .bind(severity)
    .bind(STATUS_OPEN)
    .bind(description)
    .fetch_one(&mut **tx)
    .await?;

    enqueue(
        tx,
        correlation,
        EventType::NcCreated,
        json!({
            "nc_id": nc.id,
            "supplier_id": nc.supplier_id,
            "severity": nc.severity,
        }),
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok(nc)
}

/// Close an open NC and enqueue `NC_CLOSED`. Closing an already-closed NC is
/// a no-op transition that still re-enqueues — the original does the same
/// unconditional flush-then-enqueue, and downstream handlers are idempotent
/// on `event_id` regardless.
pub async fn close_nc(
    tx: &mut Transaction<'_, Postgres>,
    correlation: &Correlation,
    nc_id: i64,
) -> Result<NonConformity, ApiError> {
    let nc = sqlx::query_as::<_, NonConformity>(
        r#"
        UPDATE nonconformities
        SET status = $2
        WHERE id = $1
        RETURNING id, supplier_id, severity, status, description, created_at
        "#,
    )
    .bind(nc_id)
    .bind(STATUS_CLOSED)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("non-conformity not found".to_string()))?;

    enqueue(tx, correlation, EventType::NcClosed, json!({ "nc_id": nc.id }))
        .await
        .map_err(ApiError::Internal)?;

    Ok(nc)
}

pub async fn list_ncs(
    pool: &PgPool,
    offset: i64,
    limit: i64,
    status: Option<&str>,
    severity: Option<&str>,
) -> Result<Vec<NonConformity>, ApiError> {
    let rows = sqlx::query_as::<_, NonConformity>(
        r#"
        SELECT id, supplier_id, severity, status, description, created_at
        FROM nonconformities
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR severity = $2)
        ORDER BY id ASC
        OFFSET $3
        LIMIT $4
        "#,
    )
    .bind(status)
    .bind(severity)
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
