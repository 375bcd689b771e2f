//! Supplier register service. Grounded on `supplier_service.py`, translated
//! from SQLAlchemy flush/ValueError to sqlx/`ApiError`.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use crate::correlation::Correlation;
use crate::error::{map_unique_violation, ApiError};
use crate::outbox::{enqueue, EventType};

use super::model::{Supplier, SupplierDetail};

pub async fn create_supplier(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    certification_expiry: Option<&str>,
) -> Result<Supplier, ApiError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT 1 FROM suppliers WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("supplier name already exists".to_string()));
    }

    // The `SELECT` above is a fast path, not the guarantee: a concurrent
    // insert of the same name between that check and this one would
    // otherwise surface as an unmapped 500 instead of the 400 the original
    // returns for this conflict.
    let supplier = sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO suppliers (name, certification_expiry)
        VALUES ($1, $2)
        RETURNING id, name, certification_expiry, created_at
        "#,
    )
    .bind(name)
    .bind(certification_expiry)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_unique_violation(e, "supplier name already exists"))?;

    Ok(supplier)
}

pub async fn list_suppliers(pool: &PgPool, offset: i64, limit: i64) -> Result<Vec<Supplier>, ApiError> {
    let rows = sqlx::query_as::<_, Supplier>(
        r#"
        SELECT id, name, certification_expiry, created_at
        FROM suppliers
        ORDER BY id ASC
        OFFSET $1
        LIMIT $2
        "#,
    )
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate NC counts and compute the risk flag for one supplier.
///
/// `certification_expiry` is parsed as a calendar date rather than
/// string-compared against "today" (the original's `func.to_date` cast in
/// `routes_kpi.py`): a malformed value is logged and treated as not-expired
/// rather than silently miscompared, per spec.md §9's recommendation.
pub async fn get_supplier_detail(pool: &PgPool, supplier_id: i64) -> Result<SupplierDetail, ApiError> {
    let supplier = sqlx::query_as::<_, Supplier>(
        "SELECT id, name, certification_expiry, created_at FROM suppliers WHERE id = $1",
    )
    .bind(supplier_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("supplier not found".to_string()))?;

    let nc_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nonconformities WHERE supplier_id = $1")
        .bind(supplier_id)
        .fetch_one(pool)
        .await?;

    let nc_open: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM nonconformities WHERE supplier_id = $1 AND status = 'OPEN'",
    )
    .bind(supplier_id)
    .fetch_one(pool)
    .await?;

    let nc_open_high: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM nonconformities WHERE supplier_id = $1 AND status = 'OPEN' AND severity = 'high'",
    )
    .bind(supplier_id)
    .fetch_one(pool)
    .await?;

    let cert_expired = is_cert_expired(supplier.certification_expiry.as_deref(), supplier_id);
    let is_at_risk = cert_expired || nc_open_high > 0;

    Ok(SupplierDetail {
        id: supplier.id,
        name: supplier.name,
        certification_expiry: supplier.certification_expiry,
        nc_total,
        nc_open,
        nc_open_high,
        is_at_risk,
    })
}

/// Update a supplier's certification expiry and enqueue
/// `SUPPLIER_CERT_UPDATED` in the same transaction.
pub async fn update_supplier_certification(
    tx: &mut Transaction<'_, Postgres>,
    correlation: &Correlation,
    supplier_id: i64,
    certification_expiry: Option<&str>,
) -> Result<Supplier, ApiError> {
    let supplier = sqlx::query_as::<_, Supplier>(
        r#"
        UPDATE suppliers
        SET certification_expiry = $2
        WHERE id = $1
        RETURNING id, name, certification_expiry, created_at
        "#,
    )
    .bind(supplier_id)
    .bind(certification_expiry)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("supplier not found".to_string()))?;

    enqueue(
        tx,
        correlation,
        EventType::SupplierCertUpdated,
        json!({
            "supplier_id": supplier.id,
            "certification_expiry": supplier.certification_expiry,
        }),
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok(supplier)
}

/// `true` if `expiry` parses as a date strictly before today (UTC). A
/// present-but-unparseable value is logged and treated as not-expired so one
/// bad row can't silently hide a KPI signal or crash the detail view.
pub fn is_cert_expired(expiry: Option<&str>, supplier_id: i64) -> bool {
    let Some(expiry) = expiry else { return false };
    if expiry.is_empty() {
        return false;
    }
    match NaiveDate::parse_from_str(expiry, "%Y-%m-%d") {
        Ok(date) => date < Utc::now().date_naive(),
        Err(e) => {
            warn!(supplier_id, expiry, error = %e, "malformed certification_expiry, treating as not expired");
            false
        }
    }
}
