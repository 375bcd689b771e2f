//! `GET /kpi` — grounded on `routes_kpi.py::get_kpi`.

use axum::extract::Extension;
use axum::Json;
use serde::Serialize;
use std::collections::HashSet;

use crate::domains::auth::AuthUser;
use crate::domains::suppliers::service::is_cert_expired;
use crate::error::ApiError;

use super::super::app::AppState;

#[derive(Debug, Serialize)]
pub struct Kpi {
    pub nc_open: i64,
    pub nc_open_high: i64,
    pub nc_closed: i64,
    pub outbox_pending: i64,
    pub outbox_failed: i64,
    pub suppliers_at_risk: i64,
    pub audit_events_total: i64,
}

pub async fn get_kpi(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<Kpi>, ApiError> {
    user.require_role(&["auditor", "quality", "admin"])?;

    let pool = &state.db_pool;

    let nc_open: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nonconformities WHERE status = 'OPEN'")
        .fetch_one(pool)
        .await?;

    let nc_open_high: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM nonconformities WHERE status = 'OPEN' AND severity = 'high'",
    )
    .fetch_one(pool)
    .await?;

    let nc_closed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nonconformities WHERE status = 'CLOSED'")
        .fetch_one(pool)
        .await?;

    let outbox_pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE status = 'pending'")
        .fetch_one(pool)
        .await?;

    let outbox_failed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE status = 'failed'")
        .fetch_one(pool)
        .await?;

    let audit_events_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
        .fetch_one(pool)
        .await?;

    // Suppliers at risk = cert expired OR at least one OPEN high-severity NC
    // (routes_kpi.py computes this as a set union; done here in app code
    // since the date parse lives in Rust, not SQL, per spec.md §9).
    let suppliers: Vec<(i64, Option<String>)> =
        sqlx::query_as("SELECT id, certification_expiry FROM suppliers")
            .fetch_all(pool)
            .await?;

    let mut at_risk: HashSet<i64> = suppliers
        .into_iter()
        .filter(|(id, expiry)| is_cert_expired(expiry.as_deref(), *id))
        .map(|(id, _)| id)
        .collect();

    let nc_high_supplier_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT DISTINCT supplier_id FROM nonconformities WHERE status = 'OPEN' AND severity = 'high'",
    )
    .fetch_all(pool)
    .await?;
    at_risk.extend(nc_high_supplier_ids);

    Ok(Json(Kpi {
        nc_open,
        nc_open_high,
        nc_closed,
        outbox_pending,
        outbox_failed,
        suppliers_at_risk: at_risk.len() as i64,
        audit_events_total,
    }))
}
