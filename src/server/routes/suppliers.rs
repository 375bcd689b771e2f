use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::correlation::Correlation;
use crate::domains::auth::AuthUser;
use crate::domains::suppliers::model::{Supplier, SupplierDetail};
use crate::domains::suppliers::service;
use crate::error::ApiError;

use super::super::app::AppState;
use super::validate_pagination;

#[derive(Debug, Deserialize)]
pub struct SupplierCreate {
    pub name: String,
    pub certification_expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierCertUpdate {
    pub certification_expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// `POST /suppliers` (grounded on `routes_suppliers.py::post_supplier`).
pub async fn create_supplier(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Json(payload): Json<SupplierCreate>,
) -> Result<(StatusCode, Json<Supplier>), ApiError> {
    user.require_role(&["procurement", "admin"])?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }

    let mut tx = state.db_pool.begin().await?;
    let supplier = service::create_supplier(
        &mut tx,
        payload.name.trim(),
        payload.certification_expiry.as_deref(),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

/// `GET /suppliers`.
pub async fn list_suppliers(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    user.require_role(&["auditor", "quality", "procurement", "admin"])?;

    let (limit, offset) = validate_pagination(q.limit, q.offset)?;
    let rows = service::list_suppliers(&state.db_pool, offset, limit).await?;
    Ok(Json(rows))
}

/// `GET /suppliers/{supplier_id}`.
pub async fn get_supplier(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Path(supplier_id): Path<i64>,
) -> Result<Json<SupplierDetail>, ApiError> {
    user.require_role(&["auditor", "quality", "procurement", "admin"])?;

    let detail = service::get_supplier_detail(&state.db_pool, supplier_id).await?;
    Ok(Json(detail))
}

/// `PATCH /suppliers/{supplier_id}/certification`.
pub async fn patch_certification(
    Extension(state): Extension<AppState>,
    Extension(correlation): Extension<Correlation>,
    user: AuthUser,
    Path(supplier_id): Path<i64>,
    Json(payload): Json<SupplierCertUpdate>,
) -> Result<Json<Supplier>, ApiError> {
    user.require_role(&["procurement", "admin"])?;

    let mut tx = state.db_pool.begin().await?;
    let supplier = service::update_supplier_certification(
        &mut tx,
        &correlation,
        supplier_id,
        payload.certification_expiry.as_deref(),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(supplier))
}
