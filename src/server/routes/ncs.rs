use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::correlation::Correlation;
use crate::domains::auth::AuthUser;
use crate::domains::non_conformities::model::NonConformity;
use crate::domains::non_conformities::service;
use crate::error::ApiError;

use super::super::app::AppState;
use super::validate_pagination;

#[derive(Debug, Deserialize)]
pub struct NcCreate {
    pub supplier_id: i64,
    pub severity: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<String>,
    pub severity: Option<String>,
}

fn default_limit() -> i64 {
    20
}

/// `POST /ncs` (grounded on `routes_ncs.py::post_nc`).
pub async fn create_nc(
    Extension(state): Extension<AppState>,
    Extension(correlation): Extension<Correlation>,
    user: AuthUser,
    Json(payload): Json<NcCreate>,
) -> Result<(StatusCode, Json<NonConformity>), ApiError> {
    user.require_role(&["quality", "admin"])?;

    if payload.description.trim().is_empty() {
        return Err(ApiError::Validation("description must not be empty".to_string()));
    }

    let mut tx = state.db_pool.begin().await?;
    let nc = service::create_nc(
        &mut tx,
        &correlation,
        payload.supplier_id,
        &payload.severity,
        payload.description.trim(),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(nc)))
}

/// `PATCH /ncs/{nc_id}/close`.
pub async fn close_nc(
    Extension(state): Extension<AppState>,
    Extension(correlation): Extension<Correlation>,
    user: AuthUser,
    Path(nc_id): Path<i64>,
) -> Result<Json<NonConformity>, ApiError> {
    user.require_role(&["quality", "admin"])?;

    let mut tx = state.db_pool.begin().await?;
    let nc = service::close_nc(&mut tx, &correlation, nc_id).await?;
    tx.commit().await?;

    Ok(Json(nc))
}

/// `GET /ncs`.
pub async fn list_ncs(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<NonConformity>>, ApiError> {
    user.require_role(&["auditor", "quality", "procurement", "admin"])?;

    let (limit, offset) = validate_pagination(q.limit, q.offset)?;
    let rows = service::list_ncs(
        &state.db_pool,
        offset,
        limit,
        q.status.as_deref(),
        q.severity.as_deref(),
    )
    .await?;

    Ok(Json(rows))
}
