//! `GET /audit-log` — grounded on `routes_audit_log.py`.

use axum::extract::{Extension, Query};
use axum::Json;
use serde::Deserialize;

use crate::domains::audit::service::list_audit_logs;
use crate::domains::audit::AuditLog;
use crate::domains::auth::AuthUser;
use crate::error::ApiError;

use super::super::app::AppState;
use super::validate_pagination;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn list_audit_log(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    user.require_role(&["auditor", "admin"])?;

    let (limit, offset) = validate_pagination(q.limit, q.offset)?;

    let rows = list_audit_logs(&state.db_pool, offset, limit).await?;
    Ok(Json(rows))
}
