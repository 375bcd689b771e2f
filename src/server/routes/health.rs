//! Health and readiness endpoints — grounded on `app/main.py`'s
//! `/health`, `/healthz`, `/readyz` and on the teacher's `health_handler`
//! connection-pool reporting.
//!
//! Migration-alignment replaces the original's Alembic code-head/db-revision
//! comparison with sqlx's own `_sqlx_migrations` ledger: ready only once
//! every migration compiled into this binary (`sqlx::migrate!`) has been
//! applied and none are marked dirty.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::super::app::AppState;

#[derive(Debug, Serialize)]
pub struct StatusBody {
    status: String,
}

/// `GET /health` — legacy alias kept for backward compatibility.
pub async fn health() -> Json<StatusBody> {
    Json(StatusBody { status: "ok".to_string() })
}

/// `GET /healthz` — liveness: the process is up, no external calls made.
pub async fn healthz() -> Json<StatusBody> {
    Json(StatusBody { status: "ok".to_string() })
}

/// `GET /readyz` — readiness: DB connectivity, then migration alignment.
pub async fn readyz(Extension(state): Extension<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false);

    if !db_ok {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "db": { "ok": false }, "migrations": { "ok": true, "skipped": false } },
            })),
        );
    }

    // spec.md §6: "outside of test mode, schema migration head equals the
    // code's declared head" — in `ENV=test`, this check is skipped entirely
    // so integration tests don't need to fight the migrator's own bookkeeping.
    let skip_migrations = state.env == "test";
    let migrations_ok = skip_migrations || check_migrations_applied(&state.db_pool).await;

    if !migrations_ok {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "db": { "ok": true }, "migrations": { "ok": false, "skipped": false } },
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "checks": { "db": { "ok": true }, "migrations": { "ok": true, "skipped": skip_migrations } },
        })),
    )
}

async fn check_migrations_applied(pool: &sqlx::PgPool) -> bool {
    let applied: Vec<i64> = match sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
    {
        Ok(rows) => rows,
        Err(_) => return false,
    };

    crate::MIGRATOR
        .iter()
        .all(|m| applied.contains(&m.version))
}
