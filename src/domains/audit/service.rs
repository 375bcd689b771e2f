use anyhow::Result;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use crate::correlation::Correlation;

use super::model::AuditLog;

/// Merge an event's payload with the correlation context into one audit
/// `meta` object. Precedence: a `request_id` already present in the event's
/// own meta (i.e. the one that travelled with it since enqueue) wins over the
/// handler's own ambient correlation; if neither has one, the key is omitted
/// entirely rather than written as null (spec.md §4.3).
pub fn build_meta(payload: &Value, event_meta: &Value, ambient: &Correlation) -> Value {
    let mut merged = payload.as_object().cloned().unwrap_or_default();

    if let Some(rid) = event_meta.get("request_id").and_then(Value::as_str) {
        merged.insert("request_id".to_string(), Value::String(rid.to_string()));
    } else if let Some(rid) = &ambient.request_id {
        merged.insert("request_id".to_string(), Value::String(rid.clone()));
    }

    Value::Object(merged)
}

/// Insert one audit row inside the caller's transaction.
pub async fn insert_audit_log(
    tx: &mut Transaction<'_, Postgres>,
    actor: &str,
    action: &str,
    entity_type: &str,
    entity_id: &str,
    meta: Value,
) -> Result<AuditLog> {
    let row = sqlx::query_as::<_, AuditLog>(
        r#"
        INSERT INTO audit_log (actor, action, entity_type, entity_id, meta)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, actor, action, entity_type, entity_id, meta, created_at
        "#,
    )
    .bind(actor)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(meta)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

/// Latest-first paginated audit log listing (spec.md §6 `/audit-log`).
pub async fn list_audit_logs(pool: &PgPool, offset: i64, limit: i64) -> Result<Vec<AuditLog>> {
    let rows = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT id, actor, action, entity_type, entity_id, meta, created_at
        FROM audit_log
        ORDER BY id DESC
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
