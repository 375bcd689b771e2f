use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// An append-only audit trail row. Written once per handled outbox event, in
/// the same transaction as the event's DONE transition and the processed-
/// event dedupe marker (spec.md §3).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}
