use anyhow::Result;
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::correlation::Correlation;

use super::model::{EventStatus, EventType, OutboxEvent};

/// Append one outbox row to the caller's open transaction.
///
/// This never writes outside `tx` — if the caller rolls back, the row never
/// becomes visible to any other transaction, which is the whole point of the
/// transactional-outbox pattern (spec.md §4.1): the business fact and its
/// event are all-or-nothing.
pub async fn enqueue(
    tx: &mut Transaction<'_, Postgres>,
    correlation: &Correlation,
    event_type: EventType,
    mut payload: Value,
) -> Result<OutboxEvent> {
    if let (Some(obj), Some(rid)) = (payload.as_object_mut(), &correlation.request_id) {
        obj.entry("request_id")
            .or_insert_with(|| Value::String(rid.clone()));
    }

    let mut meta = serde_json::Map::new();
    correlation.merge_into(&mut meta);

    let event_id = Uuid::new_v4().to_string();

    let event = sqlx::query_as::<_, OutboxEvent>(
        r#"
        INSERT INTO outbox_events (event_id, event_type, payload, meta, status, attempts)
        VALUES ($1, $2, $3, $4, $5, 0)
        RETURNING id, event_id, event_type, payload, meta, status, attempts,
                  locked_by, locked_at, created_at, processed_at
        "#,
    )
    .bind(&event_id)
    .bind(event_type.as_str())
    .bind(&payload)
    .bind(Value::Object(meta))
    .bind(EventStatus::Pending)
    .fetch_one(&mut **tx)
    .await?;

    Ok(event)
}
