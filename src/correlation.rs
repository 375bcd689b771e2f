//! Explicit correlation context.
//!
//! The source this service was distilled from kept the request id in a
//! thread/task-local contextvar with implicit reads from deep inside the ORM
//! layer. That is convenient in a dynamic language but hides a dependency: any
//! function that touches `AuditLog` or `OutboxEvent` secretly reads global
//! mutable state. Here `Correlation` is instead an explicit value, produced
//! once per request (by HTTP middleware) or once per claimed event (by the
//! worker), and threaded through every service/outbox call that needs it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Correlation metadata ambient to one request or one claimed outbox event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Correlation {
    pub request_id: Option<String>,
    pub traceparent: Option<String>,
}

impl Correlation {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            traceparent: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the ambient register a worker uses while processing one claimed
    /// event, reading `request_id`/`traceparent` back out of the event's
    /// `meta` JSON. Falls back to a batch-scoped id so unrelated log lines
    /// are still groupable even when the originating request carried none.
    pub fn from_event_meta(meta: &Value, batch_id: &str) -> Self {
        let request_id = meta
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(batch_id.to_string()));

        let traceparent = meta
            .get("traceparent")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            request_id,
            traceparent,
        }
    }

    /// Merge this correlation's fields into a JSON meta object, without
    /// overwriting keys the caller already set.
    pub fn merge_into(&self, meta: &mut serde_json::Map<String, Value>) {
        if let Some(rid) = &self.request_id {
            meta.entry("request_id")
                .or_insert_with(|| Value::String(rid.clone()));
        }
        if let Some(tp) = &self.traceparent {
            meta.entry("traceparent")
                .or_insert_with(|| Value::String(tp.clone()));
        }
    }
}

/// A fresh opaque id a worker batch can fall back on when correlating logs
/// for events that carry no originating request id.
pub fn new_batch_id() -> String {
    format!("worker:{}", Uuid::new_v4())
}
