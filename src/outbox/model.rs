use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Lifecycle state of one outbox row. Backed by a native Postgres enum
/// (`outbox_status`) since only this crate ever writes a value here — unlike
/// `event_type`, which must tolerate values the closed Rust enum doesn't
/// recognize (see `EventType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_status", rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

/// The closed set of business events this service knows how to handle.
///
/// `event_type` is stored as plain text, not a database enum, so that a
/// poison event with an unrecognized type can still be inserted (directly, or
/// by a future producer running code this binary hasn't caught up to yet) and
/// observed failing through the normal retry-then-FAILED path instead of
/// being rejected at the schema level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    NcCreated,
    NcClosed,
    SupplierCertUpdated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NcCreated => "NC_CREATED",
            EventType::NcClosed => "NC_CLOSED",
            EventType::SupplierCertUpdated => "SUPPLIER_CERT_UPDATED",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NC_CREATED" => Ok(EventType::NcCreated),
            "NC_CLOSED" => Ok(EventType::NcClosed),
            "SUPPLIER_CERT_UPDATED" => Ok(EventType::SupplierCertUpdated),
            _ => Err(()),
        }
    }
}

/// One row of the outbox. Invariants (spec.md §3):
/// - `status = Processing` implies `locked_by`/`locked_at` are both set.
/// - `status in {Pending, Failed}` implies both are null.
/// - `status = Done` implies `processed_at` is set and `event_id` is in
///   `processed_events`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub payload: Value,
    pub meta: Value,
    pub status: EventStatus,
    pub attempts: i32,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
