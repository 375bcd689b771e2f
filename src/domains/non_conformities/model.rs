use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A non-conformity raised against a supplier. `severity` and `status` are
/// plain text, not database enums, mirroring `event_type`'s rationale: this
/// keeps filtering (`?severity=`, `?status=`) a straight string comparison
/// without a cast, and the closed set is enforced at the service boundary.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NonConformity {
    pub id: i64,
    pub supplier_id: i64,
    pub severity: String,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

pub const VALID_SEVERITIES: [&str; 3] = ["low", "medium", "high"];
pub const STATUS_OPEN: &str = "OPEN";
pub const STATUS_CLOSED: &str = "CLOSED";
