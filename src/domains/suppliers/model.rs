use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A supplier in the QHSE register. `certification_expiry` is stored as the
/// calendar-date string the original system used (`YYYY-MM-DD`); KPI and
/// detail views parse it into a typed date rather than string-comparing it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub certification_expiry: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Supplier detail view: the row plus NC aggregates and risk flag computed
/// against it.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierDetail {
    pub id: i64,
    pub name: String,
    pub certification_expiry: Option<String>,
    pub nc_total: i64,
    pub nc_open: i64,
    pub nc_open_high: i64,
    pub is_at_risk: bool,
}
