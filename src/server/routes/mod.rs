pub mod audit_log;
pub mod auth;
pub mod health;
pub mod kpi;
pub mod ncs;
pub mod suppliers;

use crate::error::ApiError;

/// Validate `limit`/`offset` query bounds shared by every paginated listing
/// (spec.md §6: `limit∈[1,100]`, `offset≥0`). The original relied on
/// FastAPI's `Query(ge=.., le=..)`; axum has no built-in equivalent, so this
/// is the explicit check spec.md §7 requires ("bad pagination bounds" is a
/// `Validation` error, not a silent clamp).
pub(super) fn validate_pagination(limit: i64, offset: i64) -> Result<(i64, i64), ApiError> {
    if !(1..=100).contains(&limit) {
        return Err(ApiError::Validation("limit must be between 1 and 100".to_string()));
    }
    if offset < 0 {
        return Err(ApiError::Validation("offset must be >= 0".to_string()));
    }
    Ok((limit, offset))
}
