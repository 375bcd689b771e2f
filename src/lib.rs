//! Core library for the QHSE supply-chain service.
//!
//! Two binaries share this crate: `api` (the synchronous HTTP surface) and
//! `worker` (the transactional-outbox drain loop). Both are built from the
//! same `Config` and `PgPool`.

pub mod config;
pub mod correlation;
pub mod domains;
pub mod error;
pub mod outbox;
pub mod server;

/// The migrations compiled into this binary. `migrate` runs them;
/// `/readyz` compares them against what's actually applied.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
