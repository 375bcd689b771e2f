//! Application setup and router assembly.
//!
//! Shaped after the teacher's `build_app`/`AxumAppState` (`server/app.rs`):
//! shared state in an `Extension`, middleware layered outside-in, CORS and
//! `TraceLayer` wrapping everything. This service has no GraphQL schema or
//! seesaw engine to thread through, so the state is just the pool, the JWT
//! service, and config.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::routing::{get, patch, post};
use axum::{middleware as axum_middleware, Extension, Router};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::auth::JwtService;

use super::middleware::{jwt_auth_middleware, request_id_middleware};
use super::routes::{audit_log, auth, health, kpi, ncs, suppliers};

/// Shared application state, cloned into every request via `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: Arc<JwtService>,
    pub request_id_header: String,
    /// `Config::env`, carried so `/readyz` can skip migration-alignment in
    /// test mode (spec.md §4.6, §6: "outside of test mode").
    pub env: String,
}

pub fn build_app(pool: PgPool, config: &Config) -> Router {
    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.access_token_expire_min));

    let state = AppState {
        db_pool: pool,
        jwt_service,
        request_id_header: config.request_id_header.clone(),
        env: config.env.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/auth/login", post(auth::login))
        .route("/suppliers", post(suppliers::create_supplier))
        .route("/suppliers", get(suppliers::list_suppliers))
        .route("/suppliers/:supplier_id", get(suppliers::get_supplier))
        .route(
            "/suppliers/:supplier_id/certification",
            patch(suppliers::patch_certification),
        )
        .route("/ncs", post(ncs::create_nc))
        .route("/ncs", get(ncs::list_ncs))
        .route("/ncs/:nc_id/close", patch(ncs::close_nc))
        .route("/kpi", get(kpi::get_kpi))
        .route("/audit-log", get(audit_log::list_audit_log));

    router
        .layer(axum_middleware::from_fn(jwt_auth_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
