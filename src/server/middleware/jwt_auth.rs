//! JWT bearer-token middleware.
//!
//! Shaped after the teacher's `jwt_auth_middleware` (`server/middleware/jwt_auth.rs`):
//! extract the token, verify it, and insert `AuthUser` into request
//! extensions if it checks out. Unlike the teacher, a missing/invalid token
//! is not silently treated as anonymous — most routes here require a role,
//! so the `AuthUser` extractor itself rejects with 401 when the extension
//! is absent (`/auth/login` and the health endpoints are the only routes
//! that never look for it).

use axum::extract::{Extension, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::domains::auth::AuthUser;

use super::super::app::AppState;

pub async fn jwt_auth_middleware(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = extract_auth_user(&request, &state) {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

fn extract_auth_user(request: &Request, state: &AppState) -> Option<AuthUser> {
    let header = request.headers().get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value);

    state.jwt_service.verify_token(token).ok()
}
