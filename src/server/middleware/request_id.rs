//! Request-id middleware.
//!
//! Grounded on `RequestIdMiddleware` (`app/main.py`): read an incoming
//! `X-Request-Id` header if present and non-blank, otherwise mint one;
//! stash it on the request as a `Correlation` extension for handlers and
//! outbox `enqueue` calls to pick up, and echo it back on the response.
//! The original threads this through a contextvar; here it's the explicit
//! `Correlation` extension instead (see `crate::correlation`).

use axum::extract::{Extension, Request};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::correlation::Correlation;

use super::super::app::AppState;

pub async fn request_id_middleware(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_name = state.request_id_header.as_str();

    let incoming = request
        .headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let request_id = incoming.unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(Correlation::new(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(
            axum::http::HeaderName::from_bytes(header_name.as_bytes())
                .unwrap_or_else(|_| axum::http::HeaderName::from_static("x-request-id")),
            value,
        );
    }

    response
}
