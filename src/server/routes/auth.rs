use axum::extract::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domains::auth::authenticate;
use crate::error::ApiError;

use super::super::app::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// `POST /auth/login` — grounded on `routes_auth.py`'s static-user login.
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let role = authenticate(&payload.username, &payload.password)?;
    let access_token = state.jwt_service.create_token(&payload.username, role)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
