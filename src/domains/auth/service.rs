//! Static-user login and JWT issuance/verification.
//!
//! Grounded on `app/auth.py`'s `STATIC_USERS` table and HS256
//! encode/decode, restructured around the teacher's `JwtService` shape
//! (`packages/server/src/domains/auth`) rather than FastAPI's
//! `Depends(security)` dependency-injection idiom.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT claims. `exp` is seconds since epoch, as `jsonwebtoken` expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: String,
}

impl AuthUser {
    /// Mirrors `require_role` (`app/auth.py`): reject with 403 if this
    /// user's role isn't in `allowed`.
    pub fn require_role(&self, allowed: &[&str]) -> Result<(), ApiError> {
        if allowed.contains(&self.role.as_str()) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Extracted from request extensions, populated by `jwt_auth_middleware`
/// when the request carries a valid bearer token. Missing or invalid tokens
/// surface here as `ApiError::Unauthorized`, matching the original's
/// `get_current_user` dependency.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

pub struct JwtService {
    secret: String,
    access_token_expire_min: i64,
}

impl JwtService {
    pub fn new(secret: impl Into<String>, access_token_expire_min: i64) -> Self {
        Self {
            secret: secret.into(),
            access_token_expire_min,
        }
    }

    pub fn create_token(&self, username: &str, role: &str) -> Result<String, ApiError> {
        let exp = Utc::now() + Duration::minutes(self.access_token_expire_min);
        let claims = Claims {
            sub: username.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(e.into()))
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            username: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// The four demo accounts the original service shipped with. Credentials
/// are intentionally static — this is a QHSE demo surface, not a real
/// identity provider (spec.md Non-goals).
fn static_users() -> &'static [(&'static str, &'static str, &'static str)] {
    &[
        ("quality", "quality", "quality"),
        ("procurement", "procurement", "procurement"),
        ("auditor", "auditor", "auditor"),
        ("admin", "admin", "admin"),
    ]
}

/// Check a username/password pair against the static user table and return
/// its role, or `ApiError::Unauthorized` if either doesn't match.
pub fn authenticate(username: &str, password: &str) -> Result<&'static str, ApiError> {
    static_users()
        .iter()
        .find(|(u, p, _)| *u == username && *p == password)
        .map(|(_, _, role)| *role)
        .ok_or(ApiError::Unauthorized)
}
