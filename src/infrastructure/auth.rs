use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::env;

use axum::{
    async_trait,
    extract::{FromRequestParts, Json, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::models::user;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CASHIER: &str = "cashier";

type AuthRejection = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

fn unauthorized(msg: &str) -> AuthRejection {
    (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": msg })))
}

fn claims_from_headers(headers: &HeaderMap) -> Result<Claims, AuthRejection> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid Authorization header format"))?;

    decode_jwt(token).map_err(|_| unauthorized("Invalid or expired token"))
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Already validated by `require_auth`
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(claims.clone());
        }
        claims_from_headers(&parts.headers)
    }
}

/// Middleware rejecting requests without a valid bearer token.
/// The account must still exist and be active; its current role replaces
/// the one baked into the token. The claims are stored in the request extensions.
pub async fn require_auth(
    State(db): State<DatabaseConnection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let mut claims = claims_from_headers(request.headers())?;

    let account = user::Entity::find()
        .filter(user::Column::Username.eq(claims.sub.as_str()))
        .one(&db)
        .await
        .map_err(|e| {
            tracing::error!("Account lookup failed for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Internal server error" })),
            )
        })?;

    match account {
        Some(account) if account.is_active => claims.role = account.role,
        _ => {
            tracing::debug!("Rejected token for inactive or unknown account {}", claims.sub);
            return Err(unauthorized("Account is disabled or no longer exists"));
        }
    }

    tracing::trace!("Authenticated request from {}", claims.sub);
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

pub fn create_jwt(username: &str, role: &str) -> Result<String, String> {
    let secret = get_jwt_secret();
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(12))
        .ok_or_else(|| "invalid expiration timestamp".to_string())?
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        role: role.to_owned(),
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_round_trips_claims() {
        let token = create_jwt("alice", ROLE_CASHIER).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", format!("Bearer {}", token).parse().unwrap());

        let claims = claims_from_headers(&headers).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(!claims.is_admin());
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Basic abc".parse().unwrap());

        let (status, _) = claims_from_headers(&headers).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
