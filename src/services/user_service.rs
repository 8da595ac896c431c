//! User Service - staff accounts and login

use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::auth::{self, ROLE_ADMIN, ROLE_CASHIER};
use crate::models::user::{self, Entity as User};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: user::Model,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

const MIN_PASSWORD_LEN: usize = 6;

pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>, DomainError> {
    Ok(User::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await?)
}

/// Check credentials and issue a bearer token
pub async fn login(db: &DatabaseConnection, req: LoginRequest) -> Result<LoginResponse, DomainError> {
    // Same message for unknown user and wrong password
    let invalid = || DomainError::Unauthorized("Invalid credentials".to_string());

    let user = find_by_username(db, &req.username).await?.ok_or_else(invalid)?;
    let matches = auth::verify_password(&req.password, &user.password_hash)
        .map_err(DomainError::Internal)?;
    if !matches {
        tracing::warn!("Failed login attempt for '{}'", user.username);
        return Err(invalid());
    }
    if !user.is_active {
        return Err(DomainError::Unauthorized("Account is disabled".to_string()));
    }

    let token = auth::create_jwt(&user.username, &user.role).map_err(DomainError::Internal)?;
    tracing::info!("User '{}' logged in", user.username);

    Ok(LoginResponse { token, user })
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, DomainError> {
    Ok(User::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

pub async fn create_user(
    db: &DatabaseConnection,
    req: CreateUserRequest,
) -> Result<user::Model, DomainError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(DomainError::validation("Username is required"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let role = req.role.unwrap_or_else(|| ROLE_CASHIER.to_string());
    if role != ROLE_ADMIN && role != ROLE_CASHIER {
        return Err(DomainError::validation(format!("Unknown role '{}'", role)));
    }
    if find_by_username(db, &username).await?.is_some() {
        return Err(DomainError::conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }

    let password_hash = auth::hash_password(&req.password).map_err(DomainError::Internal)?;
    let now = chrono::Utc::now().to_rfc3339();
    let user = user::ActiveModel {
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created {} account '{}'", user.role, user.username);
    Ok(user)
}

/// Enable or disable an account. An admin cannot disable their own account.
pub async fn set_active(
    db: &DatabaseConnection,
    id: i32,
    is_active: bool,
    acting_username: &str,
) -> Result<user::Model, DomainError> {
    let user = User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("User"))?;

    if !is_active && user.username == acting_username {
        return Err(DomainError::conflict("You cannot disable your own account"));
    }

    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(db).await?)
}
