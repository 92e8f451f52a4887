// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{CreateUserRequest, LoginRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let existing = sqlx::query_as::<_, (String, String)>(
        "SELECT username, email FROM users WHERE username = ?1 OR email = ?2 LIMIT 1",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await?;

    if let Some((username, _)) = existing {
        return Err(if username == payload.username {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            AppError::Conflict("Email is already registered".to_string())
        });
    }

    let hashed_password = hash_password(&payload.password)?;

    let id = sqlx::query("INSERT INTO users (username, email, password, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&payload.username)
        .bind(&payload.email)
        .bind(&hashed_password)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| {
            // Lost a race against a concurrent registration.
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", payload.username))
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?
        .last_insert_rowid();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, created_at FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Registered user {} (id {})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the username and password against the database.
/// If valid, signs a JWT token with the user's ID.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, created_at FROM users WHERE username = ?1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Same message for both cases so usernames cannot be probed.
    let user = user.ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.username,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}
