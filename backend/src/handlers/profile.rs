// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{error::AppError, models::score::MyScore, utils::jwt::Claims};

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize, FromRow)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub quizzes_created: i64,
    pub quizzes_completed: i64,
    pub total_score: i64,
}

/// Get current user's profile and statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT
            u.id, u.username, u.email, u.created_at,
            (SELECT COUNT(*) FROM quizzes WHERE creator_id = u.id) AS quizzes_created,
            (SELECT COUNT(*) FROM scores WHERE user_id = u.id) AS quizzes_completed,
            (SELECT COALESCE(SUM(total_score), 0) FROM scores WHERE user_id = u.id) AS total_score
        FROM users u
        WHERE u.id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(me))
}

/// List the current user's recorded scores, newest first.
pub async fn list_my_scores(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let scores = sqlx::query_as::<_, MyScore>(
        r#"
        SELECT
            s.quiz_id, q.title AS quiz_title,
            s.total_score, s.max_points, s.percentage, s.completed_at
        FROM scores s
        JOIN quizzes q ON q.id = s.quiz_id
        WHERE s.user_id = ?1
        ORDER BY s.completed_at DESC, s.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(scores))
}
