// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::score::{GlobalLeaderboardEntry, LeaderboardParams, QuizLeaderboardEntry},
};

const LEADERBOARD_LIMIT: i64 = 100;

/// Retrieves the leaderboard.
///
/// * With `?quiz_id=N`: ranking of that quiz's stored scores.
/// * Without: global ranking, the sum of each user's scores over all quizzes.
///
/// Ties rank by earliest completion (per quiz) or by username (global).
pub async fn get_leaderboard(
    State(pool): State<SqlitePool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    match params.quiz_id {
        Some(quiz_id) => quiz_leaderboard(&pool, quiz_id).await,
        None => global_leaderboard(&pool).await,
    }
}

async fn quiz_leaderboard(pool: &SqlitePool, quiz_id: i64) -> Result<Json<serde_json::Value>, AppError> {
    let title: String = sqlx::query_scalar("SELECT title FROM quizzes WHERE id = ?1")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let entries = sqlx::query_as::<_, QuizLeaderboardEntry>(
        r#"
        SELECT
            ROW_NUMBER() OVER (ORDER BY s.total_score DESC, s.completed_at ASC, s.id ASC) AS "rank",
            u.id AS user_id,
            u.username,
            s.total_score AS score,
            s.percentage,
            s.completed_at
        FROM scores s
        JOIN users u ON u.id = s.user_id
        WHERE s.quiz_id = ?1
        ORDER BY "rank"
        LIMIT ?2
        "#,
    )
    .bind(quiz_id)
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "type": "quiz",
        "quiz_id": quiz_id,
        "quiz_title": title,
        "leaderboard": entries,
    })))
}

async fn global_leaderboard(pool: &SqlitePool) -> Result<Json<serde_json::Value>, AppError> {
    let entries = sqlx::query_as::<_, GlobalLeaderboardEntry>(
        r#"
        SELECT
            ROW_NUMBER() OVER (ORDER BY SUM(s.total_score) DESC, u.username ASC) AS "rank",
            u.id AS user_id,
            u.username,
            SUM(s.total_score) AS total_score,
            COUNT(s.id) AS quizzes_completed
        FROM scores s
        JOIN users u ON u.id = s.user_id
        GROUP BY u.id, u.username
        ORDER BY "rank"
        LIMIT ?1
        "#,
    )
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch global leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "type": "global",
        "leaderboard": entries,
    })))
}
