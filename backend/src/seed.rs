// src/seed.rs

//! Demo data for local development, enabled with `SEED_DEMO_DATA=true`.

use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    grading::percentage,
    handlers::quiz::insert_quiz,
    models::quiz::CreateQuizRequest,
    utils::hash::hash_password,
};

const DEMO_PASSWORD: &str = "password123";

/// Seeds two users, two public quizzes and two scores.
///
/// Does nothing if any user exists. Returns whether data was inserted.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<bool, AppError> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if users > 0 {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now();

    let mut user_ids = Vec::new();
    for (username, email) in [("alice", "alice@example.com"), ("bob", "bob@example.com")] {
        let id = sqlx::query("INSERT INTO users (username, email, password, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(username)
            .bind(email)
            .bind(hash_password(DEMO_PASSWORD)?)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        user_ids.push(id);
    }
    let (alice, bob) = (user_ids[0], user_ids[1]);

    let general = demo_quiz(json!({
        "title": "Quiz de Culture Générale",
        "description": "Testez vos connaissances générales !",
        "questions": [
            {
                "kind": "binary_choice",
                "content": "La Tour Eiffel mesure 330 mètres de hauteur.",
                "points": 1,
                "options": [
                    { "label": "Vrai", "is_correct": true },
                    { "label": "Faux", "is_correct": false }
                ]
            },
            {
                "kind": "multi_select",
                "content": "Quels sont les pays frontaliers de la France ?",
                "points": 3,
                "options": [
                    { "label": "Espagne", "is_correct": true },
                    { "label": "Allemagne", "is_correct": true },
                    { "label": "Pologne", "is_correct": false },
                    { "label": "Italie", "is_correct": true }
                ]
            },
            {
                "kind": "free_text",
                "content": "Quelle est la capitale de l'Australie ?",
                "points": 5,
                "options": [
                    { "label": "Canberra", "is_correct": true },
                    { "label": "Sydney", "is_correct": false },
                    { "label": "Melbourne", "is_correct": false }
                ]
            }
        ]
    }))?;

    let javascript = demo_quiz(json!({
        "title": "Quiz JavaScript",
        "description": "Connaissances en JavaScript moderne",
        "questions": [
            {
                "kind": "binary_choice",
                "content": "JavaScript est un langage typé statiquement.",
                "points": 1,
                "options": [
                    { "label": "Vrai", "is_correct": false },
                    { "label": "Faux", "is_correct": true }
                ]
            },
            {
                "kind": "multi_select",
                "content": "Quelles sont des méthodes de tableau JavaScript ?",
                "points": 3,
                "options": [
                    { "label": "map()", "is_correct": true },
                    { "label": "filter()", "is_correct": true },
                    { "label": "query()", "is_correct": false },
                    { "label": "reduce()", "is_correct": true }
                ]
            }
        ]
    }))?;

    let general_id = insert_quiz(&mut tx, alice, &general).await?;
    let javascript_id = insert_quiz(&mut tx, bob, &javascript).await?;

    // Each player aced the other's quiz.
    for (user_id, quiz_id, score) in [(bob, general_id, 9_i64), (alice, javascript_id, 4_i64)] {
        sqlx::query(
            r#"
            INSERT INTO scores (user_id, quiz_id, total_score, max_points, percentage, completed_at)
            VALUES (?1, ?2, ?3, ?3, ?4, ?5)
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(score)
        .bind(i64::from(percentage(score as u64, score as u64)))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!("Seeded demo data (users alice/bob, password '{}')", DEMO_PASSWORD);
    Ok(true)
}

fn demo_quiz(value: serde_json::Value) -> Result<CreateQuizRequest, AppError> {
    let quiz: CreateQuizRequest = serde_json::from_value(value)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    quiz.check_questions().map_err(AppError::InternalServerError)?;
    Ok(quiz)
}
