// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    grading::{self, QuizDefinition},
    models::{
        question::{AnswerOptionRow, CreateQuestionRequest, EditableQuestion, PublicQuestion, Question, QuestionWithOptions},
        quiz::{CreateQuizRequest, CreatorInfo, EditableQuiz, PublicQuiz, Quiz, QuizSummary, SubmitQuizRequest, SubmitQuizResponse},
        score::{RecordStatus, RepeatAttemptPolicy, Score},
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Loads a quiz row or fails with 404.
async fn fetch_quiz(pool: &SqlitePool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, creator_id, title, description, is_public, created_at, updated_at
        FROM quizzes
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Loads the questions of a quiz with their options, in display order.
async fn fetch_questions(pool: &SqlitePool, quiz_id: i64) -> Result<Vec<QuestionWithOptions>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, position, kind, content, points
        FROM questions
        WHERE quiz_id = ?1
        ORDER BY position, id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, AnswerOptionRow>(
        r#"
        SELECT o.id, o.question_id, o.position, o.label, o.is_correct
        FROM answer_options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.quiz_id = ?1
        ORDER BY o.question_id, o.position, o.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(QuestionWithOptions::assemble(questions, options))
}

fn ensure_creator(quiz: &Quiz, claims: &Claims) -> Result<(), AppError> {
    if quiz.creator_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "Only the creator can modify this quiz".to_string(),
        ));
    }
    Ok(())
}

/// Validates a create/update payload: field rules first, then question shapes.
fn validate_quiz_payload(payload: &CreateQuizRequest) -> Result<(), AppError> {
    payload.validate()?;
    payload.check_questions().map_err(AppError::BadRequest)
}

/// Inserts questions and their options for a quiz, keeping list order as position.
async fn insert_questions(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: i64,
    questions: &[CreateQuestionRequest],
) -> Result<(), AppError> {
    for (position, question) in questions.iter().enumerate() {
        let question_id = sqlx::query(
            "INSERT INTO questions (quiz_id, position, kind, content, points) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(quiz_id)
        .bind(position as i64)
        .bind(question.kind.as_str())
        .bind(clean_html(&question.content))
        .bind(i64::from(question.points))
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();

        for (option_position, option) in question.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO answer_options (question_id, position, label, is_correct) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(question_id)
            .bind(option_position as i64)
            .bind(option.label.trim())
            .bind(option.is_correct)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

/// Inserts a quiz row and its questions. Expects a validated payload.
pub(crate) async fn insert_quiz(
    tx: &mut Transaction<'_, Sqlite>,
    creator_id: i64,
    payload: &CreateQuizRequest,
) -> Result<i64, AppError> {
    let now = chrono::Utc::now();

    let quiz_id = sqlx::query(
        r#"
        INSERT INTO quizzes (creator_id, title, description, is_public, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
    )
    .bind(creator_id)
    .bind(clean_html(&payload.title))
    .bind(clean_html(payload.description.as_deref().unwrap_or_default()))
    .bind(payload.is_public.unwrap_or(true))
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    insert_questions(tx, quiz_id, &payload.questions).await?;
    Ok(quiz_id)
}

async fn delete_questions(tx: &mut Transaction<'_, Sqlite>, quiz_id: i64) -> Result<(), AppError> {
    sqlx::query(
        "DELETE FROM answer_options WHERE question_id IN (SELECT id FROM questions WHERE quiz_id = ?1)",
    )
    .bind(quiz_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM questions WHERE quiz_id = ?1")
        .bind(quiz_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Lists public quizzes, newest first.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT
            q.id,
            q.title,
            q.description,
            q.creator_id,
            u.username AS creator_username,
            (SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = q.id) AS question_count,
            q.created_at
        FROM quizzes q
        JOIN users u ON u.id = q.creator_id
        WHERE q.is_public = 1
        ORDER BY q.created_at DESC, q.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Creates a quiz with its questions and answer keys.
///
/// * Validates field lengths and per-kind shape rules.
/// * Rejects answer keys the grader could not interpret (400).
/// * Inserts everything in one transaction.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_quiz_payload(&payload)?;
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    let quiz_id = insert_quiz(&mut tx, user_id, &payload).await?;
    tx.commit().await?;

    tracing::info!(
        "User {} created quiz {} with {} questions",
        claims.username,
        quiz_id,
        payload.questions.len()
    );

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": quiz_id }))))
}

/// Returns a quiz for taking it: no `is_correct` flags, no free-text answers.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;

    let creator = sqlx::query_as::<_, (i64, String)>("SELECT id, username FROM users WHERE id = ?1")
        .bind(quiz.creator_id)
        .fetch_one(&pool)
        .await?;

    let questions = fetch_questions(&pool, id).await?;
    let total_points: i64 = questions.iter().map(|q| q.question.points).sum();

    Ok(Json(PublicQuiz {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        creator: CreatorInfo {
            id: creator.0,
            username: creator.1,
        },
        total_points,
        questions: questions.iter().map(PublicQuestion::from).collect(),
    }))
}

/// Returns a quiz with its answer keys for the editor. Creator only.
pub async fn get_quiz_for_edit(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    ensure_creator(&quiz, &claims)?;

    let questions = fetch_questions(&pool, id).await?;

    Ok(Json(EditableQuiz {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        is_public: quiz.is_public,
        questions: questions.iter().map(EditableQuestion::from).collect(),
    }))
}

/// Replaces the content of a quiz. Creator only.
///
/// Existing scores are kept: they record what the quiz was worth when taken.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    ensure_creator(&quiz, &claims)?;
    validate_quiz_payload(&payload)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE quizzes
        SET title = ?1, description = ?2, is_public = ?3, updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(clean_html(payload.description.as_deref().unwrap_or_default()))
    .bind(payload.is_public.unwrap_or(quiz.is_public))
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    delete_questions(&mut tx, id).await?;
    insert_questions(&mut tx, id, &payload.questions).await?;
    tx.commit().await?;

    tracing::info!("User {} updated quiz {}", claims.username, id);

    Ok(StatusCode::OK)
}

/// Deletes a quiz with its questions and scores. Creator only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    ensure_creator(&quiz, &claims)?;

    let mut tx = pool.begin().await?;
    delete_questions(&mut tx, id).await?;
    sqlx::query("DELETE FROM scores WHERE quiz_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM quizzes WHERE id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!("User {} deleted quiz {}", claims.username, id);

    Ok(StatusCode::NO_CONTENT)
}

fn completion_date(score: &Score) -> String {
    score
        .completed_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "an unknown date".to_string())
}

/// Stores a graded attempt according to the repeat-attempt policy.
///
/// Each policy is a single upsert on the (user_id, quiz_id) unique key inside
/// an immediate transaction, so two concurrent first attempts cannot both be stored.
/// Returns the status and the score that was stored before this attempt.
async fn record_score(
    pool: &SqlitePool,
    policy: RepeatAttemptPolicy,
    user_id: i64,
    quiz_id: i64,
    result: &grading::GradingResult,
) -> Result<(RecordStatus, Option<i64>), AppError> {
    let total_score = i64::try_from(result.total_score)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let max_points = i64::try_from(result.max_points)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    // Take the write lock before reading the stored score.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let previous = sqlx::query_as::<_, Score>(
        r#"
        SELECT id, user_id, quiz_id, total_score, max_points, percentage, completed_at
        FROM scores
        WHERE user_id = ?1 AND quiz_id = ?2
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .fetch_optional(&mut *tx)
    .await?;

    let upsert = match policy {
        RepeatAttemptPolicy::KeepFirst | RepeatAttemptPolicy::Reject => {
            r#"
            INSERT INTO scores (user_id, quiz_id, total_score, max_points, percentage, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, quiz_id) DO NOTHING
            "#
        }
        RepeatAttemptPolicy::KeepBest => {
            r#"
            INSERT INTO scores (user_id, quiz_id, total_score, max_points, percentage, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, quiz_id) DO UPDATE SET
                total_score = excluded.total_score,
                max_points = excluded.max_points,
                percentage = excluded.percentage,
                completed_at = excluded.completed_at
            WHERE excluded.total_score > scores.total_score
            "#
        }
    };

    let written = sqlx::query(upsert)
        .bind(user_id)
        .bind(quiz_id)
        .bind(total_score)
        .bind(max_points)
        .bind(i64::from(result.percentage))
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record score: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?
        .rows_affected()
        > 0;

    let previous_score = previous.as_ref().map(|s| s.total_score);
    let status = match (written, previous.is_some()) {
        (true, false) => RecordStatus::FirstAttempt,
        (true, true) => RecordStatus::Improved,
        (false, _) if policy == RepeatAttemptPolicy::Reject => {
            tx.rollback().await?;
            let recorded = previous
                .map(|s| format!("{}/{} on {}", s.total_score, s.max_points, completion_date(&s)))
                .unwrap_or_else(|| "unknown".to_string());
            return Err(AppError::Conflict(format!(
                "You have already completed this quiz (recorded score: {})",
                recorded
            )));
        }
        (false, _) => RecordStatus::KeptPrevious,
    };

    tx.commit().await?;
    Ok((status, previous_score))
}

/// Grades a quiz attempt and records the score.
///
/// * Loads the quiz with its answer keys and grades the submitted answers.
/// * The creator gets the full breakdown but nothing is stored.
/// * Other users' scores are stored per the configured repeat-attempt policy.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    let user_id = claims.user_id()?;

    let questions = fetch_questions(&pool, id).await?;
    let definition = QuizDefinition {
        questions: questions
            .iter()
            .map(|q| q.to_definition())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::InternalServerError(format!("Invalid points in quiz {}: {}", id, e)))?,
    };

    let mut result = grading::grade(&definition, &req.answers).map_err(|e| {
        tracing::error!("Quiz {} cannot be graded: {}", id, e);
        AppError::from(e)
    })?;

    for question in result.unsupported() {
        tracing::warn!(
            "Quiz {} question {} has an unsupported kind and was scored as zero",
            id,
            question.question_id
        );
    }

    let is_creator = quiz.creator_id == user_id;
    let (recorded, previous_score) = if is_creator {
        (RecordStatus::CreatorNotRecorded, None)
    } else {
        record_score(&pool, config.repeat_policy, user_id, id, &result).await?
    };

    tracing::info!(
        "User {} scored {}/{} on quiz {} ({:?})",
        claims.username,
        result.total_score,
        result.max_points,
        id,
        recorded
    );

    if !config.reveal_answers {
        for question in &mut result.questions {
            question.correct_labels.clear();
        }
    }

    Ok(Json(SubmitQuizResponse {
        result,
        is_creator,
        recorded,
        previous_score,
        message: recorded.message().to_string(),
    }))
}
