// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::grading::{GradingResult, Submission};
use crate::models::question::{CreateQuestionRequest, EditableQuestion, PublicQuestion};
use crate::models::score::RecordStatus;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub creator_id: i64,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Row of the public quiz listing.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub creator_username: String,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreatorInfo {
    pub id: i64,
    pub username: String,
}

/// DTO for taking a quiz: no answer keys.
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub creator: CreatorInfo,
    pub total_points: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for the quiz editor: includes answer keys. Creator only.
#[derive(Debug, Serialize)]
pub struct EditableQuiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub questions: Vec<EditableQuestion>,
}

/// DTO for creating (or fully replacing) a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub is_public: Option<bool>,
    #[validate(length(min = 1, max = 100), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

impl CreateQuizRequest {
    /// Runs the per-question shape checks, reporting the first failure with its
    /// 1-based question number.
    pub fn check_questions(&self) -> Result<(), String> {
        for (i, question) in self.questions.iter().enumerate() {
            question
                .check_shape()
                .map_err(|e| format!("Question {}: {}", i + 1, e))?;
        }
        Ok(())
    }
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// User's answers map.
    /// Key: Question ID
    /// Value: option id, list of option ids, or free text
    #[serde(default)]
    pub answers: Submission,
}

/// DTO returned after grading an attempt.
#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    #[serde(flatten)]
    pub result: GradingResult,
    pub is_creator: bool,
    pub recorded: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_score: Option<i64>,
    pub message: String,
}
