// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::grading::{AnswerOption, QuestionDefinition, QuestionKind};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Display order inside the quiz.
    pub position: i64,

    /// Stored kind tag: 'binary_choice', 'multi_select' or 'free_text'.
    pub kind: String,

    /// The text content of the question.
    pub content: String,

    pub points: i64,
}

/// Represents the 'answer_options' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerOptionRow {
    pub id: i64,
    pub question_id: i64,
    pub position: i64,
    pub label: String,
    pub is_correct: bool,
}

impl From<&AnswerOptionRow> for AnswerOption {
    fn from(row: &AnswerOptionRow) -> Self {
        AnswerOption {
            id: row.id,
            label: row.label.clone(),
            is_correct: row.is_correct,
        }
    }
}

/// A question joined with its options, in display order.
#[derive(Debug, Clone)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<AnswerOptionRow>,
}

impl QuestionWithOptions {
    /// Groups option rows under their questions, keeping both orders.
    pub fn assemble(questions: Vec<Question>, options: Vec<AnswerOptionRow>) -> Vec<Self> {
        let mut grouped: Vec<Self> = questions
            .into_iter()
            .map(|question| Self {
                question,
                options: Vec::new(),
            })
            .collect();

        for option in options {
            if let Some(entry) = grouped
                .iter_mut()
                .find(|q| q.question.id == option.question_id)
            {
                entry.options.push(option);
            }
        }

        for entry in &mut grouped {
            entry.options.sort_by_key(|o| o.position);
        }
        grouped.sort_by_key(|q| q.question.position);
        grouped
    }

    pub fn kind(&self) -> QuestionKind {
        QuestionKind::from(self.question.kind.clone())
    }

    /// Engine view of the question. Fails only if the stored points are out of range.
    pub fn to_definition(&self) -> Result<QuestionDefinition, std::num::TryFromIntError> {
        Ok(QuestionDefinition {
            id: self.question.id,
            kind: self.kind(),
            points: u32::try_from(self.question.points)?,
            options: self.options.iter().map(AnswerOption::from).collect(),
        })
    }
}

/// DTO for sending an option to a quiz taker (excludes `is_correct`).
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub label: String,
}

/// DTO for sending a question to a quiz taker.
/// Free-text questions carry no options at all, so the canonical answer never leaks.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub kind: QuestionKind,
    pub content: String,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<PublicOption>>,
}

impl From<&QuestionWithOptions> for PublicQuestion {
    fn from(q: &QuestionWithOptions) -> Self {
        let kind = q.kind();
        let options = kind.is_choice().then(|| {
            q.options
                .iter()
                .map(|o| PublicOption {
                    id: o.id,
                    label: o.label.clone(),
                })
                .collect()
        });

        PublicQuestion {
            id: q.question.id,
            kind,
            content: q.question.content.clone(),
            points: q.question.points,
            options,
        }
    }
}

/// Question with its answer key, for the quiz creator.
#[derive(Debug, Serialize)]
pub struct EditableQuestion {
    pub id: i64,
    pub kind: QuestionKind,
    pub content: String,
    pub points: i64,
    pub options: Vec<AnswerOption>,
}

impl From<&QuestionWithOptions> for EditableQuestion {
    fn from(q: &QuestionWithOptions) -> Self {
        EditableQuestion {
            id: q.question.id,
            kind: q.kind(),
            content: q.question.content.clone(),
            points: q.question.points,
            options: q.options.iter().map(AnswerOption::from).collect(),
        }
    }
}

/// DTO for one answer option when creating a question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub label: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub kind: QuestionKind,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(range(max = 1000))]
    pub points: u32,
    #[validate(length(min = 1, max = 20), nested)]
    pub options: Vec<CreateOptionRequest>,
}

impl CreateQuestionRequest {
    /// Checks the per-kind shape rules and that the answer key is gradable.
    pub fn check_shape(&self) -> Result<(), String> {
        // Labels are stored trimmed.
        if let Some(i) = self.options.iter().position(|o| o.label.trim().is_empty()) {
            return Err(format!("option {} has an empty label", i + 1));
        }

        let correct = self.options.iter().filter(|o| o.is_correct).count();
        match &self.kind {
            QuestionKind::Unsupported(tag) => {
                return Err(format!("unsupported question kind '{}'", tag));
            }
            QuestionKind::BinaryChoice if self.options.len() != 2 => {
                return Err("a binary choice question needs exactly two options".to_string());
            }
            QuestionKind::MultiSelect if self.options.len() < 2 => {
                return Err("a multi-select question needs at least two options".to_string());
            }
            QuestionKind::FreeText if correct > 1 => {
                return Err("a free text question takes exactly one expected answer".to_string());
            }
            _ => {}
        }

        self.to_definition(0).validate().map_err(|e| e.to_string())
    }

    /// Engine view with placeholder ids, used for validation before insert.
    fn to_definition(&self, id: i64) -> QuestionDefinition {
        QuestionDefinition {
            id,
            kind: self.kind.clone(),
            points: self.points,
            options: self
                .options
                .iter()
                .enumerate()
                .map(|(i, o)| AnswerOption {
                    id: i as i64,
                    label: o.label.clone(),
                    is_correct: o.is_correct,
                })
                .collect(),
        }
    }
}
