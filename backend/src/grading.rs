// src/grading.rs

//! Quiz grading engine.
//!
//! Turns a quiz definition (questions with answer keys and point values) and a
//! user's submission into a score breakdown. Grading is pure: no I/O, no
//! logging, no clock. Persisting the result is up to the caller.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

pub type QuestionId = i64;
pub type OptionId = i64;

/// Kind of a question, stored as a snake_case tag.
///
/// Tags this build does not recognise are kept as `Unsupported` so that a quiz
/// containing them still grades (the question scores zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    BinaryChoice,
    MultiSelect,
    FreeText,
    Unsupported(String),
}

impl QuestionKind {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionKind::BinaryChoice => "binary_choice",
            QuestionKind::MultiSelect => "multi_select",
            QuestionKind::FreeText => "free_text",
            QuestionKind::Unsupported(tag) => tag,
        }
    }

    /// Whether takers pick from the option list.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionKind::BinaryChoice | QuestionKind::MultiSelect)
    }
}

impl From<String> for QuestionKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "binary_choice" => QuestionKind::BinaryChoice,
            "multi_select" => QuestionKind::MultiSelect,
            "free_text" => QuestionKind::FreeText,
            _ => QuestionKind::Unsupported(tag),
        }
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub label: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub points: u32,
    pub options: Vec<AnswerOption>,
}

/// Questions in display order. Order has no effect on the score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub questions: Vec<QuestionDefinition>,
}

/// A single answer as sent by the client.
///
/// The JSON shape decides the variant: a number is one selected option, an
/// array is a set of options, a string is free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserAnswer {
    Choice(OptionId),
    Choices(Vec<OptionId>),
    Text(String),
}

impl UserAnswer {
    /// Selected option ids, deduplicated. `None` for free text.
    fn selection(&self) -> Option<BTreeSet<OptionId>> {
        match self {
            UserAnswer::Choice(id) => Some(BTreeSet::from([*id])),
            UserAnswer::Choices(ids) => Some(ids.iter().copied().collect()),
            UserAnswer::Text(_) => None,
        }
    }
}

/// Answers keyed by question id. Missing entries are unanswered questions.
pub type Submission = HashMap<QuestionId, UserAnswer>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
    /// The question kind is not gradable by this build.
    UnsupportedKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub outcome: Outcome,
    /// Labels of the correct option(s), in option order.
    pub correct_labels: Vec<String>,
    /// Labels of the selected options (unmatched ids as `unknown option <id>`),
    /// or the raw free text.
    pub submitted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
    pub total_score: u64,
    pub max_points: u64,
    pub percentage: u32,
    pub questions: Vec<QuestionResult>,
}

impl GradingResult {
    /// Questions skipped because their kind is unknown.
    pub fn unsupported(&self) -> impl Iterator<Item = &QuestionResult> {
        self.questions
            .iter()
            .filter(|q| q.outcome == Outcome::UnsupportedKind)
    }
}

/// A quiz definition the engine cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingError {
    NoOptions { question_id: QuestionId },
    BinaryKeyCount { question_id: QuestionId, correct: usize },
    NoCorrectOption { question_id: QuestionId },
    MissingCanonicalText { question_id: QuestionId },
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::NoOptions { question_id } => {
                write!(f, "question {question_id} has no answer options")
            }
            GradingError::BinaryKeyCount {
                question_id,
                correct,
            } => write!(
                f,
                "binary choice question {question_id} must have exactly one correct option, found {correct}"
            ),
            GradingError::NoCorrectOption { question_id } => {
                write!(f, "multi-select question {question_id} has no correct option")
            }
            GradingError::MissingCanonicalText { question_id } => {
                write!(f, "free text question {question_id} has no canonical answer")
            }
        }
    }
}

impl std::error::Error for GradingError {}

impl QuestionDefinition {
    /// Checks that the answer key can be graded at all.
    pub fn validate(&self) -> Result<(), GradingError> {
        let question_id = self.id;
        let correct = self.options.iter().filter(|o| o.is_correct).count();

        match &self.kind {
            QuestionKind::BinaryChoice | QuestionKind::MultiSelect if self.options.is_empty() => {
                Err(GradingError::NoOptions { question_id })
            }
            QuestionKind::BinaryChoice if correct != 1 => Err(GradingError::BinaryKeyCount {
                question_id,
                correct,
            }),
            QuestionKind::MultiSelect if correct == 0 => {
                Err(GradingError::NoCorrectOption { question_id })
            }
            QuestionKind::FreeText if correct == 0 => {
                Err(GradingError::MissingCanonicalText { question_id })
            }
            _ => Ok(()),
        }
    }

    fn correct_labels(&self) -> Vec<String> {
        let correct = self.options.iter().filter(|o| o.is_correct);
        match self.kind {
            // Only the first correct entry is canonical.
            QuestionKind::FreeText => correct.take(1).map(|o| o.label.clone()).collect(),
            _ => correct.map(|o| o.label.clone()).collect(),
        }
    }

    /// Labels of the selected options in option order, then ids that match no
    /// option as `unknown option <id>`.
    fn labels_for(&self, selection: &BTreeSet<OptionId>) -> Vec<String> {
        let known = self
            .options
            .iter()
            .filter(|o| selection.contains(&o.id))
            .map(|o| o.label.clone());
        let unknown = selection
            .iter()
            .filter(|id| !self.options.iter().any(|o| o.id == **id))
            .map(|id| format!("unknown option {id}"));
        known.chain(unknown).collect()
    }

    /// Returns whether the answer is correct and what to echo back as submitted.
    fn evaluate(&self, answer: &UserAnswer) -> (bool, Vec<String>) {
        match &self.kind {
            QuestionKind::BinaryChoice => match answer.selection() {
                Some(selection) => {
                    let correct = selection.len() == 1
                        && self
                            .options
                            .iter()
                            .any(|o| o.is_correct && selection.contains(&o.id));
                    (correct, self.labels_for(&selection))
                }
                None => (false, Vec::new()),
            },
            QuestionKind::MultiSelect => match answer.selection() {
                Some(selection) => {
                    let expected: BTreeSet<OptionId> = self
                        .options
                        .iter()
                        .filter(|o| o.is_correct)
                        .map(|o| o.id)
                        .collect();
                    (selection == expected, self.labels_for(&selection))
                }
                None => (false, Vec::new()),
            },
            QuestionKind::FreeText => match answer {
                UserAnswer::Text(text) => {
                    let submitted = normalize_text(text);
                    let correct = !submitted.is_empty()
                        && self
                            .options
                            .iter()
                            .find(|o| o.is_correct)
                            .is_some_and(|o| normalize_text(&o.label) == submitted);
                    (correct, vec![text.clone()])
                }
                _ => (false, Vec::new()),
            },
            QuestionKind::Unsupported(_) => (false, Vec::new()),
        }
    }
}

/// Trims, collapses whitespace runs to one space and lowercases.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `round(100 * score / max)` with halves rounded up; 0 for an empty quiz.
pub fn percentage(score: u64, max: u64) -> u32 {
    if max == 0 {
        return 0;
    }
    ((200 * score + max) / (2 * max)) as u32
}

/// Grades a submission against a quiz.
///
/// Missing answers, unknown option ids, answers of the wrong shape and
/// unsupported question kinds score zero for that question. Only a quiz whose
/// answer key cannot be interpreted yields an error.
pub fn grade(quiz: &QuizDefinition, submission: &Submission) -> Result<GradingResult, GradingError> {
    let mut total_score = 0u64;
    let mut max_points = 0u64;
    let mut questions = Vec::with_capacity(quiz.questions.len());

    for question in &quiz.questions {
        question.validate()?;

        let (outcome, submitted) = match (&question.kind, submission.get(&question.id)) {
            (QuestionKind::Unsupported(_), answer) => {
                let submitted = match answer {
                    Some(UserAnswer::Text(text)) => vec![text.clone()],
                    _ => Vec::new(),
                };
                (Outcome::UnsupportedKind, submitted)
            }
            (_, None) => (Outcome::Unanswered, Vec::new()),
            (_, Some(answer)) => {
                let (correct, submitted) = question.evaluate(answer);
                let outcome = if correct {
                    Outcome::Correct
                } else {
                    Outcome::Incorrect
                };
                (outcome, submitted)
            }
        };

        let is_correct = outcome == Outcome::Correct;
        let points_awarded = if is_correct { question.points } else { 0 };

        max_points += u64::from(question.points);
        total_score += u64::from(points_awarded);

        questions.push(QuestionResult {
            question_id: question.id,
            is_correct,
            points_awarded,
            outcome,
            correct_labels: question.correct_labels(),
            submitted,
        });
    }

    Ok(GradingResult {
        total_score,
        max_points,
        percentage: percentage(total_score, max_points),
        questions,
    })
}
