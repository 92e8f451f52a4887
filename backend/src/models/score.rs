// src/models/score.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'scores' table in the database.
/// One row per (user, quiz) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub total_score: i64,
    pub max_points: i64,
    pub percentage: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// How a repeat submission of the same quiz by the same user is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatAttemptPolicy {
    /// The first recorded score is final; later attempts are graded only.
    #[default]
    KeepFirst,
    /// The stored score is replaced when a later attempt scores strictly higher.
    KeepBest,
    /// Later attempts are refused with a conflict.
    Reject,
}

impl FromStr for RepeatAttemptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_first" | "first" => Ok(Self::KeepFirst),
            "keep_best" | "best" => Ok(Self::KeepBest),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown repeat attempt policy '{}'", other)),
        }
    }
}

impl fmt::Display for RepeatAttemptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeepFirst => "keep_first",
            Self::KeepBest => "keep_best",
            Self::Reject => "reject",
        };
        f.write_str(name)
    }
}

/// What happened to the graded attempt at the storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// First attempt, stored.
    FirstAttempt,
    /// Repeat attempt that beat the stored score, stored.
    Improved,
    /// Repeat attempt, stored score left as it was.
    KeptPrevious,
    /// Attempt by the quiz creator, never stored.
    CreatorNotRecorded,
}

impl RecordStatus {
    pub fn message(&self) -> &'static str {
        match self {
            Self::FirstAttempt => "Score recorded.",
            Self::Improved => "New best score recorded.",
            Self::KeptPrevious => "You already completed this quiz; your recorded score is unchanged.",
            Self::CreatorNotRecorded => "Creators do not earn points on their own quizzes.",
        }
    }
}

/// Query parameters for the leaderboard endpoint.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub quiz_id: Option<i64>,
}

/// Aggregated row of the global leaderboard (sum over all quizzes).
#[derive(Debug, Serialize, FromRow)]
pub struct GlobalLeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub total_score: i64,
    pub quizzes_completed: i64,
}

/// Row of a single quiz's leaderboard.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizLeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub score: i64,
    pub percentage: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A score of the current user, joined with the quiz title.
#[derive(Debug, Serialize, FromRow)]
pub struct MyScore {
    pub quiz_id: i64,
    pub quiz_title: String,
    pub total_score: i64,
    pub max_points: i64,
    pub percentage: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("keep_first".parse::<RepeatAttemptPolicy>(), Ok(RepeatAttemptPolicy::KeepFirst));
        assert_eq!(" KEEP_BEST ".parse::<RepeatAttemptPolicy>(), Ok(RepeatAttemptPolicy::KeepBest));
        assert_eq!("reject".parse::<RepeatAttemptPolicy>(), Ok(RepeatAttemptPolicy::Reject));
        assert!("overwrite".parse::<RepeatAttemptPolicy>().is_err());
        assert_eq!(RepeatAttemptPolicy::default(), RepeatAttemptPolicy::KeepFirst);
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [
            RepeatAttemptPolicy::KeepFirst,
            RepeatAttemptPolicy::KeepBest,
            RepeatAttemptPolicy::Reject,
        ] {
            assert_eq!(policy.to_string().parse::<RepeatAttemptPolicy>(), Ok(policy));
        }
    }
}
