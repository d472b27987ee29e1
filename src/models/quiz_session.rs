// src/models/quiz_session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    answer::UserAnswer,
    evaluation::{AiAssessment, ScoringMode},
    question::{Question, QuizDifficulty},
};

/// A finished quiz attempt. Immutable once written.
///
/// `questions` is a denormalized copy, so later edits to the bank do not
/// change history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: i64,
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub question_count: usize,
    pub questions: Vec<Question>,
    /// Parallel to `questions`.
    pub user_answers: Vec<UserAnswer>,
    /// 0..=100.
    pub score: Option<u32>,
    /// Seconds.
    pub time_spent: Option<u64>,
    pub scoring_mode: ScoringMode,
    pub evaluation: Option<AiAssessment>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewQuizSession {
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub questions: Vec<Question>,
    pub user_answers: Vec<UserAnswer>,
    pub score: Option<u32>,
    pub time_spent: Option<u64>,
    pub scoring_mode: ScoringMode,
    pub evaluation: Option<AiAssessment>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
