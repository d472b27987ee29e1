// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    answer::UserAnswer,
    question::{Question, QuizDifficulty},
};

/// Rolling per-topic statistics. One row per topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: i64,
    pub topic: String,
    pub total_questions: i64,
    pub correct_answers: i64,
    /// Always `correct_answers / total_questions * 100`.
    pub average_score: f64,
    /// Cumulative seconds.
    pub time_spent: i64,
    pub last_studied: DateTime<Utc>,
    pub streak_days: i64,
}

/// Point-in-time copy of an unfinished quiz, used to resume after a reload.
/// At most one exists per topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub id: i64,
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub questions: Vec<Question>,
    pub user_answers: Vec<UserAnswer>,
    pub current_question_index: usize,
    /// Countdown seconds remaining.
    pub time_left: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Snapshot contents as written by autosave.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizProgressDraft {
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub questions: Vec<Question>,
    pub user_answers: Vec<UserAnswer>,
    pub current_question_index: usize,
    pub time_left: u64,
    /// Creation time of the first snapshot of this attempt.
    pub created_at: DateTime<Utc>,
}
