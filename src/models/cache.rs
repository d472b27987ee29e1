// src/models/cache.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Generated explanation keyed by `(question_id, user_answer)`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CachedExplanation {
    pub id: i64,
    pub question_id: i64,
    pub user_answer: String,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}

/// Generated hint keyed by `question_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CachedHint {
    pub id: i64,
    pub question_id: i64,
    pub hint: String,
    pub created_at: DateTime<Utc>,
}
