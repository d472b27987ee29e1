// src/store/snapshots.rs

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, prelude::FromRow, types::Json};

use crate::{
    error::AppError,
    models::{
        answer::UserAnswer,
        progress::{QuizProgress, QuizProgressDraft},
        question::Question,
    },
};

#[derive(FromRow)]
struct SnapshotRow {
    id: i64,
    topic: String,
    difficulty: String,
    questions: Json<Vec<Question>>,
    user_answers: Json<Vec<UserAnswer>>,
    current_question_index: i64,
    time_left: i64,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for QuizProgress {
    type Error = AppError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(QuizProgress {
            id: row.id,
            difficulty: row.difficulty.parse().map_err(|e| {
                AppError::InternalServerError(format!(
                    "Corrupt snapshot for '{}': {}",
                    row.topic, e
                ))
            })?,
            topic: row.topic,
            questions: row.questions.0,
            user_answers: row.user_answers.0,
            current_question_index: row.current_question_index.max(0) as usize,
            time_left: row.time_left.max(0) as u64,
            created_at: row.created_at,
            last_updated: row.last_updated,
        })
    }
}

/// Repository for in-progress quiz snapshots (`quiz_progress`).
pub struct SnapshotRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SnapshotRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces the topic's snapshot: the old row is deleted before the new one
    /// is inserted, in one transaction.
    pub async fn save(&self, draft: &QuizProgressDraft, now: DateTime<Utc>) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM quiz_progress WHERE topic = ?")
            .bind(&draft.topic)
            .execute(&mut *tx)
            .await?;

        let id = sqlx::query(
            r#"
            INSERT INTO quiz_progress (
                topic, difficulty, questions, user_answers, current_question_index,
                time_left, created_at, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.topic)
        .bind(draft.difficulty.as_str())
        .bind(Json(&draft.questions))
        .bind(Json(&draft.user_answers))
        .bind(draft.current_question_index as i64)
        .bind(draft.time_left as i64)
        .bind(draft.created_at)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        Ok(id)
    }

    pub async fn load(&self, topic: &str) -> Result<Option<QuizProgress>, AppError> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT id, topic, difficulty, questions, user_answers, current_question_index,
                   time_left, created_at, last_updated
            FROM quiz_progress
            WHERE topic = ?
            "#,
        )
        .bind(topic)
        .fetch_optional(self.pool)
        .await?;

        row.map(QuizProgress::try_from).transpose()
    }

    /// Returns whether a snapshot existed.
    pub async fn delete(&self, topic: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quiz_progress WHERE topic = ?")
            .bind(topic)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
