// src/store/cache.rs

//! Persistent cache of generated explanations and hints.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::cache::{CachedExplanation, CachedHint},
};

pub struct CacheRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CacheRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Exact lookup on the `(question_id, user_answer)` compound index.
    pub async fn explanation(
        &self,
        question_id: i64,
        user_answer: &str,
    ) -> Result<Option<CachedExplanation>, AppError> {
        let entry = sqlx::query_as::<_, CachedExplanation>(
            r#"
            SELECT id, question_id, user_answer, explanation, created_at
            FROM cached_explanations
            WHERE question_id = ? AND user_answer = ?
            "#,
        )
        .bind(question_id)
        .bind(user_answer)
        .fetch_optional(self.pool)
        .await?;
        Ok(entry)
    }

    /// Stores an explanation, replacing any entry with the same key.
    pub async fn save_explanation(
        &self,
        question_id: i64,
        user_answer: &str,
        explanation: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedExplanation, AppError> {
        let entry = sqlx::query_as::<_, CachedExplanation>(
            r#"
            INSERT INTO cached_explanations (question_id, user_answer, explanation, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (question_id, user_answer)
            DO UPDATE SET explanation = excluded.explanation, created_at = excluded.created_at
            RETURNING id, question_id, user_answer, explanation, created_at
            "#,
        )
        .bind(question_id)
        .bind(user_answer)
        .bind(explanation)
        .bind(now)
        .fetch_one(self.pool)
        .await?;
        Ok(entry)
    }

    /// Newest hint for the question.
    pub async fn hint(&self, question_id: i64) -> Result<Option<CachedHint>, AppError> {
        let entry = sqlx::query_as::<_, CachedHint>(
            r#"
            SELECT id, question_id, hint, created_at
            FROM cached_hints
            WHERE question_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(question_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(entry)
    }

    /// Stores the hint as the only entry for the question.
    pub async fn save_hint(
        &self,
        question_id: i64,
        hint: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedHint, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cached_hints WHERE question_id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        let entry = sqlx::query_as::<_, CachedHint>(
            r#"
            INSERT INTO cached_hints (question_id, hint, created_at)
            VALUES (?, ?, ?)
            RETURNING id, question_id, hint, created_at
            "#,
        )
        .bind(question_id)
        .bind(hint)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Drops every cached entry for the question. Returns `(explanations, hints)`.
    pub async fn purge_question(&self, question_id: i64) -> Result<(u64, u64), AppError> {
        let mut tx = self.pool.begin().await?;

        let explanations = sqlx::query("DELETE FROM cached_explanations WHERE question_id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let hints = sqlx::query("DELETE FROM cached_hints WHERE question_id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok((explanations, hints))
    }

    /// Drops entries created before `cutoff`. Returns `(explanations, hints)`.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<(u64, u64), AppError> {
        let explanations = sqlx::query("DELETE FROM cached_explanations WHERE created_at < ?")
            .bind(cutoff)
            .execute(self.pool)
            .await?
            .rows_affected();
        let hints = sqlx::query("DELETE FROM cached_hints WHERE created_at < ?")
            .bind(cutoff)
            .execute(self.pool)
            .await?
            .rows_affected();
        Ok((explanations, hints))
    }
}
