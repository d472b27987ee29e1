// src/store/sessions.rs

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, prelude::FromRow, types::Json};

use crate::{
    error::AppError,
    models::{
        answer::UserAnswer,
        evaluation::AiAssessment,
        question::Question,
        quiz_session::{NewQuizSession, QuizSession},
    },
};

const SESSION_COLUMNS: &str = "id, topic, difficulty, question_count, questions, user_answers, \
     score, time_spent, scoring_mode, evaluation, created_at, completed_at";

#[derive(FromRow)]
struct SessionRow {
    id: i64,
    topic: String,
    difficulty: String,
    question_count: i64,
    questions: Json<Vec<Question>>,
    user_answers: Json<Vec<UserAnswer>>,
    score: Option<i64>,
    time_spent: Option<i64>,
    scoring_mode: String,
    evaluation: Option<Json<AiAssessment>>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for QuizSession {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: AppError| {
            AppError::InternalServerError(format!("Corrupt quiz session row {}: {}", id, e))
        };
        Ok(QuizSession {
            id: row.id,
            topic: row.topic,
            difficulty: row.difficulty.parse().map_err(corrupt)?,
            question_count: row.question_count.max(0) as usize,
            questions: row.questions.0,
            user_answers: row.user_answers.0,
            score: row.score.map(|s| s.clamp(0, 100) as u32),
            time_spent: row.time_spent.map(|t| t.max(0) as u64),
            scoring_mode: row.scoring_mode.parse().map_err(corrupt)?,
            evaluation: row.evaluation.map(|e| e.0),
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

/// Repository for the append-only `quiz_sessions` history.
pub struct SessionRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends a finished session. There is no update counterpart.
    pub async fn put(&self, session: &NewQuizSession) -> Result<i64, AppError> {
        if session.user_answers.len() != session.questions.len() {
            return Err(AppError::ValidationFailed(format!(
                "{} answers for {} questions",
                session.user_answers.len(),
                session.questions.len()
            )));
        }

        let created_at = session.created_at.unwrap_or_else(Utc::now);
        let result = sqlx::query(
            r#"
            INSERT INTO quiz_sessions (
                topic, difficulty, question_count, questions, user_answers,
                score, time_spent, scoring_mode, evaluation, created_at, completed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.topic)
        .bind(session.difficulty.as_str())
        .bind(session.questions.len() as i64)
        .bind(Json(&session.questions))
        .bind(Json(&session.user_answers))
        .bind(session.score.map(i64::from))
        .bind(session.time_spent.map(|t| t as i64))
        .bind(session.scoring_mode.as_str())
        .bind(session.evaluation.as_ref().map(Json))
        .bind(created_at)
        .bind(session.completed_at)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<QuizSession, AppError> {
        let sql = format!("SELECT {} FROM quiz_sessions WHERE id = ?", SESSION_COLUMNS);
        let row: SessionRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz session {} not found", id)))?;
        row.try_into()
    }

    /// Most recent sessions first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<QuizSession>, AppError> {
        let sql = format!(
            "SELECT {} FROM quiz_sessions ORDER BY created_at DESC, id DESC LIMIT ?",
            SESSION_COLUMNS
        );
        let rows: Vec<SessionRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(QuizSession::try_from).collect()
    }

    pub async fn by_topic(&self, topic: &str, limit: Option<i64>) -> Result<Vec<QuizSession>, AppError> {
        let sql = format!(
            "SELECT {} FROM quiz_sessions WHERE topic = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            SESSION_COLUMNS
        );
        let rows: Vec<SessionRow> = sqlx::query_as(&sql)
            .bind(topic)
            .bind(limit.unwrap_or(-1))
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(QuizSession::try_from).collect()
    }
}
