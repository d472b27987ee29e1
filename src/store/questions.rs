// src/store/questions.rs

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, prelude::FromRow, types::Json};

use crate::{
    error::AppError,
    models::question::{CorrectAnswer, Difficulty, NewQuestion, Question, QuestionType},
    store::{Collection, Index, IndexValue, push_index_filter},
};

const QUESTION_COLUMNS: &str = "id, question_type, topic, difficulty, question, options, \
     correct_answer, explanation, ai_hint, bookmarked, tags, created_at, last_used";

/// Raw `questions` row. Enum columns are stored as text.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    question_type: String,
    topic: String,
    difficulty: String,
    question: String,
    options: Option<Json<Vec<String>>>,
    correct_answer: Json<CorrectAnswer>,
    explanation: String,
    ai_hint: String,
    bookmarked: bool,
    tags: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    last_used: Option<DateTime<Utc>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: AppError| {
            AppError::InternalServerError(format!("Corrupt question row {}: {}", id, e))
        };
        Ok(Question {
            id: row.id,
            question_type: row.question_type.parse().map_err(corrupt)?,
            topic: row.topic,
            difficulty: row.difficulty.parse().map_err(corrupt)?,
            question: row.question,
            options: row.options.map(|o| o.0).unwrap_or_default(),
            correct_answer: row.correct_answer.0,
            explanation: row.explanation,
            ai_hint: row.ai_hint,
            bookmarked: row.bookmarked,
            tags: row.tags.0,
            created_at: row.created_at,
            last_used: row.last_used,
        })
    }
}

fn into_questions(rows: Vec<QuestionRow>) -> Result<Vec<Question>, AppError> {
    rows.into_iter().map(Question::try_from).collect()
}

/// Fields to merge into an existing question. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub question_type: Option<QuestionType>,
    pub difficulty: Option<Difficulty>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<CorrectAnswer>,
    pub explanation: Option<String>,
    pub ai_hint: Option<String>,
    pub bookmarked: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub last_used: Option<DateTime<Utc>>,
}

impl QuestionPatch {
    /// Patch carrying all content fields of `q` (not identity, bookmark or timestamps).
    pub fn content_of(q: &Question) -> Self {
        Self {
            question_type: Some(q.question_type),
            difficulty: Some(q.difficulty),
            question: Some(q.question.clone()),
            options: Some(q.options.clone()),
            correct_answer: Some(q.correct_answer.clone()),
            explanation: Some(q.explanation.clone()),
            ai_hint: Some(q.ai_hint.clone()),
            tags: Some(q.tags.clone()),
            ..Self::default()
        }
    }

    fn apply(self, q: &mut Question) {
        if let Some(v) = self.question_type {
            q.question_type = v;
        }
        if let Some(v) = self.difficulty {
            q.difficulty = v;
        }
        if let Some(v) = self.question {
            q.question = v;
        }
        if let Some(v) = self.options {
            q.options = v;
        }
        if let Some(v) = self.correct_answer {
            q.correct_answer = v;
        }
        if let Some(v) = self.explanation {
            q.explanation = v;
        }
        if let Some(v) = self.ai_hint {
            q.ai_hint = v;
        }
        if let Some(v) = self.bookmarked {
            q.bookmarked = v;
        }
        if let Some(v) = self.tags {
            q.tags = v;
        }
        if let Some(v) = self.last_used {
            q.last_used = Some(v);
        }
    }
}

/// Filters for browsing the bank. All set fields must match.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct QuestionFilter {
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub bookmarked: Option<bool>,
    /// Case-insensitive match on question text or tags.
    pub search: Option<String>,
    pub limit: Option<i64>,
}

/// Repository for the `questions` collection (the bank).
pub struct QuestionRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> QuestionRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts one question and returns its new identity.
    pub async fn put(&self, question: &NewQuestion) -> Result<i64, AppError> {
        question.check_shape()?;
        let id = insert(self.pool, question, Utc::now()).await?;
        Ok(id)
    }

    /// Inserts all questions in one transaction. Nothing is written if any is malformed.
    pub async fn bulk_put(&self, questions: &[NewQuestion]) -> Result<Vec<i64>, AppError> {
        for q in questions {
            q.check_shape()?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(questions.len());
        for q in questions {
            ids.push(insert(&mut *tx, q, now).await?);
        }
        tx.commit().await?;

        tracing::debug!("Stored {} questions", ids.len());
        Ok(ids)
    }

    pub async fn get(&self, id: i64) -> Result<Question, AppError> {
        let sql = format!("SELECT {} FROM questions WHERE id = ?", QUESTION_COLUMNS);
        let row: QuestionRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;
        row.try_into()
    }

    /// Loads several questions, keeping the order of `ids` and skipping missing ones.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM questions WHERE id IN (",
            QUESTION_COLUMNS
        ));
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<QuestionRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let mut found = into_questions(rows)?;
        found.sort_by_key(|q| ids.iter().position(|id| *id == q.id));
        Ok(found)
    }

    /// Merges `patch` into question `id`. The merged question must still be well-formed.
    pub async fn update(&self, id: i64, patch: QuestionPatch) -> Result<Question, AppError> {
        let mut question = self.get(id).await?;
        patch.apply(&mut question);
        question.check_shape()?;

        let options = non_empty_options(&question.options);
        let result = sqlx::query(
            r#"
            UPDATE questions SET
                question_type = ?, difficulty = ?, question = ?, options = ?,
                correct_answer = ?, explanation = ?, ai_hint = ?, bookmarked = ?,
                tags = ?, last_used = ?
            WHERE id = ?
            "#,
        )
        .bind(question.question_type.as_str())
        .bind(question.difficulty.as_str())
        .bind(&question.question)
        .bind(options)
        .bind(Json(&question.correct_answer))
        .bind(&question.explanation)
        .bind(&question.ai_hint)
        .bind(question.bookmarked)
        .bind(Json(&question.tags))
        .bind(question.last_used)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Question {} not found", id)));
        }
        Ok(question)
    }

    /// Questions whose `index` equals `value`, newest first.
    pub async fn get_by_index(
        &self,
        index: Index,
        value: impl Into<IndexValue>,
        limit: Option<i64>,
    ) -> Result<Vec<Question>, AppError> {
        if !Collection::Questions.indexes().contains(&index) {
            return Err(AppError::BadRequest(format!(
                "Questions have no '{}' index",
                index.column()
            )));
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM questions WHERE ",
            QUESTION_COLUMNS
        ));
        push_index_filter(&mut qb, index, &value.into());
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<QuestionRow> = qb.build_query_as().fetch_all(self.pool).await?;
        into_questions(rows)
    }

    /// Draws up to `count` distinct questions for a topic at random.
    pub async fn random_by_topic(
        &self,
        topic: &str,
        difficulty: Option<Difficulty>,
        count: usize,
    ) -> Result<Vec<Question>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM questions WHERE topic = ",
            QUESTION_COLUMNS
        ));
        qb.push_bind(topic.to_string());
        if let Some(level) = difficulty {
            qb.push(" AND difficulty = ").push_bind(level.as_str());
        }
        qb.push(" ORDER BY RANDOM() LIMIT ").push_bind(count as i64);

        let rows: Vec<QuestionRow> = qb.build_query_as().fetch_all(self.pool).await?;
        into_questions(rows)
    }

    pub async fn count_for_topic(
        &self,
        topic: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<usize, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM questions WHERE topic = ");
        qb.push_bind(topic.to_string());
        if let Some(level) = difficulty {
            qb.push(" AND difficulty = ").push_bind(level.as_str());
        }
        let count = qb.build_query_scalar::<i64>().fetch_one(self.pool).await?;
        Ok(count.max(0) as usize)
    }

    /// Browses the bank, newest first.
    pub async fn list(&self, filter: &QuestionFilter) -> Result<Vec<Question>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM questions WHERE 1 = 1",
            QUESTION_COLUMNS
        ));

        if let Some(topic) = &filter.topic {
            qb.push(" AND topic = ").push_bind(topic.clone());
        }
        if let Some(level) = filter.difficulty {
            qb.push(" AND difficulty = ").push_bind(level.as_str());
        }
        if let Some(kind) = filter.question_type {
            qb.push(" AND question_type = ").push_bind(kind.as_str());
        }
        if let Some(bookmarked) = filter.bookmarked {
            qb.push(" AND bookmarked = ").push_bind(bookmarked);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            qb.push(" AND (LOWER(question) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(tags) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<QuestionRow> = qb.build_query_as().fetch_all(self.pool).await?;
        into_questions(rows)
    }

    /// Flips the bookmark flag and returns the new value.
    pub async fn toggle_bookmark(&self, id: i64) -> Result<bool, AppError> {
        let current = self.get(id).await?;
        let flipped = !current.bookmarked;
        sqlx::query("UPDATE questions SET bookmarked = ? WHERE id = ?")
            .bind(flipped)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(flipped)
    }

    /// Marks questions as used now, which protects them from cleanup.
    pub async fn touch_last_used(&self, ids: &[i64], now: DateTime<Utc>) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE questions SET last_used = ");
        qb.push_bind(now).push(" WHERE id IN (");
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build().execute(self.pool).await?;
        Ok(())
    }

    /// Deletes a question together with its cached explanations and hints.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cached_explanations WHERE question_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cached_hints WHERE question_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Question {} not found", id)));
        }
        tx.commit().await?;
        Ok(())
    }
}

fn non_empty_options(options: &[String]) -> Option<Json<&[String]>> {
    if options.is_empty() {
        None
    } else {
        Some(Json(options))
    }
}

async fn insert<'e, E>(executor: E, q: &NewQuestion, now: DateTime<Utc>) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let created_at = q.created_at.unwrap_or(now);
    let result = sqlx::query(
        r#"
        INSERT INTO questions (
            question_type, topic, difficulty, question, options, correct_answer,
            explanation, ai_hint, bookmarked, tags, created_at, last_used
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(q.question_type.as_str())
    .bind(&q.topic)
    .bind(q.difficulty.as_str())
    .bind(&q.question)
    .bind(non_empty_options(&q.options))
    .bind(Json(&q.correct_answer))
    .bind(&q.explanation)
    .bind(&q.ai_hint)
    .bind(q.bookmarked)
    .bind(Json(&q.tags))
    .bind(created_at)
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}
