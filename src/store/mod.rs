// src/store/mod.rs

//! Embedded SQLite store.
//!
//! Every entity lives in its own collection (table). Typed repositories in the
//! submodules own the per-collection CRUD; this module owns opening the
//! database, schema migrations and the operations that work on any collection.

pub mod admin;
pub mod cache;
pub mod progress;
pub mod questions;
pub mod reading;
pub mod sessions;
pub mod snapshots;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{
    QueryBuilder, Sqlite, SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::error::AppError;

pub use cache::CacheRepo;
pub use progress::ProgressRepo;
pub use questions::{QuestionFilter, QuestionPatch, QuestionRepo};
pub use reading::ReadingRepo;
pub use sessions::SessionRepo;
pub use snapshots::SnapshotRepo;

/// Versioned schema. Each migration only adds tables or indexes and is applied
/// in order when the store is opened.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Named collections of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Questions,
    QuizSessions,
    UserProgress,
    CachedExplanations,
    CachedHints,
    ReadingMaterials,
    QuizProgress,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Questions,
        Collection::QuizSessions,
        Collection::UserProgress,
        Collection::CachedExplanations,
        Collection::CachedHints,
        Collection::ReadingMaterials,
        Collection::QuizProgress,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Questions => "questions",
            Collection::QuizSessions => "quiz_sessions",
            Collection::UserProgress => "user_progress",
            Collection::CachedExplanations => "cached_explanations",
            Collection::CachedHints => "cached_hints",
            Collection::ReadingMaterials => "reading_materials",
            Collection::QuizProgress => "quiz_progress",
        }
    }

    /// Secondary indexes declared by the schema for this collection.
    pub fn indexes(&self) -> &'static [Index] {
        match self {
            Collection::Questions => &[
                Index::Topic,
                Index::Difficulty,
                Index::QuestionType,
                Index::Bookmarked,
            ],
            Collection::QuizSessions | Collection::UserProgress | Collection::QuizProgress => {
                &[Index::Topic]
            }
            Collection::CachedExplanations | Collection::CachedHints => &[Index::QuestionId],
            Collection::ReadingMaterials => &[Index::Topic, Index::Difficulty, Index::Bookmarked],
        }
    }

    fn require(&self, index: Index) -> Result<(), AppError> {
        if self.indexes().contains(&index) {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Collection '{}' has no '{}' index",
                self.table(),
                index.column()
            )))
        }
    }
}

/// Single-column secondary indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    Topic,
    Difficulty,
    QuestionType,
    Bookmarked,
    QuestionId,
}

impl Index {
    pub fn column(&self) -> &'static str {
        match self {
            Index::Topic => "topic",
            Index::Difficulty => "difficulty",
            Index::QuestionType => "question_type",
            Index::Bookmarked => "bookmarked",
            Index::QuestionId => "question_id",
        }
    }
}

/// Value looked up in an index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for IndexValue {
    fn from(v: &str) -> Self {
        IndexValue::Text(v.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(v: String) -> Self {
        IndexValue::Text(v)
    }
}

impl From<i64> for IndexValue {
    fn from(v: i64) -> Self {
        IndexValue::Int(v)
    }
}

impl From<bool> for IndexValue {
    fn from(v: bool) -> Self {
        IndexValue::Bool(v)
    }
}

/// Appends `<column> = ?` with the value bound.
pub(crate) fn push_index_filter(qb: &mut QueryBuilder<'_, Sqlite>, index: Index, value: &IndexValue) {
    qb.push(index.column()).push(" = ");
    match value {
        IndexValue::Text(s) => {
            qb.push_bind(s.clone());
        }
        IndexValue::Int(i) => {
            qb.push_bind(*i);
        }
        IndexValue::Bool(b) => {
            qb.push_bind(*b);
        }
    }
}

/// Rows removed by a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub explanations: u64,
    pub hints: u64,
    pub questions: u64,
}

/// Handle to the local database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the database at `database_url` and applies
    /// pending migrations. A migration failure is returned, never swallowed.
    pub async fn open(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database. A single connection that never expires,
    /// since every SQLite memory connection is its own database.
    pub async fn open_in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, AppError> {
        tracing::info!("Running migrations...");
        MIGRATOR.run(&pool).await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {:?}", e);
            AppError::from(e)
        })?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of applied schema versions.
    pub async fn schema_version(&self) -> Result<i64, AppError> {
        let version: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    pub fn questions(&self) -> QuestionRepo<'_> {
        QuestionRepo::new(&self.pool)
    }

    pub fn sessions(&self) -> SessionRepo<'_> {
        SessionRepo::new(&self.pool)
    }

    pub fn progress(&self) -> ProgressRepo<'_> {
        ProgressRepo::new(&self.pool)
    }

    pub fn snapshots(&self) -> SnapshotRepo<'_> {
        SnapshotRepo::new(&self.pool)
    }

    pub fn cache(&self) -> CacheRepo<'_> {
        CacheRepo::new(&self.pool)
    }

    pub fn reading(&self) -> ReadingRepo<'_> {
        ReadingRepo::new(&self.pool)
    }

    /// Removes one record by identity. Returns whether it existed.
    pub async fn delete(&self, collection: Collection, id: i64) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes every record whose `index` equals `value`.
    pub async fn delete_by_index(
        &self,
        collection: Collection,
        index: Index,
        value: impl Into<IndexValue>,
    ) -> Result<u64, AppError> {
        collection.require(index)?;

        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM ");
        qb.push(collection.table()).push(" WHERE ");
        push_index_filter(&mut qb, index, &value.into());

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Counts matching records without loading them.
    pub async fn count(
        &self,
        collection: Collection,
        index: Index,
        value: impl Into<IndexValue>,
    ) -> Result<i64, AppError> {
        collection.require(index)?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        qb.push(collection.table()).push(" WHERE ");
        push_index_filter(&mut qb, index, &value.into());

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn count_all(&self, collection: Collection) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Drops cached explanations and hints created before `now - retention`,
    /// and questions neither bookmarked nor used since then.
    pub async fn cleanup_stale(
        &self,
        retention: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, AppError> {
        let cutoff = now - retention;
        let (explanations, hints) = self.cache().purge_older_than(cutoff).await?;

        let questions = sqlx::query(
            r#"
            DELETE FROM questions
            WHERE bookmarked = 0
              AND COALESCE(last_used, created_at) < ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let report = CleanupReport {
            explanations,
            hints,
            questions,
        };
        tracing::info!(?report, "Stale data cleanup finished");
        Ok(report)
    }
}
