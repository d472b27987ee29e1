// src/store/reading.rs

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, prelude::FromRow, types::Json};

use crate::{
    error::AppError,
    models::reading_material::{NewReadingMaterial, ReadingMaterial},
};

const READING_COLUMNS: &str =
    "id, topic, title, content, difficulty, tags, bookmarked, created_at, last_read";

#[derive(FromRow)]
struct ReadingRow {
    id: i64,
    topic: String,
    title: String,
    content: String,
    difficulty: String,
    tags: Json<Vec<String>>,
    bookmarked: bool,
    created_at: DateTime<Utc>,
    last_read: Option<DateTime<Utc>>,
}

impl TryFrom<ReadingRow> for ReadingMaterial {
    type Error = AppError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(ReadingMaterial {
            id: row.id,
            topic: row.topic,
            title: row.title,
            content: row.content,
            difficulty: row.difficulty.parse().map_err(move |e| {
                AppError::InternalServerError(format!("Corrupt reading material {}: {}", id, e))
            })?,
            tags: row.tags.0,
            bookmarked: row.bookmarked,
            created_at: row.created_at,
            last_read: row.last_read,
        })
    }
}

pub struct ReadingRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReadingRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn put(&self, material: &NewReadingMaterial) -> Result<i64, AppError> {
        if material.title.trim().is_empty() || material.content.trim().is_empty() {
            return Err(AppError::ValidationFailed(
                "Reading material needs a title and content".to_string(),
            ));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO reading_materials (topic, title, content, difficulty, tags, bookmarked, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&material.topic)
        .bind(&material.title)
        .bind(&material.content)
        .bind(material.difficulty.as_str())
        .bind(Json(&material.tags))
        .bind(material.created_at.unwrap_or_else(Utc::now))
        .execute(self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<ReadingMaterial, AppError> {
        let sql = format!("SELECT {} FROM reading_materials WHERE id = ?", READING_COLUMNS);
        let row: ReadingRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reading material {} not found", id)))?;
        row.try_into()
    }

    /// Newest first, optionally restricted to one topic.
    pub async fn list(&self, topic: Option<&str>) -> Result<Vec<ReadingMaterial>, AppError> {
        let rows: Vec<ReadingRow> = match topic {
            Some(topic) => {
                let sql = format!(
                    "SELECT {} FROM reading_materials WHERE topic = ? ORDER BY created_at DESC, id DESC",
                    READING_COLUMNS
                );
                sqlx::query_as(&sql).bind(topic).fetch_all(self.pool).await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM reading_materials ORDER BY created_at DESC, id DESC",
                    READING_COLUMNS
                );
                sqlx::query_as(&sql).fetch_all(self.pool).await?
            }
        };
        rows.into_iter().map(ReadingMaterial::try_from).collect()
    }

    pub async fn bookmarked(&self) -> Result<Vec<ReadingMaterial>, AppError> {
        let sql = format!(
            "SELECT {} FROM reading_materials WHERE bookmarked = 1 ORDER BY created_at DESC, id DESC",
            READING_COLUMNS
        );
        let rows: Vec<ReadingRow> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        rows.into_iter().map(ReadingMaterial::try_from).collect()
    }

    /// Flips the bookmark flag and returns the new value.
    pub async fn toggle_bookmark(&self, id: i64) -> Result<bool, AppError> {
        let bookmarked: Option<bool> = sqlx::query_scalar(
            "UPDATE reading_materials SET bookmarked = NOT bookmarked WHERE id = ? RETURNING bookmarked",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        bookmarked.ok_or_else(|| AppError::NotFound(format!("Reading material {} not found", id)))
    }

    pub async fn mark_read(&self, id: i64, now: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE reading_materials SET last_read = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reading material {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM reading_materials WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reading material {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete_by_topic(&self, topic: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM reading_materials WHERE topic = ?")
            .bind(topic)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
