// src/store/admin.rs

//! Bulk data-management operations.
//!
//! Each operation runs all of its deletions even if one fails, then reports
//! overall failure naming the collections that could not be purged.

use serde::Serialize;

use crate::{
    error::AppError,
    store::{Collection, Index, Store},
};

/// Rows removed per collection by a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub removed: Vec<(Collection, u64)>,
    pub failed: Vec<Collection>,
}

impl PurgeReport {
    fn record(&mut self, collection: Collection, outcome: Result<u64, AppError>) {
        match outcome {
            Ok(rows) => self.removed.push((collection, rows)),
            Err(e) => {
                tracing::error!("Failed to purge {}: {}", collection.table(), e);
                self.failed.push(collection);
            }
        }
    }

    /// Rows removed from `collection` (0 if it was not touched or failed).
    pub fn removed_from(&self, collection: Collection) -> u64 {
        self.removed
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, rows)| rows)
            .sum()
    }

    fn finish(self, operation: &str) -> Result<Self, AppError> {
        if self.failed.is_empty() {
            tracing::info!(removed = ?self.removed, "{} finished", operation);
            Ok(self)
        } else {
            let names: Vec<&str> = self.failed.iter().map(|c| c.table()).collect();
            Err(AppError::InternalServerError(format!(
                "{} could not purge: {}",
                operation,
                names.join(", ")
            )))
        }
    }
}

impl Store {
    async fn purge_all(&self, collection: Collection) -> Result<u64, AppError> {
        let sql = format!("DELETE FROM {}", collection.table());
        let result = sqlx::query(&sql).execute(self.pool()).await?;
        Ok(result.rows_affected())
    }

    /// Removes cached entries of `collection` that belong to questions of `topic`.
    async fn purge_cache_for_topic(&self, collection: Collection, topic: &str) -> Result<u64, AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE question_id IN (SELECT id FROM questions WHERE topic = ?)",
            collection.table()
        );
        let result = sqlx::query(&sql).bind(topic).execute(self.pool()).await?;
        Ok(result.rows_affected())
    }

    /// Wipes every collection.
    pub async fn clear_all(&self) -> Result<PurgeReport, AppError> {
        let mut report = PurgeReport::default();
        for collection in Collection::ALL {
            report.record(collection, self.purge_all(collection).await);
        }
        report.finish("Clear all")
    }

    /// Wipes history, progress, snapshots and caches. The bank and reading
    /// materials are kept.
    pub async fn reset_all(&self) -> Result<PurgeReport, AppError> {
        let mut report = PurgeReport::default();
        for collection in [
            Collection::QuizSessions,
            Collection::UserProgress,
            Collection::QuizProgress,
            Collection::CachedExplanations,
            Collection::CachedHints,
        ] {
            report.record(collection, self.purge_all(collection).await);
        }
        report.finish("Reset all")
    }

    /// Wipes every record of `topic`, including cache entries of its questions.
    pub async fn delete_topic(&self, topic: &str) -> Result<PurgeReport, AppError> {
        let mut report = PurgeReport::default();

        // Caches first: they are found through the topic's questions.
        for collection in [Collection::CachedExplanations, Collection::CachedHints] {
            report.record(collection, self.purge_cache_for_topic(collection, topic).await);
        }
        for collection in [
            Collection::Questions,
            Collection::QuizSessions,
            Collection::UserProgress,
            Collection::QuizProgress,
            Collection::ReadingMaterials,
        ] {
            report.record(
                collection,
                self.delete_by_index(collection, Index::Topic, topic).await,
            );
        }
        report.finish("Delete topic")
    }

    /// Wipes the topic's history, progress and snapshot. Its questions and
    /// reading materials are kept.
    pub async fn reset_topic(&self, topic: &str) -> Result<PurgeReport, AppError> {
        let mut report = PurgeReport::default();
        for collection in [
            Collection::QuizSessions,
            Collection::UserProgress,
            Collection::QuizProgress,
        ] {
            report.record(
                collection,
                self.delete_by_index(collection, Index::Topic, topic).await,
            );
        }
        report.finish("Reset topic")
    }
}
