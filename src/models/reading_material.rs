// src/models/reading_material.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::Difficulty;

/// Generated study text for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingMaterial {
    pub id: i64,
    pub topic: String,
    pub title: String,
    /// Markdown.
    pub content: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
    pub last_read: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewReadingMaterial {
    pub topic: String,
    pub title: String,
    pub content: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Reading material as returned by the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReadingMaterial {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GeneratedReadingMaterial {
    pub fn into_new(self, topic: &str) -> Result<NewReadingMaterial, crate::error::AppError> {
        Ok(NewReadingMaterial {
            topic: topic.to_string(),
            title: self.title.trim().to_string(),
            content: self.content,
            difficulty: self.difficulty.parse()?,
            tags: self.tags,
            created_at: None,
        })
    }
}
