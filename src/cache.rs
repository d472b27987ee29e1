// src/cache.rs

//! Cache-then-fetch for generated tutoring content.
//!
//! A `CacheEntry` knows how to find a cached value, how to produce it from the
//! LLM on a miss and how to store it afterwards. `fetch_through` runs that
//! sequence for any entry kind.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    llm::{ExplanationRequest, HintRequest, LlmService},
    models::{answer::UserAnswer, question::Question},
    store::Store,
};

#[async_trait]
pub trait CacheEntry: Send + Sync {
    type Value: Send + Sync;

    /// Short description for logs.
    fn describe(&self) -> String;

    async fn lookup(&self, store: &Store) -> Result<Option<Self::Value>, AppError>;

    async fn generate(&self, llm: &dyn LlmService) -> Result<Self::Value, AppError>;

    async fn persist(
        &self,
        store: &Store,
        value: &Self::Value,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// Returns the cached value for `entry`, generating and storing it on a miss.
///
/// Generation errors reach the caller unchanged. A failed write is only
/// logged: the generated value is still returned.
pub async fn fetch_through<E: CacheEntry>(
    store: &Store,
    llm: &dyn LlmService,
    entry: &E,
) -> Result<E::Value, AppError> {
    if let Some(hit) = entry.lookup(store).await? {
        tracing::debug!("Cache hit: {}", entry.describe());
        return Ok(hit);
    }

    tracing::debug!("Cache miss: {}", entry.describe());
    let value = entry.generate(llm).await?;

    if let Err(e) = entry.persist(store, &value, Utc::now()).await {
        tracing::warn!("Failed to cache {}: {}", entry.describe(), e);
    }
    Ok(value)
}

/// Explanation of `question` for one particular answer.
pub struct ExplanationEntry<'a> {
    pub question: &'a Question,
    pub answer: &'a UserAnswer,
}

#[async_trait]
impl CacheEntry for ExplanationEntry<'_> {
    type Value = String;

    fn describe(&self) -> String {
        format!(
            "explanation for question {} answer '{}'",
            self.question.id,
            self.answer.canonical()
        )
    }

    async fn lookup(&self, store: &Store) -> Result<Option<String>, AppError> {
        let cached = store
            .cache()
            .explanation(self.question.id, &self.answer.canonical())
            .await?;
        Ok(cached.map(|c| c.explanation))
    }

    async fn generate(&self, llm: &dyn LlmService) -> Result<String, AppError> {
        let req = ExplanationRequest {
            question: self.question.question.clone(),
            user_answer: self.question.format_answer(self.answer),
            correct_answer: self.question.correct_answer_text(),
            topic: self.question.topic.clone(),
        };
        llm.explanation(&req).await
    }

    async fn persist(&self, store: &Store, value: &String, now: DateTime<Utc>) -> Result<(), AppError> {
        store
            .cache()
            .save_explanation(self.question.id, &self.answer.canonical(), value, now)
            .await?;
        Ok(())
    }
}

/// Hint for `question`. Hints do not depend on the answer.
pub struct HintEntry<'a> {
    pub question: &'a Question,
}

#[async_trait]
impl CacheEntry for HintEntry<'_> {
    type Value = String;

    fn describe(&self) -> String {
        format!("hint for question {}", self.question.id)
    }

    async fn lookup(&self, store: &Store) -> Result<Option<String>, AppError> {
        let cached = store.cache().hint(self.question.id).await?;
        Ok(cached.map(|c| c.hint))
    }

    async fn generate(&self, llm: &dyn LlmService) -> Result<String, AppError> {
        let req = HintRequest {
            question: self.question.question.clone(),
            topic: self.question.topic.clone(),
        };
        llm.hint(&req).await
    }

    async fn persist(&self, store: &Store, value: &String, now: DateTime<Utc>) -> Result<(), AppError> {
        store.cache().save_hint(self.question.id, value, now).await?;
        Ok(())
    }
}

/// Explanation and hint lookups backed by the store and the LLM.
#[derive(Clone)]
pub struct ContentCache {
    store: Store,
    llm: Arc<dyn LlmService>,
}

impl ContentCache {
    pub fn new(store: Store, llm: Arc<dyn LlmService>) -> Self {
        Self { store, llm }
    }

    pub async fn explanation(&self, question: &Question, answer: &UserAnswer) -> Result<String, AppError> {
        fetch_through(&self.store, self.llm.as_ref(), &ExplanationEntry { question, answer }).await
    }

    pub async fn hint(&self, question: &Question) -> Result<String, AppError> {
        fetch_through(&self.store, self.llm.as_ref(), &HintEntry { question }).await
    }

    /// Like `explanation`, for a question in the bank.
    pub async fn explanation_for(&self, question_id: i64, answer: &UserAnswer) -> Result<String, AppError> {
        let question = self.store.questions().get(question_id).await?;
        question.check_answer(answer)?;
        self.explanation(&question, answer).await
    }

    pub async fn hint_for(&self, question_id: i64) -> Result<String, AppError> {
        let question = self.store.questions().get(question_id).await?;
        self.hint(&question).await
    }

    /// Forgets everything cached for a question whose content changed.
    pub async fn invalidate(&self, question_id: i64) -> Result<(), AppError> {
        let (explanations, hints) = self.store.cache().purge_question(question_id).await?;
        tracing::debug!(
            "Dropped {} explanations and {} hints for question {}",
            explanations,
            hints,
            question_id
        );
        Ok(())
    }
}
