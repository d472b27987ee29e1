// src/handlers/questions.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    config::MAX_QUESTIONS_PER_QUIZ,
    error::AppError,
    llm::{LlmService, QuestionsRequest},
    models::question::{Difficulty, QuizDifficulty},
    store::{QuestionFilter, Store},
};

/// Browses the bank with optional filters and free-text search.
pub async fn list_questions(
    State(store): State<Store>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let questions = store.questions().list(&filter).await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.questions().get(id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuestionsRequest {
    #[validate(length(min = 1, max = 100, message = "Topic must be between 1 and 100 characters."))]
    pub topic: String,
    #[validate(range(min = 1, max = 50, message = "Count must be between 1 and 50."))]
    pub count: usize,
    #[serde(default)]
    pub difficulty: QuizDifficulty,
}

/// Generates questions into the bank without starting a quiz.
pub async fn generate_questions(
    State(store): State<Store>,
    State(llm): State<Arc<dyn LlmService>>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let topic = payload.topic.trim().to_string();
    let mut fresh = llm
        .generate_questions(&QuestionsRequest {
            topic: topic.clone(),
            count: payload.count.min(MAX_QUESTIONS_PER_QUIZ),
            difficulty: payload.difficulty,
        })
        .await?;
    for q in &mut fresh {
        q.topic = topic.clone();
    }

    let repo = store.questions();
    let ids = repo.bulk_put(&fresh).await?;
    let questions = repo.get_many(&ids).await?;
    tracing::info!("Generated {} questions on '{}'", questions.len(), topic);

    Ok((StatusCode::CREATED, Json(questions)))
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub difficulty: Option<Difficulty>,
}

pub async fn count_questions(
    State(store): State<Store>,
    Path(topic): Path<String>,
    Query(params): Query<CountParams>,
) -> Result<impl IntoResponse, AppError> {
    let count = store
        .questions()
        .count_for_topic(&topic, params.difficulty)
        .await?;
    Ok(Json(json!({ "topic": topic, "count": count })))
}

pub async fn toggle_bookmark(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bookmarked = store.questions().toggle_bookmark(id).await?;
    Ok(Json(json!({ "id": id, "bookmarked": bookmarked })))
}

pub async fn delete_question(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.questions().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
