// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{answer::UserAnswer, evaluation::ScoringMode},
    quiz::{LoadRequest, QuizEngine},
};

/// Current attempt, or `null` when nothing is loaded.
pub async fn get_quiz(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.view().await))
}

/// Loads questions for a new attempt, from the bank or the generator.
pub async fn load_questions(
    State(engine): State<QuizEngine>,
    Json(payload): Json<LoadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = engine.load_questions(payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Saved unfinished attempt for a topic, or `null`.
pub async fn get_snapshot(
    State(engine): State<QuizEngine>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.pending_snapshot(&topic).await?))
}

pub async fn resume_snapshot(
    State(engine): State<QuizEngine>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.resume_snapshot(&topic).await?))
}

pub async fn discard_snapshot(
    State(engine): State<QuizEngine>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if engine.discard_snapshot(&topic).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No saved quiz for '{}'", topic)))
    }
}

pub async fn start(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.start().await?))
}

pub async fn pause(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.pause().await?))
}

pub async fn resume(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.resume().await?))
}

pub async fn next(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.next().await?))
}

pub async fn previous(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.previous().await?))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub index: usize,
    pub answer: UserAnswer,
}

pub async fn answer(
    State(engine): State<QuizEngine>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.answer(payload.index, payload.answer).await?))
}

pub async fn regenerate(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.regenerate().await?))
}

pub async fn hint(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.hint().await?))
}

pub async fn explanation(State(engine): State<QuizEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.explanation().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteParams {
    /// Overrides the configured scoring mode.
    pub mode: Option<ScoringMode>,
}

pub async fn complete(
    State(engine): State<QuizEngine>,
    Query(params): Query<CompleteParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.complete(params.mode).await?))
}
