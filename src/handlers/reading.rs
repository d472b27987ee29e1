// src/handlers/reading.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    llm::{LlmService, ReadingMaterialRequest},
    models::question::Difficulty,
    store::Store,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub topic: Option<String>,
}

/// Lists reading materials, newest first.
pub async fn list_materials(
    State(store): State<Store>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let materials = store.reading().list(params.topic.as_deref()).await?;
    Ok(Json(materials))
}

pub async fn list_bookmarked(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.reading().bookmarked().await?))
}

pub async fn get_material(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.reading().get(id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateMaterialRequest {
    #[validate(length(min = 1, max = 100, message = "Topic must be between 1 and 100 characters."))]
    pub topic: String,
    pub difficulty: Difficulty,
}

pub async fn generate_material(
    State(store): State<Store>,
    State(llm): State<Arc<dyn LlmService>>,
    Json(payload): Json<GenerateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let topic = payload.topic.trim().to_string();
    let mut material = llm
        .generate_reading_material(&ReadingMaterialRequest {
            topic: topic.clone(),
            difficulty: payload.difficulty,
        })
        .await?;
    material.topic = topic;

    let repo = store.reading();
    let id = repo.put(&material).await?;
    Ok((StatusCode::CREATED, Json(repo.get(id).await?)))
}

pub async fn toggle_bookmark(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bookmarked = store.reading().toggle_bookmark(id).await?;
    Ok(Json(json!({ "id": id, "bookmarked": bookmarked })))
}

/// Records that the material was opened.
pub async fn mark_read(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.reading().mark_read(id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_material(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.reading().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_topic_materials(
    State(store): State<Store>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let removed = store.reading().delete_by_topic(&topic).await?;
    Ok(Json(json!({ "topic": topic, "removed": removed })))
}
