// src/handlers/data.rs

//! Data management: wiping, resetting and sweeping the local store.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::{
    config::Config,
    error::AppError,
    quiz::QuizEngine,
    store::{Collection, Index, Store},
};

/// Deletes everything, including the question bank.
pub async fn clear_all(
    State(store): State<Store>,
    State(engine): State<QuizEngine>,
) -> Result<impl IntoResponse, AppError> {
    engine.abandon().await;
    let report = store.clear_all().await?;
    Ok(Json(report))
}

/// Forgets history and caches but keeps the bank and reading materials.
pub async fn reset_all(
    State(store): State<Store>,
    State(engine): State<QuizEngine>,
) -> Result<impl IntoResponse, AppError> {
    engine.abandon().await;
    let report = store.reset_all().await?;
    Ok(Json(report))
}

pub async fn delete_topic(
    State(store): State<Store>,
    State(engine): State<QuizEngine>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    engine.abandon_if_topic(&topic).await;
    let report = store.delete_topic(&topic).await?;
    Ok(Json(report))
}

pub async fn reset_topic(
    State(store): State<Store>,
    State(engine): State<QuizEngine>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    engine.abandon_if_topic(&topic).await;
    let report = store.reset_topic(&topic).await?;
    Ok(Json(report))
}

/// Runs the retention sweep on demand.
pub async fn cleanup(
    State(store): State<Store>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let retention = chrono::Duration::days(config.cache_retention_days);
    let report = store.cleanup_stale(retention, Utc::now()).await?;
    Ok(Json(report))
}

/// Record counts per collection and the schema version.
pub async fn stats(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let mut counts = Map::new();
    for collection in Collection::ALL {
        let count = store.count_all(collection).await?;
        counts.insert(collection.table().to_string(), Value::from(count));
    }

    Ok(Json(json!({
        "schema_version": store.schema_version().await?,
        "collections": counts,
    })))
}

/// Record counts for one topic in every topic-indexed collection.
pub async fn topic_stats(
    State(store): State<Store>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut counts = Map::new();
    for collection in Collection::ALL {
        if !collection.indexes().contains(&Index::Topic) {
            continue;
        }
        let count = store.count(collection, Index::Topic, topic.as_str()).await?;
        counts.insert(collection.table().to_string(), Value::from(count));
    }

    Ok(Json(json!({
        "topic": topic,
        "collections": counts,
    })))
}
