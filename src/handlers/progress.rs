// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::{config::RECENT_SESSIONS_LIMIT, error::AppError, store::Store};

/// Per-topic aggregates plus the most recent completed sessions.
pub async fn get_progress(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let progress = store.progress().all().await?;
    let recent = store.sessions().recent(RECENT_SESSIONS_LIMIT).await?;

    Ok(Json(json!({
        "progress": progress,
        "recent_sessions": recent,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SessionParams {
    pub topic: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_sessions(
    State(store): State<Store>,
    Query(params): Query<SessionParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.limit.is_some_and(|l| l <= 0) {
        return Err(AppError::BadRequest("Limit must be positive.".to_string()));
    }

    let sessions = match params.topic.as_deref() {
        Some(topic) => store.sessions().by_topic(topic, params.limit).await?,
        None => {
            store
                .sessions()
                .recent(params.limit.unwrap_or(RECENT_SESSIONS_LIMIT))
                .await?
        }
    };
    Ok(Json(sessions))
}
