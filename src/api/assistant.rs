//! Assistant and quiz endpoints.

use super::{
    AppState,
    error::{ApiError, ApiResult},
};
use crate::core::{quiz::QuizQuestion, snippet};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /assistant`.
#[derive(Deserialize)]
pub struct AssistRequest {
    /// User prompt
    pub prompt: String,
}

/// Body returned by `POST /assistant`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssistResponse {
    /// Reply text, or the unavailable notice
    pub reply: String,
}

/// `POST /assistant`
pub async fn assist(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AssistRequest>,
) -> ApiResult<Json<AssistResponse>> {
    // Code pasted from a lesson may still be in its stored form
    let trimmed = body.prompt.trim();
    let prompt = if snippet::is_encoded(trimmed) && trimmed.contains(";base64,") {
        snippet::decode(Some(trimmed))
    } else {
        trimmed.to_string()
    };
    if prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt cannot be empty".to_string()));
    }
    let reply = state.assistant.generate_reply(&prompt).await;
    Ok(Json(AssistResponse { reply }))
}

/// Body of `POST /quiz`.
#[derive(Deserialize)]
pub struct QuizRequest {
    /// Topic to ask about
    pub topic: String,
    /// Number of questions wanted
    #[serde(default = "default_count")]
    pub count: usize,
}

const fn default_count() -> usize {
    5
}

/// `POST /quiz`
pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuizRequest>,
) -> ApiResult<Json<Vec<QuizQuestion>>> {
    let topic = body.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::BadRequest("Topic cannot be empty".to_string()));
    }
    Ok(Json(state.assistant.generate_quiz(topic, body.count).await))
}
