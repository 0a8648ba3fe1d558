//! Dashboard endpoints: analytics and uploads.

use super::{
    AppState,
    error::{ApiError, ApiResult},
};
use crate::{
    core::{
        Requester, Subject,
        analytics::{self, DEFAULT_EVENT_LIMIT},
    },
    entities::AnalyticsEventModel,
    services::storage::object_path,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Query of `GET /analytics`.
#[derive(Deserialize)]
pub struct EventQuery {
    /// Only events of this type
    pub event_type: Option<String>,
    /// Page size
    pub limit: Option<u64>,
}

/// `GET /analytics`
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Query(query): Query<EventQuery>,
) -> ApiResult<Json<Vec<AnalyticsEventModel>>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    Ok(Json(
        analytics::list_events(&state.db, &requester, query.event_type.as_deref(), limit).await?,
    ))
}

/// Body of `POST /analytics`.
#[derive(Deserialize)]
pub struct RecordEventRequest {
    /// Principal the event is about
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Event name
    pub event_type: String,
    /// Arbitrary payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// `POST /analytics`
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Json(body): Json<RecordEventRequest>,
) -> ApiResult<(StatusCode, Json<AnalyticsEventModel>)> {
    let event = analytics::record_event(
        &state.db,
        &requester,
        body.user_id,
        &body.event_type,
        body.payload,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("event"))?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Query of `POST /uploads/{kind}`.
#[derive(Deserialize)]
pub struct UploadQuery {
    /// Original file name
    pub file_name: String,
}

/// Body returned by `POST /uploads/{kind}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Object path inside the bucket
    pub path: String,
    /// Public URL
    pub url: String,
}

/// `POST /uploads/{kind}` where `kind` is `products` or `curriculum`. Admin only.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(kind): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    if !Subject::resolve(&state.db, &requester).await?.is_admin() {
        debug!("Upload denied");
        return Err(ApiError::Forbidden("Uploads are restricted to admins".to_string()));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Upload body is empty".to_string()));
    }

    let bucket = match kind.as_str() {
        "products" => state.storage.product_bucket(),
        "curriculum" => state.storage.curriculum_bucket(),
        other => return Err(ApiError::not_found(&format!("upload target '{other}'"))),
    };
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let path = object_path(&kind, &query.file_name);
    let url = state
        .storage
        .upload(bucket, &path, body.to_vec(), content_type)
        .await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { path, url })))
}
