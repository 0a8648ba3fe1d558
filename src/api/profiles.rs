//! Profile endpoints.

use super::{
    AppState,
    error::{ApiError, ApiResult},
};
use crate::{
    core::{
        Requester,
        profile::{self, NewProfile, ProfileChanges},
    },
    entities::ProfileModel,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

/// `GET /profiles`
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> ApiResult<Json<Vec<ProfileModel>>> {
    Ok(Json(profile::list_profiles(&state.db, &requester).await?))
}

/// `GET /profiles/me`
pub async fn my_profile(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> ApiResult<Json<ProfileModel>> {
    let id = requester.id().ok_or_else(|| ApiError::not_found("profile"))?;
    profile::get_profile(&state.db, &requester, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("profile"))
}

/// `GET /profiles/{id}`
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProfileModel>> {
    profile::get_profile(&state.db, &requester, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("profile"))
}

/// `POST /profiles`
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Json(body): Json<NewProfile>,
) -> ApiResult<(StatusCode, Json<ProfileModel>)> {
    let created = profile::create_profile(&state.db, &requester, body)
        .await?
        .ok_or_else(|| ApiError::not_found("profile"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /profiles/{id}`
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<Uuid>,
    Json(changes): Json<ProfileChanges>,
) -> ApiResult<Json<ProfileModel>> {
    profile::update_profile(&state.db, &requester, id, changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("profile"))
}

/// `DELETE /profiles/{id}`
pub async fn delete_principal(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    profile::delete_principal(&state.db, &requester, id)
        .await?
        .ok_or_else(|| ApiError::not_found("profile"))?;
    Ok(StatusCode::NO_CONTENT)
}
