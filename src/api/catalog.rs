//! Product and curriculum endpoints.
//!
//! Anonymous reads are served from the catalog cache; signed-in reads go straight to
//! the core so admins see unpublished modules. Every successful write invalidates
//! the cache.

use super::{
    AppState,
    error::{ApiError, ApiResult},
};
use crate::{
    cache::CatalogSource,
    core::{
        Requester,
        curriculum::{self, CodeSnippet, ModuleFilter, ModuleInput},
        product::{self, ProductInput},
    },
    entities::{CurriculumModuleModel, ProductModel},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `GET /catalog`.
#[derive(Serialize)]
pub struct CatalogResponse {
    /// Where the data came from
    pub source: CatalogSource,
    /// Products, featured first
    pub products: Vec<ProductModel>,
    /// Published modules
    pub modules: Vec<CurriculumModuleModel>,
}

/// `GET /catalog`
pub async fn catalog(State(state): State<Arc<AppState>>) -> ApiResult<Json<CatalogResponse>> {
    let view = state.catalog.get(&state.db).await?;
    Ok(Json(CatalogResponse {
        source: view.source,
        products: view.snapshot.products.clone(),
        modules: view.snapshot.modules.clone(),
    }))
}

/// `GET /products`
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> ApiResult<Json<Vec<ProductModel>>> {
    if requester == Requester::Anonymous {
        let view = state.catalog.get(&state.db).await?;
        return Ok(Json(view.snapshot.products.clone()));
    }
    Ok(Json(product::list_products(&state.db, &requester).await?))
}

/// `GET /products/featured`
pub async fn list_featured_products(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> ApiResult<Json<Vec<ProductModel>>> {
    if requester == Requester::Anonymous {
        let view = state.catalog.get(&state.db).await?;
        let mut featured: Vec<_> = view
            .snapshot
            .products
            .iter()
            .filter(|p| p.featured)
            .cloned()
            .collect();
        featured.sort_by(|a, b| a.name.cmp(&b.name));
        return Ok(Json(featured));
    }
    Ok(Json(product::list_featured_products(&state.db, &requester).await?))
}

/// `GET /products/{id}`
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductModel>> {
    product::get_product(&state.db, &requester, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product"))
}

/// `POST /products`
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<ProductModel>)> {
    let created = product::create_product(&state.db, &requester, input)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    state.catalog.invalidate().await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /products/{id}`
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<ProductModel>> {
    let updated = product::update_product(&state.db, &requester, id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    state.catalog.invalidate().await;
    Ok(Json(updated))
}

/// `DELETE /products/{id}`
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    product::delete_product(&state.db, &requester, id)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    state.catalog.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /modules`
pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Query(filter): Query<ModuleFilter>,
) -> ApiResult<Json<Vec<CurriculumModuleModel>>> {
    if requester == Requester::Anonymous {
        let view = state.catalog.get(&state.db).await?;
        let modules = view
            .snapshot
            .modules
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        return Ok(Json(modules));
    }
    Ok(Json(curriculum::list_modules(&state.db, &requester, &filter).await?))
}

/// `GET /modules/{id}`
pub async fn get_module(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<Json<CurriculumModuleModel>> {
    curriculum::get_module(&state.db, &requester, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("module"))
}

/// `GET /modules/{id}/snippets` - decoded code assets.
pub async fn module_snippets(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<CodeSnippet>>> {
    let module = curriculum::get_module(&state.db, &requester, id)
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    Ok(Json(curriculum::code_snippets(&module)))
}

/// `POST /modules`
pub async fn create_module(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Json(input): Json<ModuleInput>,
) -> ApiResult<(StatusCode, Json<CurriculumModuleModel>)> {
    let created = curriculum::create_module(&state.db, &requester, input)
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    state.catalog.invalidate().await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /modules/{id}`
pub async fn update_module(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
    Json(input): Json<ModuleInput>,
) -> ApiResult<Json<CurriculumModuleModel>> {
    let updated = curriculum::update_module(&state.db, &requester, id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    state.catalog.invalidate().await;
    Ok(Json(updated))
}

/// Body of `POST /modules/{id}/publish`.
#[derive(Deserialize)]
pub struct PublishRequest {
    /// New visibility
    pub published: bool,
}

/// `POST /modules/{id}/publish`
pub async fn set_published(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
    Json(body): Json<PublishRequest>,
) -> ApiResult<Json<CurriculumModuleModel>> {
    let updated = curriculum::set_published(&state.db, &requester, id, body.published)
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    state.catalog.invalidate().await;
    Ok(Json(updated))
}

/// Body of `POST /modules/{id}/code`.
#[derive(Deserialize)]
pub struct CodeAssetRequest {
    /// Caption
    pub label: String,
    /// Snippet text, stored encoded
    pub code: String,
}

/// `POST /modules/{id}/code`
pub async fn append_code_asset(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
    Json(body): Json<CodeAssetRequest>,
) -> ApiResult<Json<CurriculumModuleModel>> {
    let updated = curriculum::append_code_asset(&state.db, &requester, id, &body.label, &body.code)
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    state.catalog.invalidate().await;
    Ok(Json(updated))
}

/// `DELETE /modules/{id}`
pub async fn delete_module(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    curriculum::delete_module(&state.db, &requester, id)
        .await?
        .ok_or_else(|| ApiError::not_found("module"))?;
    state.catalog.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}
