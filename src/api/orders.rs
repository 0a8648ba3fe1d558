//! Order endpoints.

use super::{
    AppState,
    error::{ApiError, ApiResult},
};
use crate::{
    core::{
        Requester,
        order::{self, OrderLine, OrderWithItems},
    },
    entities::{OrderModel, OrderStatus},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

/// Body of `POST /orders`.
#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    /// Requested lines
    pub lines: Vec<OrderLine>,
}

/// `POST /orders`
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Json(body): Json<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderWithItems>)> {
    let placed = order::place_order(&state.db, &requester, &body.lines)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// `GET /orders`
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> ApiResult<Json<Vec<OrderModel>>> {
    Ok(Json(order::list_orders(&state.db, &requester).await?))
}

/// `GET /orders/{id}`
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderWithItems>> {
    order::get_order_with_items(&state.db, &requester, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("order"))
}

/// Body of `PUT /orders/{id}/status`.
#[derive(Deserialize)]
pub struct StatusRequest {
    /// New status
    pub status: OrderStatus,
}

/// `PUT /orders/{id}/status`
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Json<OrderModel>> {
    order::update_order_status(&state.db, &requester, id, body.status)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("order"))
}

/// `DELETE /orders/{id}`
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    order::delete_order(&state.db, &requester, id)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    Ok(StatusCode::NO_CONTENT)
}
