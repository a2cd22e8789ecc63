//! Admin-facing order management. Handlers stay thin; the ledger owns every
//! state transition.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger::orders as ledger;
use crate::ledger::orders::{NewOrder, OrderUpdate};
use crate::models::order::{DeliveryStatus, Order};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route(
            "/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/orders/:id/assign", post(assign_order))
        .route("/orders/:id/unassign", post(unassign_order))
        .route("/orders/:id/cancel", post(cancel_order))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewOrder>,
) -> Result<Json<Order>, AppError> {
    let order = ledger::create_order(&state, payload)?;
    Ok(Json(order))
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<DeliveryStatus>,
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ListResponse {
    orders: Vec<Order>,
    total: usize,
    page: usize,
    limit: usize,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<ListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).max(1);
    let (orders, total) = ledger::list_orders(&state, query.status, page, limit);

    Json(ListResponse {
        orders,
        total,
        page,
        limit,
    })
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::get_order(&state, id)?))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderUpdate>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::update_order(&state, id, payload)?))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    ledger::delete_order(&state, id)?;
    Ok(Json(serde_json::json!({ "message": "order deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignRequest {
    driver_id: Uuid,
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::assign_order(&state, id, payload.driver_id)?))
}

async fn unassign_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::unassign_order(&state, id)?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::cancel_order(&state, id)?))
}
