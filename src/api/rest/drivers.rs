//! Driver-facing routes plus driver fleet management. The routing layer
//! passes driver identity explicitly; authentication lives outside this
//! service.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::ingest::location;
use crate::ledger::orders as ledger;
use crate::ledger::orders::CompletionData;
use crate::models::driver::{DriverLocation, DriverProfile};
use crate::models::order::Order;
use crate::realtime::protocol::{LocationReport, ServerMessage};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id", delete(delete_driver))
        .route("/drivers/:id/history", get(driver_history))
        .route("/drivers/:id/location", post(report_location))
        .route("/drivers/:id/fcm-token", post(register_fcm_token))
        .route("/driver/orders", get(open_orders))
        .route("/driver/orders/:id/claim", post(claim_order))
        .route("/driver/orders/:id/complete", post(complete_order))
}

#[derive(Deserialize)]
struct CreateDriverRequest {
    name: String,
    phone: String,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<DriverProfile>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::Validation("phone is required".into()));
    }
    let phone_taken = state
        .drivers
        .iter()
        .any(|entry| entry.phone == payload.phone);
    if phone_taken {
        return Err(AppError::Validation("phone number already exists".into()));
    }

    let driver = DriverProfile::new(payload.name, payload.phone);
    state.drivers.insert(driver.id, driver.clone());

    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<DriverProfile>> {
    let drivers = state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(drivers)
}

/// Offboarding. The live session, if any, is told to log out; the order
/// snapshots keep the driver's name and phone.
async fn delete_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, driver) = state
        .drivers
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    state.router.send_to_actor(
        &driver.id.to_string(),
        &ServerMessage::ForceLogout {
            message: "your account has been removed".into(),
        },
    );

    Ok(Json(serde_json::json!({ "message": "driver deleted" })))
}

async fn driver_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Order>>, AppError> {
    if !state.drivers.contains_key(&id) {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }
    Ok(Json(ledger::driver_history(&state, id)))
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationReport>,
) -> Result<Json<DriverLocation>, AppError> {
    Ok(Json(location::report_location(&state, id, payload)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FcmTokenRequest {
    fcm_token: String,
}

async fn register_fcm_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FcmTokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    location::register_fcm_token(&state, id, payload.fcm_token)?;
    Ok(Json(serde_json::json!({ "message": "fcm token registered" })))
}

async fn open_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(ledger::list_open_orders(&state))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest {
    driver_id: Uuid,
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::claim_order(&state, id, payload.driver_id)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest {
    driver_id: Uuid,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<Order>, AppError> {
    let completion = CompletionData {
        latitude: payload.latitude,
        longitude: payload.longitude,
        photo: payload.photo,
        notes: payload.notes,
    };
    Ok(Json(ledger::complete_order(
        &state,
        id,
        payload.driver_id,
        completion,
    )?))
}
