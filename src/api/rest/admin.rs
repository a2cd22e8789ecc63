//! Admin dashboard aggregates and the out-of-band location wake.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Serialize;

use crate::ledger::orders::{dashboard_stats, DashboardStats};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/request-locations", post(request_locations))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    Json(dashboard_stats(&state))
}

#[derive(Serialize)]
struct RequestLocationsResponse {
    message: String,
    sent: usize,
    failed: usize,
    total: usize,
}

/// Push-wake every active driver with a registered token, and nudge the
/// connected ones over their channel for an immediate fix.
async fn request_locations(
    State(state): State<Arc<AppState>>,
) -> Json<RequestLocationsResponse> {
    state.tracking.request_all_locations();

    let tokens = state.driver_wake_tokens();
    let total = tokens.len();

    if total == 0 {
        return Json(RequestLocationsResponse {
            message: "no drivers with push notifications enabled".into(),
            sent: 0,
            failed: 0,
            total: 0,
        });
    }

    let summary = state.notifier.notify_all(&tokens).await;

    Json(RequestLocationsResponse {
        message: format!("location request sent to {} drivers", summary.success_count),
        sent: summary.success_count,
        failed: summary.failure_count,
        total,
    })
}
