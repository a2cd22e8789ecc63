//! Validation gate for driver position reports. Accepted fixes overwrite the
//! stored location (last-write-wins, no history) and are relayed to the
//! tracking audience. Reports arrive on a fixed cadence from the driver app,
//! roughly every 30 seconds while tracking is on.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::DriverLocation;
use crate::realtime::protocol::LocationReport;
use crate::state::AppState;

/// Fixes worse than this are noise, rejected rather than stored.
pub const MAX_ACCURACY_METERS: f64 = 200.0;

pub fn report_location(
    state: &AppState,
    driver_id: Uuid,
    report: LocationReport,
) -> Result<DriverLocation, AppError> {
    let (latitude, longitude) = match (report.latitude, report.longitude) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => (lat, lon),
        _ => {
            state
                .metrics
                .location_updates_total
                .with_label_values(&["rejected"])
                .inc();
            return Err(AppError::MissingCoordinates);
        }
    };

    if report.accuracy.is_some_and(|acc| acc > MAX_ACCURACY_METERS) {
        state
            .metrics
            .location_updates_total
            .with_label_values(&["rejected"])
            .inc();
        return Err(AppError::LowAccuracy);
    }

    let location = DriverLocation {
        latitude,
        longitude,
        accuracy: report.accuracy,
        updated_at: Utc::now(),
    };

    let driver_name = {
        let mut driver = state
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
        driver.last_location = Some(location.clone());
        driver.name.clone()
    };

    state
        .metrics
        .location_updates_total
        .with_label_values(&["accepted"])
        .inc();

    state
        .tracking
        .forward_location_update(driver_id, &driver_name, &location);

    Ok(location)
}

/// Store the push wake address for a driver device.
pub fn register_fcm_token(
    state: &AppState,
    driver_id: Uuid,
    token: String,
) -> Result<(), AppError> {
    if token.trim().is_empty() {
        return Err(AppError::Validation("fcm token is required".into()));
    }

    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
    driver.fcm_token = Some(token);

    info!(driver = %driver.name, "fcm token registered");
    Ok(())
}
