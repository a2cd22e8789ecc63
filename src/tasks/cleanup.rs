//! Retention collaborator: purges delivered orders past the retention
//! window and clears driver locations past the freshness window. The rest
//! of the system tolerates these fields disappearing at any time.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::time;
use tracing::info;

use crate::config::Config;
use crate::models::order::DeliveryStatus;
use crate::state::AppState;

pub async fn run_cleanup(state: Arc<AppState>, config: Config) {
    info!(
        interval_secs = config.cleanup_interval_secs,
        retention_hours = config.delivered_retention_hours,
        freshness_mins = config.location_freshness_mins,
        "cleanup task started"
    );

    let mut ticker = time::interval(time::Duration::from_secs(config.cleanup_interval_secs));
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let purged = purge_delivered(&state, Duration::hours(config.delivered_retention_hours));
        let cleared = clear_stale_locations(&state, Duration::minutes(config.location_freshness_mins));

        if purged > 0 || cleared > 0 {
            info!(purged, cleared, "cleanup pass completed");
        }
    }
}

/// Drop delivered orders whose delivery timestamp is past the retention
/// window. Returns the purge count.
pub fn purge_delivered(state: &AppState, older_than: Duration) -> usize {
    let cutoff = Utc::now() - older_than;
    let before = state.orders.len();

    state.orders.retain(|_, order| {
        !(order.delivery_status == DeliveryStatus::Delivered
            && order.delivered_at.is_some_and(|at| at < cutoff))
    });

    before - state.orders.len()
}

/// Clear driver locations older than the freshness window so nothing ever
/// reads a stale fix as current. Returns the cleared count.
pub fn clear_stale_locations(state: &AppState, window: Duration) -> usize {
    let cutoff = Utc::now() - window;
    let mut cleared = 0usize;

    for mut driver in state.drivers.iter_mut() {
        let stale = driver
            .last_location
            .as_ref()
            .is_some_and(|location| location.updated_at < cutoff);
        if stale {
            driver.last_location = None;
            cleared += 1;
        }
    }

    cleared
}
