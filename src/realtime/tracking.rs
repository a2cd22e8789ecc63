//! On/off lifecycle of live location broadcasting. Drivers are told to send
//! pings only while at least one admin is watching; the start/stop signals
//! are edge-triggered on the 0<->1 subscriber-count boundary, never repeated
//! per subscriber.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::info;
use uuid::Uuid;

use crate::models::driver::DriverLocation;
use crate::notify::push::PushNotifier;
use crate::observability::metrics::Metrics;
use crate::realtime::protocol::{Role, ServerMessage};
use crate::realtime::registry::ConnectionRegistry;
use crate::realtime::router::BroadcastRouter;

pub struct TrackingCoordinator {
    /// Admin actor ids currently watching. Mutex rather than a concurrent
    /// map: edge detection is a read-modify-write over the whole set.
    subscribers: Mutex<HashSet<String>>,
    registry: Arc<ConnectionRegistry>,
    router: BroadcastRouter,
    notifier: Arc<dyn PushNotifier>,
    metrics: Metrics,
}

impl TrackingCoordinator {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        router: BroadcastRouter,
        notifier: Arc<dyn PushNotifier>,
        metrics: Metrics,
    ) -> Self {
        Self {
            subscribers: Mutex::new(HashSet::new()),
            registry,
            router,
            notifier,
            metrics,
        }
    }

    /// Add an admin to the subscriber set. Crossing 0 -> 1 broadcasts
    /// `START_TRACKING` to drivers and wakes offline drivers through the
    /// push collaborator; any later subscriber joins silently.
    pub async fn subscribe(&self, actor_id: &str, wake_tokens: Vec<String>) {
        let became_first = {
            let mut subscribers = self
                .subscribers
                .lock()
                .expect("tracking subscriber set poisoned");
            let inserted = subscribers.insert(actor_id.to_string());
            self.metrics.tracking_subscribers.set(subscribers.len() as i64);
            inserted && subscribers.len() == 1
        };

        self.registry.set_tracking(actor_id, true);

        if became_first {
            info!(actor_id, "first tracking subscriber; starting location pings");
            self.router
                .broadcast_to_role(&ServerMessage::StartTracking, Role::Driver);

            if !wake_tokens.is_empty() {
                let summary = self.notifier.notify_all(&wake_tokens).await;
                info!(
                    sent = summary.success_count,
                    failed = summary.failure_count,
                    "push wake dispatched to offline drivers"
                );
            }
        }
    }

    /// Remove an admin from the subscriber set. Crossing 1 -> 0 broadcasts
    /// `STOP_TRACKING`. Safe to call for actors that never subscribed, so
    /// channel-close handling can invoke it unconditionally.
    pub fn unsubscribe(&self, actor_id: &str) {
        let became_empty = {
            let mut subscribers = self
                .subscribers
                .lock()
                .expect("tracking subscriber set poisoned");
            let removed = subscribers.remove(actor_id);
            self.metrics.tracking_subscribers.set(subscribers.len() as i64);
            removed && subscribers.is_empty()
        };

        self.registry.set_tracking(actor_id, false);

        if became_empty {
            info!(actor_id, "last tracking subscriber left; stopping location pings");
            self.router
                .broadcast_to_role(&ServerMessage::StopTracking, Role::Driver);
        }
    }

    /// Ad-hoc refresh: ask every connected driver to report now, regardless
    /// of the subscribe state.
    pub fn request_all_locations(&self) {
        self.router
            .broadcast_to_role(&ServerMessage::RequestLocation, Role::Driver);
    }

    /// Relay a driver position to the tracking audience only; unrelated
    /// connections never see location traffic.
    pub fn forward_location_update(
        &self,
        driver_id: Uuid,
        driver_name: &str,
        location: &DriverLocation,
    ) {
        self.router
            .send_to_tracking_subscribers(&ServerMessage::DriverLocationUpdate {
                driver_id,
                driver_name: driver_name.to_string(),
                location: location.clone(),
            });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("tracking subscriber set poisoned")
            .len()
    }
}
