use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::driver::{DriverProfile, DriverStatus};
use crate::models::order::Order;
use crate::models::transaction::Transaction;
use crate::notify::push::PushNotifier;
use crate::observability::metrics::Metrics;
use crate::realtime::registry::ConnectionRegistry;
use crate::realtime::router::BroadcastRouter;
use crate::realtime::tracking::TrackingCoordinator;

pub struct AppState {
    pub orders: DashMap<Uuid, Order>,
    pub drivers: DashMap<Uuid, DriverProfile>,
    /// Append-only settlement log.
    pub transactions: Mutex<Vec<Transaction>>,
    pub registry: Arc<ConnectionRegistry>,
    pub router: BroadcastRouter,
    pub tracking: TrackingCoordinator,
    pub notifier: Arc<dyn PushNotifier>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(notifier: Arc<dyn PushNotifier>) -> Self {
        let metrics = Metrics::new();
        let registry = Arc::new(ConnectionRegistry::new());
        let router = BroadcastRouter::new(registry.clone(), metrics.clone());
        let tracking = TrackingCoordinator::new(
            registry.clone(),
            router.clone(),
            notifier.clone(),
            metrics.clone(),
        );

        Self {
            orders: DashMap::new(),
            drivers: DashMap::new(),
            transactions: Mutex::new(Vec::new()),
            registry,
            router,
            tracking,
            notifier,
            metrics,
        }
    }

    /// Push-wake tokens of every active driver.
    pub fn driver_wake_tokens(&self) -> Vec<String> {
        self.drivers
            .iter()
            .filter(|entry| entry.status == DriverStatus::Active)
            .filter_map(|entry| entry.fcm_token.clone())
            .collect()
    }

    /// Push-wake tokens of active drivers without an open channel; connected
    /// drivers hear the tracking edge signal directly.
    pub fn offline_driver_wake_tokens(&self) -> Vec<String> {
        self.drivers
            .iter()
            .filter(|entry| entry.status == DriverStatus::Active)
            .filter(|entry| self.registry.lookup(&entry.id.to_string()).is_none())
            .filter_map(|entry| entry.fcm_token.clone())
            .collect()
    }
}
