use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub claims_total: IntCounterVec,
    pub deliveries_total: IntCounter,
    pub location_updates_total: IntCounterVec,
    pub broadcast_messages_total: IntCounterVec,
    pub connected_clients: IntGauge,
    pub tracking_subscribers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Order claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let deliveries_total =
            IntCounter::new("deliveries_total", "Total confirmed deliveries")
                .expect("valid deliveries_total metric");

        let location_updates_total = IntCounterVec::new(
            Opts::new(
                "location_updates_total",
                "Driver location reports by outcome",
            ),
            &["outcome"],
        )
        .expect("valid location_updates_total metric");

        let broadcast_messages_total = IntCounterVec::new(
            Opts::new(
                "broadcast_messages_total",
                "Channel messages sent by audience",
            ),
            &["audience"],
        )
        .expect("valid broadcast_messages_total metric");

        let connected_clients =
            IntGauge::new("connected_clients", "Currently registered channel connections")
                .expect("valid connected_clients metric");

        let tracking_subscribers =
            IntGauge::new("tracking_subscribers", "Admins currently watching locations")
                .expect("valid tracking_subscribers metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(deliveries_total.clone()))
            .expect("register deliveries_total");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(broadcast_messages_total.clone()))
            .expect("register broadcast_messages_total");
        registry
            .register(Box::new(connected_clients.clone()))
            .expect("register connected_clients");
        registry
            .register(Box::new(tracking_subscribers.clone()))
            .expect("register tracking_subscribers");

        Self {
            registry,
            orders_created_total,
            claims_total,
            deliveries_total,
            location_updates_total,
            broadcast_messages_total,
            connected_clients,
            tracking_subscribers,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
