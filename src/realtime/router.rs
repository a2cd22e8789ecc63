//! Delivers a message to a computed audience without callers touching
//! registry internals. Delivery is fire-and-forget: no acknowledgment, no
//! retry, no queuing for offline actors — a disconnected actor misses the
//! update and reconciles by re-fetching state after it re-registers.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::observability::metrics::Metrics;
use crate::realtime::protocol::{Role, ServerMessage};
use crate::realtime::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct BroadcastRouter {
    registry: Arc<ConnectionRegistry>,
    metrics: Metrics,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Metrics) -> Self {
        Self { registry, metrics }
    }

    /// Every open channel, regardless of role.
    pub fn broadcast_all(&self, message: &ServerMessage) {
        self.fan_out(message, "all", |_| true);
    }

    pub fn broadcast_to_role(&self, message: &ServerMessage, role: Role) {
        self.fan_out(message, role_label(role), |conn| conn.role == role);
    }

    /// Connections currently flagged as watching live locations.
    pub fn send_to_tracking_subscribers(&self, message: &ServerMessage) {
        self.fan_out(message, "tracking", |conn| conn.tracking);
    }

    /// Single lookup + send. Silently no-ops when the actor is not
    /// connected; an unreachable target is never an error here.
    pub fn send_to_actor(&self, actor_id: &str, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };

        match self.registry.lookup(actor_id) {
            Some(conn) => {
                if conn.sender.send(frame).is_err() {
                    debug!(actor_id, "send to closed channel dropped");
                }
                self.metrics
                    .broadcast_messages_total
                    .with_label_values(&["actor"])
                    .inc();
            }
            None => debug!(actor_id, "send target not connected; dropping"),
        }
    }

    fn fan_out<F>(&self, message: &ServerMessage, audience: &str, include: F)
    where
        F: Fn(&crate::realtime::registry::Connection) -> bool,
    {
        let Some(frame) = encode(message) else {
            return;
        };

        let mut sent = 0usize;
        for conn in self.registry.snapshot() {
            if !include(&conn) {
                continue;
            }
            if conn.sender.send(frame.clone()).is_err() {
                debug!(actor_id = %conn.actor_id, "send to closed channel dropped");
                continue;
            }
            sent += 1;
        }

        self.metrics
            .broadcast_messages_total
            .with_label_values(&[audience])
            .inc_by(sent as u64);
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound message");
            None
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "admins",
        Role::Driver => "drivers",
        Role::Unknown => "unknown",
    }
}
