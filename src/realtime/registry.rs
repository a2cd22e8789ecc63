//! Single source of truth for "who is currently reachable". Registrations
//! are transient and in-memory; a restart clears everything and clients
//! re-register on reconnect.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::realtime::protocol::Role;

/// One live bidirectional channel bound to an actor identity.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Identity of the socket itself, distinct from the actor. Guards
    /// against a stale socket's close evicting a newer registration.
    pub conn_id: Uuid,
    pub actor_id: String,
    pub role: Role,
    pub name: Option<String>,
    /// Outbound handle; frames are serialized envelopes.
    pub sender: mpsc::UnboundedSender<String>,
    /// Set while this connection is watching live driver locations.
    pub tracking: bool,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to an actor. Last registration wins: a duplicate
    /// actor id replaces the prior entry, which is returned so the caller
    /// can carry state (e.g. the tracking flag) over to the new channel.
    pub fn register(&self, conn: Connection) -> Option<Connection> {
        self.connections.insert(conn.actor_id.clone(), conn)
    }

    /// Remove the registration whose socket matches `conn_id`, returning it.
    /// O(n) scan; the fleet is tens of drivers. Returns `None` when the
    /// socket was never registered or was already replaced by a newer one.
    pub fn unregister(&self, conn_id: Uuid) -> Option<Connection> {
        let actor_id = self
            .connections
            .iter()
            .find(|entry| entry.conn_id == conn_id)
            .map(|entry| entry.key().clone())?;

        self.connections
            .remove_if(&actor_id, |_, conn| conn.conn_id == conn_id)
            .map(|(_, conn)| conn)
    }

    pub fn lookup(&self, actor_id: &str) -> Option<Connection> {
        self.connections.get(actor_id).map(|entry| entry.value().clone())
    }

    /// Flip the tracking flag; no-op when the actor is not connected.
    pub fn set_tracking(&self, actor_id: &str, tracking: bool) {
        if let Some(mut entry) = self.connections.get_mut(actor_id) {
            entry.tracking = tracking;
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Cloned view of all live connections, for audience computation.
    pub fn snapshot(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
