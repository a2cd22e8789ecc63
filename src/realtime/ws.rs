//! The persistent channel endpoint. A socket is anonymous until its first
//! `register` frame binds it to an actor; from then on the registry owns the
//! outbound half and the receive loop dispatches inbound frames.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ingest::location;
use crate::realtime::protocol::{ClientMessage, Role};
use crate::realtime::registry::Connection;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let conn_id = Uuid::new_v4();

    info!(%conn_id, "websocket client connected");

    let mut send_task = tokio::spawn(async move {
        let mut frames = UnboundedReceiverStream::new(rx);
        while let Some(frame) = frames.next().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut actor: Option<(String, Role)> = None;
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Text(text) = message {
                handle_frame(&recv_state, conn_id, &tx, &mut actor, &text).await;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    if let Some(conn) = state.registry.unregister(conn_id) {
        // A subscribed admin that vanishes without STOP_TRACKING behaves
        // exactly like an explicit unsubscribe.
        state.tracking.unsubscribe(&conn.actor_id);
        state
            .metrics
            .connected_clients
            .set(state.registry.len() as i64);
        info!(actor_id = %conn.actor_id, "websocket client unregistered");
    }

    info!(%conn_id, "websocket client disconnected");
}

async fn handle_frame(
    state: &AppState,
    conn_id: Uuid,
    tx: &mpsc::UnboundedSender<String>,
    actor: &mut Option<(String, Role)>,
    text: &str,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(%conn_id, error = %err, "dropping unparseable channel frame");
            return;
        }
    };

    match message {
        ClientMessage::Register {
            user_id,
            role,
            name,
        } => {
            let replaced = state.registry.register(Connection {
                conn_id,
                actor_id: user_id.clone(),
                role,
                name,
                sender: tx.clone(),
                tracking: false,
            });
            // A reconnecting admin keeps its tracking subscription.
            if replaced.is_some_and(|prior| prior.tracking) {
                state.registry.set_tracking(&user_id, true);
            }
            state
                .metrics
                .connected_clients
                .set(state.registry.len() as i64);
            info!(actor_id = %user_id, ?role, "actor registered on channel");
            *actor = Some((user_id, role));
        }

        ClientMessage::StartTracking => match actor {
            Some((actor_id, Role::Admin)) => {
                let wake_tokens = state.offline_driver_wake_tokens();
                state.tracking.subscribe(actor_id, wake_tokens).await;
            }
            _ => warn!(%conn_id, "tracking subscribe from unregistered or non-admin connection"),
        },

        ClientMessage::StopTracking => match actor {
            Some((actor_id, Role::Admin)) => state.tracking.unsubscribe(actor_id),
            _ => warn!(%conn_id, "tracking unsubscribe from unregistered or non-admin connection"),
        },

        ClientMessage::RequestAllLocations => match actor {
            Some((_, Role::Admin)) => state.tracking.request_all_locations(),
            _ => warn!(%conn_id, "location refresh from unregistered or non-admin connection"),
        },

        ClientMessage::DriverLocationUpdate { location: report } => match actor {
            Some((actor_id, Role::Driver)) => match Uuid::parse_str(actor_id) {
                Ok(driver_id) => {
                    if let Err(err) = location::report_location(state, driver_id, report) {
                        warn!(%driver_id, error = %err, "channel location report rejected");
                    }
                }
                Err(_) => warn!(%conn_id, actor_id, "driver actor id is not a valid uuid"),
            },
            _ => warn!(%conn_id, "location report from unregistered or non-driver connection"),
        },
    }
}
