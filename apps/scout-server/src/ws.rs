//! Server side of the per-user notification channel.
//!
//! Events published while the socket is open are forwarded in publish order;
//! nothing is queued for a disconnected client, which reconciles by fetching
//! state after reconnecting. Heartbeats flow on a fixed cadence to expose
//! half-open connections.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use scout_events::{Envelope, NotificationEvent};

use crate::AppState;

pub async fn channel_ws(
    State(state): State<AppState>,
    Path(user): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_channel(state, user, socket))
}

async fn serve_channel(state: AppState, user: String, mut socket: WebSocket) {
    // Make sure the actor exists so the clock covers this user from now on.
    state.engine().user(&user).await;
    let mut rx = state.hub().subscribe(&user);

    let greeting = Envelope::new(NotificationEvent::ConnectionEstablished {
        user_id: user.clone(),
    });
    if send_envelope(&mut socket, &greeting).await.is_err() {
        return;
    }
    debug!(user = %user, "notification channel connected");

    let mut heartbeat = tokio::time::interval(state.heartbeat_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The greeting stands in for the interval's immediate first tick.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let env = Envelope::new(NotificationEvent::Heartbeat);
                if send_envelope(&mut socket, &env).await.is_err() {
                    break;
                }
            }
            event = rx.recv() => match event {
                Ok(env) => {
                    if send_envelope(&mut socket, &env).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Slow consumer; it will reconcile by refetching.
                    warn!(user = %user, skipped, "notification channel lagged");
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                // Client heartbeats and acks are liveness signals only.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(user = %user, error = %err, "channel receive error");
                    break;
                }
            },
        }
    }
    debug!(user = %user, "notification channel closed");
}

async fn send_envelope(socket: &mut WebSocket, envelope: &Envelope) -> Result<(), axum::Error> {
    let text = serde_json::to_string(envelope).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text.into())).await
}
