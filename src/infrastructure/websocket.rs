//! WebSocket feed of guess-round events for one group
//!
//! A chat adapter connects to `/api/groups/{gid}/guess/events` and receives
//! every `RoundEvent` for that group as a JSON text frame: the start, each
//! profile hint as it is revealed, and the solve or timeout reveal.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::application::services::RoundEvent;
use crate::domain::value_objects::GroupId;
use crate::infrastructure::state::AppState;

/// WebSocket upgrade handler
pub async fn round_events_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(gid): Path<String>,
) -> impl IntoResponse {
    let gid = GroupId::from(gid);
    // subscribe before the upgrade so nothing emitted meanwhile is missed
    let events = state.guess_service.subscribe();
    ws.on_upgrade(move |socket| forward_round_events(socket, gid, events))
}

async fn forward_round_events(
    socket: WebSocket,
    gid: GroupId,
    mut events: broadcast::Receiver<RoundEvent>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    tracing::info!(gid = %gid, "Round event subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(json) = encode_for_group(&event, &gid) else {
                        continue;
                    };
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(gid = %gid, skipped, "Round event subscriber fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::error!(gid = %gid, "WebSocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(gid = %gid, "Round event subscriber disconnected");
}

/// JSON frame for `event` if it belongs to `gid`
fn encode_for_group(event: &RoundEvent, gid: &GroupId) -> Option<String> {
    if event.gid() != gid {
        return None;
    }
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!("Failed to encode round event: {}", e);
            None
        }
    }
}
