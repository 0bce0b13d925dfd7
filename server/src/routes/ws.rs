//! WebSocket handler: room control plus canvas relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client envelopes -> decode into a `ClientEvent` -> dispatch
//! - Events queued by room peers and services -> forward to client
//!
//! Services queue everything addressed to room members (including the
//! caller) on the members' channels, so per-connection delivery order is the
//! order the services produced it. The dispatch layer only answers failures
//! directly: `room:error` for create, `error` for everything else.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade -> send `connected` with `clientId`
//! 2. Client sends events -> dispatch -> services update rooms and fan out
//! 3. Close, read error or send failure -> leave every joined room

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use frames::{
    ClientEvent, CodecError, Connected, DeleteObject, DeleteRelay, Envelope, ErrorPayload, ObjectEvent, ObjectRelay,
    RoomCode, ServerEvent, UserProfile,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::room::{self, Caller, RoomError};
use crate::services::{chat, relay};
use crate::state::{AppState, ClientId};

/// Wire encoding of the connection; follows whatever the client sent last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Binary,
}

/// Per-connection context handed to every handler.
struct Connection {
    client_id: ClientId,
    /// Identity supplied at upgrade, used when payloads omit `userId`.
    identity: Option<UserProfile>,
    tx: mpsc::Sender<ServerEvent>,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = identity_from_params(&params);
    ws.on_upgrade(move |socket| run_ws(socket, state, identity))
}

fn identity_from_params(params: &HashMap<String, String>) -> Option<UserProfile> {
    let id = params.get("user_id").map(|v| v.trim()).filter(|v| !v.is_empty())?;
    let name = params
        .get("name")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(id);
    Some(UserProfile { id: id.to_owned(), name: name.to_owned() })
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, identity: Option<UserProfile>) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for events queued by services and peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.client_channel_capacity);
    let conn = Connection { client_id, identity, tx: client_tx };
    let mut encoding = Encoding::Json;

    if let Some(profile) = &conn.identity {
        if let Err(e) = state.store.upsert_user(profile).await {
            error!(%client_id, user_id = %profile.id, error = %e, "ws: failed to store user profile");
        }
    }

    let welcome = ServerEvent::Connected(Connected {
        client_id: client_id.to_string(),
        user_id: conn.identity.as_ref().map(|u| u.id.clone()),
    });
    if send_event(&mut socket, encoding, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, user_id = ?conn.identity.as_ref().map(|u| u.id.as_str()), "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let decoded = match msg {
                    Message::Text(text) => {
                        encoding = Encoding::Json;
                        frames::decode_json(text.as_str())
                    }
                    Message::Binary(bytes) => {
                        encoding = Encoding::Binary;
                        frames::decode_binary(&bytes)
                    }
                    Message::Close(_) => break,
                    _ => continue,
                };
                if let Some(reply) = process_inbound(&state, &conn, decoded).await {
                    if send_event(&mut socket, encoding, &reply).await.is_err() {
                        break;
                    }
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, encoding, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    room::disconnect(&state, client_id).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Process one decoded inbound envelope. Returns the error reply for the
/// sender, if any; everything else is queued by the services.
async fn process_inbound(
    state: &AppState,
    conn: &Connection,
    decoded: Result<Envelope, CodecError>,
) -> Option<ServerEvent> {
    let client_id = conn.client_id;
    let event = match decoded.and_then(|envelope| ClientEvent::try_from(&envelope)) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return Some(ServerEvent::Error(ErrorPayload::new("E_INVALID_FRAME", format!("invalid frame: {e}"))));
        }
    };

    debug!(%client_id, event = event.name(), "ws: recv event");
    dispatch(state, conn, event).await.err()
}

async fn dispatch(state: &AppState, conn: &Connection, event: ClientEvent) -> Result<(), ServerEvent> {
    let client_id = conn.client_id;
    match event {
        // Room control.
        ClientEvent::CreateRoom(req) => {
            let (code, caller) = prepare(conn, &req.room_code, req.user_id.as_deref()).map_err(|e| room_error(&e))?;
            room::create_or_get_room(state, &caller, &code)
                .await
                .map(drop)
                .map_err(|e| room_error(&e))
        }
        ClientEvent::JoinRoom(req) => {
            let (code, caller) = prepare(conn, &req.room_code, req.user_id.as_deref()).map_err(|e| plain_error(&e))?;
            room::join_room(state, &caller, &code).await.map(drop).map_err(|e| plain_error(&e))
        }
        ClientEvent::LeaveRoom(req) => {
            let (code, caller) = prepare(conn, &req.room_code, req.user_id.as_deref()).map_err(|e| plain_error(&e))?;
            room::leave_room(state, client_id, &caller.user_id, &code).await.map_err(|e| plain_error(&e))
        }
        ClientEvent::SendMessage(msg) => {
            let (code, caller) = prepare(conn, &msg.room_code, msg.user_id.as_deref()).map_err(|e| plain_error(&e))?;
            chat::send_message(state, client_id, &caller.user_id, &code, &msg.content)
                .await
                .map_err(|e| plain_error(&e))
        }

        // Canvas relay.
        ClientEvent::AddCanvasObject(ObjectEvent { room, object }) => {
            relay::relay_canvas(state, client_id, &room, ServerEvent::AddCanvasObject(ObjectRelay { object })).await;
            Ok(())
        }
        ClientEvent::UpdateCanvasObject(ObjectEvent { room, object }) => {
            relay::relay_canvas(state, client_id, &room, ServerEvent::UpdateCanvasObject(ObjectRelay { object })).await;
            Ok(())
        }
        ClientEvent::DeleteCanvasObject(DeleteObject { room, id }) => {
            relay::relay_canvas(state, client_id, &room, ServerEvent::DeleteCanvasObject(DeleteRelay { id })).await;
            Ok(())
        }
        ClientEvent::ResetCanvas(signal) => {
            let room = signal.room_code.clone();
            relay::relay_canvas(state, client_id, &room, ServerEvent::ResetCanvas(signal)).await;
            Ok(())
        }
        ClientEvent::Undo(signal) => {
            let room = signal.room_code.clone();
            relay::relay_canvas(state, client_id, &room, ServerEvent::Undo(signal)).await;
            Ok(())
        }
        ClientEvent::Redo(signal) => {
            let room = signal.room_code.clone();
            relay::relay_canvas(state, client_id, &room, ServerEvent::Redo(signal)).await;
            Ok(())
        }

        // Snapshot handshake.
        ClientEvent::RequestCanvasSync(signal) => {
            relay::request_sync(state, client_id, &signal.room_code).await;
            Ok(())
        }
        ClientEvent::CanvasSnapshot(offer) => {
            relay::deliver_snapshot(state, client_id, offer).await;
            Ok(())
        }
    }
}

/// Normalize the room code and resolve the acting user.
fn prepare(conn: &Connection, raw_code: &str, user_id: Option<&str>) -> Result<(RoomCode, Caller), RoomError> {
    let code = room::parse_code(raw_code)?;
    let user_id = room::resolve_user(user_id, conn.identity.as_ref())?;
    Ok((code, Caller { client_id: conn.client_id, user_id, tx: conn.tx.clone() }))
}

fn room_error(err: &RoomError) -> ServerEvent {
    ServerEvent::RoomError(ErrorPayload::from_error(err))
}

fn plain_error(err: &RoomError) -> ServerEvent {
    ServerEvent::Error(ErrorPayload::from_error(err))
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, encoding: Encoding, event: &ServerEvent) -> Result<(), ()> {
    let envelope = match event.to_envelope() {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, event = event.name(), "ws: failed to serialize event");
            return Err(());
        }
    };
    let message = match encoding {
        Encoding::Json => match frames::encode_json(&envelope) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => {
                warn!(error = %e, event = event.name(), "ws: failed to encode event");
                return Err(());
            }
        },
        Encoding::Binary => Message::Binary(frames::encode_binary(&envelope).into()),
    };

    match event {
        ServerEvent::RoomError(payload) | ServerEvent::Error(payload) => {
            warn!(id = %envelope.id, event = event.name(), code = %payload.code, message = %payload.message, "ws: send error");
        }
        _ if event.is_canvas() => debug!(id = %envelope.id, event = event.name(), "ws: send event"),
        _ => info!(id = %envelope.id, event = event.name(), "ws: send event"),
    }

    socket.send(message).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
