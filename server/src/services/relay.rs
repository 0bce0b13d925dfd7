//! Canvas event relay and the snapshot handshake.
//!
//! The relay is stateless with respect to canvas content: it checks that the
//! sender is subscribed to the room and fans the event out to every other
//! member. Objects are never inspected. Failures are silent to clients and
//! only logged.

use frames::{RoomSignal, ServerEvent, SnapshotDelivery, SnapshotOffer, SyncRequest};
use tracing::{debug, warn};

use crate::state::{AppState, ClientId};

/// Forward a canvas event to every other member of `room`. Returns the number
/// of peers it was queued for.
pub async fn relay_canvas(state: &AppState, client_id: ClientId, room: &str, event: ServerEvent) -> usize {
    let Ok(code) = frames::RoomCode::parse(room) else {
        warn!(%client_id, room, event = event.name(), "relay: invalid room code; event dropped");
        return 0;
    };
    if !state.rooms.is_member(&code, client_id).await {
        warn!(%code, %client_id, event = event.name(), "relay: sender not in room; event dropped");
        return 0;
    }
    let delivered = state.rooms.broadcast(&code, &event, Some(client_id)).await;
    debug!(%code, %client_id, event = event.name(), delivered, "relay: forwarded");
    delivered
}

/// Ask the longest-joined other member to publish its canvas for the
/// requester. When no peer can be asked the requester gets
/// `canvas-sync-unavailable` instead. Returns whether a request was sent.
pub async fn request_sync(state: &AppState, client_id: ClientId, room: &str) -> bool {
    let Ok(code) = frames::RoomCode::parse(room) else {
        warn!(%client_id, room, "relay: sync request with invalid room code");
        return false;
    };
    if !state.rooms.is_member(&code, client_id).await {
        warn!(%code, %client_id, "relay: sync request from non-member ignored");
        return false;
    }
    let sent = match state.rooms.earliest_member(&code, client_id).await {
        Some(peer) => {
            let request = ServerEvent::CanvasSyncRequest(SyncRequest {
                room_code: code.to_string(),
                requester: client_id.to_string(),
            });
            let sent = state.rooms.send_to(&code, peer, request).await;
            debug!(%code, %client_id, %peer, sent, "relay: sync requested");
            sent
        }
        None => {
            debug!(%code, %client_id, "relay: no peer to sync from");
            false
        }
    };
    if !sent {
        let unavailable = ServerEvent::CanvasSyncUnavailable(RoomSignal { room_code: code.to_string() });
        state.rooms.send_to(&code, client_id, unavailable).await;
    }
    sent
}

/// Deliver a peer's snapshot to its target only. Both ends must be members of
/// the room. Returns whether the snapshot was queued.
pub async fn deliver_snapshot(state: &AppState, client_id: ClientId, offer: SnapshotOffer) -> bool {
    let Ok(code) = frames::RoomCode::parse(&offer.room_code) else {
        warn!(%client_id, room = %offer.room_code, "relay: snapshot with invalid room code");
        return false;
    };
    let Ok(target) = offer.target.parse::<ClientId>() else {
        warn!(%code, %client_id, target = %offer.target, "relay: snapshot target is not a client id");
        return false;
    };
    if !state.rooms.is_member(&code, client_id).await {
        warn!(%code, %client_id, "relay: snapshot from non-member ignored");
        return false;
    }
    let delivery = ServerEvent::CanvasSnapshot(SnapshotDelivery { room_code: code.to_string(), snapshot: offer.snapshot });
    let sent = state.rooms.send_to(&code, target, delivery).await;
    if !sent {
        warn!(%code, %client_id, %target, "relay: snapshot target not in room");
    }
    sent
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
