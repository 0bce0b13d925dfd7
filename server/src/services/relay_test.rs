use frames::{DeleteRelay, ObjectRelay, RoomSignal};
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::state::test_helpers::{assert_no_event, client_channel, code, recv_event, test_app_state};

fn add_rect() -> ServerEvent {
    ServerEvent::AddCanvasObject(ObjectRelay {
        object: json!({"id": "r1", "type": "shape", "shapeName": "rectangle", "x": 10, "y": 10, "width": 50, "height": 50}),
    })
}

async fn seat(
    state: &AppState,
    room: &str,
    user: &str,
) -> (ClientId, tokio::sync::mpsc::Receiver<ServerEvent>) {
    let client_id = Uuid::new_v4();
    let (tx, rx) = client_channel();
    state.rooms.subscribe(&code(room), client_id, user, tx).await;
    (client_id, rx)
}

// =============================================================================
// relay_canvas
// =============================================================================

#[tokio::test]
async fn canvas_event_reaches_every_other_member_but_not_sender() {
    let state = test_app_state();
    let (a, mut rx_a) = seat(&state, "AB12CD", "alice").await;
    let (_b, mut rx_b) = seat(&state, "AB12CD", "bob").await;
    let (_c, mut rx_c) = seat(&state, "AB12CD", "carol").await;

    let delivered = relay_canvas(&state, a, "ab12cd", add_rect()).await;

    assert_eq!(delivered, 2);
    assert_eq!(recv_event(&mut rx_b).await, add_rect());
    assert_eq!(recv_event(&mut rx_c).await, add_rect());
    assert_no_event(&mut rx_a).await;
}

#[tokio::test]
async fn canvas_event_does_not_cross_rooms() {
    let state = test_app_state();
    let (a, _rx_a) = seat(&state, "AB12CD", "alice").await;
    let (_other, mut rx_other) = seat(&state, "ZZ99ZZ", "zed").await;

    relay_canvas(&state, a, "AB12CD", ServerEvent::Undo(RoomSignal { room_code: "AB12CD".into() })).await;

    assert_no_event(&mut rx_other).await;
}

#[tokio::test]
async fn non_member_event_is_dropped() {
    let state = test_app_state();
    let (_a, mut rx_a) = seat(&state, "AB12CD", "alice").await;

    let delivered = relay_canvas(
        &state,
        Uuid::new_v4(),
        "AB12CD",
        ServerEvent::DeleteCanvasObject(DeleteRelay { id: "r1".into() }),
    )
    .await;

    assert_eq!(delivered, 0);
    assert_no_event(&mut rx_a).await;
}

#[tokio::test]
async fn invalid_room_code_is_dropped() {
    let state = test_app_state();
    let (a, _rx_a) = seat(&state, "AB12CD", "alice").await;
    assert_eq!(relay_canvas(&state, a, "not-a-code", add_rect()).await, 0);
}

// =============================================================================
// snapshot handshake
// =============================================================================

#[tokio::test]
async fn sync_request_goes_to_longest_joined_peer() {
    let state = test_app_state();
    let (_first, mut rx_first) = seat(&state, "AB12CD", "alice").await;
    let (_second, mut rx_second) = seat(&state, "AB12CD", "bob").await;
    let (late, mut rx_late) = seat(&state, "AB12CD", "carol").await;

    assert!(request_sync(&state, late, "AB12CD").await);

    assert_eq!(
        recv_event(&mut rx_first).await,
        ServerEvent::CanvasSyncRequest(SyncRequest { room_code: "AB12CD".into(), requester: late.to_string() })
    );
    assert_no_event(&mut rx_second).await;
    assert_no_event(&mut rx_late).await;
}

#[tokio::test]
async fn sync_request_without_peers_is_answered_unavailable() {
    let state = test_app_state();
    let (alone, mut rx) = seat(&state, "AB12CD", "alice").await;

    assert!(!request_sync(&state, alone, "AB12CD").await);
    assert_eq!(
        recv_event(&mut rx).await,
        ServerEvent::CanvasSyncUnavailable(RoomSignal { room_code: "AB12CD".into() })
    );
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn sync_request_from_non_member_is_ignored() {
    let state = test_app_state();
    let (_a, mut rx_a) = seat(&state, "AB12CD", "alice").await;

    assert!(!request_sync(&state, Uuid::new_v4(), "AB12CD").await);
    assert_no_event(&mut rx_a).await;
}

#[tokio::test]
async fn snapshot_is_delivered_to_target_only() {
    let state = test_app_state();
    let (peer, mut rx_peer) = seat(&state, "AB12CD", "alice").await;
    let (_bystander, mut rx_bystander) = seat(&state, "AB12CD", "bob").await;
    let (late, mut rx_late) = seat(&state, "AB12CD", "carol").await;
    let snapshot = json!({"objects": [{"id": "r1", "type": "shape"}], "undo": [], "redo": []});

    let sent = deliver_snapshot(
        &state,
        peer,
        SnapshotOffer { room_code: "AB12CD".into(), target: late.to_string(), snapshot: snapshot.clone() },
    )
    .await;

    assert!(sent);
    assert_eq!(
        recv_event(&mut rx_late).await,
        ServerEvent::CanvasSnapshot(SnapshotDelivery { room_code: "AB12CD".into(), snapshot })
    );
    assert_no_event(&mut rx_peer).await;
    assert_no_event(&mut rx_bystander).await;
}

#[tokio::test]
async fn snapshot_to_unknown_or_foreign_target_is_dropped() {
    let state = test_app_state();
    let (peer, _rx_peer) = seat(&state, "AB12CD", "alice").await;
    let (outsider, mut rx_outsider) = seat(&state, "ZZ99ZZ", "zed").await;

    let foreign = SnapshotOffer { room_code: "AB12CD".into(), target: outsider.to_string(), snapshot: json!({}) };
    assert!(!deliver_snapshot(&state, peer, foreign).await);
    assert_no_event(&mut rx_outsider).await;

    let garbage = SnapshotOffer { room_code: "AB12CD".into(), target: "not-a-uuid".into(), snapshot: json!({}) };
    assert!(!deliver_snapshot(&state, peer, garbage).await);
}

#[tokio::test]
async fn snapshot_from_non_member_is_dropped() {
    let state = test_app_state();
    let (late, mut rx_late) = seat(&state, "AB12CD", "carol").await;

    let offer = SnapshotOffer { room_code: "AB12CD".into(), target: late.to_string(), snapshot: json!({}) };
    assert!(!deliver_snapshot(&state, Uuid::new_v4(), offer).await);
    assert_no_event(&mut rx_late).await;
}
