use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::services::room::{Caller, create_or_get_room, join_room};
use crate::services::store::{MemoryRoomStore, RoomStore};
use crate::state::test_helpers::{assert_no_event, client_channel, code, drain, recv_event, test_app_state_with_store};

#[tokio::test]
async fn message_is_stored_and_broadcast_to_whole_room() {
    let store = Arc::new(MemoryRoomStore::new());
    let state = test_app_state_with_store(store.clone());
    store.upsert_user(&UserProfile { id: "alice".into(), name: "Alice".into() }).await.expect("user");

    let (tx_a, mut rx_a) = client_channel();
    let (tx_b, mut rx_b) = client_channel();
    let alice = Caller { client_id: Uuid::new_v4(), user_id: "alice".into(), tx: tx_a };
    let bob = Caller { client_id: Uuid::new_v4(), user_id: "bob".into(), tx: tx_b };
    let room = create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");
    join_room(&state, &bob, &code("AB12CD")).await.expect("join");
    drain(&mut rx_a);
    drain(&mut rx_b);

    send_message(&state, alice.client_id, "alice", &code("AB12CD"), "hello").await.expect("send");

    for rx in [&mut rx_a, &mut rx_b] {
        let ServerEvent::NewMessage(msg) = recv_event(rx).await else {
            panic!("expected new-message");
        };
        assert_eq!(msg.message.content, "hello");
        assert_eq!(msg.message.room_id, room.room.id);
        assert_eq!(msg.sender, UserProfile { id: "alice".into(), name: "Alice".into() });
    }
    let room_id = room.room.id.parse().expect("uuid room id");
    assert_eq!(store.message_count(room_id).await, 1);
}

#[tokio::test]
async fn sender_without_profile_is_named_after_id() {
    let state = test_app_state_with_store(Arc::new(MemoryRoomStore::new()));
    let (tx, mut rx) = client_channel();
    let bob = Caller { client_id: Uuid::new_v4(), user_id: "bob".into(), tx };
    create_or_get_room(&state, &bob, &code("AB12CD")).await.expect("create");
    drain(&mut rx);

    send_message(&state, bob.client_id, "bob", &code("AB12CD"), "hi").await.expect("send");

    let ServerEvent::NewMessage(msg) = recv_event(&mut rx).await else {
        panic!("expected new-message");
    };
    assert_eq!(msg.sender.name, "bob");
}

#[tokio::test]
async fn message_for_unknown_room_is_ignored() {
    let state = test_app_state_with_store(Arc::new(MemoryRoomStore::new()));
    let (tx, mut rx) = client_channel();
    state.rooms.subscribe(&code("AB12CD"), Uuid::new_v4(), "alice", tx).await;

    send_message(&state, Uuid::new_v4(), "alice", &code("AB12CD"), "hello?").await.expect("ignored");

    assert_no_event(&mut rx).await;
}
