use std::sync::Arc;

use async_trait::async_trait;
use frames::{ChatMessage, ParticipantInfo};
use uuid::Uuid;

use super::*;
use crate::services::store::{NewChatMessage, RoomRecord, RoomStore};
use crate::state::test_helpers::{
    assert_no_event, client_channel, code, drain, recv_event, test_app_state, test_app_state_with_store,
};

fn caller(user_id: &str) -> (Caller, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = client_channel();
    (Caller { client_id: Uuid::new_v4(), user_id: user_id.to_owned(), tx }, rx)
}

fn participant_ids(participants: &[ParticipantInfo]) -> Vec<&str> {
    let mut ids: Vec<&str> = participants.iter().map(|p| p.user.id.as_str()).collect();
    ids.sort_unstable();
    ids
}

// =============================================================================
// create
// =============================================================================

#[tokio::test]
async fn create_broadcasts_created_room_to_caller() {
    let state = test_app_state();
    let (alice, mut rx) = caller("alice");

    let created = create_or_get_room(&state, &alice, &code("ab12cd")).await.expect("create");

    assert_eq!(created.room.room_code, "AB12CD");
    assert_eq!(created.room.created_by, "alice");
    assert_eq!(participant_ids(&created.participants), vec!["alice"]);
    assert_eq!(recv_event(&mut rx).await, ServerEvent::CreatedRoom(created));
    assert!(state.rooms.is_member(&code("AB12CD"), alice.client_id).await);
}

#[tokio::test]
async fn create_of_existing_code_joins_it() {
    let state = test_app_state();
    let (alice, mut rx_a) = caller("alice");
    let (bob, mut rx_b) = caller("bob");

    let first = create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");
    drain(&mut rx_a);
    let second = create_or_get_room(&state, &bob, &code("AB12CD")).await.expect("create again");

    assert_eq!(first.room.id, second.room.id);
    assert_eq!(participant_ids(&second.participants), vec!["alice", "bob"]);
    assert!(matches!(recv_event(&mut rx_a).await, ServerEvent::CreatedRoom(_)));
    assert!(matches!(recv_event(&mut rx_b).await, ServerEvent::CreatedRoom(_)));
}

#[tokio::test]
async fn concurrent_creates_produce_one_room_with_both_participants() {
    let state = test_app_state();
    let (alice, _rx_a) = caller("alice");
    let (bob, _rx_b) = caller("bob");
    let room = code("RACE01");

    let (a, b) = tokio::join!(
        create_or_get_room(&state, &alice, &room),
        create_or_get_room(&state, &bob, &room)
    );
    let (a, b) = (a.expect("alice create"), b.expect("bob create"));

    assert_eq!(a.room.id, b.room.id);
    let stored = state.store.find_room(&room).await.expect("find").expect("room exists");
    let participants = state.store.list_participants(stored.id).await.expect("list");
    assert_eq!(participant_ids(&participants), vec!["alice", "bob"]);
    assert_eq!(state.rooms.member_count(&room).await, 2);
}

// =============================================================================
// join
// =============================================================================

#[tokio::test]
async fn join_unknown_room_is_not_found() {
    let state = test_app_state();
    let (bob, mut rx) = caller("bob");

    let err = join_room(&state, &bob, &code("NOPE00")).await.expect_err("unknown room");

    assert!(matches!(err, RoomError::NotFound(_)));
    assert_eq!(err.error_code(), "E_ROOM_NOT_FOUND");
    assert!(!state.rooms.is_member(&code("NOPE00"), bob.client_id).await);
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn join_replies_then_broadcasts_room_users() {
    let state = test_app_state();
    let (alice, mut rx_a) = caller("alice");
    let (bob, mut rx_b) = caller("bob");
    create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");
    drain(&mut rx_a);

    let joined = join_room(&state, &bob, &code("ab12cd")).await.expect("join");

    assert_eq!(participant_ids(&joined.participants), vec!["alice", "bob"]);
    assert_eq!(recv_event(&mut rx_b).await, ServerEvent::JoinedRoom(joined.clone()));
    let ServerEvent::RoomUsers(users) = recv_event(&mut rx_b).await else {
        panic!("bob expected room-users");
    };
    assert_eq!(users.room_code, "AB12CD");
    assert_eq!(users.participants, joined.participants);

    let ServerEvent::RoomUsers(seen_by_alice) = recv_event(&mut rx_a).await else {
        panic!("alice expected room-users");
    };
    assert_eq!(participant_ids(&seen_by_alice.participants), vec!["alice", "bob"]);
    assert_no_event(&mut rx_a).await;
}

#[tokio::test]
async fn joining_twice_keeps_one_participant_record() {
    let state = test_app_state();
    let (alice, _rx_a) = caller("alice");
    let (bob, _rx_b) = caller("bob");
    create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");

    join_room(&state, &bob, &code("AB12CD")).await.expect("join");
    let again = join_room(&state, &bob, &code("AB12CD")).await.expect("join again");

    assert_eq!(participant_ids(&again.participants), vec!["alice", "bob"]);
    assert_eq!(state.rooms.member_count(&code("AB12CD")).await, 2);
}

// =============================================================================
// leave / disconnect
// =============================================================================

#[tokio::test]
async fn leave_broadcasts_to_remaining_members_only() {
    let state = test_app_state();
    let (alice, mut rx_a) = caller("alice");
    let (bob, mut rx_b) = caller("bob");
    create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");
    join_room(&state, &bob, &code("AB12CD")).await.expect("join");
    drain(&mut rx_a);
    drain(&mut rx_b);

    leave_room(&state, bob.client_id, "bob", &code("AB12CD")).await.expect("leave");

    let ServerEvent::RoomUsers(users) = recv_event(&mut rx_a).await else {
        panic!("alice expected room-users");
    };
    assert_eq!(participant_ids(&users.participants), vec!["alice"]);
    assert_no_event(&mut rx_b).await;
    assert!(!state.rooms.is_member(&code("AB12CD"), bob.client_id).await);
}

#[tokio::test]
async fn leave_unknown_room_or_absent_participant_is_ok() {
    let state = test_app_state();
    let (alice, _rx) = caller("alice");

    leave_room(&state, alice.client_id, "alice", &code("NOPE00")).await.expect("unknown room");

    create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");
    leave_room(&state, Uuid::new_v4(), "ghost", &code("AB12CD")).await.expect("absent participant");
    assert_eq!(state.rooms.member_count(&code("AB12CD")).await, 1);
}

#[tokio::test]
async fn last_leave_empties_group() {
    let state = test_app_state();
    let (alice, _rx) = caller("alice");
    create_or_get_room(&state, &alice, &code("AB12CD")).await.expect("create");

    leave_room(&state, alice.client_id, "alice", &code("AB12CD")).await.expect("leave");

    assert_eq!(state.rooms.member_count(&code("AB12CD")).await, 0);
    assert!(state.rooms.rooms_of(alice.client_id).await.is_empty());
}

#[tokio::test]
async fn disconnect_runs_leave_for_every_joined_room() {
    let state = test_app_state();
    let (alice, mut rx_a) = caller("alice");
    let (bob, _rx_b) = caller("bob");
    create_or_get_room(&state, &alice, &code("AAAAAA")).await.expect("create a");
    create_or_get_room(&state, &alice, &code("BBBBBB")).await.expect("create b");
    join_room(&state, &bob, &code("AAAAAA")).await.expect("bob joins a");
    join_room(&state, &bob, &code("BBBBBB")).await.expect("bob joins b");
    drain(&mut rx_a);

    disconnect(&state, bob.client_id).await;

    let mut seen = Vec::new();
    for _ in 0..2 {
        let ServerEvent::RoomUsers(users) = recv_event(&mut rx_a).await else {
            panic!("alice expected room-users");
        };
        assert_eq!(participant_ids(&users.participants), vec!["alice"]);
        seen.push(users.room_code);
    }
    seen.sort();
    assert_eq!(seen, vec!["AAAAAA", "BBBBBB"]);

    assert!(state.rooms.rooms_of(bob.client_id).await.is_empty());
    let room = state.store.find_room(&code("AAAAAA")).await.expect("find").expect("room");
    let participants = state.store.list_participants(room.id).await.expect("list");
    assert_eq!(participant_ids(&participants), vec!["alice"]);
}

#[tokio::test]
async fn disconnect_keeps_user_with_another_live_connection() {
    let state = test_app_state();
    let (alice_tab1, _rx_1) = caller("alice");
    let (alice_tab2, mut rx_2) = caller("alice");
    let (bob, mut rx_b) = caller("bob");
    create_or_get_room(&state, &alice_tab1, &code("AB12CD")).await.expect("create");
    join_room(&state, &alice_tab2, &code("AB12CD")).await.expect("second tab joins");
    join_room(&state, &bob, &code("AB12CD")).await.expect("bob joins");
    drain(&mut rx_2);
    drain(&mut rx_b);

    disconnect(&state, alice_tab1.client_id).await;

    let ServerEvent::RoomUsers(users) = recv_event(&mut rx_b).await else {
        panic!("bob expected room-users");
    };
    assert_eq!(participant_ids(&users.participants), vec!["alice", "bob"]);
    assert!(matches!(recv_event(&mut rx_2).await, ServerEvent::RoomUsers(_)));
    assert_eq!(state.rooms.member_count(&code("AB12CD")).await, 2);

    disconnect(&state, alice_tab2.client_id).await;

    let ServerEvent::RoomUsers(users) = recv_event(&mut rx_b).await else {
        panic!("bob expected room-users");
    };
    assert_eq!(participant_ids(&users.participants), vec!["bob"]);
}

#[tokio::test]
async fn explicit_leave_from_one_tab_keeps_the_record() {
    let state = test_app_state();
    let (tab1, _rx_1) = caller("alice");
    let (tab2, _rx_2) = caller("alice");
    create_or_get_room(&state, &tab1, &code("AB12CD")).await.expect("create");
    join_room(&state, &tab2, &code("AB12CD")).await.expect("join");

    leave_room(&state, tab1.client_id, "alice", &code("AB12CD")).await.expect("leave");

    assert!(!state.rooms.is_member(&code("AB12CD"), tab1.client_id).await);
    let room = state.store.find_room(&code("AB12CD")).await.expect("find").expect("room");
    let participants = state.store.list_participants(room.id).await.expect("list");
    assert_eq!(participant_ids(&participants), vec!["alice"]);
}

// =============================================================================
// store failures
// =============================================================================

struct FailingStore;

#[async_trait]
impl RoomStore for FailingStore {
    async fn upsert_user(&self, _user: &UserProfile) -> Result<(), StoreError> {
        Err(StoreError::UnknownRoom(Uuid::nil()))
    }

    async fn find_user(&self, _user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Err(StoreError::UnknownRoom(Uuid::nil()))
    }

    async fn find_room(&self, _code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        Err(StoreError::UnknownRoom(Uuid::nil()))
    }

    async fn create_room(&self, _code: &RoomCode, _created_by: &str) -> Result<RoomRecord, StoreError> {
        Err(StoreError::UnknownRoom(Uuid::nil()))
    }

    async fn upsert_participant(&self, room_id: Uuid, _user_id: &str) -> Result<(), StoreError> {
        Err(StoreError::UnknownRoom(room_id))
    }

    async fn remove_participant(&self, room_id: Uuid, _user_id: &str) -> Result<(), StoreError> {
        Err(StoreError::UnknownRoom(room_id))
    }

    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>, StoreError> {
        Err(StoreError::UnknownRoom(room_id))
    }

    async fn create_message(&self, message: NewChatMessage<'_>) -> Result<ChatMessage, StoreError> {
        Err(StoreError::UnknownRoom(message.room_id))
    }
}

#[tokio::test]
async fn store_failure_is_reported_and_nothing_changes() {
    let state = test_app_state_with_store(Arc::new(FailingStore));
    let (alice, mut rx) = caller("alice");

    let err = create_or_get_room(&state, &alice, &code("AB12CD")).await.expect_err("store down");

    assert_eq!(err.error_code(), "E_PERSISTENCE");
    assert!(err.retryable());
    assert_eq!(err.to_string(), "failed to create room");
    assert!(!state.rooms.is_member(&code("AB12CD"), alice.client_id).await);
    assert_no_event(&mut rx).await;
}

#[tokio::test]
async fn disconnect_unsubscribes_even_when_store_fails() {
    let state = test_app_state_with_store(Arc::new(FailingStore));
    let (tx, _rx) = client_channel();
    let client_id = Uuid::new_v4();
    state.rooms.subscribe(&code("AB12CD"), client_id, "alice", tx).await;

    disconnect(&state, client_id).await;

    assert!(state.rooms.rooms_of(client_id).await.is_empty());
}

// =============================================================================
// input resolution
// =============================================================================

#[test]
fn resolve_user_prefers_payload_then_identity() {
    let identity = UserProfile { id: "conn-user".into(), name: "Conn".into() };
    assert_eq!(resolve_user(Some("payload"), Some(&identity)).expect("payload"), "payload");
    assert_eq!(resolve_user(Some("  "), Some(&identity)).expect("identity"), "conn-user");
    assert_eq!(resolve_user(None, Some(&identity)).expect("identity"), "conn-user");
    assert!(matches!(resolve_user(None, None), Err(RoomError::Unauthorized)));
}

#[test]
fn parse_code_maps_to_invalid_code() {
    assert_eq!(parse_code("ab12cd").expect("valid").as_str(), "AB12CD");
    let err = parse_code("bad").expect_err("too short");
    assert_eq!(err.error_code(), "E_INVALID_ROOM_CODE");
    assert!(!err.retryable());
}
