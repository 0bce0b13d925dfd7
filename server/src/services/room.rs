//! Room service: create, join, leave and disconnect cleanup.
//!
//! DESIGN
//! ======
//! Every operation takes the room's lock from the registry before touching
//! the store and holds it until the group update and the resulting
//! broadcast are done, so membership changes on one code are applied and
//! announced in a single order. Group membership changes only after the
//! store call succeeded; the one exception is disconnect, where the
//! connection is gone and is unsubscribed regardless.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are logged here and returned to the caller as
//! `RoomError::Store` with a generic message. Nothing is broadcast on
//! failure.

use frames::{ErrorCode, RoomCode, RoomCodeError, RoomState, RoomUsers, ServerEvent, UserProfile};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::services::store::StoreError;
use crate::state::{AppState, ClientId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(RoomCode),
    #[error("a user identity is required")]
    Unauthorized,
    #[error("invalid room code: {0}")]
    InvalidCode(#[from] RoomCodeError),
    #[error("failed to {action}")]
    Store {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::InvalidCode(_) => "E_INVALID_ROOM_CODE",
            Self::Store { .. } => "E_PERSISTENCE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

/// The connection performing a room operation.
#[derive(Debug, Clone)]
pub struct Caller {
    pub client_id: ClientId,
    pub user_id: String,
    pub tx: mpsc::Sender<ServerEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaveCause {
    Request,
    Disconnect,
}

// =============================================================================
// INPUT RESOLUTION
// =============================================================================

/// Normalize a room code from a client payload.
///
/// # Errors
///
/// Returns [`RoomError::InvalidCode`] for malformed codes.
pub fn parse_code(raw: &str) -> Result<RoomCode, RoomError> {
    Ok(RoomCode::parse(raw)?)
}

/// Pick the acting user: the payload's `userId` when present, otherwise the
/// connection's identity.
///
/// # Errors
///
/// Returns [`RoomError::Unauthorized`] when neither is available.
pub fn resolve_user(requested: Option<&str>, identity: Option<&UserProfile>) -> Result<String, RoomError> {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .or_else(|| identity.map(|u| u.id.clone()))
        .ok_or(RoomError::Unauthorized)
}

fn store_failure<'a>(action: &'static str, code: &'a RoomCode) -> impl FnOnce(StoreError) -> RoomError + 'a {
    move |source| {
        error!(%code, error = %source, "room: failed to {action}");
        RoomError::Store { action, source }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Find or create the room, add the caller as participant, subscribe it and
/// broadcast `created-room` to every member including the caller.
///
/// # Errors
///
/// Returns [`RoomError::Store`] if persistence fails.
pub async fn create_or_get_room(state: &AppState, caller: &Caller, code: &RoomCode) -> Result<RoomState, RoomError> {
    let result = create_locked(state, caller, code).await;
    state.rooms.prune_lock(code).await;
    result
}

async fn create_locked(state: &AppState, caller: &Caller, code: &RoomCode) -> Result<RoomState, RoomError> {
    let _guard = state.rooms.lock_room(code).await;

    let existing = state.store.find_room(code).await.map_err(store_failure("create room", code))?;
    let room = match existing {
        Some(room) => room,
        None => state
            .store
            .create_room(code, &caller.user_id)
            .await
            .map_err(store_failure("create room", code))?,
    };
    state
        .store
        .upsert_participant(room.id, &caller.user_id)
        .await
        .map_err(store_failure("create room", code))?;
    let participants = state
        .store
        .list_participants(room.id)
        .await
        .map_err(store_failure("create room", code))?;

    state.rooms.subscribe(code, caller.client_id, &caller.user_id, caller.tx.clone()).await;

    let room_state = RoomState { room: room.info(), participants };
    state.rooms.broadcast(code, &ServerEvent::CreatedRoom(room_state.clone()), None).await;
    info!(%code, client_id = %caller.client_id, user_id = %caller.user_id, participants = room_state.participants.len(), "room: created or rejoined");
    Ok(room_state)
}

/// Join an existing room: `joined-room` to the caller, then `room-users` to
/// every member including the caller.
///
/// # Errors
///
/// Returns [`RoomError::NotFound`] for unknown codes and
/// [`RoomError::Store`] if persistence fails.
pub async fn join_room(state: &AppState, caller: &Caller, code: &RoomCode) -> Result<RoomState, RoomError> {
    let result = join_locked(state, caller, code).await;
    state.rooms.prune_lock(code).await;
    result
}

async fn join_locked(state: &AppState, caller: &Caller, code: &RoomCode) -> Result<RoomState, RoomError> {
    let _guard = state.rooms.lock_room(code).await;

    let Some(room) = state.store.find_room(code).await.map_err(store_failure("join room", code))? else {
        return Err(RoomError::NotFound(code.clone()));
    };
    state
        .store
        .upsert_participant(room.id, &caller.user_id)
        .await
        .map_err(store_failure("join room", code))?;
    let participants = state
        .store
        .list_participants(room.id)
        .await
        .map_err(store_failure("join room", code))?;

    state.rooms.subscribe(code, caller.client_id, &caller.user_id, caller.tx.clone()).await;

    let room_state = RoomState { room: room.info(), participants };
    state.rooms.send_to(code, caller.client_id, ServerEvent::JoinedRoom(room_state.clone())).await;
    let users = ServerEvent::RoomUsers(RoomUsers {
        room_code: code.to_string(),
        participants: room_state.participants.clone(),
    });
    state.rooms.broadcast(code, &users, None).await;
    info!(%code, client_id = %caller.client_id, user_id = %caller.user_id, participants = room_state.participants.len(), "room: joined");
    Ok(room_state)
}

/// Remove the user's participant record, unsubscribe the connection and
/// broadcast `room-users` to the remaining members. Unknown rooms and absent
/// participants are not errors. The record stays while the user has another
/// connection in the room.
///
/// # Errors
///
/// Returns [`RoomError::Store`] if persistence fails; the connection stays
/// subscribed in that case.
pub async fn leave_room(state: &AppState, client_id: ClientId, user_id: &str, code: &RoomCode) -> Result<(), RoomError> {
    let result = leave_locked(state, client_id, user_id, code, LeaveCause::Request).await;
    state.rooms.prune_lock(code).await;
    result
}

/// Run the leave path for every room the connection joined.
pub async fn disconnect(state: &AppState, client_id: ClientId) {
    for (code, user_id) in state.rooms.rooms_of(client_id).await {
        if let Err(e) = leave_locked(state, client_id, &user_id, &code, LeaveCause::Disconnect).await {
            warn!(%code, %client_id, error = %e, "room: disconnect cleanup incomplete");
        }
        state.rooms.prune_lock(&code).await;
    }
}

async fn leave_locked(
    state: &AppState,
    client_id: ClientId,
    user_id: &str,
    code: &RoomCode,
    cause: LeaveCause,
) -> Result<(), RoomError> {
    let _guard = state.rooms.lock_room(code).await;

    if cause == LeaveCause::Disconnect {
        state.rooms.unsubscribe(code, client_id).await;
    }

    let room = state.store.find_room(code).await.map_err(store_failure("leave room", code))?;
    let Some(room) = room else {
        state.rooms.unsubscribe(code, client_id).await;
        return Ok(());
    };
    let still_present = state.rooms.user_has_other_connection(code, user_id, client_id).await;
    if !still_present {
        state
            .store
            .remove_participant(room.id, user_id)
            .await
            .map_err(store_failure("leave room", code))?;
    }
    state.rooms.unsubscribe(code, client_id).await;

    let participants = state
        .store
        .list_participants(room.id)
        .await
        .map_err(store_failure("leave room", code))?;
    let remaining = state
        .rooms
        .broadcast(code, &ServerEvent::RoomUsers(RoomUsers { room_code: code.to_string(), participants }), None)
        .await;
    info!(%code, %client_id, %user_id, ?cause, remaining, still_present, "room: left");
    Ok(())
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
