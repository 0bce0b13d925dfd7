//! Room chat: persist a message, then broadcast it to every member.

use frames::{NewMessage, RoomCode, ServerEvent, UserProfile};
use tracing::{error, info};

use crate::services::room::RoomError;
use crate::services::store::NewChatMessage;
use crate::state::{AppState, ClientId};

/// Store a message and broadcast `new-message` to the whole room, sender
/// included. Messages for unknown rooms are dropped.
///
/// # Errors
///
/// Returns [`RoomError::Store`] if persistence fails.
pub async fn send_message(
    state: &AppState,
    client_id: ClientId,
    user_id: &str,
    code: &RoomCode,
    content: &str,
) -> Result<(), RoomError> {
    let room = state.store.find_room(code).await.map_err(|source| {
        error!(%code, error = %source, "chat: room lookup failed");
        RoomError::Store { action: "send message", source }
    })?;
    let Some(room) = room else {
        info!(%code, %client_id, "chat: message for unknown room ignored");
        return Ok(());
    };

    let message = state
        .store
        .create_message(NewChatMessage { room_id: room.id, user_id, content })
        .await
        .map_err(|source| {
            error!(%code, error = %source, "chat: failed to store message");
            RoomError::Store { action: "send message", source }
        })?;

    let sender = match state.store.find_user(user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => UserProfile { id: user_id.to_owned(), name: user_id.to_owned() },
        Err(e) => {
            error!(%code, %user_id, error = %e, "chat: sender lookup failed; using id as name");
            UserProfile { id: user_id.to_owned(), name: user_id.to_owned() }
        }
    };

    let delivered = state
        .rooms
        .broadcast(code, &ServerEvent::NewMessage(NewMessage { message, sender }), None)
        .await;
    info!(%code, %client_id, %user_id, delivered, "chat: message sent");
    Ok(())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
