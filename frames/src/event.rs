//! Typed events: the closed set of messages clients and server exchange.
//!
//! Control payloads keep `roomCode` as a raw string so the server can answer
//! a malformed code with a typed error instead of dropping the message.
//! Canvas objects travel as opaque JSON; the relay never inspects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CodecError, Envelope, ErrorCode};

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Every message a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "create-room")]
    CreateRoom(RoomRequest),
    #[serde(rename = "join-room")]
    JoinRoom(RoomRequest),
    #[serde(rename = "leave-room")]
    LeaveRoom(RoomRequest),
    #[serde(rename = "send-message")]
    SendMessage(SendMessage),
    #[serde(rename = "add-canvas-object")]
    AddCanvasObject(ObjectEvent),
    #[serde(rename = "update-canvas-object")]
    UpdateCanvasObject(ObjectEvent),
    #[serde(rename = "delete-canvas-object")]
    DeleteCanvasObject(DeleteObject),
    #[serde(rename = "reset-canvas")]
    ResetCanvas(RoomSignal),
    #[serde(rename = "undo")]
    Undo(RoomSignal),
    #[serde(rename = "redo")]
    Redo(RoomSignal),
    #[serde(rename = "request-canvas-sync")]
    RequestCanvasSync(RoomSignal),
    #[serde(rename = "canvas-snapshot")]
    CanvasSnapshot(SnapshotOffer),
}

impl ClientEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "create-room",
            Self::JoinRoom(_) => "join-room",
            Self::LeaveRoom(_) => "leave-room",
            Self::SendMessage(_) => "send-message",
            Self::AddCanvasObject(_) => "add-canvas-object",
            Self::UpdateCanvasObject(_) => "update-canvas-object",
            Self::DeleteCanvasObject(_) => "delete-canvas-object",
            Self::ResetCanvas(_) => "reset-canvas",
            Self::Undo(_) => "undo",
            Self::Redo(_) => "redo",
            Self::RequestCanvasSync(_) => "request-canvas-sync",
            Self::CanvasSnapshot(_) => "canvas-snapshot",
        }
    }

    /// Wrap into a wire envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload cannot be serialized.
    pub fn to_envelope(&self) -> Result<Envelope, CodecError> {
        Envelope::from_event(self)
    }
}

impl TryFrom<&Envelope> for ClientEvent {
    type Error = CodecError;

    fn try_from(envelope: &Envelope) -> Result<Self, CodecError> {
        envelope.to_event()
    }
}

/// Create, join or leave a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub room_code: String,
    /// Acting user. Falls back to the connection's identity when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Post a chat message to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub room_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub content: String,
}

/// Add or update a canvas object. For updates `object` is a partial attribute
/// set that must carry the target `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub room: String,
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObject {
    pub room: String,
    pub id: String,
}

/// Room-wide instruction without a body (reset, undo, redo, sync request
/// and its no-peer reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSignal {
    pub room_code: String,
}

/// Full canvas state offered by a peer to a late joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOffer {
    pub room_code: String,
    /// Connection id of the requester.
    pub target: String,
    pub snapshot: Value,
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Every message the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected(Connected),
    #[serde(rename = "created-room")]
    CreatedRoom(RoomState),
    #[serde(rename = "joined-room")]
    JoinedRoom(RoomState),
    #[serde(rename = "room-users")]
    RoomUsers(RoomUsers),
    #[serde(rename = "new-message")]
    NewMessage(NewMessage),
    #[serde(rename = "add-canvas-object")]
    AddCanvasObject(ObjectRelay),
    #[serde(rename = "update-canvas-object")]
    UpdateCanvasObject(ObjectRelay),
    #[serde(rename = "delete-canvas-object")]
    DeleteCanvasObject(DeleteRelay),
    #[serde(rename = "reset-canvas")]
    ResetCanvas(RoomSignal),
    #[serde(rename = "undo")]
    Undo(RoomSignal),
    #[serde(rename = "redo")]
    Redo(RoomSignal),
    #[serde(rename = "canvas-sync-request")]
    CanvasSyncRequest(SyncRequest),
    #[serde(rename = "canvas-snapshot")]
    CanvasSnapshot(SnapshotDelivery),
    /// No peer can answer a sync request; the requester's canvas stands.
    #[serde(rename = "canvas-sync-unavailable")]
    CanvasSyncUnavailable(RoomSignal),
    #[serde(rename = "room:error")]
    RoomError(ErrorPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::CreatedRoom(_) => "created-room",
            Self::JoinedRoom(_) => "joined-room",
            Self::RoomUsers(_) => "room-users",
            Self::NewMessage(_) => "new-message",
            Self::AddCanvasObject(_) => "add-canvas-object",
            Self::UpdateCanvasObject(_) => "update-canvas-object",
            Self::DeleteCanvasObject(_) => "delete-canvas-object",
            Self::ResetCanvas(_) => "reset-canvas",
            Self::Undo(_) => "undo",
            Self::Redo(_) => "redo",
            Self::CanvasSyncRequest(_) => "canvas-sync-request",
            Self::CanvasSnapshot(_) => "canvas-snapshot",
            Self::CanvasSyncUnavailable(_) => "canvas-sync-unavailable",
            Self::RoomError(_) => "room:error",
            Self::Error(_) => "error",
        }
    }

    /// Wrap into a wire envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload cannot be serialized.
    pub fn to_envelope(&self) -> Result<Envelope, CodecError> {
        Envelope::from_event(self)
    }

    /// Whether this event only carries canvas traffic (high volume, logged at debug).
    #[must_use]
    pub fn is_canvas(&self) -> bool {
        matches!(
            self,
            Self::AddCanvasObject(_)
                | Self::UpdateCanvasObject(_)
                | Self::DeleteCanvasObject(_)
                | Self::ResetCanvas(_)
                | Self::Undo(_)
                | Self::Redo(_)
        )
    }
}

impl TryFrom<&Envelope> for ServerEvent {
    type Error = CodecError;

    fn try_from(envelope: &Envelope) -> Result<Self, CodecError> {
        envelope.to_event()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    pub room_code: String,
    pub created_by: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user: UserProfile,
    pub joined_at: i64,
}

/// Room plus its full participant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub room: RoomInfo,
    pub participants: Vec<ParticipantInfo>,
}

/// Updated membership broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUsers {
    pub room_code: String,
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub message: ChatMessage,
    pub sender: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRelay {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRelay {
    pub id: String,
}

/// Ask a peer to publish its canvas state for `requester`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub room_code: String,
    pub requester: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDelivery {
    pub room_code: String,
    pub snapshot: Value,
}

/// Body of `room:error` and `error` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

impl ErrorPayload {
    /// Build from a typed error.
    pub fn from_error<E: ErrorCode + ?Sized>(err: &E) -> Self {
        Self { code: err.error_code().to_owned(), message: err.to_string(), retryable: err.retryable() }
    }

    /// Build from a code and a caller-facing message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), retryable: false }
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
