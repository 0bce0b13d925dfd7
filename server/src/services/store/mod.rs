//! Persistence collaborator for rooms, participants, users and chat.
//!
//! DESIGN
//! ======
//! The room registry only needs a handful of CRUD operations, so they sit
//! behind one async trait. `PgRoomStore` backs production deployments;
//! `MemoryRoomStore` backs tests and database-less local runs. Both make
//! `create_room` idempotent on the room code so concurrent creators converge
//! on a single row.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use frames::{ChatMessage, ParticipantInfo, RoomCode, RoomInfo, UserProfile};
use uuid::Uuid;

pub use memory::MemoryRoomStore;
pub use postgres::PgRoomStore;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("room {0} does not exist")]
    UnknownRoom(Uuid),
}

/// A stored room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: Uuid,
    pub room_code: RoomCode,
    pub created_by: String,
    pub created_at: i64,
}

impl RoomRecord {
    #[must_use]
    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.to_string(),
            room_code: self.room_code.to_string(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
        }
    }
}

/// Chat message about to be stored.
#[derive(Debug, Clone)]
pub struct NewChatMessage<'a> {
    pub room_id: Uuid,
    pub user_id: &'a str,
    pub content: &'a str,
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert or refresh a user profile.
    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StoreError>;

    /// Stored profile for `user_id`, if any.
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn find_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError>;

    /// Create the room unless one with the same code exists; returns the
    /// stored row either way.
    async fn create_room(&self, code: &RoomCode, created_by: &str) -> Result<RoomRecord, StoreError>;

    /// Add the participant or refresh its join timestamp.
    async fn upsert_participant(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError>;

    /// Remove the participant. Absent rows are not an error.
    async fn remove_participant(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError>;

    /// Participants ordered by join time. Users without a stored profile are
    /// named after their id.
    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>, StoreError>;

    async fn create_message(&self, message: NewChatMessage<'_>) -> Result<ChatMessage, StoreError>;
}
