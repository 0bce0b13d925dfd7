//! `PostgreSQL` implementation of `RoomStore`.
//!
//! Room creation relies on the unique `room_code` constraint: the insert is
//! `ON CONFLICT DO NOTHING` and the row is then read back, so two racing
//! creators always observe the same room.

use async_trait::async_trait;
use frames::{ChatMessage, ParticipantInfo, RoomCode, UserProfile};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewChatMessage, RoomRecord, RoomStore, StoreError};

#[derive(Clone)]
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn room_from_row((id, room_code, created_by, created_at): (Uuid, String, String, i64)) -> Option<RoomRecord> {
    // Codes are validated before insert; a malformed row is treated as absent.
    let room_code = RoomCode::parse(&room_code).ok()?;
    Some(RoomRecord { id, room_code, created_by, created_at })
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = now()",
        )
        .bind(&user.id)
        .bind(&user.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, (String, String)>("SELECT id, name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| UserProfile { id, name }))
    }

    async fn find_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, i64)>(
            "SELECT id, room_code, created_by, created_at FROM rooms WHERE room_code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(room_from_row))
    }

    async fn create_room(&self, code: &RoomCode, created_by: &str) -> Result<RoomRecord, StoreError> {
        sqlx::query(
            "INSERT INTO rooms (id, room_code, created_by, created_at) VALUES ($1, $2, $3, $4)
             ON CONFLICT (room_code) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(code.as_str())
        .bind(created_by)
        .bind(frames::now_ms())
        .execute(&self.pool)
        .await?;

        self.find_room(code)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn upsert_participant(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO room_participants (room_id, user_id, joined_at) VALUES ($1, $2, $3)
             ON CONFLICT (room_id, user_id) DO UPDATE SET joined_at = EXCLUDED.joined_at",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(frames::now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_participant(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM room_participants WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT p.user_id, COALESCE(u.name, p.user_id), p.joined_at
             FROM room_participants p
             LEFT JOIN users u ON u.id = p.user_id
             WHERE p.room_id = $1
             ORDER BY p.joined_at ASC, p.user_id ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, joined_at)| ParticipantInfo { user: UserProfile { id, name }, joined_at })
            .collect())
    }

    async fn create_message(&self, message: NewChatMessage<'_>) -> Result<ChatMessage, StoreError> {
        let id = Uuid::new_v4();
        let created_at = frames::now_ms();
        sqlx::query(
            "INSERT INTO messages (id, room_id, user_id, content, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(message.room_id)
        .bind(message.user_id)
        .bind(message.content)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id: id.to_string(),
            room_id: message.room_id.to_string(),
            user_id: message.user_id.to_owned(),
            content: message.content.to_owned(),
            created_at,
        })
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
