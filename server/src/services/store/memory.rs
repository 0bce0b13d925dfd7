//! In-memory `RoomStore` for tests and local runs without `PostgreSQL`.

use std::collections::HashMap;

use async_trait::async_trait;
use frames::{ChatMessage, ParticipantInfo, RoomCode, UserProfile};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NewChatMessage, RoomRecord, RoomStore, StoreError};

#[derive(Default)]
struct Tables {
    users: HashMap<String, String>,
    rooms: HashMap<RoomCode, RoomRecord>,
    /// `room_id` -> `user_id` -> `joined_at`.
    participants: HashMap<Uuid, HashMap<String, i64>>,
    messages: Vec<ChatMessage>,
}

impl Tables {
    fn room_exists(&self, room_id: Uuid) -> bool {
        self.rooms.values().any(|r| r.id == room_id)
    }
}

#[derive(Default)]
pub struct MemoryRoomStore {
    tables: Mutex<Tables>,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chat messages for a room.
    #[cfg(test)]
    pub async fn message_count(&self, room_id: Uuid) -> usize {
        let tables = self.tables.lock().await;
        tables.messages.iter().filter(|m| m.room_id == room_id.to_string()).count()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.users.insert(user.id.clone(), user.name.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .get(user_id)
            .map(|name| UserProfile { id: user_id.to_owned(), name: name.clone() }))
    }

    async fn find_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.rooms.get(code).cloned())
    }

    async fn create_room(&self, code: &RoomCode, created_by: &str) -> Result<RoomRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        let record = tables.rooms.entry(code.clone()).or_insert_with(|| RoomRecord {
            id: Uuid::new_v4(),
            room_code: code.clone(),
            created_by: created_by.to_owned(),
            created_at: frames::now_ms(),
        });
        Ok(record.clone())
    }

    async fn upsert_participant(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.room_exists(room_id) {
            return Err(StoreError::UnknownRoom(room_id));
        }
        tables
            .participants
            .entry(room_id)
            .or_default()
            .insert(user_id.to_owned(), frames::now_ms());
        Ok(())
    }

    async fn remove_participant(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(members) = tables.participants.get_mut(&room_id) {
            members.remove(user_id);
        }
        Ok(())
    }

    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>, StoreError> {
        let tables = self.tables.lock().await;
        let Some(members) = tables.participants.get(&room_id) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<ParticipantInfo> = members
            .iter()
            .map(|(user_id, joined_at)| ParticipantInfo {
                user: UserProfile {
                    id: user_id.clone(),
                    name: tables.users.get(user_id).cloned().unwrap_or_else(|| user_id.clone()),
                },
                joined_at: *joined_at,
            })
            .collect();
        out.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.user.id.cmp(&b.user.id)));
        Ok(out)
    }

    async fn create_message(&self, message: NewChatMessage<'_>) -> Result<ChatMessage, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.room_exists(message.room_id) {
            return Err(StoreError::UnknownRoom(message.room_id));
        }
        let stored = ChatMessage {
            id: Uuid::new_v4().to_string(),
            room_id: message.room_id.to_string(),
            user_id: message.user_id.to_owned(),
            content: message.content.to_owned(),
            created_at: frames::now_ms(),
        };
        tables.messages.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
