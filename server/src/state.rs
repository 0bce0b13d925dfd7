//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the persistence collaborator and the live room registry: which
//! connections are subscribed to which room, plus one async lock per room
//! code that serializes membership changes for that code.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use frames::{RoomCode, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::services::store::RoomStore;

/// Identifier of one websocket connection.
pub type ClientId = Uuid;

// =============================================================================
// MEMBER
// =============================================================================

/// A connection subscribed to a room group.
#[derive(Debug, Clone)]
pub struct Member {
    /// User the connection acts as inside this room.
    pub user_id: String,
    /// Outbound queue drained by the connection's socket task.
    pub tx: mpsc::Sender<ServerEvent>,
    /// Process-wide subscription order; lower joined earlier.
    pub joined_seq: u64,
}

// =============================================================================
// ROOM REGISTRY
// =============================================================================

/// Live room groups and per-room locks.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    groups: Arc<RwLock<HashMap<RoomCode, HashMap<ClientId, Member>>>>,
    locks: Arc<Mutex<HashMap<RoomCode, Arc<Mutex<()>>>>>,
    next_seq: Arc<AtomicU64>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the membership lock for `code`. Held across persistence calls
    /// so create/join/leave on one code never interleave.
    pub async fn lock_room(&self, code: &RoomCode) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(code.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry for `code` once its group is empty and nobody
    /// else holds or waits on it. Call after releasing the guard.
    pub async fn prune_lock(&self, code: &RoomCode) {
        let mut locks = self.locks.lock().await;
        let idle = locks.get(code).is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle && !self.groups.read().await.contains_key(code) {
            locks.remove(code);
        }
    }

    /// Subscribe a connection. Re-subscribing keeps the original join order.
    pub async fn subscribe(&self, code: &RoomCode, client_id: ClientId, user_id: &str, tx: mpsc::Sender<ServerEvent>) {
        let mut groups = self.groups.write().await;
        let group = groups.entry(code.clone()).or_default();
        let joined_seq = group
            .get(&client_id)
            .map_or_else(|| self.next_seq.fetch_add(1, Ordering::Relaxed), |m| m.joined_seq);
        group.insert(client_id, Member { user_id: user_id.to_owned(), tx, joined_seq });
    }

    /// Unsubscribe a connection, removing the group when it empties.
    pub async fn unsubscribe(&self, code: &RoomCode, client_id: ClientId) -> Option<Member> {
        let mut groups = self.groups.write().await;
        let group = groups.get_mut(code)?;
        let removed = group.remove(&client_id);
        if group.is_empty() {
            groups.remove(code);
        }
        removed
    }

    pub async fn is_member(&self, code: &RoomCode, client_id: ClientId) -> bool {
        let groups = self.groups.read().await;
        groups.get(code).is_some_and(|g| g.contains_key(&client_id))
    }

    pub async fn member_count(&self, code: &RoomCode) -> usize {
        let groups = self.groups.read().await;
        groups.get(code).map_or(0, HashMap::len)
    }

    /// Whether `user_id` has a connection in `code` other than `exclude`.
    pub async fn user_has_other_connection(&self, code: &RoomCode, user_id: &str, exclude: ClientId) -> bool {
        let groups = self.groups.read().await;
        groups
            .get(code)
            .is_some_and(|g| g.iter().any(|(id, m)| *id != exclude && m.user_id == user_id))
    }

    /// Rooms a connection is subscribed to, with the user it acts as in each.
    pub async fn rooms_of(&self, client_id: ClientId) -> Vec<(RoomCode, String)> {
        let groups = self.groups.read().await;
        groups
            .iter()
            .filter_map(|(code, group)| group.get(&client_id).map(|m| (code.clone(), m.user_id.clone())))
            .collect()
    }

    /// Longest-subscribed member other than `exclude`.
    pub async fn earliest_member(&self, code: &RoomCode, exclude: ClientId) -> Option<ClientId> {
        let groups = self.groups.read().await;
        groups
            .get(code)?
            .iter()
            .filter(|(id, _)| **id != exclude)
            .min_by_key(|(_, m)| m.joined_seq)
            .map(|(id, _)| *id)
    }

    /// Deliver an event to one member of `code`. Returns whether it was queued.
    pub async fn send_to(&self, code: &RoomCode, client_id: ClientId, event: ServerEvent) -> bool {
        let groups = self.groups.read().await;
        let Some(member) = groups.get(code).and_then(|g| g.get(&client_id)) else {
            return false;
        };
        deliver(code, client_id, member, event)
    }

    /// Send an event to every member of `code`, optionally excluding one
    /// connection. Returns the number of members the event was queued for.
    pub async fn broadcast(&self, code: &RoomCode, event: &ServerEvent, exclude: Option<ClientId>) -> usize {
        let groups = self.groups.read().await;
        let Some(group) = groups.get(code) else {
            return 0;
        };
        let mut delivered = 0;
        for (id, member) in group {
            if Some(*id) == exclude {
                continue;
            }
            if deliver(code, *id, member, event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}

fn deliver(code: &RoomCode, client_id: ClientId, member: &Member, event: ServerEvent) -> bool {
    let name = event.name();
    match member.tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(%code, %client_id, event = name, "room: peer queue full; event dropped");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%code, %client_id, event = name, "room: peer channel closed");
            false
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub rooms: RoomRegistry,
    /// Outbound queue depth for each new connection.
    pub client_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn RoomStore>, client_channel_capacity: usize) -> Self {
        Self { store, rooms: RoomRegistry::new(), client_channel_capacity }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
