use super::*;
use crate::services::store::MemoryRoomStore;
use tokio::time::{Duration, timeout};

/// Create a test `AppState` backed by the in-memory store.
#[must_use]
pub fn test_app_state() -> AppState {
    test_app_state_with_store(Arc::new(MemoryRoomStore::new()))
}

/// Create a test `AppState` around a caller-supplied store.
#[must_use]
pub fn test_app_state_with_store(store: Arc<dyn RoomStore>) -> AppState {
    AppState::new(store, 64)
}

/// Normalized room code for tests.
#[must_use]
pub fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).expect("valid room code")
}

/// Outbound channel for a simulated connection.
#[must_use]
pub fn client_channel() -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
    mpsc::channel(64)
}

/// Receive the next event or fail after a short timeout.
pub async fn recv_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("event receive timed out")
        .expect("event channel closed unexpectedly")
}

/// Assert that nothing arrives within a short window.
pub async fn assert_no_event(rx: &mut mpsc::Receiver<ServerEvent>) {
    let got = timeout(Duration::from_millis(80), rx.recv()).await;
    assert!(got.is_err(), "expected no event, got {got:?}");
}

/// Drain everything currently queued.
pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
