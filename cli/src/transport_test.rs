use super::*;

#[test]
fn backoff_doubles_to_cap_and_resets() {
    let mut backoff = Backoff::default();
    let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);

    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_secs(1));
}

#[test]
fn ws_url_from_http_base() {
    let url = ws_url("http://127.0.0.1:3000", "alice", Some("Alice Smith")).expect("url");
    assert_eq!(url, "ws://127.0.0.1:3000/ws?user_id=alice&name=Alice+Smith");
}

#[test]
fn ws_url_from_https_base_drops_path_and_query() {
    let url = ws_url("https://board.example.com/app?x=1", "u-1", None).expect("url");
    assert_eq!(url, "wss://board.example.com/ws?user_id=u-1");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://host", "u", None), Err(ClientError::InvalidBaseUrl(_))));
    assert!(matches!(ws_url("not a url", "u", None), Err(ClientError::InvalidBaseUrl(_))));
}

#[test]
fn control_frames_decode_to_nothing() {
    assert!(decode(Message::Ping(Vec::new().into())).expect("ping").is_none());
}

#[test]
fn text_frames_decode_to_server_events() {
    let text = r#"{"id":"1","ts":0,"event":"undo","data":{"roomCode":"AB12CD"}}"#;
    let event = decode(Message::Text(text.into())).expect("decode").expect("event");
    assert_eq!(event, ServerEvent::Undo(frames::RoomSignal { room_code: "AB12CD".into() }));
}

#[test]
fn garbage_frames_are_errors() {
    assert!(decode(Message::Text("nope".into())).is_err());
}

#[test]
fn sync_deadline_starts_once_and_clears() {
    let now = Instant::now();
    let started = next_sync_deadline(true, None, now).expect("deadline");
    assert_eq!(started, now + SYNC_TIMEOUT);

    let later = now + Duration::from_secs(1);
    assert_eq!(next_sync_deadline(true, Some(started), later), Some(started));
    assert_eq!(next_sync_deadline(false, Some(started), later), None);
}
