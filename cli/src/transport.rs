//! WebSocket transport with reconnect.
//!
//! LIFECYCLE
//! =========
//! 1. Connect to `/ws` with the user's identity in the query string
//! 2. Ask the session what to send on connect (create or join the room)
//! 3. Pump server events into the session and typed commands out of it.
//!    A canvas sync that gets no answer within 5s is abandoned.
//! 4. On disconnect wait with exponential backoff (1s doubling to 10s),
//!    then go back to 1. `leave`, `quit` or a closed command channel ends
//!    the loop.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::time::Duration;

use frames::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::repl::Command;
use crate::session::{ClientSession, Outcome};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { current: INITIAL_BACKOFF, max: MAX_BACKOFF }
    }
}

impl Backoff {
    /// Delay to wait now; the next one doubles up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

/// Build the websocket URL for `base_url` (http or https).
///
/// # Errors
///
/// Returns [`ClientError::InvalidBaseUrl`] for anything but an http(s) URL.
pub fn ws_url(base_url: &str, user_id: &str, name: Option<&str>) -> Result<String, ClientError> {
    let invalid = || ClientError::InvalidBaseUrl(base_url.to_owned());
    let mut url = reqwest::Url::parse(base_url).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|()| invalid())?;
    url.set_path("/ws");
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("user_id", user_id);
        if let Some(name) = name {
            query.append_pair("name", name);
        }
    }
    Ok(url.into())
}

/// How one connection ended.
enum Exit {
    Quit,
    Disconnected,
}

/// Run until the user quits. Connection failures are retried; notices are
/// handed to `show`.
pub async fn run(url: &str, session: &mut ClientSession, commands: &mut mpsc::Receiver<Command>, show: impl Fn(&str)) {
    let mut backoff = Backoff::default();
    loop {
        match connect_async(url).await {
            Ok((socket, _)) => {
                info!(url, "transport: connected");
                backoff.reset();
                match drive(socket, session, commands, &show).await {
                    Ok(Exit::Quit) => return,
                    Ok(Exit::Disconnected) => warn!("transport: disconnected"),
                    Err(e) => warn!(error = %e, "transport: connection failed"),
                }
            }
            Err(e) => warn!(url, error = %e, "transport: connect failed"),
        }
        let delay = backoff.next_delay();
        show(&format!("reconnecting in {}s", delay.as_secs()));
        tokio::time::sleep(delay).await;
    }
}

async fn drive(
    mut socket: Socket,
    session: &mut ClientSession,
    commands: &mut mpsc::Receiver<Command>,
    show: &impl Fn(&str),
) -> Result<Exit, ClientError> {
    send_all(&mut socket, session.on_connected()).await?;
    let mut sync_deadline = None;
    loop {
        tokio::select! {
            msg = socket.next() => {
                let Some(msg) = msg else { return Ok(Exit::Disconnected) };
                let event = match decode(msg?) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(error = %e, "transport: undecodable server frame");
                        continue;
                    }
                };
                let outcome = session.handle_server_event(event);
                deliver(&mut socket, outcome, show).await?;
            }
            command = commands.recv() => {
                let Some(command) = command else { return Ok(Exit::Quit) };
                let ends = command.ends_session();
                let outcome = session.handle_command(command);
                deliver(&mut socket, outcome, show).await?;
                if ends {
                    socket.close(None).await?;
                    return Ok(Exit::Quit);
                }
            }
            () = wait_until(sync_deadline) => {
                let outcome = session.abandon_sync();
                deliver(&mut socket, outcome, show).await?;
            }
        }
        sync_deadline = next_sync_deadline(session.is_syncing(), sync_deadline, Instant::now());
    }
}

/// Deadline for the outstanding sync: kept while syncing, started when a
/// sync begins, cleared once it ends.
fn next_sync_deadline(syncing: bool, current: Option<Instant>, now: Instant) -> Option<Instant> {
    if syncing { current.or(Some(now + SYNC_TIMEOUT)) } else { None }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Decode one websocket message; control frames yield `None`.
fn decode(msg: Message) -> Result<Option<ServerEvent>, ClientError> {
    let envelope = match msg {
        Message::Text(text) => frames::decode_json(text.as_str())?,
        Message::Binary(bytes) => frames::decode_binary(&bytes)?,
        _ => return Ok(None),
    };
    let event = ServerEvent::try_from(&envelope)?;
    debug!(event = event.name(), "transport: recv");
    Ok(Some(event))
}

async fn deliver(socket: &mut Socket, outcome: Outcome, show: &impl Fn(&str)) -> Result<(), ClientError> {
    for notice in &outcome.notices {
        show(notice);
    }
    send_all(socket, outcome.send).await
}

async fn send_all(socket: &mut Socket, events: Vec<ClientEvent>) -> Result<(), ClientError> {
    for event in events {
        debug!(event = event.name(), "transport: send");
        let text = frames::encode_json(&event.to_envelope()?)?;
        socket.send(Message::Text(text.into())).await?;
    }
    Ok(())
}
