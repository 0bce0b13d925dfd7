//! Client session: wires the canvas engine to the room relay.
//!
//! DESIGN
//! ======
//! The session is transport-agnostic. Inbound server events and typed
//! commands go in; an [`Outcome`] comes out with the client events to send
//! and the lines to show the user. Local edits are applied to the engine
//! before they are sent, and the relay never echoes them back, so each edit
//! lands once per replica.
//!
//! On entering a room (created or joined) the session asks the room for a
//! canvas snapshot; when a peer asks us, we answer with ours. Until the
//! snapshot (or `canvas-sync-unavailable`) arrives, canvas commands are held
//! and replayed on top of the synced state, so an edit made during the
//! handshake is not wiped by the incoming snapshot.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use canvas::engine::{Action, EngineCore};
use canvas::store::{RemoteChange, Snapshot, StoreError};
use frames::{
    ClientEvent, DeleteObject, ObjectEvent, ParticipantInfo, RoomCode, RoomRequest, RoomSignal, RoomState,
    SendMessage, ServerEvent, SnapshotOffer,
};
use tracing::{debug, info, warn};

use crate::repl::{Command, HELP};

/// What the host should do after feeding the session.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub send: Vec<ClientEvent>,
    pub notices: Vec<String>,
}

impl Outcome {
    fn notice(line: impl Into<String>) -> Self {
        Self { send: Vec::new(), notices: vec![line.into()] }
    }

    fn send(events: Vec<ClientEvent>) -> Self {
        Self { send: events, notices: Vec::new() }
    }

    fn extend(&mut self, other: Outcome) {
        self.send.extend(other.send);
        self.notices.extend(other.notices);
    }
}

pub struct ClientSession {
    pub engine: EngineCore,
    room: RoomCode,
    /// Create the room on first connect instead of joining it.
    create: bool,
    entered: bool,
    /// A sync request is outstanding.
    syncing: bool,
    /// Canvas commands typed while syncing.
    held: Vec<Command>,
    client_id: Option<String>,
}

impl ClientSession {
    #[must_use]
    pub fn new(room: RoomCode, create: bool) -> Self {
        Self {
            engine: EngineCore::new(),
            room,
            create,
            entered: false,
            syncing: false,
            held: Vec::new(),
            client_id: None,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    /// Events to send after (re)connecting. A reconnect always joins: the
    /// room exists once we have been in it.
    pub fn on_connected(&mut self) -> Vec<ClientEvent> {
        self.entered = false;
        let request = RoomRequest { room_code: self.room.to_string(), user_id: None };
        if self.create {
            vec![ClientEvent::CreateRoom(request)]
        } else {
            vec![ClientEvent::JoinRoom(request)]
        }
    }

    // --- Inbound ---

    pub fn handle_server_event(&mut self, event: ServerEvent) -> Outcome {
        match event {
            ServerEvent::Connected(connected) => {
                info!(client_id = %connected.client_id, "session: connected");
                self.client_id = Some(connected.client_id);
                Outcome::default()
            }
            ServerEvent::CreatedRoom(state) | ServerEvent::JoinedRoom(state) => self.entered_room(&state),
            ServerEvent::RoomUsers(users) => {
                Outcome::notice(format!("in {}: {}", users.room_code, names(&users.participants)))
            }
            ServerEvent::NewMessage(msg) => Outcome::notice(format!("<{}> {}", msg.sender.name, msg.message.content)),
            ServerEvent::AddCanvasObject(relay) => self.apply_remote("add", RemoteChange::add(relay.object)),
            ServerEvent::UpdateCanvasObject(relay) => self.apply_remote("update", RemoteChange::update(relay.object)),
            ServerEvent::DeleteCanvasObject(relay) => self.apply_remote("delete", Ok(RemoteChange::Delete(relay.id))),
            ServerEvent::ResetCanvas(_) => self.apply_remote("reset", Ok(RemoteChange::Reset)),
            ServerEvent::Undo(_) => self.apply_remote("undo", Ok(RemoteChange::Undo)),
            ServerEvent::Redo(_) => self.apply_remote("redo", Ok(RemoteChange::Redo)),
            ServerEvent::CanvasSyncRequest(request) => self.offer_snapshot(request.requester),
            ServerEvent::CanvasSnapshot(delivery) => self.load_snapshot(delivery.snapshot),
            ServerEvent::CanvasSyncUnavailable(_) => {
                if !self.syncing {
                    return Outcome::default();
                }
                debug!("session: no peer to sync from; keeping local canvas");
                self.finish_sync()
            }
            ServerEvent::RoomError(err) | ServerEvent::Error(err) => {
                warn!(code = %err.code, message = %err.message, "session: server error");
                Outcome::notice(format!("error [{}]: {}", err.code, err.message))
            }
        }
    }

    fn entered_room(&mut self, state: &RoomState) -> Outcome {
        let mut outcome =
            Outcome::notice(format!("room {} ({})", state.room.room_code, names(&state.participants)));
        if !self.entered {
            self.entered = true;
            self.create = false;
            info!(room_code = %state.room.room_code, "session: entered room");
            outcome.send.push(ClientEvent::RequestCanvasSync(self.signal()));
            self.syncing = true;
        }
        outcome
    }

    fn load_snapshot(&mut self, snapshot: serde_json::Value) -> Outcome {
        if !self.syncing {
            debug!("session: unrequested canvas snapshot ignored");
            return Outcome::default();
        }
        let mut outcome = self.apply_remote("snapshot", Snapshot::from_value(snapshot).map(RemoteChange::Snapshot));
        if outcome.notices.is_empty() {
            outcome = Outcome::notice(format!("synced {} object(s) from peer", self.engine.store.len()));
        }
        outcome.extend(self.finish_sync());
        outcome
    }

    /// Give up waiting for a snapshot and keep the local canvas.
    pub fn abandon_sync(&mut self) -> Outcome {
        if !self.syncing {
            return Outcome::default();
        }
        warn!("session: canvas sync timed out");
        let mut outcome = Outcome::notice("canvas sync timed out; keeping local canvas");
        outcome.extend(self.finish_sync());
        outcome
    }

    /// Leave the syncing state and replay held commands in order.
    fn finish_sync(&mut self) -> Outcome {
        self.syncing = false;
        let mut outcome = Outcome::default();
        for command in std::mem::take(&mut self.held) {
            outcome.extend(self.handle_command(command));
        }
        outcome
    }

    fn apply_remote(&mut self, kind: &'static str, change: Result<RemoteChange, StoreError>) -> Outcome {
        match change {
            Ok(change) => {
                if !self.engine.apply_remote(change) {
                    debug!(kind, "session: remote change had no effect");
                }
                Outcome::default()
            }
            Err(e) => {
                warn!(kind, error = %e, "session: dropped malformed canvas event");
                Outcome::notice(format!("ignored malformed {kind} from peer"))
            }
        }
    }

    fn offer_snapshot(&self, requester: String) -> Outcome {
        match self.engine.store.snapshot().to_value() {
            Ok(snapshot) => {
                debug!(%requester, "session: sending canvas snapshot");
                Outcome::send(vec![ClientEvent::CanvasSnapshot(SnapshotOffer {
                    room_code: self.room.to_string(),
                    target: requester,
                    snapshot,
                })])
            }
            Err(e) => {
                warn!(error = %e, "session: failed to encode snapshot");
                Outcome::default()
            }
        }
    }

    // --- Local ---

    pub fn handle_command(&mut self, command: Command) -> Outcome {
        if self.syncing && command.touches_canvas() {
            self.held.push(command);
            return if self.held.len() == 1 {
                Outcome::notice("waiting for canvas sync; edits are queued")
            } else {
                Outcome::default()
            };
        }
        let engine = &mut self.engine;
        let actions = match command {
            Command::Tool(tool) => {
                engine.set_tool(tool);
                return Outcome::default();
            }
            Command::Down(at) => engine.on_pointer_down(at),
            Command::Move(at) => engine.on_pointer_move(at),
            Command::Up => engine.on_pointer_up(),
            Command::Draw { from, to } => {
                let mut actions = engine.on_pointer_down(from);
                actions.extend(engine.on_pointer_move(to));
                actions.extend(engine.on_pointer_up());
                actions
            }
            Command::Select(id) => {
                engine.store.select(id);
                return Outcome::default();
            }
            Command::Patch { id, patch } => engine.update_object(&id, patch),
            Command::Delete => engine.delete_selected(),
            Command::Key { key, mods } => engine.on_key_down(&key, mods),
            Command::Undo => engine.undo(),
            Command::Redo => engine.redo(),
            Command::Reset => engine.reset(),
            Command::Say(content) => {
                return Outcome::send(vec![ClientEvent::SendMessage(SendMessage {
                    room_code: self.room.to_string(),
                    user_id: None,
                    content,
                })]);
            }
            Command::List => return self.listing(),
            Command::Help => return Outcome::notice(HELP),
            Command::Leave => {
                self.entered = false;
                return Outcome::send(vec![ClientEvent::LeaveRoom(RoomRequest {
                    room_code: self.room.to_string(),
                    user_id: None,
                })]);
            }
            Command::Quit => return Outcome::default(),
        };
        self.relay(actions)
    }

    /// Convert local actions into relay events.
    fn relay(&self, actions: Vec<Action>) -> Outcome {
        let mut outcome = Outcome::default();
        for action in actions {
            match self.to_event(action) {
                Ok(event) => outcome.send.push(event),
                Err(e) => {
                    warn!(error = %e, "session: failed to encode local edit");
                    outcome.notices.push(format!("edit not sent: {e}"));
                }
            }
        }
        outcome
    }

    fn to_event(&self, action: Action) -> Result<ClientEvent, serde_json::Error> {
        let room = self.room.to_string();
        Ok(match action {
            Action::ObjectAdded(object) => {
                ClientEvent::AddCanvasObject(ObjectEvent { room, object: serde_json::to_value(object)? })
            }
            Action::ObjectUpdated(update) => {
                ClientEvent::UpdateCanvasObject(ObjectEvent { room, object: serde_json::to_value(update)? })
            }
            Action::ObjectDeleted { id } => ClientEvent::DeleteCanvasObject(DeleteObject { room, id }),
            Action::CanvasReset => ClientEvent::ResetCanvas(self.signal()),
            Action::Undo => ClientEvent::Undo(self.signal()),
            Action::Redo => ClientEvent::Redo(self.signal()),
        })
    }

    fn listing(&self) -> Outcome {
        let store = &self.engine.store;
        let mut notices: Vec<String> = store
            .objects()
            .iter()
            .map(|o| {
                let marker = if store.selected() == Some(o.id()) { "*" } else { " " };
                format!("{marker} {} {}", o.kind(), o.id())
            })
            .collect();
        notices.push(format!(
            "{} object(s); undo {}, redo {}",
            store.len(),
            if store.can_undo() { "yes" } else { "no" },
            if store.can_redo() { "yes" } else { "no" }
        ));
        Outcome { send: Vec::new(), notices }
    }

    fn signal(&self) -> RoomSignal {
        RoomSignal { room_code: self.room.to_string() }
    }
}

fn names(participants: &[ParticipantInfo]) -> String {
    participants.iter().map(|p| p.user.name.as_str()).collect::<Vec<_>>().join(", ")
}
