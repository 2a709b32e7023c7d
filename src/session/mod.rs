//! Per-connection session tracking and outbound message delivery

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::RoomRegistry;
use crate::ws::protocol::ServerMsg;

/// Ephemeral per-connection record, created on connect and destroyed
/// on disconnect
#[derive(Debug)]
pub struct Session {
    pub conn_id: Uuid,
    pub name: String,
    /// Code of the room this connection occupies, if any
    pub room_code: Option<String>,
    /// Outbox drained by the connection's writer task; sending never
    /// blocks the caller
    tx: mpsc::UnboundedSender<ServerMsg>,
}

/// Process-wide mapping from connection identity to session state
pub struct SessionDirectory {
    sessions: DashMap<Uuid, Session>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a session with a generated default display name
    pub fn on_connect(&self, conn_id: Uuid, tx: mpsc::UnboundedSender<ServerMsg>) -> String {
        let name = format!("Player_{}", &conn_id.to_string()[..8]);
        self.sessions.insert(
            conn_id,
            Session {
                conn_id,
                name: name.clone(),
                room_code: None,
                tx,
            },
        );
        debug!(conn_id = %conn_id, name = %name, "Session created");
        name
    }

    /// Tear down a disconnected session: leave the current room,
    /// notify the remaining occupant, and drop empty rooms.
    /// A missing session is a no-op, not an error.
    pub fn on_disconnect(&self, conn_id: Uuid, rooms: &RoomRegistry) {
        let Some((_, session)) = self.sessions.remove(&conn_id) else {
            return;
        };
        if let Some(code) = session.room_code {
            self.detach_from(&code, conn_id, rooms);
        }
    }

    /// Detach a connection from its current room while the session
    /// stays alive (a connection re-homing into another room). No-op
    /// for a roomless session.
    pub fn leave_room(&self, conn_id: Uuid, rooms: &RoomRegistry) {
        let Some(code) = self.room_of(conn_id) else {
            return;
        };
        self.set_room(conn_id, None);
        self.detach_from(&code, conn_id, rooms);
    }

    fn detach_from(&self, code: &str, conn_id: Uuid, rooms: &RoomRegistry) {
        let Some(room) = rooms.find(code) else {
            return;
        };

        let remaining = {
            let mut room = room.lock();
            if !room.remove_player(conn_id) {
                return;
            }
            room.occupant_ids()
        };

        if remaining.is_empty() {
            rooms.remove(code);
            info!(code = %code, "Room removed, last player left");
        } else {
            self.send_to_many(
                &remaining,
                &ServerMsg::PlayerLeft { player_id: conn_id },
                None,
            );
            info!(conn_id = %conn_id, code = %code, "Player left room");
        }
    }

    pub fn set_name(&self, conn_id: Uuid, name: &str) {
        if let Some(mut session) = self.sessions.get_mut(&conn_id) {
            session.name = name.to_string();
        }
    }

    pub fn set_room(&self, conn_id: Uuid, code: Option<String>) {
        if let Some(mut session) = self.sessions.get_mut(&conn_id) {
            session.room_code = code;
        }
    }

    pub fn room_of(&self, conn_id: Uuid) -> Option<String> {
        self.sessions
            .get(&conn_id)
            .and_then(|s| s.room_code.clone())
    }

    /// Queue a message for one connection; silently dropped if the
    /// session is gone or its writer has stopped
    pub fn send_to(&self, conn_id: Uuid, msg: &ServerMsg) {
        if let Some(session) = self.sessions.get(&conn_id) {
            let _ = session.tx.send(msg.clone());
        }
    }

    /// Queue a message for a set of connections, optionally skipping one
    /// (used for broadcasts that exclude the sender)
    pub fn send_to_many(&self, conn_ids: &[Uuid], msg: &ServerMsg, exclude: Option<Uuid>) {
        for &conn_id in conn_ids {
            if Some(conn_id) == exclude {
                continue;
            }
            self.send_to(conn_id, msg);
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}
