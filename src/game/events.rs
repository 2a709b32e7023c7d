//! Event router - maps inbound client events to room mutations and
//! outbound broadcasts

use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::ws::protocol::{BulletSnapshot, ClientMsg, PlayerSnapshot, RoomSnapshot, ServerMsg};

use super::entity::Bullet;
use super::room::{GameMode, RoomStatus};
use super::{simulation, GameError};

/// Route one inbound client event. Failures are reported back to the
/// originating connection as an error event and never propagate.
pub fn handle_event(state: &AppState, conn_id: Uuid, msg: ClientMsg) {
    if let Err(err) = dispatch(state, conn_id, msg) {
        warn!(conn_id = %conn_id, error = %err, "Event rejected");
        state.sessions.send_to(
            conn_id,
            &ServerMsg::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        );
    }
}

fn dispatch(state: &AppState, conn_id: Uuid, msg: ClientMsg) -> Result<(), GameError> {
    match msg {
        ClientMsg::CreateRoom {
            mode,
            map_id,
            player_name,
        } => create_room(state, conn_id, mode, &map_id, &player_name),
        ClientMsg::JoinRoom {
            room_code,
            player_name,
        } => join_room(state, conn_id, &room_code, &player_name),
        ClientMsg::StartGame => start_game(state, conn_id),
        ClientMsg::PlayerMove { x, y } => player_move(state, conn_id, x, y),
        ClientMsg::PlayerShoot { vx, vy } => player_shoot(state, conn_id, vx, vy),
        ClientMsg::Ping { t } => {
            state.sessions.send_to(conn_id, &ServerMsg::Pong { t });
            Ok(())
        }
    }
}

fn create_room(
    state: &AppState,
    conn_id: Uuid,
    mode: GameMode,
    map_id: &str,
    player_name: &str,
) -> Result<(), GameError> {
    let map = state
        .maps
        .get(map_id)
        .ok_or_else(|| GameError::InvalidMap(map_id.to_string()))?;

    // Re-homing: drop out of any room this connection still occupies
    // so no ghost player keeps the old room alive
    state.sessions.leave_room(conn_id, &state.rooms);

    let (code, room) = state.rooms.create_room(conn_id, mode, map, player_name);
    state.sessions.set_name(conn_id, player_name);
    state.sessions.set_room(conn_id, Some(code.clone()));

    let snapshot = RoomSnapshot::from(&*room.lock());
    state.sessions.send_to(
        conn_id,
        &ServerMsg::RoomCreated {
            code,
            room: snapshot,
            map: map.clone(),
        },
    );
    Ok(())
}

fn join_room(
    state: &AppState,
    conn_id: Uuid,
    room_code: &str,
    player_name: &str,
) -> Result<(), GameError> {
    let code = room_code.trim().to_ascii_uppercase();

    // Leave the previous room first; joining one's own room is then a
    // plain not-found once the empty room is dropped
    state.sessions.leave_room(conn_id, &state.rooms);

    let room = state
        .rooms
        .find(&code)
        .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;

    let (snapshot, map, player) = {
        let mut room = room.lock();
        let map = state
            .maps
            .get(&room.map_id)
            .ok_or_else(|| GameError::InvalidMap(room.map_id.clone()))?
            .clone();
        let player = PlayerSnapshot::from(room.add_player(conn_id, player_name, &map)?);
        (RoomSnapshot::from(&*room), map, player)
    };

    state.sessions.set_name(conn_id, player_name);
    state.sessions.set_room(conn_id, Some(code.clone()));

    let occupants: Vec<Uuid> = snapshot.players.iter().map(|p| p.id).collect();
    state.sessions.send_to_many(
        &occupants,
        &ServerMsg::PlayerJoined {
            room: snapshot,
            map,
            player,
        },
        None,
    );
    info!(conn_id = %conn_id, code = %code, "Player joined room");
    Ok(())
}

fn start_game(state: &AppState, conn_id: Uuid) -> Result<(), GameError> {
    let code = state
        .sessions
        .room_of(conn_id)
        .ok_or(GameError::NotInRoom)?;
    let room = state
        .rooms
        .find(&code)
        .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;

    let (msg, occupants) = {
        let mut room = room.lock();
        if room.host_id != conn_id {
            return Err(GameError::NotHost);
        }
        if room.status != RoomStatus::Waiting {
            return Err(GameError::GameInProgress);
        }
        // Co-op is playable solo; a duel needs both slots filled
        let min_players = match room.mode {
            GameMode::CoopWaves => 1,
            GameMode::Pvp1v1 => 2,
        };
        if room.players.len() < min_players {
            return Err(GameError::InsufficientPlayers);
        }

        let map = state
            .maps
            .get(&room.map_id)
            .ok_or_else(|| GameError::InvalidMap(room.map_id.clone()))?;

        room.status = RoomStatus::Playing;
        room.wave = 1;
        if room.mode == GameMode::CoopWaves {
            simulation::spawn_wave(&mut room, map);
        }

        (
            ServerMsg::GameStarted {
                wave: room.wave,
                room: RoomSnapshot::from(&*room),
            },
            room.occupant_ids(),
        )
    };

    state.sessions.send_to_many(&occupants, &msg, None);
    info!(conn_id = %conn_id, code = %code, "Game started");
    Ok(())
}

fn player_move(state: &AppState, conn_id: Uuid, x: f32, y: f32) -> Result<(), GameError> {
    // Silently ignored unless the sender is a living player in a room
    let Some(code) = state.sessions.room_of(conn_id) else {
        return Ok(());
    };
    let Some(room) = state.rooms.find(&code) else {
        return Ok(());
    };

    let occupants = {
        let mut room = room.lock();
        let Some(player) = room.player_mut(conn_id) else {
            return Ok(());
        };
        if !player.alive {
            return Ok(());
        }
        player.x = x;
        player.y = y;
        room.occupant_ids()
    };

    // The mover already knows its own position
    state.sessions.send_to_many(
        &occupants,
        &ServerMsg::PlayerMoved {
            player_id: conn_id,
            x,
            y,
        },
        Some(conn_id),
    );
    Ok(())
}

fn player_shoot(state: &AppState, conn_id: Uuid, vx: f32, vy: f32) -> Result<(), GameError> {
    let Some(code) = state.sessions.room_of(conn_id) else {
        return Ok(());
    };
    let Some(room) = state.rooms.find(&code) else {
        return Ok(());
    };

    let (bullet, occupants) = {
        let mut room = room.lock();
        // Only ticking rooms advance bullets; anything fired earlier
        // would pile up unprocessed
        if room.status != RoomStatus::Playing {
            return Ok(());
        }
        let Some(player) = room.player(conn_id) else {
            return Ok(());
        };
        if !player.alive {
            return Ok(());
        }
        let bullet = Bullet::new(conn_id, player.x, player.y, vx, vy, &player.color);
        let snapshot = BulletSnapshot::from(&bullet);
        room.bullets.push(bullet);
        (snapshot, room.occupant_ids())
    };

    // Shooter included, for confirmation and sound cues
    state
        .sessions
        .send_to_many(&occupants, &ServerMsg::BulletFired { bullet }, None);
    Ok(())
}
