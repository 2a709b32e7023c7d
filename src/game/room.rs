//! Room state and the process-wide room registry

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use super::entity::{Bullet, Enemy};
use super::map::{MapCatalog, MapConfig};
use super::GameError;

/// Game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Cooperative survival against escalating enemy waves
    CoopWaves,
    /// Head-to-head duel
    Pvp1v1,
}

/// Room lifecycle status; transitions are monotonic
/// (waiting -> playing -> finished, no regressions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

pub const MAX_PLAYERS: usize = 2;
pub const PLAYER_MAX_HEALTH: f32 = 100.0;

/// Distinguishing colors assigned by spawn slot (host, guest)
pub const PLAYER_COLORS: [&str; MAX_PLAYERS] = ["#ff6b9d", "#6bc5ff"];

/// A player occupying a room slot (authoritative)
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub score: u32,
    pub alive: bool,
    pub color: String,
}

impl RoomPlayer {
    fn new(id: Uuid, name: &str, x: f32, y: f32, color: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            x,
            y,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            score: 0,
            alive: true,
            color: color.to_string(),
        }
    }
}

/// A bounded two-player session
pub struct Room {
    pub id: Uuid,
    pub code: String,
    pub host_id: Uuid,
    pub mode: GameMode,
    pub map_id: String,
    pub status: RoomStatus,
    /// Current wave number; only ever increases
    pub wave: u32,
    pub players: Vec<RoomPlayer>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub rng: ChaCha8Rng,
    pub created_at: DateTime<Utc>,
    /// Set when the room enters `finished`; drives registry eviction
    pub finished_at: Option<Instant>,
}

impl Room {
    fn new(code: String, host_id: Uuid, mode: GameMode, map: &MapConfig, host_name: &str) -> Self {
        let spawn = map.spawn_points[0];
        Self {
            id: Uuid::new_v4(),
            code,
            host_id,
            mode,
            map_id: map.id.clone(),
            status: RoomStatus::Waiting,
            wave: 1,
            players: vec![RoomPlayer::new(
                host_id,
                host_name,
                spawn.x,
                spawn.y,
                PLAYER_COLORS[0],
            )],
            enemies: Vec::new(),
            bullets: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(rand::random()),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Add a player at the next spawn slot
    pub fn add_player(
        &mut self,
        id: Uuid,
        name: &str,
        map: &MapConfig,
    ) -> Result<&RoomPlayer, GameError> {
        if self.status != RoomStatus::Waiting {
            return Err(GameError::GameInProgress);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }
        let slot = self.players.len();
        let spawn = map.spawn_points[slot];
        self.players.push(RoomPlayer::new(
            id,
            name,
            spawn.x,
            spawn.y,
            PLAYER_COLORS[slot],
        ));
        Ok(&self.players[slot])
    }

    pub fn player(&self, id: Uuid) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut RoomPlayer> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Remove a player; returns false if they were not in the room
    pub fn remove_player(&mut self, id: Uuid) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        self.players.len() < before
    }

    /// Connection ids of all current occupants
    pub fn occupant_ids(&self) -> Vec<Uuid> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Move the room to `finished` and stamp the eviction clock
    pub fn finish(&mut self) {
        if self.status != RoomStatus::Finished {
            self.status = RoomStatus::Finished;
            self.finished_at = Some(Instant::now());
        }
    }
}

/// Summary row for the waiting-room listing
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub code: String,
    pub players: usize,
    pub mode: GameMode,
    pub map_name: String,
}

pub type SharedRoom = Arc<Mutex<Room>>;

pub const CODE_LEN: usize = 4;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Process-wide mapping from room code to room; exclusively owns
/// room lifetime
pub struct RoomRegistry {
    rooms: DashMap<String, SharedRoom>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Create a room with a freshly generated unique code.
    ///
    /// The alphabet is small enough that collisions with live codes
    /// happen in practice; retry until the code is unclaimed.
    pub fn create_room(
        &self,
        host_id: Uuid,
        mode: GameMode,
        map: &MapConfig,
        host_name: &str,
    ) -> (String, SharedRoom) {
        loop {
            let code = generate_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    let room = Arc::new(Mutex::new(Room::new(
                        code.clone(),
                        host_id,
                        mode,
                        map,
                        host_name,
                    )));
                    entry.insert(room.clone());
                    info!(code = %code, host_id = %host_id, "Room created");
                    return (code, room);
                }
            }
        }
    }

    pub fn find(&self, code: &str) -> Option<SharedRoom> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    pub fn remove(&self, code: &str) -> Option<SharedRoom> {
        self.rooms.remove(code).map(|(_, room)| room)
    }

    /// Clone the current room set so callers can iterate without
    /// holding any room's lock across the whole pass
    pub fn snapshot(&self) -> Vec<(String, SharedRoom)> {
        self.rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Summaries of rooms still accepting players
    pub fn waiting_rooms(&self, maps: &MapCatalog) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for (code, room) in self.snapshot() {
            let room = room.lock();
            if room.status != RoomStatus::Waiting {
                continue;
            }
            let map_name = maps
                .get(&room.map_id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| room.map_id.clone());
            summaries.push(RoomSummary {
                code,
                players: room.players.len(),
                mode: room.mode,
                map_name,
            });
        }
        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        summaries
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|(_, room)| room.lock().players.len())
            .sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MapCatalog {
        MapCatalog::new()
    }

    fn cafe(catalog: &MapCatalog) -> &MapConfig {
        catalog.get("first_date_cafe").unwrap()
    }

    #[test]
    fn codes_are_four_uppercase_alphanumerics() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn codes_are_unique_among_live_rooms() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..50 {
            let (code, _) = registry.create_room(
                Uuid::new_v4(),
                GameMode::CoopWaves,
                cafe(&catalog),
                "host",
            );
            assert!(codes.insert(code), "duplicate live room code");
        }
    }

    #[test]
    fn host_takes_spawn_slot_zero() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let host = Uuid::new_v4();
        let (_, room) = registry.create_room(host, GameMode::CoopWaves, cafe(&catalog), "Ami");
        let room = room.lock();
        assert_eq!(room.host_id, host);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].x, 100.0);
        assert_eq!(room.players[0].color, PLAYER_COLORS[0]);
    }

    #[test]
    fn third_join_is_rejected_and_membership_stays_at_two() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let map = cafe(&catalog);
        let (_, room) = registry.create_room(Uuid::new_v4(), GameMode::CoopWaves, map, "host");
        let mut room = room.lock();
        room.add_player(Uuid::new_v4(), "guest", map).unwrap();
        let err = room.add_player(Uuid::new_v4(), "extra", map).unwrap_err();
        assert_eq!(err.code(), "room_full");
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn join_after_start_is_rejected() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let map = cafe(&catalog);
        let (_, room) = registry.create_room(Uuid::new_v4(), GameMode::CoopWaves, map, "host");
        let mut room = room.lock();
        room.status = RoomStatus::Playing;
        let err = room.add_player(Uuid::new_v4(), "late", map).unwrap_err();
        assert_eq!(err.code(), "game_in_progress");
    }

    #[test]
    fn waiting_listing_excludes_started_rooms() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let map = cafe(&catalog);
        let (waiting_code, _) =
            registry.create_room(Uuid::new_v4(), GameMode::CoopWaves, map, "a");
        let (_, playing) = registry.create_room(Uuid::new_v4(), GameMode::Pvp1v1, map, "b");
        playing.lock().status = RoomStatus::Playing;

        let summaries = registry.waiting_rooms(&catalog);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].code, waiting_code);
        assert_eq!(summaries[0].players, 1);
        assert_eq!(summaries[0].map_name, "First Date Café");
    }

    #[test]
    fn removed_room_is_unfindable() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let (code, _) =
            registry.create_room(Uuid::new_v4(), GameMode::CoopWaves, cafe(&catalog), "host");
        assert!(registry.find(&code).is_some());
        registry.remove(&code);
        assert!(registry.find(&code).is_none());
    }

    #[test]
    fn finish_is_monotonic() {
        let catalog = catalog();
        let registry = RoomRegistry::new();
        let (_, room) =
            registry.create_room(Uuid::new_v4(), GameMode::CoopWaves, cafe(&catalog), "host");
        let mut room = room.lock();
        room.status = RoomStatus::Playing;
        room.finish();
        let stamped = room.finished_at;
        assert!(stamped.is_some());
        room.finish();
        assert_eq!(room.finished_at, stamped);
    }
}
