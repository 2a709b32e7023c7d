//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entity::{Bullet, Enemy, EnemyKind, EnemyStats};
use crate::game::map::MapConfig;
use crate::game::room::{GameMode, Room, RoomPlayer, RoomStatus};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Create a new room and become its host
    CreateRoom {
        mode: GameMode,
        map_id: String,
        player_name: String,
    },

    /// Join an existing room by code
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    /// Start the game (host only)
    StartGame,

    /// Report the player's new position
    PlayerMove { x: f32, y: f32 },

    /// Fire a bullet with the given velocity vector (units per tick)
    PlayerShoot { vx: f32, vy: f32 },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { conn_id: Uuid, server_time: u64 },

    /// Room created; sent to the host only
    RoomCreated {
        code: String,
        room: RoomSnapshot,
        map: MapConfig,
    },

    /// A player joined the room (broadcast to all occupants)
    PlayerJoined {
        room: RoomSnapshot,
        map: MapConfig,
        player: PlayerSnapshot,
    },

    /// The host started the game
    GameStarted { wave: u32, room: RoomSnapshot },

    /// Another player moved (broadcast, excludes the mover)
    PlayerMoved { player_id: Uuid, x: f32, y: f32 },

    /// A bullet was fired (broadcast, includes the shooter)
    BulletFired { bullet: BulletSnapshot },

    /// Full state snapshot, sent every tick while playing
    GameUpdate {
        wave: u32,
        players: Vec<PlayerSnapshot>,
        enemies: Vec<EnemySnapshot>,
        bullets: Vec<BulletSnapshot>,
    },

    /// A co-op wave was cleared; `wave` is the new wave number
    WaveComplete { wave: u32 },

    /// The game ended
    GameComplete {
        winner_id: Option<Uuid>,
        scores: Vec<FinalScore>,
    },

    /// A player left the room
    PlayerLeft { player_id: Uuid },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Room state for join/create confirmations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: String,
    pub host_id: Uuid,
    pub mode: GameMode,
    pub map_id: String,
    pub status: RoomStatus,
    pub wave: u32,
    pub players: Vec<PlayerSnapshot>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
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

/// Enemy state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: Uuid,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub color: String,
    pub emoji: String,
}

/// Bullet state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: String,
}

/// Final score line for game completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalScore {
    pub player_id: Uuid,
    pub name: String,
    pub score: u32,
}

impl From<&RoomPlayer> for PlayerSnapshot {
    fn from(p: &RoomPlayer) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            x: p.x,
            y: p.y,
            health: p.health,
            max_health: p.max_health,
            score: p.score,
            alive: p.alive,
            color: p.color.clone(),
        }
    }
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        let stats = EnemyStats::for_kind(e.kind);
        Self {
            id: e.id,
            kind: e.kind,
            x: e.x,
            y: e.y,
            health: e.health,
            max_health: e.max_health,
            color: stats.color.to_string(),
            emoji: stats.emoji.to_string(),
        }
    }
}

impl From<&Bullet> for BulletSnapshot {
    fn from(b: &Bullet) -> Self {
        Self {
            id: b.id,
            owner_id: b.owner_id,
            x: b.x,
            y: b.y,
            vx: b.vx,
            vy: b.vy,
            color: b.color.clone(),
        }
    }
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            host_id: room.host_id,
            mode: room.mode,
            map_id: room.map_id.clone(),
            status: room.status,
            wave: room.wave,
            players: room.players.iter().map(PlayerSnapshot::from).collect(),
        }
    }
}
