//! Room lifecycle, combat simulation, and event routing

pub mod entity;
pub mod events;
pub mod map;
pub mod room;
pub mod scheduler;
pub mod simulation;

pub use room::{Room, RoomRegistry};

use thiserror::Error;

/// Errors reported back to the originating connection as structured
/// error events; none of these is fatal to the process.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Unknown map: {0}")]
    InvalidMap(String),

    #[error("Unsupported enemy type: {0}")]
    UnsupportedEnemy(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Not currently in a room")]
    NotInRoom,

    #[error("Room is full")]
    RoomFull,

    #[error("Game already in progress")]
    GameInProgress,

    #[error("Only the host can start the game")]
    NotHost,

    #[error("Not enough players to start")]
    InsufficientPlayers,
}

impl GameError {
    /// Stable wire code for error events
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidMap(_) => "invalid_map",
            GameError::UnsupportedEnemy(_) => "unsupported_enemy_type",
            GameError::RoomNotFound(_) => "room_not_found",
            GameError::NotInRoom => "not_in_room",
            GameError::RoomFull => "room_full",
            GameError::GameInProgress => "game_in_progress",
            GameError::NotHost => "not_host",
            GameError::InsufficientPlayers => "insufficient_players",
        }
    }
}
