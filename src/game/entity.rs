//! Enemy and bullet construction with per-type stat tables

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GameError;

/// Damage dealt by every player bullet
pub const BULLET_DAMAGE: f32 = 25.0;

/// Enemy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Shambles straight at the nearest player
    Zombie,
    /// Slower but hits much harder
    Heartbreaker,
}

impl EnemyKind {
    /// Parse a type tag, rejecting unrecognized values
    pub fn parse(tag: &str) -> Result<Self, GameError> {
        match tag {
            "zombie" => Ok(Self::Zombie),
            "heartbreaker" => Ok(Self::Heartbreaker),
            other => Err(GameError::UnsupportedEnemy(other.to_string())),
        }
    }
}

/// Static per-variant enemy stats
#[derive(Debug, Clone, Copy)]
pub struct EnemyStats {
    pub max_health: f32,
    /// Movement per tick (units)
    pub speed: f32,
    /// Damage per tick while in contact range
    pub damage: f32,
    pub color: &'static str,
    pub emoji: &'static str,
}

impl EnemyStats {
    pub fn for_kind(kind: EnemyKind) -> Self {
        match kind {
            EnemyKind::Zombie => Self {
                max_health: 30.0,
                speed: 1.2,
                damage: 0.5,
                color: "#7fb069",
                emoji: "🧟",
            },
            EnemyKind::Heartbreaker => Self {
                max_health: 60.0,
                speed: 0.8,
                damage: 1.5,
                color: "#d64570",
                emoji: "💔",
            },
        }
    }
}

/// A live enemy in a room
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: Uuid,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    pub damage: f32,
}

impl Enemy {
    pub fn new(kind: EnemyKind, x: f32, y: f32) -> Self {
        let stats = EnemyStats::for_kind(kind);
        Self {
            id: Uuid::new_v4(),
            kind,
            x,
            y,
            health: stats.max_health,
            max_health: stats.max_health,
            speed: stats.speed,
            damage: stats.damage,
        }
    }
}

/// Construct an enemy from a dynamic type tag
pub fn create_enemy(kind: &str, x: f32, y: f32) -> Result<Enemy, GameError> {
    Ok(Enemy::new(EnemyKind::parse(kind)?, x, y))
}

/// A live bullet in a room
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    /// Velocity in units per tick
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub color: String,
}

impl Bullet {
    pub fn new(owner_id: Uuid, x: f32, y: f32, vx: f32, vy: f32, color: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            x,
            y,
            vx,
            vy,
            damage: BULLET_DAMAGE,
            color: color.to_string(),
        }
    }
}
