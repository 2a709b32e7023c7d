//! Player statistics and game session records.
//!
//! This is the persistence boundary: the engine reports finished games
//! here and the query API reads from here. Records live in process
//! memory, keyed by player name.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::game::room::GameMode;
use crate::game::simulation::GameResult;

/// Durable per-player record
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStats {
    pub id: Uuid,
    pub player_name: String,
    pub wins: u32,
    pub losses: u32,
    pub total_rounds: u32,
    pub created_at: DateTime<Utc>,
}

impl PlayerStats {
    fn new(player_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_name: player_name.to_string(),
            wins: 0,
            losses: 0,
            total_rounds: 0,
            created_at: Utc::now(),
        }
    }
}

/// A completed game session
#[derive(Debug, Clone, Serialize)]
pub struct GameSessionRecord {
    pub id: Uuid,
    pub room_code: String,
    pub mode: GameMode,
    pub player_names: Vec<String>,
    pub scores: Vec<u32>,
    pub winner_name: Option<String>,
    pub rounds_played: u32,
    pub completed_at: DateTime<Utc>,
}

/// Leaderboard row, ranked by wins then win rate
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub wins: u32,
    pub win_rate: f32,
    pub total_games: u32,
}

const LEADERBOARD_SIZE: usize = 10;
const RECENT_SESSIONS: usize = 10;

/// Store for player statistics and completed sessions
pub struct StatsStore {
    players: DashMap<String, PlayerStats>,
    sessions: Mutex<Vec<GameSessionRecord>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Fetch a player record, creating it on first sight
    pub fn ensure_player(&self, player_name: &str) -> PlayerStats {
        self.players
            .entry(player_name.to_string())
            .or_insert_with(|| PlayerStats::new(player_name))
            .clone()
    }

    pub fn get_player(&self, id: Uuid) -> Option<PlayerStats> {
        self.players
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
    }

    pub fn all_players(&self) -> Vec<PlayerStats> {
        let mut players: Vec<PlayerStats> =
            self.players.iter().map(|e| e.value().clone()).collect();
        players.sort_by(|a, b| a.player_name.cmp(&b.player_name));
        players
    }

    /// Record a finished game: bump per-player win/loss counters and
    /// append a session record
    pub fn record_result(&self, result: &GameResult) {
        let winner_name = result
            .scores
            .iter()
            .find(|s| Some(s.player_id) == result.winner_id)
            .map(|s| s.name.clone());

        for score in &result.scores {
            let mut stats = self
                .players
                .entry(score.name.clone())
                .or_insert_with(|| PlayerStats::new(&score.name));
            if Some(score.player_id) == result.winner_id {
                stats.wins += 1;
            } else {
                stats.losses += 1;
            }
            stats.total_rounds += result.rounds;
        }

        self.sessions.lock().push(GameSessionRecord {
            id: Uuid::new_v4(),
            room_code: result.room_code.clone(),
            mode: result.mode,
            player_names: result.scores.iter().map(|s| s.name.clone()).collect(),
            scores: result.scores.iter().map(|s| s.score).collect(),
            winner_name,
            rounds_played: result.rounds,
            completed_at: Utc::now(),
        });
    }

    /// Top players by wins, then win rate
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|e| {
                let p = e.value();
                let total_games = p.wins + p.losses;
                let win_rate = p.wins as f32 / total_games.max(1) as f32 * 100.0;
                LeaderboardEntry {
                    player_name: p.player_name.clone(),
                    wins: p.wins,
                    win_rate: (win_rate * 10.0).round() / 10.0,
                    total_games,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.win_rate.total_cmp(&a.win_rate))
                .then(a.player_name.cmp(&b.player_name))
        });
        entries.truncate(LEADERBOARD_SIZE);
        entries
    }

    /// Most recent completed sessions, newest first
    pub fn recent_sessions(&self) -> Vec<GameSessionRecord> {
        let sessions = self.sessions.lock();
        sessions
            .iter()
            .rev()
            .take(RECENT_SESSIONS)
            .cloned()
            .collect()
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::FinalScore;

    fn result(winner: &str, scores: &[(&str, u32)]) -> GameResult {
        let lines: Vec<FinalScore> = scores
            .iter()
            .map(|(name, score)| FinalScore {
                player_id: Uuid::new_v4(),
                name: name.to_string(),
                score: *score,
            })
            .collect();
        let winner_id = lines.iter().find(|l| l.name == winner).map(|l| l.player_id);
        GameResult {
            room_code: "AB12".to_string(),
            mode: GameMode::CoopWaves,
            winner_id,
            scores: lines,
            rounds: 10,
        }
    }

    #[test]
    fn recording_updates_wins_losses_and_rounds() {
        let store = StatsStore::new();
        store.record_result(&result("Ami", &[("Ami", 120), ("Ben", 80)]));

        let ami = store.ensure_player("Ami");
        let ben = store.ensure_player("Ben");
        assert_eq!((ami.wins, ami.losses, ami.total_rounds), (1, 0, 10));
        assert_eq!((ben.wins, ben.losses, ben.total_rounds), (0, 1, 10));

        let sessions = store.recent_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].winner_name.as_deref(), Some("Ami"));
        assert_eq!(sessions[0].scores, vec![120, 80]);
    }

    #[test]
    fn ensure_player_is_idempotent() {
        let store = StatsStore::new();
        let first = store.ensure_player("Ami");
        let second = store.ensure_player("Ami");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn leaderboard_ranks_by_wins_then_win_rate() {
        let store = StatsStore::new();
        // Ami: 2 wins, 0 losses; Ben: 2 wins, 2 losses; Cho: 1 win
        store.record_result(&result("Ami", &[("Ami", 10), ("Ben", 5)]));
        store.record_result(&result("Ami", &[("Ami", 10), ("Ben", 5)]));
        store.record_result(&result("Ben", &[("Ben", 10), ("Cho", 5)]));
        store.record_result(&result("Ben", &[("Ben", 10), ("Cho", 5)]));
        store.record_result(&result("Cho", &[("Cho", 10), ("Dee", 5)]));

        let board = store.leaderboard();
        let names: Vec<&str> = board.iter().map(|e| e.player_name.as_str()).collect();
        assert_eq!(names, vec!["Ami", "Ben", "Cho", "Dee"]);
        assert_eq!(board[0].win_rate, 100.0);
        assert_eq!(board[1].win_rate, 50.0);
    }

    #[test]
    fn recent_sessions_are_newest_first_and_capped() {
        let store = StatsStore::new();
        for i in 0..12 {
            let mut r = result("Ami", &[("Ami", i), ("Ben", 0)]);
            r.room_code = format!("RM{i:02}");
            store.record_result(&r);
        }
        let sessions = store.recent_sessions();
        assert_eq!(sessions.len(), 10);
        assert_eq!(sessions[0].room_code, "RM11");
        assert_eq!(sessions[9].room_code, "RM02");
    }
}
