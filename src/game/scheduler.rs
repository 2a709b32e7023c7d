//! Fixed-rate tick loop driving every playing room

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::app::AppState;
use crate::util::time::{SIMULATION_TPS, TICK_DURATION_MICROS};

use super::room::{RoomStatus, SharedRoom};
use super::simulation::{self, TickReport};
use super::GameError;

/// How long finished rooms stay readable before eviction
pub const FINISHED_ROOM_TTL: Duration = Duration::from_secs(30);

/// Drives the combat simulator for every playing room at a fixed
/// cadence. Started once at process startup; runs for the process
/// lifetime.
pub struct TickScheduler {
    state: AppState,
}

impl TickScheduler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(self) {
        info!(tps = SIMULATION_TPS, "Tick scheduler started");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.tick_all();
        }
    }

    /// Advance every room once. One room's failure never blocks the
    /// others or the next tick.
    fn tick_all(&self) {
        // Snapshot the room set so no room lock is held across the
        // whole iteration
        for (code, room) in self.state.rooms.snapshot() {
            if let Err(err) = self.tick_one(&code, &room) {
                error!(code = %code, error = %err, "Room tick failed, skipping this tick");
            }
        }
    }

    fn tick_one(&self, code: &str, room: &SharedRoom) -> Result<(), GameError> {
        let report: TickReport = {
            let mut room = room.lock();
            match room.status {
                RoomStatus::Waiting => return Ok(()),
                RoomStatus::Finished => {
                    let expired = room
                        .finished_at
                        .map_or(true, |at| at.elapsed() >= FINISHED_ROOM_TTL);
                    drop(room);
                    if expired {
                        self.state.rooms.remove(code);
                        debug!(code = %code, "Finished room evicted");
                    }
                    return Ok(());
                }
                RoomStatus::Playing => {}
            }

            let map = self
                .state
                .maps
                .get(&room.map_id)
                .ok_or_else(|| GameError::InvalidMap(room.map_id.clone()))?;
            simulation::tick_room(&mut room, map)
        };

        // Lock released; queue the broadcasts and report any finished
        // game to the persistence layer
        for msg in &report.messages {
            self.state
                .sessions
                .send_to_many(&report.recipients, msg, None);
        }
        if let Some(result) = report.result {
            info!(
                code = %code,
                winner = ?result.winner_id,
                "Game complete, recording result"
            );
            self.state.stats.record_result(&result);
        }
        Ok(())
    }
}
