//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::map::MapCatalog;
use crate::game::RoomRegistry;
use crate::session::SessionDirectory;
use crate::store::StatsStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub maps: Arc<MapCatalog>,
    pub rooms: Arc<RoomRegistry>,
    pub sessions: Arc<SessionDirectory>,
    pub stats: Arc<StatsStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            maps: Arc::new(MapCatalog::new()),
            rooms: Arc::new(RoomRegistry::new()),
            sessions: Arc::new(SessionDirectory::new()),
            stats: Arc::new(StatsStore::new()),
        }
    }
}
