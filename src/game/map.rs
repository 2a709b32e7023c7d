//! Static arena definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Axis-aligned rectangular obstacle
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Player spawn point (index 0 = host, index 1 = guest)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// Immutable arena configuration, loaded at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    pub id: String,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub obstacles: Vec<Obstacle>,
    pub spawn_points: Vec<SpawnPoint>,
}

/// Read-only registry of playable maps by identifier
pub struct MapCatalog {
    maps: HashMap<String, MapConfig>,
}

impl MapCatalog {
    /// Build the catalog from the built-in map set
    pub fn new() -> Self {
        let mut maps = HashMap::new();
        for map in builtin_maps() {
            debug_assert!(map.spawn_points.len() >= 2, "map needs host and guest spawns");
            maps.insert(map.id.clone(), map);
        }
        Self { maps }
    }

    pub fn get(&self, id: &str) -> Option<&MapConfig> {
        self.maps.get(id)
    }

    /// All maps, ordered by id for stable listings
    pub fn all(&self) -> Vec<&MapConfig> {
        let mut maps: Vec<&MapConfig> = self.maps.values().collect();
        maps.sort_by(|a, b| a.id.cmp(&b.id));
        maps
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn rect(x: f32, y: f32, width: f32, height: f32) -> Obstacle {
    Obstacle {
        x,
        y,
        width,
        height,
    }
}

fn builtin_maps() -> Vec<MapConfig> {
    vec![
        MapConfig {
            id: "first_date_cafe".to_string(),
            name: "First Date Café".to_string(),
            width: 800.0,
            height: 600.0,
            obstacles: vec![
                // Café tables
                rect(180.0, 150.0, 80.0, 80.0),
                rect(540.0, 150.0, 80.0, 80.0),
                rect(180.0, 370.0, 80.0, 80.0),
                rect(540.0, 370.0, 80.0, 80.0),
                // Espresso counter
                rect(330.0, 260.0, 140.0, 60.0),
            ],
            spawn_points: vec![
                SpawnPoint { x: 100.0, y: 300.0 },
                SpawnPoint { x: 700.0, y: 300.0 },
            ],
        },
        MapConfig {
            id: "moonlit_park".to_string(),
            name: "Moonlit Park".to_string(),
            width: 900.0,
            height: 600.0,
            obstacles: vec![
                // Fountain
                rect(400.0, 250.0, 100.0, 100.0),
                // Hedges
                rect(150.0, 100.0, 200.0, 40.0),
                rect(550.0, 460.0, 200.0, 40.0),
                // Benches
                rect(120.0, 430.0, 90.0, 30.0),
                rect(690.0, 130.0, 90.0, 30.0),
            ],
            spawn_points: vec![
                SpawnPoint { x: 90.0, y: 540.0 },
                SpawnPoint { x: 810.0, y: 60.0 },
            ],
        },
        MapConfig {
            id: "rooftop_terrace".to_string(),
            name: "Rooftop Terrace".to_string(),
            width: 700.0,
            height: 700.0,
            obstacles: vec![
                // Planters
                rect(150.0, 150.0, 60.0, 180.0),
                rect(490.0, 370.0, 60.0, 180.0),
                // Bar
                rect(270.0, 320.0, 160.0, 60.0),
            ],
            spawn_points: vec![
                SpawnPoint { x: 80.0, y: 620.0 },
                SpawnPoint { x: 620.0, y: 80.0 },
            ],
        },
    ]
}
