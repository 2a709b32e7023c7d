//! HTTP route definitions - the read-only query surface

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::map::MapConfig;
use crate::game::room::RoomSummary;
use crate::store::stats::{GameSessionRecord, LeaderboardEntry, PlayerStats};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - "*" for development, otherwise a
    // comma-separated origin list
    let cors = if state.config.client_origin.trim() == "*" {
        CorsLayer::permissive()
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/maps", get(maps_handler))
        .route("/rooms", get(rooms_handler))
        .route("/players", get(list_players_handler).post(create_player_handler))
        .route("/players/:player_id", get(get_player_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/game-sessions", get(game_sessions_handler));

    Router::new()
        .route("/ws", get(ws_handler))
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_rooms: usize,
    active_players: usize,
    active_sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: state.rooms.active_rooms(),
        active_players: state.rooms.total_players(),
        active_sessions: state.sessions.active_sessions(),
    })
}

// ============================================================================
// Map and room listings
// ============================================================================

async fn maps_handler(State(state): State<AppState>) -> Json<Vec<MapConfig>> {
    Json(state.maps.all().into_iter().cloned().collect())
}

async fn rooms_handler(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.rooms.waiting_rooms(&state.maps))
}

// ============================================================================
// Player record endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreatePlayerRequest {
    player_name: String,
}

async fn create_player_handler(
    State(state): State<AppState>,
    Json(req): Json<CreatePlayerRequest>,
) -> Result<Json<PlayerStats>, AppError> {
    let name = req.player_name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("player_name must not be empty".to_string()));
    }
    Ok(Json(state.stats.ensure_player(name)))
}

async fn list_players_handler(State(state): State<AppState>) -> Json<Vec<PlayerStats>> {
    Json(state.stats.all_players())
}

async fn get_player_handler(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<PlayerStats>, AppError> {
    state
        .stats
        .get_player(player_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("player {player_id}")))
}

async fn leaderboard_handler(State(state): State<AppState>) -> Json<Vec<LeaderboardEntry>> {
    Json(state.stats.leaderboard())
}

async fn game_sessions_handler(State(state): State<AppState>) -> Json<Vec<GameSessionRecord>> {
    Json(state.stats.recent_sessions())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
