//! Combat simulator - advances one room by one tick

use rand::Rng;
use uuid::Uuid;

use crate::ws::protocol::{BulletSnapshot, EnemySnapshot, FinalScore, PlayerSnapshot, ServerMsg};

use super::entity::{Enemy, EnemyKind};
use super::map::MapConfig;
use super::room::{GameMode, Room, RoomStatus};

/// Enemies within this distance of a player deal contact damage
pub const CONTACT_RANGE: f32 = 30.0;
/// Bullets within this distance of a target register a hit
pub const HIT_RANGE: f32 = 20.0;
/// Score awarded to the bullet's owner per hit
pub const HIT_SCORE: u32 = 10;
/// Clearing this wave wins a co-op game
pub const MAX_WAVE: u32 = 10;
/// Spawn positions keep this distance from map bounds
pub const SPAWN_MARGIN: f32 = 30.0;

/// Result of a finished game, handed to the persistence layer
#[derive(Debug, Clone)]
pub struct GameResult {
    pub room_code: String,
    pub mode: GameMode,
    pub winner_id: Option<Uuid>,
    pub scores: Vec<FinalScore>,
    pub rounds: u32,
}

/// Everything one tick of one room produced
pub struct TickReport {
    /// Broadcasts for all occupants, in emission order; the full state
    /// snapshot is always last
    pub messages: Vec<ServerMsg>,
    /// Present when this tick ended the game
    pub result: Option<GameResult>,
    /// Connection ids of the room's occupants
    pub recipients: Vec<Uuid>,
}

/// Advance one playing room by one tick.
///
/// Order per tick: enemy AI, bullet resolution, dead-enemy cleanup,
/// wave/win bookkeeping, then the full state snapshot.
pub fn tick_room(room: &mut Room, map: &MapConfig) -> TickReport {
    let mut messages = Vec::new();
    let mut result = None;

    step_enemy_ai(room);
    step_bullets(room, map);
    room.enemies.retain(|e| e.health > 0.0);

    match room.mode {
        GameMode::CoopWaves => step_waves(room, map, &mut messages, &mut result),
        GameMode::Pvp1v1 => step_pvp_win(room, &mut messages, &mut result),
    }

    messages.push(build_game_update(room));

    TickReport {
        messages,
        result,
        recipients: room.occupant_ids(),
    }
}

/// Move every living enemy toward its nearest living player and apply
/// contact damage
fn step_enemy_ai(room: &mut Room) {
    for ei in 0..room.enemies.len() {
        if room.enemies[ei].health <= 0.0 {
            continue;
        }
        let (ex, ey) = (room.enemies[ei].x, room.enemies[ei].y);

        // Nearest living player; ties go to the first in list order
        let mut target: Option<(usize, f32)> = None;
        for (pi, player) in room.players.iter().enumerate() {
            if !player.alive {
                continue;
            }
            let d = distance(ex, ey, player.x, player.y);
            match target {
                Some((_, best)) if d >= best => {}
                _ => target = Some((pi, d)),
            }
        }
        let Some((pi, dist)) = target else { continue };

        let speed = room.enemies[ei].speed;
        let damage = room.enemies[ei].damage;
        let (px, py) = (room.players[pi].x, room.players[pi].y);

        // Zero movement if already coincident (guards the division)
        if dist > f32::EPSILON {
            let enemy = &mut room.enemies[ei];
            enemy.x += (px - ex) / dist * speed;
            enemy.y += (py - ey) / dist * speed;
        }

        let new_dist = distance(room.enemies[ei].x, room.enemies[ei].y, px, py);
        if new_dist < CONTACT_RANGE {
            let player = &mut room.players[pi];
            player.health = (player.health - damage).max(0.0);
            if player.health <= 0.0 {
                player.alive = false;
            }
        }
    }
}

/// Advance bullets, discard out-of-bounds ones, and resolve hits.
/// A bullet damages at most one target and is then consumed.
fn step_bullets(room: &mut Room, map: &MapConfig) {
    let bullets = std::mem::take(&mut room.bullets);
    let pvp = room.mode == GameMode::Pvp1v1;

    for mut bullet in bullets {
        bullet.x += bullet.vx;
        bullet.y += bullet.vy;

        if bullet.x < 0.0 || bullet.x > map.width || bullet.y < 0.0 || bullet.y > map.height {
            continue;
        }

        // First living enemy in range takes the damage
        let hit_enemy = room
            .enemies
            .iter_mut()
            .filter(|e| e.health > 0.0)
            .find(|e| distance(bullet.x, bullet.y, e.x, e.y) <= HIT_RANGE);
        if let Some(enemy) = hit_enemy {
            enemy.health = (enemy.health - bullet.damage).max(0.0);
            if let Some(owner) = room.players.iter_mut().find(|p| p.id == bullet.owner_id) {
                owner.score += HIT_SCORE;
            }
            continue;
        }

        if pvp {
            let hit_player = room.players.iter().position(|p| {
                p.alive
                    && p.id != bullet.owner_id
                    && distance(bullet.x, bullet.y, p.x, p.y) <= HIT_RANGE
            });
            if let Some(pi) = hit_player {
                let target = &mut room.players[pi];
                target.health = (target.health - bullet.damage).max(0.0);
                if target.health <= 0.0 {
                    target.alive = false;
                }
                if let Some(owner) = room.players.iter_mut().find(|p| p.id == bullet.owner_id) {
                    owner.score += HIT_SCORE;
                }
                continue;
            }
        }

        room.bullets.push(bullet);
    }
}

/// Co-op wave bookkeeping: advance the wave when the field is clear,
/// finish the game past the wave cap
fn step_waves(
    room: &mut Room,
    map: &MapConfig,
    messages: &mut Vec<ServerMsg>,
    result: &mut Option<GameResult>,
) {
    if room.status != RoomStatus::Playing || !room.enemies.is_empty() {
        return;
    }

    room.wave += 1;
    if room.wave <= MAX_WAVE {
        spawn_wave(room, map);
        messages.push(ServerMsg::WaveComplete { wave: room.wave });
    } else {
        room.finish();
        let scores = final_scores(room);
        // Co-op winner is the top scorer, first slot on ties
        let mut winner_id = None;
        let mut best_score = 0;
        for s in &scores {
            if winner_id.is_none() || s.score > best_score {
                winner_id = Some(s.player_id);
                best_score = s.score;
            }
        }
        messages.push(ServerMsg::GameComplete {
            winner_id,
            scores: scores.clone(),
        });
        *result = Some(GameResult {
            room_code: room.code.clone(),
            mode: room.mode,
            winner_id,
            scores,
            rounds: MAX_WAVE,
        });
    }
}

/// PvP win condition: the last player standing wins
fn step_pvp_win(room: &mut Room, messages: &mut Vec<ServerMsg>, result: &mut Option<GameResult>) {
    if room.status != RoomStatus::Playing || room.players.iter().all(|p| p.alive) {
        return;
    }

    room.finish();
    let scores = final_scores(room);
    let winner_id = room.players.iter().find(|p| p.alive).map(|p| p.id);
    messages.push(ServerMsg::GameComplete {
        winner_id,
        scores: scores.clone(),
    });
    *result = Some(GameResult {
        room_code: room.code.clone(),
        mode: room.mode,
        winner_id,
        scores,
        rounds: 1,
    });
}

fn final_scores(room: &Room) -> Vec<FinalScore> {
    room.players
        .iter()
        .map(|p| FinalScore {
            player_id: p.id,
            name: p.name.clone(),
            score: p.score,
        })
        .collect()
}

/// Spawn the current wave's enemies.
///
/// Zombie count is min(3 + wave, 10); heartbreakers appear from wave 2
/// at min(wave / 2, 5). Zombies enter from map edges, heartbreakers at
/// random interior positions; neither placement considers player
/// positions.
pub fn spawn_wave(room: &mut Room, map: &MapConfig) {
    let wave = room.wave;

    let zombies = (3 + wave).min(10);
    for _ in 0..zombies {
        let (x, y) = edge_spawn(room, map);
        room.enemies.push(Enemy::new(EnemyKind::Zombie, x, y));
    }

    if wave >= 2 {
        let heartbreakers = (wave / 2).min(5);
        for _ in 0..heartbreakers {
            let x = room.rng.gen_range(SPAWN_MARGIN..map.width - SPAWN_MARGIN);
            let y = room.rng.gen_range(SPAWN_MARGIN..map.height - SPAWN_MARGIN);
            room.enemies.push(Enemy::new(EnemyKind::Heartbreaker, x, y));
        }
    }
}

/// Uniform choice of edge, uniform position along it within the margin
fn edge_spawn(room: &mut Room, map: &MapConfig) -> (f32, f32) {
    let along_x = || -> std::ops::Range<f32> { SPAWN_MARGIN..map.width - SPAWN_MARGIN };
    let along_y = || -> std::ops::Range<f32> { SPAWN_MARGIN..map.height - SPAWN_MARGIN };
    match room.rng.gen_range(0..4u8) {
        0 => (room.rng.gen_range(along_x()), SPAWN_MARGIN),
        1 => (room.rng.gen_range(along_x()), map.height - SPAWN_MARGIN),
        2 => (SPAWN_MARGIN, room.rng.gen_range(along_y())),
        _ => (map.width - SPAWN_MARGIN, room.rng.gen_range(along_y())),
    }
}

fn build_game_update(room: &Room) -> ServerMsg {
    ServerMsg::GameUpdate {
        wave: room.wave,
        players: room.players.iter().map(PlayerSnapshot::from).collect(),
        enemies: room.enemies.iter().map(EnemySnapshot::from).collect(),
        bullets: room.bullets.iter().map(BulletSnapshot::from).collect(),
    }
}

fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Bullet, EnemyStats, BULLET_DAMAGE};
    use crate::game::map::MapCatalog;
    use crate::game::room::{RoomRegistry, SharedRoom};

    fn playing_room(mode: GameMode, guests: &[&str]) -> (MapCatalog, SharedRoom) {
        let catalog = MapCatalog::new();
        let registry = RoomRegistry::new();
        let map = catalog.get("first_date_cafe").unwrap();
        let (_, room) = registry.create_room(Uuid::new_v4(), mode, map, "host");
        {
            let mut room = room.lock();
            for name in guests {
                room.add_player(Uuid::new_v4(), name, map).unwrap();
            }
            room.status = RoomStatus::Playing;
        }
        (catalog, room)
    }

    fn cafe(catalog: &MapCatalog) -> &MapConfig {
        catalog.get("first_date_cafe").unwrap()
    }

    #[test]
    fn wave_spawn_counts_follow_policy() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let map = cafe(&catalog);
        for wave in 1..=MAX_WAVE {
            let mut room = room.lock();
            room.enemies.clear();
            room.wave = wave;
            spawn_wave(&mut room, map);

            let zombies = room
                .enemies
                .iter()
                .filter(|e| e.kind == EnemyKind::Zombie)
                .count() as u32;
            let heartbreakers = room
                .enemies
                .iter()
                .filter(|e| e.kind == EnemyKind::Heartbreaker)
                .count() as u32;
            assert_eq!(zombies, (3 + wave).min(10), "wave {wave}");
            let expected_hb = if wave >= 2 { (wave / 2).min(5) } else { 0 };
            assert_eq!(heartbreakers, expected_hb, "wave {wave}");

            for e in &room.enemies {
                assert!(e.x >= 0.0 && e.x <= map.width);
                assert!(e.y >= 0.0 && e.y <= map.height);
            }
        }
    }

    #[test]
    fn wave_one_spawns_four_zombies_and_no_heartbreakers() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let mut room = room.lock();
        assert_eq!(room.wave, 1);
        spawn_wave(&mut room, cafe(&catalog));
        assert_eq!(room.enemies.len(), 4);
        assert!(room.enemies.iter().all(|e| e.kind == EnemyKind::Zombie));
    }

    #[test]
    fn bullet_advances_five_units_per_tick_then_exits_bounds() {
        // PvP room so an empty field does not trigger wave spawning
        let (catalog, room) = playing_room(GameMode::Pvp1v1, &["guest"]);
        let map = cafe(&catalog);
        {
            let mut room = room.lock();
            let shooter = room.players[0].id;
            room.players[0].x = 0.0;
            room.players[0].y = 0.0;
            // Keep the guest far away from the bullet path
            room.players[1].x = 700.0;
            room.players[1].y = 590.0;
            room.bullets
                .push(Bullet::new(shooter, 0.0, 0.0, 5.0, 0.0, "#ff6b9d"));
        }

        for tick in 1..=4 {
            let mut room = room.lock();
            tick_room(&mut room, map);
            assert_eq!(room.bullets.len(), 1, "tick {tick}");
            assert_eq!(room.bullets[0].x, 5.0 * tick as f32);
        }

        // Carry on until the bullet crosses x = width; it must be gone
        // on the tick it exits
        loop {
            let mut room = room.lock();
            tick_room(&mut room, map);
            if room.bullets.is_empty() {
                break;
            }
            assert!(room.bullets[0].x <= map.width);
        }
    }

    #[test]
    fn bullet_hits_at_most_one_enemy_and_is_consumed() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        let shooter = room.players[0].id;
        // Park the player away from both enemies so contact damage
        // stays out of the picture
        room.players[0].x = 400.0;
        room.players[0].y = 500.0;
        room.enemies.push(Enemy::new(EnemyKind::Zombie, 110.0, 100.0));
        room.enemies.push(Enemy::new(EnemyKind::Zombie, 120.0, 100.0));
        room.bullets
            .push(Bullet::new(shooter, 105.0, 100.0, 0.0, 0.0, "#ff6b9d"));

        tick_room(&mut room, map);

        assert!(room.bullets.is_empty(), "bullet must be consumed");
        let zombie_hp = EnemyStats::for_kind(EnemyKind::Zombie).max_health;
        let damaged: Vec<f32> = room.enemies.iter().map(|e| e.health).collect();
        assert_eq!(damaged.len(), 2);
        assert_eq!(damaged[0], zombie_hp - BULLET_DAMAGE);
        assert_eq!(damaged[1], zombie_hp, "only the first enemy in range is hit");
        assert_eq!(room.players[0].score, HIT_SCORE);
    }

    #[test]
    fn enemy_moves_toward_nearest_player_by_its_speed() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &["guest"]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        room.players[0].x = 100.0;
        room.players[0].y = 300.0;
        room.players[1].x = 700.0;
        room.players[1].y = 300.0;
        room.enemies.push(Enemy::new(EnemyKind::Zombie, 200.0, 300.0));

        tick_room(&mut room, map);

        let speed = EnemyStats::for_kind(EnemyKind::Zombie).speed;
        let enemy = &room.enemies[0];
        // Host at x=100 is nearer than guest at x=700
        assert!((enemy.x - (200.0 - speed)).abs() < 1e-4);
        assert_eq!(enemy.y, 300.0);
    }

    #[test]
    fn equidistant_targets_tie_break_to_first_player() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &["guest"]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        room.players[0].x = 100.0;
        room.players[0].y = 300.0;
        room.players[1].x = 300.0;
        room.players[1].y = 300.0;
        room.enemies.push(Enemy::new(EnemyKind::Zombie, 200.0, 300.0));

        tick_room(&mut room, map);

        assert!(room.enemies[0].x < 200.0, "enemy should head for the host");
    }

    #[test]
    fn contact_damage_eventually_downs_the_player() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        room.players[0].x = 400.0;
        room.players[0].y = 300.0;
        let mut enemy = Enemy::new(EnemyKind::Heartbreaker, 400.0, 300.0);
        // Immortal for this test so contact damage keeps flowing
        enemy.health = f32::MAX;
        enemy.max_health = f32::MAX;
        room.enemies.push(enemy);

        let mut saw_damage = false;
        for _ in 0..1000 {
            tick_room(&mut room, map);
            let p = &room.players[0];
            assert!(p.health >= 0.0, "health must clamp at zero");
            assert!(p.health <= p.max_health);
            if p.health < p.max_health {
                saw_damage = true;
            }
            if !p.alive {
                break;
            }
        }
        assert!(saw_damage);
        assert!(!room.players[0].alive);
        assert_eq!(room.players[0].health, 0.0);
        assert_eq!(
            room.players.len(),
            1,
            "death must not remove the player from the room"
        );
    }

    #[test]
    fn dead_enemies_are_purged_in_the_same_tick() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        let shooter = room.players[0].id;
        room.players[0].x = 700.0;
        room.players[0].y = 500.0;
        let mut weak = Enemy::new(EnemyKind::Zombie, 100.0, 100.0);
        weak.health = 1.0;
        room.enemies.push(weak);
        // Second enemy keeps the wave from completing
        room.enemies.push(Enemy::new(EnemyKind::Zombie, 300.0, 100.0));
        room.bullets
            .push(Bullet::new(shooter, 100.0, 100.0, 0.0, 0.0, "#ff6b9d"));

        tick_room(&mut room, map);

        assert_eq!(room.enemies.len(), 1);
        assert!(room.enemies.iter().all(|e| e.health > 0.0));
    }

    #[test]
    fn clearing_a_wave_advances_and_spawns_the_next() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        room.wave = 3;
        room.players[0].x = 400.0;
        room.players[0].y = 300.0;
        assert!(room.enemies.is_empty());

        let report = tick_room(&mut room, map);

        assert_eq!(room.wave, 4);
        assert_eq!(room.status, RoomStatus::Playing);
        // min(3+4,10)=7 zombies + min(4/2,5)=2 heartbreakers
        assert_eq!(room.enemies.len(), 9);
        assert!(report
            .messages
            .iter()
            .any(|m| matches!(m, ServerMsg::WaveComplete { wave: 4 })));
    }

    #[test]
    fn surviving_wave_ten_finishes_the_game() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &["guest"]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        room.wave = MAX_WAVE;
        room.players[0].score = 50;
        room.players[1].score = 120;
        assert!(room.enemies.is_empty());

        let report = tick_room(&mut room, map);

        assert_eq!(room.status, RoomStatus::Finished);
        assert!(room.finished_at.is_some());
        let result = report.result.expect("finished game must report a result");
        assert_eq!(result.winner_id, Some(room.players[1].id));
        assert_eq!(result.rounds, MAX_WAVE);
        assert!(report
            .messages
            .iter()
            .any(|m| matches!(m, ServerMsg::GameComplete { .. })));
    }

    #[test]
    fn pvp_bullet_downs_opponent_and_survivor_wins() {
        let (catalog, room) = playing_room(GameMode::Pvp1v1, &["guest"]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        let shooter = room.players[0].id;
        let target = room.players[1].id;
        room.players[1].x = 300.0;
        room.players[1].y = 300.0;
        room.players[1].health = BULLET_DAMAGE;
        room.bullets
            .push(Bullet::new(shooter, 295.0, 300.0, 0.0, 0.0, "#ff6b9d"));

        let report = tick_room(&mut room, map);

        assert!(!room.players[1].alive);
        assert_eq!(room.status, RoomStatus::Finished);
        let result = report.result.expect("pvp death must end the game");
        assert_eq!(result.winner_id, Some(shooter));
        assert_ne!(result.winner_id, Some(target));
    }

    #[test]
    fn every_tick_ends_with_a_full_state_snapshot() {
        let (catalog, room) = playing_room(GameMode::CoopWaves, &[]);
        let map = cafe(&catalog);
        let mut room = room.lock();
        room.enemies.push(Enemy::new(EnemyKind::Zombie, 100.0, 100.0));

        for _ in 0..3 {
            let report = tick_room(&mut room, map);
            assert!(matches!(
                report.messages.last(),
                Some(ServerMsg::GameUpdate { .. })
            ));
            assert_eq!(report.recipients, room.occupant_ids());
        }
    }
}
