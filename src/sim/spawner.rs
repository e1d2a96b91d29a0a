//! Asteroid population: level sizing, staggered spawning, splitting and
//! level-clear detection

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{AsteroidTier, Asteroid, GameEvent, GameState, Silhouette};
use crate::random_in_range;
use crate::tuning::Ruleset;

/// Where the level's spawn sequence stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnSchedule {
    /// Everything for this level has spawned; waiting for the field to clear
    Idle,
    /// Asteroids still to introduce, one every stagger interval
    Spawning { remaining: u32, countdown_ticks: u32 },
    /// Level cleared; next level begins when the pause runs out
    LevelPause { ticks: u32 },
}

impl SpawnSchedule {
    pub fn idle() -> Self {
        SpawnSchedule::Idle
    }

    pub fn pending_spawns(&self) -> u32 {
        match self {
            SpawnSchedule::Spawning { remaining, .. } => *remaining,
            _ => 0,
        }
    }

    pub fn in_level_pause(&self) -> bool {
        matches!(self, SpawnSchedule::LevelPause { .. })
    }
}

/// Asteroids introduced at the start of a level
pub fn asteroid_count(level: u32, rules: &Ruleset) -> u32 {
    rules.starting_asteroids + level.saturating_sub(1) * rules.asteroids_per_level
}

/// Inward speed of freshly spawned asteroids
pub fn asteroid_speed(level: u32, rules: &Ruleset) -> f32 {
    rules.base_asteroid_speed + level.saturating_sub(1) as f32 * rules.asteroid_speed_increase
}

/// Start the spawn sequence for the current level and refill the bullet budget
pub fn begin_level(state: &mut GameState, rules: &Ruleset) {
    let count = asteroid_count(state.level, rules);
    state.spawn = if count > 0 {
        SpawnSchedule::Spawning {
            remaining: count,
            countdown_ticks: 0,
        }
    } else {
        SpawnSchedule::Idle
    };
    state.abilities.refill_bullets(rules);
    log::info!("=== Level {} === spawning {} asteroids", state.level, count);
    state.events.push(GameEvent::LevelStarted {
        level: state.level,
        asteroids: count,
    });
}

/// Advance the spawn schedule by one tick and detect level clear
pub fn update(state: &mut GameState, rules: &Ruleset) {
    match state.spawn {
        SpawnSchedule::Spawning {
            remaining,
            countdown_ticks,
        } => {
            let countdown = countdown_ticks.saturating_sub(1);
            if countdown > 0 {
                state.spawn = SpawnSchedule::Spawning {
                    remaining,
                    countdown_ticks: countdown,
                };
                return;
            }
            spawn_edge_asteroid(state, rules);
            let remaining = remaining - 1;
            state.spawn = if remaining == 0 {
                SpawnSchedule::Idle
            } else {
                SpawnSchedule::Spawning {
                    remaining,
                    countdown_ticks: rules.spawn_stagger_ticks().max(1),
                }
            };
        }
        SpawnSchedule::LevelPause { ticks } => {
            let ticks = ticks.saturating_sub(1);
            if ticks == 0 {
                begin_level(state, rules);
            } else {
                state.spawn = SpawnSchedule::LevelPause { ticks };
            }
        }
        SpawnSchedule::Idle => {
            // Counted from the collection itself, never the cached counter
            if state.live_asteroid_count() == 0 {
                clear_level(state, rules);
            }
        }
    }
}

fn clear_level(state: &mut GameState, rules: &Ruleset) {
    log::info!("Level {} cleared", state.level);
    state.events.push(GameEvent::LevelCleared { level: state.level });
    state.level += 1;
    state.abilities.refill_bullets(rules);

    let pause = rules.level_clear_pause_ticks();
    if pause == 0 {
        begin_level(state, rules);
    } else {
        state.spawn = SpawnSchedule::LevelPause { ticks: pause };
    }
}

/// Spawn one asteroid just outside a random edge, heading straight in
pub fn spawn_edge_asteroid(state: &mut GameState, rules: &Ruleset) -> u32 {
    let radius = random_in_range(&mut state.rng, rules.spawn_radius_min, rules.spawn_radius_max);
    // Entering from past the wrap line would teleport it immediately
    let offset = radius.min(rules.wrap_margin);
    let (w, h) = (rules.arena_width, rules.arena_height);
    let along_x = random_in_range(&mut state.rng, radius.min(w / 2.0), (w - radius).max(w / 2.0));
    let along_y = random_in_range(&mut state.rng, radius.min(h / 2.0), (h - radius).max(h / 2.0));

    let (pos, dir) = match state.rng.random_range(0..4u8) {
        0 => (Vec2::new(along_x, h + offset), Vec2::NEG_Y),
        1 => (Vec2::new(w + offset, along_y), Vec2::NEG_X),
        2 => (Vec2::new(along_x, -offset), Vec2::Y),
        _ => (Vec2::new(-offset, along_y), Vec2::X),
    };
    let vel = dir * asteroid_speed(state.level, rules);
    let id = add_asteroid(state, pos, vel, radius, rules);
    log::debug!("Spawned asteroid {id} r={radius:.1} at ({:.0}, {:.0})", pos.x, pos.y);
    id
}

/// Spawn the children of a destroyed asteroid at its death position.
///
/// Returns the number of children created (0, 2 or 3).
pub fn split_asteroid(state: &mut GameState, pos: Vec2, tier: AsteroidTier, rules: &Ruleset) -> u32 {
    let Some((count, child_tier)) = tier.split() else {
        return 0;
    };
    for _ in 0..count {
        let radius = child_tier.random_radius(&mut state.rng, rules);
        let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
        let vel = Vec2::from_angle(angle) * rules.split_speed;
        add_asteroid(state, pos, vel, radius, rules);
    }
    log::debug!("Split {tier:?} asteroid into {count} {child_tier:?}");
    count
}

/// Insert a new asteroid and bump the cached counter
pub fn add_asteroid(state: &mut GameState, pos: Vec2, vel: Vec2, radius: f32, rules: &Ruleset) -> u32 {
    let id = state.next_entity_id();
    let shape_seed = state.rng.random::<u64>();
    state.asteroids.push(Asteroid {
        id,
        pos,
        vel,
        radius: radius.max(rules.min_asteroid_radius),
        silhouette: Silhouette::generate(shape_seed, rules.silhouette_vertices, rules.silhouette_jitter),
        alive: true,
    });
    state.active_asteroids += 1;
    state.events.push(GameEvent::AsteroidSpawned { id });
    id
}

/// Bring the cached counter back in line with the collection
pub fn reconcile_count(state: &mut GameState) {
    let actual = state.live_asteroid_count() as u32;
    if state.active_asteroids != actual {
        log::warn!(
            "Asteroid count mismatch: tracked {}, actual {}",
            state.active_asteroids,
            actual
        );
        state.events.push(GameEvent::CounterReconciled {
            cached: state.active_asteroids,
            actual,
        });
        state.active_asteroids = actual;
    }
}
