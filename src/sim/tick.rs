//! Fixed timestep simulation tick
//!
//! Advances the session deterministically: abilities, movement, wrap,
//! contacts, cleanup, spawning, penalties, then counter reconciliation.

use glam::Vec2;

use super::abilities::{self, FireCadence};
use super::arena::{self, EdgeLoop};
use super::collision::{Contact, EdgeBody, detect_contacts, reflect_velocity};
use super::movement::{integrate_asteroids, integrate_bullets, integrate_ship};
use super::spawner;
use super::state::{GameEvent, GamePhase, GameState, LifeLossCause};
use crate::tuning::Ruleset;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Rotation to apply this tick, radians
    pub heading_delta: f32,
    pub thrust: bool,
    /// Single shot
    pub fire: bool,
    /// Fire button held (drives rapid fire)
    pub fire_held: bool,
    pub fire_cadence: FireCadence,
    pub activate_shield: bool,
    pub activate_super_fire: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, rules: &Ruleset, dt: f32) {
    state.events.clear();
    if state.phase != GamePhase::Playing {
        return;
    }
    state.time_ticks += 1;

    // Abilities and firing
    if input.activate_shield {
        abilities::activate_shield(state, rules);
    }
    if input.activate_super_fire {
        abilities::activate_super_fire(state, rules);
    }
    if input.fire {
        abilities::try_fire(state, rules);
    }
    abilities::update_rapid_fire(state, input.fire_held, input.fire_cadence, rules);
    abilities::update_super_fire(state, rules);
    abilities::update_timers(state);

    // Movement
    integrate_ship(&mut state.ship, input.heading_delta, input.thrust, rules, dt);
    integrate_asteroids(&mut state.asteroids, dt);
    integrate_bullets(&mut state.bullets, dt);
    arena::wrap_all(state, rules);

    // Contacts
    let contacts = detect_contacts(state, rules);
    resolve_contacts(state, &contacts, rules);
    prune_dead(state);

    if state.phase == GamePhase::Playing && abilities::penalty_due(state) {
        lose_life(state, LifeLossCause::OutOfBullets, rules);
    }
    if state.phase == GamePhase::Playing {
        spawner::update(state, rules);
    }

    spawner::reconcile_count(state);
    state.normalize_order();
}

/// Apply contact responses in order. First contact wins: anything that
/// touches a body already destroyed this tick is skipped.
fn resolve_contacts(state: &mut GameState, contacts: &[Contact], rules: &Ruleset) {
    let edges = EdgeLoop::from_rules(rules);

    for contact in contacts {
        match *contact {
            Contact::Boundary(EdgeBody::Ship) => {
                let ship = &mut state.ship;
                edges.bounce(&mut ship.pos, &mut ship.vel);
            }
            Contact::Boundary(EdgeBody::Asteroid(id)) => {
                if let Some(i) = live_asteroid(state, id) {
                    let a = &mut state.asteroids[i];
                    edges.bounce(&mut a.pos, &mut a.vel);
                }
            }
            Contact::ShieldAsteroid { asteroid } => {
                if let Some(i) = live_asteroid(state, asteroid) {
                    deflect_off_shield(state, i, rules);
                }
            }
            Contact::ShipAsteroid { asteroid } => {
                // Re-checked: an earlier contact may already have respawned the ship
                let ship = &state.ship;
                let vulnerable = ship.alive && !ship.shielded && !ship.is_invulnerable();
                if vulnerable && live_asteroid(state, asteroid).is_some() {
                    lose_life(state, LifeLossCause::AsteroidCollision, rules);
                }
            }
            Contact::BulletAsteroid { bullet, asteroid } => {
                let Some(b) = state.bullets.iter().position(|x| x.id == bullet && x.alive) else {
                    continue;
                };
                let Some(a) = live_asteroid(state, asteroid) else {
                    continue;
                };
                state.bullets[b].alive = false;
                destroy_asteroid(state, a, rules);
            }
            Contact::AsteroidAsteroid { a, b } => {
                if let (Some(i), Some(j)) = (live_asteroid(state, a), live_asteroid(state, b)) {
                    bounce_asteroids(state, i, j);
                }
            }
        }

        if state.phase == GamePhase::GameOver {
            break;
        }
    }
}

fn live_asteroid(state: &GameState, id: u32) -> Option<usize> {
    state.asteroids.iter().position(|a| a.id == id && a.alive)
}

/// Elastic bounce off the force field, then push the asteroid clear of it
fn deflect_off_shield(state: &mut GameState, index: usize, rules: &Ruleset) {
    let ship_pos = state.ship.pos;
    let ship_vel = state.ship.vel;
    let reach = rules.shield_radius.max(state.ship.radius);
    let asteroid = &mut state.asteroids[index];

    let offset = asteroid.pos - ship_pos;
    let normal = offset.try_normalize().unwrap_or(Vec2::Y);
    if (asteroid.vel - ship_vel).dot(normal) < 0.0 {
        asteroid.vel = reflect_velocity(asteroid.vel, normal);
    }
    let clearance = reach + asteroid.radius;
    if offset.length() < clearance {
        asteroid.pos = ship_pos + normal * clearance;
    }
}

/// Equal-mass elastic collision: approaching rocks swap their velocity
/// components along the line of centers, then both are pushed apart
fn bounce_asteroids(state: &mut GameState, i: usize, j: usize) {
    let (first, second) = (&state.asteroids[i], &state.asteroids[j]);
    let offset = second.pos - first.pos;
    let normal = offset.try_normalize().unwrap_or(Vec2::X);
    let (mut va, mut vb) = (first.vel, second.vel);
    let overlap = first.radius + second.radius - offset.length();

    let approach = (va - vb).dot(normal);
    if approach > 0.0 {
        va -= approach * normal;
        vb += approach * normal;
    }
    let push = normal * (overlap.max(0.0) * 0.5);

    let first = &mut state.asteroids[i];
    first.vel = va;
    first.pos -= push;
    let second = &mut state.asteroids[j];
    second.vel = vb;
    second.pos += push;
}

/// Remove an asteroid, score it, and spawn its children
fn destroy_asteroid(state: &mut GameState, index: usize, rules: &Ruleset) {
    let asteroid = &mut state.asteroids[index];
    asteroid.alive = false;
    let (id, pos, tier) = (asteroid.id, asteroid.pos, asteroid.tier(rules));

    state.active_asteroids = state.active_asteroids.saturating_sub(1);
    state.asteroids_destroyed += 1;
    let children = spawner::split_asteroid(state, pos, tier, rules);
    state.events.push(GameEvent::AsteroidDestroyed {
        id,
        tier,
        pos: pos.into(),
        children,
    });
}

/// Take a life. The last one ends the run; otherwise the ship respawns at
/// the center with a fresh bullet budget and an invulnerability window.
pub fn lose_life(state: &mut GameState, cause: LifeLossCause, rules: &Ruleset) {
    if state.phase != GamePhase::Playing || !state.ship.alive {
        return;
    }
    state.lives = state.lives.saturating_sub(1);
    state.events.push(GameEvent::LifeLost {
        cause,
        lives_left: state.lives,
    });

    if state.lives == 0 {
        state.phase = GamePhase::GameOver;
        let ship = &mut state.ship;
        ship.alive = false;
        ship.shielded = false;
        ship.spinning = false;
        let abilities = &mut state.abilities;
        abilities.shield_ticks = 0;
        abilities.super_fire = None;
        abilities.out_of_bullets_ticks = None;
        abilities.rapid.reset();
        log::info!(
            "Game over: {} asteroids destroyed, reached level {}",
            state.asteroids_destroyed,
            state.level
        );
        state.events.push(GameEvent::GameOver {
            score: state.asteroids_destroyed,
            level: state.level,
        });
        return;
    }

    log::info!("Life lost ({cause:?}), {} remaining", state.lives);
    state
        .ship
        .respawn(GameState::arena_center(rules), rules.invulnerability_ticks());
    state.abilities.refill_bullets(rules);
    state.abilities.rapid.reset();
}

fn prune_dead(state: &mut GameState) {
    state.asteroids.retain(|a| a.alive);
    state.bullets.retain(|b| b.alive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::spawner::{SpawnSchedule, add_asteroid};
    use crate::sim::state::{Bullet, BulletKind};

    /// Playing state whose spawner never fires and never reports a clear
    fn quiet_state(rules: &Ruleset) -> GameState {
        let mut state = GameState::new(12345, rules);
        state.start(rules);
        state.spawn = SpawnSchedule::Spawning {
            remaining: 1,
            countdown_ticks: u32::MAX,
        };
        state
    }

    fn still_bullet(state: &mut GameState, pos: Vec2) -> u32 {
        let id = state.next_entity_id();
        state.bullets.push(Bullet {
            id,
            pos,
            vel: Vec2::ZERO,
            heading: 0.0,
            ttl_ticks: 10,
            radius: 2.0,
            kind: BulletKind::Aimed,
            alive: true,
        });
        id
    }

    fn step(state: &mut GameState, input: &TickInput, rules: &Ruleset) {
        tick(state, input, rules, SIM_DT);
    }

    #[test]
    fn test_ready_does_not_tick() {
        let rules = Ruleset::default();
        let mut state = GameState::new(1, &rules);
        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.time_ticks, 0);
        assert!(state.asteroids.is_empty());
    }

    #[test]
    fn test_first_asteroid_spawns_on_first_tick() {
        let rules = Ruleset::default();
        let mut state = GameState::new(1, &rules);
        state.start(&rules);
        assert_eq!(state.phase, GamePhase::Playing);
        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.asteroids.len(), 1);
        assert_eq!(state.active_asteroids, 1);
    }

    #[test]
    fn test_two_bullets_one_asteroid_destroyed_once() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let at = Vec2::new(200.0, 200.0);
        add_asteroid(&mut state, at, Vec2::ZERO, 12.0, &rules);
        still_bullet(&mut state, at);
        let second = still_bullet(&mut state, at);

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.asteroids_destroyed, 1);
        assert!(state.asteroids.is_empty());
        assert_eq!(state.active_asteroids, 0);
        // Second bullet found nothing left to hit
        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.bullets[0].id, second);
    }

    #[test]
    fn test_large_asteroid_splits_into_three() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let at = Vec2::new(200.0, 200.0);
        add_asteroid(&mut state, at, Vec2::ZERO, 42.0, &rules);
        still_bullet(&mut state, at);

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.asteroids_destroyed, 1);
        assert_eq!(state.asteroids.len(), 3);
        assert_eq!(state.active_asteroids, 3);

        // Children share a spawn point and bounce off each other
        for _ in 0..30 {
            step(&mut state, &TickInput::default(), &rules);
            assert_eq!(state.active_asteroids as usize, state.asteroids.len());
        }
        assert_eq!(state.asteroids.len(), 3);
        assert_eq!(state.asteroids_destroyed, 1);
    }

    #[test]
    fn test_ship_collision_costs_one_life() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let ship_pos = state.ship.pos;
        add_asteroid(&mut state, ship_pos + Vec2::new(20.0, 0.0), Vec2::ZERO, 15.0, &rules);
        add_asteroid(&mut state, ship_pos - Vec2::new(20.0, 0.0), Vec2::ZERO, 15.0, &rules);
        state.ship.vel = Vec2::new(30.0, 0.0);
        state.abilities.bullets_remaining = 17;

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.lives, 2);
        assert_eq!(state.ship.pos, GameState::arena_center(&rules));
        assert_eq!(state.ship.vel, Vec2::ZERO);
        assert_eq!(state.ship.invulnerable_ticks, rules.invulnerability_ticks());
        assert_eq!(state.abilities.bullets_remaining, rules.bullets_per_level);
        // Ship contact does not destroy the asteroid
        assert_eq!(state.asteroids.len(), 2);

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.lives, 2);
    }

    #[test]
    fn test_game_over_freezes_simulation() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        state.lives = 1;
        let ship_pos = state.ship.pos;
        add_asteroid(&mut state, ship_pos, Vec2::new(10.0, 0.0), 15.0, &rules);

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(!state.ship.alive);
        assert!(state.events.contains(&GameEvent::GameOver { score: 0, level: 1 }));

        let frozen = state.asteroids[0].pos;
        let ticks = state.time_ticks;
        step(&mut state, &TickInput { fire: true, ..Default::default() }, &rules);
        assert_eq!(state.asteroids[0].pos, frozen);
        assert_eq!(state.time_ticks, ticks);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_shield_deflects_asteroid() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let ship_pos = state.ship.pos;
        add_asteroid(&mut state, ship_pos + Vec2::new(55.0, 0.0), Vec2::new(-50.0, 0.0), 15.0, &rules);

        let input = TickInput {
            activate_shield: true,
            ..Default::default()
        };
        step(&mut state, &input, &rules);
        assert!(state.ship.shielded);
        assert_eq!(state.lives, 3);
        let asteroid = &state.asteroids[0];
        assert!(asteroid.vel.x > 0.0);
        assert!(asteroid.pos.distance(state.ship.pos) >= rules.shield_radius + asteroid.radius - 1e-3);
        assert_eq!(state.abilities.shield_charges, rules.shield_charges - 1);
    }

    #[test]
    fn test_out_of_bullets_penalty() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        state.abilities.bullets_remaining = 0;

        step(&mut state, &TickInput { fire: true, ..Default::default() }, &rules);
        assert!(state.events.contains(&GameEvent::OutOfBullets));
        for _ in 0..rules.out_of_bullets_delay_ticks() - 2 {
            step(&mut state, &TickInput { fire: true, ..Default::default() }, &rules);
        }
        assert_eq!(state.lives, 3);

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.lives, 2);
        assert!(state.events.contains(&GameEvent::LifeLost {
            cause: LifeLossCause::OutOfBullets,
            lives_left: 2
        }));
        assert_eq!(state.abilities.bullets_remaining, rules.bullets_per_level);
    }

    #[test]
    fn test_head_on_asteroids_bounce_apart() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let left = add_asteroid(&mut state, Vec2::new(100.0, 100.0), Vec2::new(60.0, 0.0), 20.0, &rules);
        let right = add_asteroid(&mut state, Vec2::new(200.0, 100.0), Vec2::new(-60.0, 0.0), 20.0, &rules);
        let find = |state: &GameState, id: u32| state.asteroids.iter().find(|a| a.id == id).cloned();

        for _ in 0..120 {
            step(&mut state, &TickInput::default(), &rules);
            let (Some(l), Some(r)) = (find(&state, left), find(&state, right)) else {
                panic!("asteroid vanished");
            };
            assert!(l.pos.x < r.pos.x, "rocks passed through each other");
            assert!(l.pos.distance(r.pos) >= l.radius + r.radius - 2.5);
        }

        let (Some(l), Some(r)) = (find(&state, left), find(&state, right)) else {
            panic!("asteroid vanished");
        };
        assert!((l.vel.x + 60.0).abs() < 1e-3);
        assert!((r.vel.x - 60.0).abs() < 1e-3);
        assert!(l.vel.y.abs() < 1e-3 && r.vel.y.abs() < 1e-3);
        assert_eq!(state.asteroids_destroyed, 0);
        assert_eq!(state.lives, 3);
    }

    #[test]
    fn test_separating_asteroids_keep_their_velocity() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let left = add_asteroid(&mut state, Vec2::new(100.0, 100.0), Vec2::new(-30.0, 0.0), 20.0, &rules);
        add_asteroid(&mut state, Vec2::new(130.0, 100.0), Vec2::new(30.0, 0.0), 20.0, &rules);

        step(&mut state, &TickInput::default(), &rules);
        let l = state.asteroids.iter().find(|a| a.id == left).cloned();
        let Some(l) = l else { panic!("asteroid vanished") };
        assert_eq!(l.vel, Vec2::new(-30.0, 0.0));
        // Pushed apart to touching
        let r = &state.asteroids[1];
        assert!((l.pos.distance(r.pos) - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_bounce_skips_rock_destroyed_this_tick() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let shot = add_asteroid(&mut state, Vec2::new(100.0, 100.0), Vec2::new(60.0, 0.0), 12.0, &rules);
        let other = add_asteroid(&mut state, Vec2::new(115.0, 100.0), Vec2::new(-60.0, 0.0), 12.0, &rules);
        still_bullet(&mut state, Vec2::new(99.0, 100.0));

        step(&mut state, &TickInput::default(), &rules);
        assert!(state.asteroids.iter().all(|a| a.id != shot));
        let survivor = state.asteroids.iter().find(|a| a.id == other);
        assert_eq!(survivor.map(|a| a.vel), Some(Vec2::new(-60.0, 0.0)));
    }

    #[test]
    fn test_edge_loop_bounces_when_wrap_disabled() {
        let rules = Ruleset {
            wrap_enabled: false,
            ..Ruleset::default()
        };
        let mut state = quiet_state(&rules);
        state.ship.invulnerable_ticks = 0;
        state.ship.pos = Vec2::new(-19.5, 300.0);
        state.ship.vel = Vec2::new(-120.0, 0.0);
        let rock = add_asteroid(
            &mut state,
            Vec2::new(rules.arena_width + 19.5, 100.0),
            Vec2::new(120.0, 0.0),
            15.0,
            &rules,
        );

        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.ship.pos.x, -rules.wrap_margin);
        assert!(state.ship.vel.x > 0.0);
        let Some(rock) = state.asteroids.iter().find(|a| a.id == rock) else {
            panic!("asteroid vanished");
        };
        assert_eq!(rock.pos.x, rules.arena_width + rules.wrap_margin);
        assert_eq!(rock.vel.x, -120.0);

        // Moving back inside, nothing bounces them again
        step(&mut state, &TickInput::default(), &rules);
        assert!(state.ship.pos.x > -rules.wrap_margin);
        assert!(state.ship.vel.x > 0.0);
    }

    #[test]
    fn test_counter_drift_is_reconciled() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        add_asteroid(&mut state, Vec2::new(100.0, 100.0), Vec2::ZERO, 15.0, &rules);
        state.active_asteroids = 4;
        step(&mut state, &TickInput::default(), &rules);
        assert_eq!(state.active_asteroids, 1);
        assert!(state.events.contains(&GameEvent::CounterReconciled { cached: 4, actual: 1 }));
    }

    #[test]
    fn test_bullets_are_not_wrapped() {
        let rules = Ruleset::default();
        let mut state = quiet_state(&rules);
        let id = state.next_entity_id();
        state.bullets.push(Bullet {
            id,
            pos: Vec2::new(-19.0, 50.0),
            vel: Vec2::new(-120.0, 0.0),
            heading: 0.0,
            ttl_ticks: 10,
            radius: 2.0,
            kind: BulletKind::Aimed,
            alive: true,
        });
        step(&mut state, &TickInput::default(), &rules);
        assert!(state.bullets[0].pos.x < -rules.wrap_margin);
    }

    #[test]
    fn test_determinism() {
        let rules = Ruleset::default();
        let mut state1 = GameState::new(99999, &rules);
        let mut state2 = GameState::new(99999, &rules);
        state1.start(&rules);
        state2.start(&rules);

        for i in 0..600 {
            let input = TickInput {
                heading_delta: 0.02,
                thrust: i % 3 == 0,
                fire: i % 10 == 0,
                ..Default::default()
            };
            step(&mut state1, &input, &rules);
            step(&mut state2, &input, &rules);
            assert_eq!(state1.active_asteroids as usize, state1.asteroids.len(), "tick {i}");
        }

        assert_eq!(state1.asteroids.len(), state2.asteroids.len());
        assert_eq!(state1.asteroids_destroyed, state2.asteroids_destroyed);
        for (a, b) in state1.asteroids.iter().zip(&state2.asteroids) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.pos, b.pos);
        }
        assert!((state1.ship.heading - state2.ship.heading).abs() < 0.0001);
    }
}
