//! Asteroid Arena - headless demo run
//!
//! Plays one game with a simple autopilot and prints the result as JSON.
//!
//! Usage: `asteroid-arena [ruleset.json] [highscores.json]`
//! Set `ASTEROID_SEED` for a reproducible run and `RUST_LOG` for logging.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use asteroid_arena::consts::TICK_RATE;
use asteroid_arena::highscores::{HighScoreEntry, format_age};
use asteroid_arena::sim::{GamePhase, Hud};
use asteroid_arena::store::now_ms;
use asteroid_arena::{LocalScoreStore, RecordId, Ruleset, ScoreStore, Session, normalize_angle};
use serde::Serialize;

/// Give up after this much simulated time
const MAX_RUN_SECS: f32 = 600.0;
const FRAME_DT: f32 = 1.0 / 30.0;

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    phase: GamePhase,
    hud: Hud,
    record: Option<RecordId>,
    high_score: bool,
    top_scores: Vec<HighScoreEntry>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    log::info!("Asteroid Arena (headless) starting...");

    let mut args = std::env::args().skip(1);
    let rules = match args.next() {
        Some(path) => Ruleset::load_or_default(path),
        None => Ruleset::default(),
    };
    let store = match args.next() {
        Some(path) => LocalScoreStore::open_or_memory(path),
        None => LocalScoreStore::in_memory(),
    };
    let seed = std::env::var("ASTEROID_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(now_ms);

    let mut session = Session::new(rules, seed, store).with_player_name("Autopilot");
    session.start();

    let max_ticks = (MAX_RUN_SECS * TICK_RATE) as u64;
    while session.phase() == GamePhase::Playing && session.state().time_ticks < max_ticks {
        autopilot(&mut session);
        session.update(FRAME_DT);
        for event in session.take_events() {
            log::trace!("{event:?}");
        }
    }

    let now = now_ms();
    for (rank, entry) in session.store().top_scores().iter().enumerate() {
        log::info!(
            "#{:<2} {:<12} {:>5}  level {:<3} {}",
            rank + 1,
            entry.name,
            entry.score,
            entry.level,
            format_age(now, entry.timestamp_ms)
        );
    }

    let summary = RunSummary {
        seed,
        ticks: session.state().time_ticks,
        phase: session.phase(),
        hud: session.snapshot().hud,
        record: session.last_record(),
        high_score: session.is_high_score(),
        top_scores: session.store().top_scores(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Turn toward the nearest asteroid, shoot when lined up, shield when crowded
fn autopilot<S: ScoreStore>(session: &mut Session<S>) {
    let state = session.state();
    let ship = &state.ship;
    let Some(target) = state
        .asteroids
        .iter()
        .min_by(|a, b| a.pos.distance_squared(ship.pos).total_cmp(&b.pos.distance_squared(ship.pos)))
    else {
        return;
    };

    let to_target = target.pos - ship.pos;
    let desired = normalize_angle(to_target.y.atan2(to_target.x) - FRAC_PI_2);
    let error = (desired - ship.heading + PI).rem_euclid(TAU) - PI;
    let aligned = error.abs() < 0.1;
    let crowded = to_target.length() < target.radius + ship.radius + 40.0;
    let can_shield = !ship.shielded && !ship.is_invulnerable() && state.abilities.shield_charges > 0;
    let fire_now = aligned && state.time_ticks.is_multiple_of(8);
    let swarmed = state.asteroids.len() > 25 && state.abilities.super_fire_charges > 0;

    session.set_heading_delta(error.clamp(-0.08, 0.08));
    if fire_now {
        session.fire_once();
    }
    if crowded && can_shield {
        session.activate_shield();
    }
    if swarmed && !session.state().abilities.super_fire_active() {
        session.activate_super_fire();
    }
}
