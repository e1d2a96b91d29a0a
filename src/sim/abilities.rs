//! Limited resources and timed abilities
//!
//! The per-level bullet budget, the out-of-bullets penalty, shield and
//! super-fire charges, and the rapid-fire cadence. All durations are tick
//! countdowns stored here, so replacing the `GameState` drops them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Bullet, BulletKind, GameEvent, GameState};
use crate::tuning::Ruleset;
use crate::{heading_vector, normalize_angle};

/// How a held fire input repeats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireCadence {
    /// Repeat at the base interval once the hold passes the threshold
    #[default]
    Hold,
    /// Repeat at the fast interval straight away (double-tap style)
    Fast,
}

/// Rapid-fire timing derived from the normalized fire-held signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RapidFire {
    pub held_ticks: u32,
    pub engaged: bool,
    pub cooldown_ticks: u32,
}

impl RapidFire {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An active super-fire window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperFire {
    pub remaining_ticks: u32,
    /// Ticks until the next radial burst (0 = burst this tick)
    pub burst_countdown: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abilities {
    pub bullets_remaining: u32,
    /// Countdown to the forced life loss after firing on an empty budget
    pub out_of_bullets_ticks: Option<u32>,
    pub shield_charges: u32,
    pub shield_ticks: u32,
    pub super_fire_charges: u32,
    pub super_fire: Option<SuperFire>,
    pub rapid: RapidFire,
}

impl Abilities {
    pub fn new(rules: &Ruleset) -> Self {
        Self {
            bullets_remaining: rules.bullets_per_level,
            out_of_bullets_ticks: None,
            shield_charges: rules.shield_charges,
            shield_ticks: 0,
            super_fire_charges: rules.super_fire_charges,
            super_fire: None,
            rapid: RapidFire::default(),
        }
    }

    /// Full budget again; any pending out-of-bullets penalty is dropped
    pub fn refill_bullets(&mut self, rules: &Ruleset) {
        self.bullets_remaining = rules.bullets_per_level;
        self.out_of_bullets_ticks = None;
    }

    #[inline]
    pub fn shield_active(&self) -> bool {
        self.shield_ticks > 0
    }

    #[inline]
    pub fn super_fire_active(&self) -> bool {
        self.super_fire.is_some()
    }

    pub fn penalty_pending(&self) -> bool {
        self.out_of_bullets_ticks.is_some()
    }
}

/// Fire one aimed bullet from the nose, spending one from the budget.
///
/// On an empty budget nothing is fired; the first such attempt per
/// depletion arms the out-of-bullets penalty. Returns true if a bullet
/// was spawned.
pub fn try_fire(state: &mut GameState, rules: &Ruleset) -> bool {
    if !state.ship.alive {
        return false;
    }
    if state.abilities.bullets_remaining == 0 {
        if !state.abilities.penalty_pending() {
            log::info!("Out of bullets!");
            state.abilities.out_of_bullets_ticks = Some(rules.out_of_bullets_delay_ticks());
            state.abilities.rapid.reset();
            state.events.push(GameEvent::OutOfBullets);
        }
        return false;
    }
    state.abilities.bullets_remaining -= 1;

    let pos = state.ship.nose(rules.ship_nose_offset);
    let heading = state.ship.heading;
    let id = spawn_bullet(
        state,
        pos,
        heading,
        rules.bullet_speed,
        rules.bullet_lifetime_ticks(),
        BulletKind::Aimed,
        rules,
    );
    state.events.push(GameEvent::ShotFired { id });
    true
}

fn spawn_bullet(
    state: &mut GameState,
    pos: Vec2,
    heading: f32,
    speed: f32,
    ttl_ticks: u32,
    kind: BulletKind,
    rules: &Ruleset,
) -> u32 {
    let id = state.next_entity_id();
    let heading = normalize_angle(heading);
    state.bullets.push(Bullet {
        id,
        pos,
        vel: heading_vector(heading) * speed,
        heading,
        ttl_ticks: ttl_ticks.max(1),
        radius: rules.bullet_radius,
        kind,
        alive: true,
    });
    id
}

/// Raise the force field. No-op without charges or while already up.
pub fn activate_shield(state: &mut GameState, rules: &Ruleset) -> bool {
    let abilities = &mut state.abilities;
    if abilities.shield_charges == 0 || abilities.shield_active() || !state.ship.alive {
        return false;
    }
    abilities.shield_charges -= 1;
    abilities.shield_ticks = rules.shield_duration_ticks().max(1);
    state.ship.shielded = true;
    log::debug!("Shield up ({} charges left)", abilities.shield_charges);
    state.events.push(GameEvent::ShieldActivated {
        charges_left: abilities.shield_charges,
    });
    true
}

/// Start a super-fire window. No-op without charges or while one is running.
pub fn activate_super_fire(state: &mut GameState, rules: &Ruleset) -> bool {
    let abilities = &mut state.abilities;
    if abilities.super_fire_charges == 0 || abilities.super_fire_active() || !state.ship.alive {
        return false;
    }
    abilities.super_fire_charges -= 1;
    abilities.super_fire = Some(SuperFire {
        remaining_ticks: rules.super_fire_duration_ticks().max(1),
        burst_countdown: 0,
    });
    state.ship.spinning = true;
    log::debug!("Super-fire on ({} charges left)", abilities.super_fire_charges);
    state.events.push(GameEvent::SuperFireActivated {
        charges_left: abilities.super_fire_charges,
    });
    true
}

/// Advance the held-fire cadence by one tick and fire when it comes due
pub fn update_rapid_fire(state: &mut GameState, held: bool, cadence: FireCadence, rules: &Ruleset) {
    if !held {
        state.abilities.rapid.reset();
        return;
    }
    let interval = match cadence {
        FireCadence::Hold => rules.rapid_fire_interval_ticks(),
        FireCadence::Fast => rules.rapid_fire_fast_interval_ticks(),
    };

    let rapid = &mut state.abilities.rapid;
    rapid.held_ticks = rapid.held_ticks.saturating_add(1);
    if !rapid.engaged {
        let engage = match cadence {
            FireCadence::Hold => rapid.held_ticks >= rules.rapid_fire_hold_ticks(),
            FireCadence::Fast => true,
        };
        if engage {
            rapid.engaged = true;
            rapid.cooldown_ticks = interval;
        }
        return;
    }

    rapid.cooldown_ticks = rapid.cooldown_ticks.saturating_sub(1);
    if rapid.cooldown_ticks == 0 {
        rapid.cooldown_ticks = interval;
        try_fire(state, rules);
    }
}

/// Run the active super-fire window: bursts on schedule, expiry at the end
pub fn update_super_fire(state: &mut GameState, rules: &Ruleset) {
    let Some(mut window) = state.abilities.super_fire else {
        return;
    };

    if window.burst_countdown == 0 {
        fire_burst(state, rules);
        window.burst_countdown = rules.super_fire_interval_ticks();
    }
    window.burst_countdown -= 1;
    window.remaining_ticks = window.remaining_ticks.saturating_sub(1);

    if window.remaining_ticks == 0 {
        state.abilities.super_fire = None;
        state.ship.spinning = false;
        state.ship.heading = 0.0;
        log::debug!("Super-fire over");
        state.events.push(GameEvent::SuperFireExpired);
    } else {
        state.abilities.super_fire = Some(window);
    }
}

/// Evenly spaced radial burst around the ship, perpendicular to the nose first
fn fire_burst(state: &mut GameState, rules: &Ruleset) {
    let directions = rules.super_fire_directions.max(1);
    let step = std::f32::consts::TAU / directions as f32;
    let base = state.ship.heading + std::f32::consts::FRAC_PI_2;
    let origin = state.ship.pos;
    for i in 0..directions {
        spawn_bullet(
            state,
            origin,
            base + i as f32 * step,
            rules.super_fire_bullet_speed,
            rules.super_fire_bullet_lifetime_ticks(),
            BulletKind::Burst,
            rules,
        );
    }
}

/// Count down shield and invulnerability windows
pub fn update_timers(state: &mut GameState) {
    if state.abilities.shield_ticks > 0 {
        state.abilities.shield_ticks -= 1;
        if state.abilities.shield_ticks == 0 {
            state.ship.shielded = false;
            log::debug!("Shield down");
            state.events.push(GameEvent::ShieldExpired);
        }
    }
    state.ship.invulnerable_ticks = state.ship.invulnerable_ticks.saturating_sub(1);
}

/// Count down a pending out-of-bullets penalty; true when it comes due
pub fn penalty_due(state: &mut GameState) -> bool {
    match state.abilities.out_of_bullets_ticks {
        Some(ticks) if ticks <= 1 => {
            state.abilities.out_of_bullets_ticks = None;
            true
        }
        Some(ticks) => {
            state.abilities.out_of_bullets_ticks = Some(ticks - 1);
            false
        }
        None => false,
    }
}
