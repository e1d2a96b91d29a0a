//! Per-tick kinematic integration
//!
//! Explicit Euler: velocity first (thrust, damping), then position.

use super::state::{Asteroid, Bullet, Ship};
use crate::normalize_angle;
use crate::tuning::Ruleset;

/// Advance the ship by one tick.
///
/// `heading_delta` is applied directly (no angular inertia). While spinning,
/// the ship also turns at the ruleset's spin rate.
pub fn integrate_ship(ship: &mut Ship, heading_delta: f32, thrust: bool, rules: &Ruleset, dt: f32) {
    let mut heading = ship.heading + heading_delta;
    if ship.spinning {
        heading += rules.spin_rate * dt;
    }
    ship.heading = normalize_angle(heading);

    if thrust {
        ship.vel += ship.forward() * rules.thrust_power * dt;
    }
    ship.vel *= 1.0 - rules.damping_factor;
    ship.pos += ship.vel * dt;
}

pub fn integrate_asteroids(asteroids: &mut [Asteroid], dt: f32) {
    for asteroid in asteroids.iter_mut().filter(|a| a.alive) {
        asteroid.pos += asteroid.vel * dt;
    }
}

/// Move bullets and age them; expired bullets are marked dead
pub fn integrate_bullets(bullets: &mut [Bullet], dt: f32) {
    for bullet in bullets.iter_mut().filter(|b| b.alive) {
        bullet.pos += bullet.vel * dt;
        bullet.ttl_ticks = bullet.ttl_ticks.saturating_sub(1);
        if bullet.ttl_ticks == 0 {
            bullet.alive = false;
        }
    }
}
