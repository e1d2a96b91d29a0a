//! Toroidal arena: wraparound and the outer edge loop
//!
//! The ship and asteroids wrap once they are more than `wrap_margin` past an
//! edge. Bullets never wrap. The edge loop sits on the wrap line and bounces
//! anything whose center is found beyond it; with wrapping enabled that only
//! happens if wrapping was skipped.

use glam::Vec2;

use super::state::GameState;
use crate::tuning::Ruleset;

/// Outer edge loop (arena rectangle grown by the wrap margin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLoop {
    pub min: Vec2,
    pub max: Vec2,
}

impl EdgeLoop {
    pub fn from_rules(rules: &Ruleset) -> Self {
        let m = rules.wrap_margin;
        Self {
            min: Vec2::new(-m, -m),
            max: Vec2::new(rules.arena_width + m, rules.arena_height + m),
        }
    }

    /// Inward normal of the edge the point has crossed, if any
    pub fn crossed_normal(&self, pos: Vec2) -> Option<Vec2> {
        let mut normal = Vec2::ZERO;
        if pos.x < self.min.x {
            normal.x = 1.0;
        } else if pos.x > self.max.x {
            normal.x = -1.0;
        }
        if pos.y < self.min.y {
            normal.y = 1.0;
        } else if pos.y > self.max.y {
            normal.y = -1.0;
        }
        (normal != Vec2::ZERO).then(|| normal.normalize())
    }

    /// Elastic, frictionless bounce: flip the outward velocity component
    /// and put the body back on the loop. Returns true if it bounced.
    pub fn bounce(&self, pos: &mut Vec2, vel: &mut Vec2) -> bool {
        let mut bounced = false;
        if pos.x < self.min.x || pos.x > self.max.x {
            pos.x = pos.x.clamp(self.min.x, self.max.x);
            let inward = if pos.x <= self.min.x { 1.0 } else { -1.0 };
            if vel.x * inward < 0.0 {
                vel.x = -vel.x;
            }
            bounced = true;
        }
        if pos.y < self.min.y || pos.y > self.max.y {
            pos.y = pos.y.clamp(self.min.y, self.max.y);
            let inward = if pos.y <= self.min.y { 1.0 } else { -1.0 };
            if vel.y * inward < 0.0 {
                vel.y = -vel.y;
            }
            bounced = true;
        }
        bounced
    }
}

/// Wrap one coordinate on an axis spanning [0, extent]
#[inline]
pub fn wrap_axis(value: f32, extent: f32, margin: f32) -> f32 {
    if value < -margin {
        extent + margin
    } else if value > extent + margin {
        -margin
    } else {
        value
    }
}

pub fn wrap_position(pos: Vec2, rules: &Ruleset) -> Vec2 {
    Vec2::new(
        wrap_axis(pos.x, rules.arena_width, rules.wrap_margin),
        wrap_axis(pos.y, rules.arena_height, rules.wrap_margin),
    )
}

/// Wrap the ship and every live asteroid
pub fn wrap_all(state: &mut GameState, rules: &Ruleset) {
    if !rules.wrap_enabled {
        return;
    }
    state.ship.pos = wrap_position(state.ship.pos, rules);
    for asteroid in state.asteroids.iter_mut().filter(|a| a.alive) {
        asteroid.pos = wrap_position(asteroid.pos, rules);
    }
}
