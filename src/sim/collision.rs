//! Collision detection for circular proxies
//!
//! Every body is a circle. A pair is tested only when one side's contact
//! mask names the other side's category, so invulnerability and shields are
//! expressed by swapping the ship's category rather than by special cases.
//! Detection is read-only; `tick` applies the responses in contact order.

use bitflags::bitflags;
use glam::Vec2;

use super::arena::EdgeLoop;
use super::state::{GameState, Ship};
use crate::tuning::Ruleset;

bitflags! {
    /// Physics categories
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u8 {
        const SHIP = 1 << 0;
        const ASTEROID = 1 << 1;
        const BULLET = 1 << 2;
        const BOUNDARY = 1 << 3;
        /// Ship with an active force field
        const SHIELD = 1 << 4;
    }
}

/// Category plus the categories this body wants contacts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Body {
    pub category: Category,
    pub contacts: Category,
}

impl Body {
    pub const ASTEROID: Body = Body {
        category: Category::ASTEROID,
        contacts: Category::SHIP
            .union(Category::BULLET)
            .union(Category::SHIELD)
            .union(Category::BOUNDARY)
            .union(Category::ASTEROID),
    };
    pub const BULLET: Body = Body {
        category: Category::BULLET,
        contacts: Category::ASTEROID,
    };
    pub const BOUNDARY: Body = Body {
        category: Category::BOUNDARY,
        contacts: Category::SHIP.union(Category::ASTEROID).union(Category::SHIELD),
    };

    /// The ship's body for this tick
    pub fn ship(ship: &Ship) -> Body {
        let category = if !ship.alive {
            return Body {
                category: Category::empty(),
                contacts: Category::empty(),
            };
        } else if ship.shielded {
            Category::SHIELD
        } else if ship.is_invulnerable() {
            // Boundary still applies; asteroid contact is suppressed
            return Body {
                category: Category::empty(),
                contacts: Category::BOUNDARY,
            };
        } else {
            Category::SHIP
        };
        Body {
            category,
            contacts: Category::ASTEROID | Category::BOUNDARY,
        }
    }

    /// Whether a pair of bodies should be tested at all
    #[inline]
    pub fn interacts(&self, other: &Body) -> bool {
        self.contacts.intersects(other.category) || other.contacts.intersects(self.category)
    }
}

/// Overlap test: touching counts
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.distance_squared(b) <= reach * reach
}

/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Which body touched the edge loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeBody {
    Ship,
    Asteroid(u32),
}

/// A detected contact, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Boundary(EdgeBody),
    ShieldAsteroid { asteroid: u32 },
    ShipAsteroid { asteroid: u32 },
    BulletAsteroid { bullet: u32, asteroid: u32 },
    /// Overlapping rocks, `a < b`
    AsteroidAsteroid { a: u32, b: u32 },
}

/// Find every contact among live bodies.
///
/// Order: boundary, shield, ship, bullet contacts by (bullet id, asteroid
/// id), then asteroid pairs by id. The caller skips contacts whose bodies
/// died earlier in the same pass.
pub fn detect_contacts(state: &GameState, rules: &Ruleset) -> Vec<Contact> {
    let mut contacts = Vec::new();
    let edges = EdgeLoop::from_rules(rules);
    let ship_body = Body::ship(&state.ship);

    if ship_body.interacts(&Body::BOUNDARY) && edges.crossed_normal(state.ship.pos).is_some() {
        contacts.push(Contact::Boundary(EdgeBody::Ship));
    }
    for asteroid in state.asteroids.iter().filter(|a| a.alive) {
        if edges.crossed_normal(asteroid.pos).is_some() {
            contacts.push(Contact::Boundary(EdgeBody::Asteroid(asteroid.id)));
        }
    }

    if ship_body.interacts(&Body::ASTEROID) {
        let shielded = ship_body.category.contains(Category::SHIELD);
        let reach = if shielded {
            rules.shield_radius.max(state.ship.radius)
        } else {
            state.ship.radius
        };
        for asteroid in state.asteroids.iter().filter(|a| a.alive) {
            if circles_overlap(state.ship.pos, reach, asteroid.pos, asteroid.radius) {
                contacts.push(if shielded {
                    Contact::ShieldAsteroid { asteroid: asteroid.id }
                } else {
                    Contact::ShipAsteroid { asteroid: asteroid.id }
                });
            }
        }
    }

    let sweep = AsteroidSweep::new(state);
    bullet_contacts(state, &sweep, &mut contacts);
    if Body::ASTEROID.interacts(&Body::ASTEROID) {
        asteroid_contacts(state, &sweep, &mut contacts);
    }
    contacts
}

/// Live asteroids sorted by x, for sweep-and-prune
struct AsteroidSweep {
    /// (x, index into `state.asteroids`)
    entries: Vec<(f32, usize)>,
    max_radius: f32,
}

impl AsteroidSweep {
    fn new(state: &GameState) -> Self {
        let mut entries: Vec<(f32, usize)> = state
            .asteroids
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive)
            .map(|(i, a)| (a.pos.x, i))
            .collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        let max_radius = entries
            .iter()
            .map(|&(_, i)| state.asteroids[i].radius)
            .fold(0.0f32, f32::max);
        Self { entries, max_radius }
    }
}

/// Bullet–asteroid pairs
fn bullet_contacts(state: &GameState, sweep: &AsteroidSweep, contacts: &mut Vec<Contact>) {
    if sweep.entries.is_empty() {
        return;
    }
    let (sweep, max_radius) = (&sweep.entries, sweep.max_radius);

    let mut hits: Vec<u32> = Vec::new();
    for bullet in state.bullets.iter().filter(|b| b.alive) {
        let reach = bullet.radius + max_radius;
        let start = sweep.partition_point(|&(x, _)| x < bullet.pos.x - reach);
        hits.clear();
        for &(x, i) in &sweep[start..] {
            if x > bullet.pos.x + reach {
                break;
            }
            let asteroid = &state.asteroids[i];
            if circles_overlap(bullet.pos, bullet.radius, asteroid.pos, asteroid.radius) {
                hits.push(asteroid.id);
            }
        }
        hits.sort_unstable();
        contacts.extend(hits.iter().map(|&asteroid| Contact::BulletAsteroid {
            bullet: bullet.id,
            asteroid,
        }));
    }
}

/// Asteroid–asteroid pairs
fn asteroid_contacts(state: &GameState, sweep: &AsteroidSweep, contacts: &mut Vec<Contact>) {
    let mut pairs: Vec<(u32, u32)> = Vec::new();
    for (k, &(x, i)) in sweep.entries.iter().enumerate() {
        let first = &state.asteroids[i];
        let reach = first.radius + sweep.max_radius;
        for &(other_x, j) in &sweep.entries[k + 1..] {
            if other_x - x > reach {
                break;
            }
            let second = &state.asteroids[j];
            if circles_overlap(first.pos, first.radius, second.pos, second.radius) {
                pairs.push((first.id.min(second.id), first.id.max(second.id)));
            }
        }
    }
    pairs.sort_unstable();
    contacts.extend(pairs.into_iter().map(|(a, b)| Contact::AsteroidAsteroid { a, b }));
}
