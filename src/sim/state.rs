//! Game state and core simulation types
//!
//! `GameState` is the session aggregate: it owns the ship, the live asteroid
//! and bullet collections, every countdown, and the RNG. Nothing outside it
//! holds simulation state, so resetting it cancels every pending effect.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::abilities::Abilities;
use super::spawner::SpawnSchedule;
use crate::tuning::Ruleset;
use crate::{heading_vector, random_in_range};

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Session created, waiting for start
    Ready,
    /// Active gameplay
    Playing,
    /// Run ended; simulation frozen until restart
    GameOver,
}

/// Asteroid size class governing split behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsteroidTier {
    Small,
    Medium,
    Large,
}

impl AsteroidTier {
    /// Classify a radius against the ruleset's tier thresholds
    pub fn classify(radius: f32, rules: &Ruleset) -> Self {
        if radius >= rules.large_radius {
            AsteroidTier::Large
        } else if radius >= rules.medium_radius {
            AsteroidTier::Medium
        } else {
            AsteroidTier::Small
        }
    }

    /// Child count and tier produced when an asteroid of this tier is destroyed
    pub fn split(&self) -> Option<(u32, AsteroidTier)> {
        match self {
            AsteroidTier::Large => Some((3, AsteroidTier::Medium)),
            AsteroidTier::Medium => Some((2, AsteroidTier::Small)),
            AsteroidTier::Small => None,
        }
    }

    /// Nominal radius (the tier threshold)
    pub fn nominal_radius(&self, rules: &Ruleset) -> f32 {
        match self {
            AsteroidTier::Small => rules.small_radius,
            AsteroidTier::Medium => rules.medium_radius,
            AsteroidTier::Large => rules.large_radius,
        }
    }

    /// Upper bound for radii that still classify as this tier
    pub fn ceiling_radius(&self, rules: &Ruleset) -> f32 {
        match self {
            AsteroidTier::Small => rules.medium_radius,
            AsteroidTier::Medium => rules.large_radius,
            AsteroidTier::Large => f32::INFINITY,
        }
    }

    /// Random radius near the nominal size that stays inside the tier
    pub fn random_radius<R: Rng + ?Sized>(&self, rng: &mut R, rules: &Ruleset) -> f32 {
        let nominal = self.nominal_radius(rules).max(rules.min_asteroid_radius);
        let ceiling = self.ceiling_radius(rules);
        let high = (nominal * (1.0 + rules.radius_variation)).min(ceiling);
        let radius = random_in_range(rng, nominal, high);
        // The range is inclusive; landing on the next threshold would change tier
        if radius >= ceiling { nominal } else { radius }
    }
}

/// Irregular outline of an asteroid: a ring of per-vertex radius factors.
///
/// Regenerating from the same seed yields the same shape. Collision ignores
/// the silhouette and uses the nominal radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Silhouette {
    pub seed: u64,
    pub factors: Vec<f32>,
}

impl Silhouette {
    pub fn generate(seed: u64, vertices: usize, jitter: f32) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let jitter = jitter.clamp(0.0, 0.95);
        let factors = (0..vertices)
            .map(|_| random_in_range(&mut rng, 1.0 - jitter, 1.0 + jitter))
            .collect();
        Self { seed, factors }
    }

    /// Outline vertices relative to the asteroid center
    pub fn outline(&self, radius: f32) -> Vec<Vec2> {
        let n = self.factors.len().max(1) as f32;
        self.factors
            .iter()
            .enumerate()
            .map(|(i, f)| Vec2::from_angle(i as f32 * std::f32::consts::TAU / n) * radius * f)
            .collect()
    }
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub pos: Vec2,
    /// Heading in radians, normalized to [0, 2π); 0 points along +y
    pub heading: f32,
    pub vel: Vec2,
    pub radius: f32,
    /// Ticks of post-respawn invulnerability remaining
    pub invulnerable_ticks: u32,
    pub shielded: bool,
    pub spinning: bool,
    /// False once the run has ended
    pub alive: bool,
}

impl Ship {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            heading: 0.0,
            vel: Vec2::ZERO,
            radius,
            invulnerable_ticks: 0,
            shielded: false,
            spinning: false,
            alive: true,
        }
    }

    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ticks > 0
    }

    /// Unit vector along the nose
    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading_vector(self.heading)
    }

    /// Bullet spawn point
    pub fn nose(&self, offset: f32) -> Vec2 {
        self.pos + self.forward() * offset
    }

    /// Return to center at rest, facing up, with an invulnerability window
    pub fn respawn(&mut self, center: Vec2, invulnerable_ticks: u32) {
        self.pos = center;
        self.vel = Vec2::ZERO;
        self.heading = 0.0;
        self.invulnerable_ticks = invulnerable_ticks;
    }

    /// Whether the ship is drawn this tick (blinks while invulnerable)
    pub fn blink_visible(&self, blink_period_ticks: u32) -> bool {
        if !self.is_invulnerable() {
            return true;
        }
        let half = (blink_period_ticks / 2).max(1);
        (self.invulnerable_ticks / half) % 2 == 0
    }
}

/// An asteroid entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub silhouette: Silhouette,
    /// Cleared on destruction; dead asteroids are pruned at the end of the tick
    pub alive: bool,
}

impl Asteroid {
    pub fn tier(&self, rules: &Ruleset) -> AsteroidTier {
        AsteroidTier::classify(self.radius, rules)
    }
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletKind {
    /// Aimed shot drawn from the per-level budget
    Aimed,
    /// Super-fire radial burst (free)
    Burst,
}

/// A bullet entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Direction of travel, fixed at spawn
    pub heading: f32,
    pub ttl_ticks: u32,
    pub radius: f32,
    pub kind: BulletKind,
    pub alive: bool,
}

/// Why a life was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeLossCause {
    AsteroidCollision,
    OutOfBullets,
}

/// Notable things that happened during a tick, for UI and sound collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelStarted { level: u32, asteroids: u32 },
    AsteroidSpawned { id: u32 },
    AsteroidDestroyed { id: u32, tier: AsteroidTier, pos: (f32, f32), children: u32 },
    ShotFired { id: u32 },
    OutOfBullets,
    LifeLost { cause: LifeLossCause, lives_left: u8 },
    ShieldActivated { charges_left: u32 },
    ShieldExpired,
    SuperFireActivated { charges_left: u32 },
    SuperFireExpired,
    LevelCleared { level: u32 },
    CounterReconciled { cached: u32, actual: u32 },
    GameOver { score: u64, level: u32 },
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed the session RNG was created from
    pub seed: u64,
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Current level (1-based)
    pub level: u32,
    pub lives: u8,
    /// The score; only ever increases within a run
    pub asteroids_destroyed: u64,
    /// Playing ticks elapsed
    pub time_ticks: u64,
    pub ship: Ship,
    /// Live asteroids (sorted by id for determinism)
    pub asteroids: Vec<Asteroid>,
    /// Live bullets (sorted by id for determinism)
    pub bullets: Vec<Bullet>,
    /// Cached live asteroid count; reconciled against `asteroids` every tick
    pub active_asteroids: u32,
    pub abilities: Abilities,
    pub spawn: SpawnSchedule,
    /// Events recorded during the most recent tick
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a session in the Ready phase
    pub fn new(seed: u64, rules: &Ruleset) -> Self {
        Self::with_rng(seed, Pcg32::seed_from_u64(seed), rules)
    }

    fn with_rng(seed: u64, rng: Pcg32, rules: &Ruleset) -> Self {
        Self {
            seed,
            rng,
            phase: GamePhase::Ready,
            level: 1,
            lives: rules.starting_lives,
            asteroids_destroyed: 0,
            time_ticks: 0,
            ship: Ship::new(Self::arena_center(rules), rules.ship_radius),
            asteroids: Vec::new(),
            bullets: Vec::new(),
            active_asteroids: 0,
            abilities: Abilities::new(rules),
            spawn: SpawnSchedule::idle(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Ready → Playing: begin spawning level 1
    pub fn start(&mut self, rules: &Ruleset) {
        if self.phase != GamePhase::Ready {
            return;
        }
        self.phase = GamePhase::Playing;
        super::spawner::begin_level(self, rules);
    }

    /// Reinitialize everything in one step and re-enter Playing.
    ///
    /// The RNG stream carries over so consecutive runs differ.
    pub fn restart(&mut self, rules: &Ruleset) {
        let rng = self.rng.clone();
        *self = Self::with_rng(self.seed, rng, rules);
        log::info!("Session restarted");
        self.start(rules);
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn arena_center(rules: &Ruleset) -> Vec2 {
        Vec2::new(rules.arena_width / 2.0, rules.arena_height / 2.0)
    }

    /// Asteroids actually present and not yet destroyed
    pub fn live_asteroid_count(&self) -> usize {
        self.asteroids.iter().filter(|a| a.alive).count()
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.time_ticks as f32 * crate::consts::SIM_DT
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.asteroids.sort_by_key(|a| a.id);
        self.bullets.sort_by_key(|b| b.id);
    }
}
