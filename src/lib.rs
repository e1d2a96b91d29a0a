//! Asteroid Arena - simulation core for a wraparound space shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, collisions, spawning, game state)
//! - `tuning`: Data-driven game balance (`Ruleset`)
//! - `highscores`: Top-10 leaderboard cache
//! - `store`: Score persistence collaborator interface
//! - `session`: Input API, frame driver and score finalization

pub mod error;
pub mod highscores;
pub mod session;
pub mod sim;
pub mod store;
pub mod tuning;

pub use error::{ConfigError, StoreError};
pub use highscores::{HighScoreEntry, HighScores};
pub use session::Session;
pub use store::{LocalScoreStore, RecordId, ScoreStore, ScoreUpdate};
pub use tuning::Ruleset;

use glam::Vec2;
use rand::Rng;

/// Simulation timing constants
pub mod consts {
    /// Simulation rate (ticks per second)
    pub const TICK_RATE: f32 = 60.0;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICK_RATE;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta the driver will accumulate
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Normalize an angle to [0, 2π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::TAU;
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Unit vector the ship's nose points along for a given heading.
///
/// Heading 0 points along +y (the ship starts upright).
#[inline]
pub fn heading_vector(heading: f32) -> Vec2 {
    Vec2::from_angle(heading + std::f32::consts::FRAC_PI_2)
}

/// Uniform random value in [min, max], tolerating a degenerate range
#[inline]
pub fn random_in_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..=max)
    } else {
        min
    }
}

/// Convert a duration in seconds to whole simulation ticks
#[inline]
pub fn secs_to_ticks(secs: f32) -> u32 {
    (secs.max(0.0) * consts::TICK_RATE).round() as u32
}
