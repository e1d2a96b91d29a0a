//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, input decoding or storage dependencies

pub mod abilities;
pub mod arena;
pub mod collision;
pub mod movement;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod tick;

pub use abilities::{Abilities, FireCadence};
pub use collision::{Category, Contact, detect_contacts};
pub use snapshot::{AsteroidView, BulletView, Hud, ShipView, Snapshot};
pub use spawner::{SpawnSchedule, asteroid_count, asteroid_speed};
pub use state::{
    Asteroid, AsteroidTier, Bullet, BulletKind, GameEvent, GamePhase, GameState, LifeLossCause,
    Ship, Silhouette,
};
pub use tick::{TickInput, lose_life, tick};
