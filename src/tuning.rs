//! Data-driven game balance
//!
//! Every tunable number of the simulation lives in one `Ruleset` that is
//! handed to the session at construction. The ruleset can be loaded from a
//! JSON file; fields missing from the file keep their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secs_to_ticks;

/// Complete set of tunables for a game session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Distance past an edge before a body is teleported to the opposite side
    pub wrap_margin: f32,
    /// Toroidal wraparound for ship and asteroids (the edge loop still applies)
    pub wrap_enabled: bool,

    // === Ship ===
    pub ship_radius: f32,
    /// Distance from ship center to the nose where bullets spawn
    pub ship_nose_offset: f32,
    /// Forward acceleration while thrusting (units/s²)
    pub thrust_power: f32,
    /// Fraction of velocity removed every tick
    pub damping_factor: f32,
    pub invulnerability_secs: f32,
    /// One fade-out/fade-in cycle of the post-respawn blink
    pub blink_period_secs: f32,

    // === Session ===
    pub starting_lives: u8,

    // === Asteroid population ===
    pub starting_asteroids: u32,
    pub asteroids_per_level: u32,
    pub base_asteroid_speed: f32,
    pub asteroid_speed_increase: f32,
    pub spawn_stagger_secs: f32,
    pub level_clear_pause_secs: f32,
    pub split_speed: f32,

    // === Asteroid sizes ===
    pub min_asteroid_radius: f32,
    pub small_radius: f32,
    pub medium_radius: f32,
    pub large_radius: f32,
    /// Relative variation applied to child radii
    pub radius_variation: f32,
    pub spawn_radius_min: f32,
    pub spawn_radius_max: f32,
    pub silhouette_vertices: usize,
    /// Silhouette vertex radii vary within [1 - jitter, 1 + jitter]
    pub silhouette_jitter: f32,

    // === Bullets ===
    pub bullet_speed: f32,
    pub bullet_lifetime_secs: f32,
    pub bullet_radius: f32,
    pub bullets_per_level: u32,
    /// Delay between running dry and the forced life loss
    pub out_of_bullets_delay_secs: f32,

    // === Shield ===
    pub shield_charges: u32,
    pub shield_duration_secs: f32,
    pub shield_radius: f32,

    // === Super-fire ===
    pub super_fire_charges: u32,
    pub super_fire_duration_secs: f32,
    pub super_fire_interval_secs: f32,
    pub super_fire_directions: u32,
    pub super_fire_bullet_speed: f32,
    pub super_fire_bullet_lifetime_secs: f32,
    /// Ship spin rate while super-fire is active (rad/s)
    pub spin_rate: f32,

    // === Rapid fire ===
    pub rapid_fire_hold_secs: f32,
    pub rapid_fire_interval_secs: f32,
    pub rapid_fire_fast_interval_secs: f32,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            arena_width: 1024.0,
            arena_height: 768.0,
            wrap_margin: 20.0,
            wrap_enabled: true,

            ship_radius: 15.0,
            ship_nose_offset: 15.0,
            thrust_power: 240.0,
            damping_factor: 0.01,
            invulnerability_secs: 1.2,
            blink_period_secs: 0.2,

            starting_lives: 3,

            starting_asteroids: 20,
            asteroids_per_level: 5,
            base_asteroid_speed: 50.0,
            asteroid_speed_increase: 10.0,
            spawn_stagger_secs: 0.3,
            level_clear_pause_secs: 2.0,
            split_speed: 75.0,

            min_asteroid_radius: 10.0,
            small_radius: 15.0,
            medium_radius: 25.0,
            large_radius: 40.0,
            radius_variation: 0.2,
            spawn_radius_min: 15.0,
            spawn_radius_max: 30.0,
            silhouette_vertices: 10,
            silhouette_jitter: 0.3,

            bullet_speed: 400.0,
            bullet_lifetime_secs: 1.5,
            bullet_radius: 2.0,
            bullets_per_level: 200,
            out_of_bullets_delay_secs: 1.5,

            shield_charges: 10,
            shield_duration_secs: 3.0,
            shield_radius: 50.0,

            super_fire_charges: 5,
            super_fire_duration_secs: 3.0,
            super_fire_interval_secs: 0.1,
            super_fire_directions: 3,
            super_fire_bullet_speed: 500.0,
            super_fire_bullet_lifetime_secs: 1.0,
            spin_rate: std::f32::consts::TAU,

            rapid_fire_hold_secs: 2.0,
            rapid_fire_interval_secs: 0.1,
            rapid_fire_fast_interval_secs: 0.05,
        }
    }
}

impl Ruleset {
    /// Parse a ruleset from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let rules: Ruleset = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load a ruleset from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_json_str(&json)?;
        log::info!("Loaded ruleset from {}", path.display());
        Ok(rules)
    }

    /// Load a ruleset, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!("{e}; using default ruleset");
                Self::default()
            }
        }
    }

    /// Check the ruleset for values the simulation cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.arena_width <= 0.0 || self.arena_height <= 0.0 {
            return invalid("arena dimensions must be positive");
        }
        if self.wrap_margin < 0.0 {
            return invalid("wrap margin must not be negative");
        }
        if !(0.0..1.0).contains(&self.damping_factor) {
            return invalid("damping factor must be in [0, 1)");
        }
        if !(self.min_asteroid_radius <= self.small_radius
            && self.small_radius < self.medium_radius
            && self.medium_radius < self.large_radius)
        {
            return invalid("asteroid tiers must satisfy min <= small < medium < large");
        }
        if self.spawn_radius_min > self.spawn_radius_max {
            return invalid("spawn radius range is inverted");
        }
        if self.spawn_radius_min < self.min_asteroid_radius {
            return invalid("spawn radius range must respect the minimum radius");
        }
        if secs_to_ticks(self.super_fire_interval_secs) == 0
            || secs_to_ticks(self.rapid_fire_interval_secs) == 0
            || secs_to_ticks(self.rapid_fire_fast_interval_secs) == 0
        {
            return invalid("fire intervals must be at least one tick");
        }
        if self.starting_lives == 0 {
            return invalid("starting lives must be at least one");
        }
        Ok(())
    }

    pub fn invulnerability_ticks(&self) -> u32 {
        secs_to_ticks(self.invulnerability_secs)
    }

    pub fn blink_period_ticks(&self) -> u32 {
        secs_to_ticks(self.blink_period_secs)
    }

    pub fn spawn_stagger_ticks(&self) -> u32 {
        secs_to_ticks(self.spawn_stagger_secs)
    }

    pub fn level_clear_pause_ticks(&self) -> u32 {
        secs_to_ticks(self.level_clear_pause_secs)
    }

    pub fn bullet_lifetime_ticks(&self) -> u32 {
        secs_to_ticks(self.bullet_lifetime_secs)
    }

    pub fn out_of_bullets_delay_ticks(&self) -> u32 {
        secs_to_ticks(self.out_of_bullets_delay_secs)
    }

    pub fn shield_duration_ticks(&self) -> u32 {
        secs_to_ticks(self.shield_duration_secs)
    }

    pub fn super_fire_duration_ticks(&self) -> u32 {
        secs_to_ticks(self.super_fire_duration_secs)
    }

    pub fn super_fire_interval_ticks(&self) -> u32 {
        secs_to_ticks(self.super_fire_interval_secs).max(1)
    }

    pub fn super_fire_bullet_lifetime_ticks(&self) -> u32 {
        secs_to_ticks(self.super_fire_bullet_lifetime_secs)
    }

    pub fn rapid_fire_hold_ticks(&self) -> u32 {
        secs_to_ticks(self.rapid_fire_hold_secs)
    }

    pub fn rapid_fire_interval_ticks(&self) -> u32 {
        secs_to_ticks(self.rapid_fire_interval_secs).max(1)
    }

    pub fn rapid_fire_fast_interval_ticks(&self) -> u32 {
        secs_to_ticks(self.rapid_fire_fast_interval_secs).max(1)
    }
}
