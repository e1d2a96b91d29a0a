//! Read-only view of a session for renderers and the HUD

use serde::Serialize;

use super::state::{AsteroidTier, BulletKind, GamePhase, GameState};
use crate::tuning::Ruleset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipView {
    pub pos: (f32, f32),
    pub heading: f32,
    pub alive: bool,
    pub invulnerable: bool,
    /// False during the "off" half of a blink cycle
    pub visible: bool,
    pub shielded: bool,
    pub spinning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsteroidView {
    pub id: u32,
    pub pos: (f32, f32),
    pub radius: f32,
    pub tier: AsteroidTier,
    pub outline: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletView {
    pub pos: (f32, f32),
    pub heading: f32,
    pub kind: BulletKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub lives: u8,
    pub level: u32,
    pub elapsed_secs: f32,
    pub active_asteroids: u32,
    pub score: u64,
    pub bullets_remaining: u32,
    pub shield_charges: u32,
    pub super_fire_charges: u32,
    pub out_of_bullets: bool,
}

/// Everything a frontend needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub ship: ShipView,
    pub asteroids: Vec<AsteroidView>,
    pub bullets: Vec<BulletView>,
    pub hud: Hud,
}

impl Snapshot {
    pub fn capture(state: &GameState, rules: &Ruleset) -> Self {
        let ship = &state.ship;
        Self {
            phase: state.phase,
            ship: ShipView {
                pos: ship.pos.into(),
                heading: ship.heading,
                alive: ship.alive,
                invulnerable: ship.is_invulnerable(),
                visible: ship.alive && ship.blink_visible(rules.blink_period_ticks()),
                shielded: ship.shielded,
                spinning: ship.spinning,
            },
            asteroids: state
                .asteroids
                .iter()
                .filter(|a| a.alive)
                .map(|a| AsteroidView {
                    id: a.id,
                    pos: a.pos.into(),
                    radius: a.radius,
                    tier: a.tier(rules),
                    outline: a.silhouette.outline(a.radius).into_iter().map(Into::into).collect(),
                })
                .collect(),
            bullets: state
                .bullets
                .iter()
                .filter(|b| b.alive)
                .map(|b| BulletView {
                    pos: b.pos.into(),
                    heading: b.heading,
                    kind: b.kind,
                })
                .collect(),
            hud: Hud {
                lives: state.lives,
                level: state.level,
                elapsed_secs: state.elapsed_secs(),
                active_asteroids: state.active_asteroids,
                score: state.asteroids_destroyed,
                bullets_remaining: state.abilities.bullets_remaining,
                shield_charges: state.abilities.shield_charges,
                super_fire_charges: state.abilities.super_fire_charges,
                out_of_bullets: state.abilities.penalty_pending(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_of_fresh_state() {
        let rules = Ruleset::default();
        let state = GameState::new(5, &rules);
        let snap = Snapshot::capture(&state, &rules);
        assert_eq!(snap.phase, GamePhase::Ready);
        assert!(snap.asteroids.is_empty());
        assert_eq!(snap.hud.lives, 3);
        assert_eq!(snap.hud.bullets_remaining, 200);
        assert_eq!(snap.hud.shield_charges, 10);
        assert_eq!(snap.hud.super_fire_charges, 5);
        assert!(snap.ship.visible);
    }

    #[test]
    fn test_snapshot_serializes() {
        let rules = Ruleset::default();
        let mut state = GameState::new(5, &rules);
        state.start(&rules);
        crate::sim::spawner::spawn_edge_asteroid(&mut state, &rules);
        let snap = Snapshot::capture(&state, &rules);
        assert_eq!(snap.asteroids[0].outline.len(), rules.silhouette_vertices);
        let json = serde_json::to_string(&snap).expect("serialize");
        assert!(json.contains("\"hud\""));
    }
}
