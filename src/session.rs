//! Game session: the input surface, the frame driver and score finalization
//!
//! Frontends push normalized inputs, call `update` once per rendered frame,
//! and pull a `Snapshot` to draw. The score is handed to the `ScoreStore`
//! exactly once per run, on entering GameOver.

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::sim::{FireCadence, GameEvent, GamePhase, GameState, Snapshot, TickInput, tick};
use crate::store::{RecordId, ScoreStore};
use crate::tuning::Ruleset;

pub const DEFAULT_PLAYER_NAME: &str = "Player";

pub struct Session<S: ScoreStore> {
    rules: Ruleset,
    state: GameState,
    input: TickInput,
    accumulator: f32,
    store: S,
    player_name: String,
    /// Set once the current run's score has been submitted
    last_record: Option<RecordId>,
    finalized: bool,
    /// Events from every tick since the last `take_events`
    events: Vec<GameEvent>,
}

impl<S: ScoreStore> Session<S> {
    /// New session in the Ready phase
    pub fn new(rules: Ruleset, seed: u64, store: S) -> Self {
        let state = GameState::new(seed, &rules);
        Self {
            rules,
            state,
            input: TickInput::default(),
            accumulator: 0.0,
            store,
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            last_record: None,
            finalized: false,
            events: Vec::new(),
        }
    }

    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = name.into();
        self
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = name.into();
    }

    // === Inputs ===

    /// Rotate by `delta` radians on the next tick (accumulates until consumed)
    pub fn set_heading_delta(&mut self, delta: f32) {
        self.input.heading_delta += delta;
    }

    pub fn set_thrust_active(&mut self, active: bool) {
        self.input.thrust = active;
    }

    pub fn fire_once(&mut self) {
        self.input.fire = true;
    }

    /// Held-fire signal; `cadence` picks base or fast repetition
    pub fn set_fire_held(&mut self, held: bool, cadence: FireCadence) {
        self.input.fire_held = held;
        self.input.fire_cadence = cadence;
    }

    pub fn activate_shield(&mut self) {
        self.input.activate_shield = true;
    }

    pub fn activate_super_fire(&mut self) {
        self.input.activate_super_fire = true;
    }

    // === Lifecycle ===

    /// Ready → Playing
    pub fn start(&mut self) {
        self.state.start(&self.rules);
        self.collect_events();
    }

    /// Throw the current run away and begin a fresh one.
    ///
    /// Everything is replaced before the next tick runs; pending inputs and
    /// partial frame time are dropped too.
    pub fn restart(&mut self) {
        self.state.restart(&self.rules);
        self.input = TickInput::default();
        self.accumulator = 0.0;
        self.last_record = None;
        self.finalized = false;
        self.collect_events();
    }

    /// Run simulation ticks for one rendered frame. Returns ticks run.
    /// A non-finite frame time counts as an empty frame.
    pub fn update(&mut self, frame_dt: f32) -> u32 {
        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += frame_dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Run exactly one tick
    pub fn step(&mut self) {
        tick(&mut self.state, &self.input, &self.rules, SIM_DT);
        self.collect_events();

        // Clear one-shot inputs after processing
        self.input.heading_delta = 0.0;
        self.input.fire = false;
        self.input.activate_shield = false;
        self.input.activate_super_fire = false;

        if self.state.phase == GamePhase::GameOver && !self.finalized {
            self.finalize_score();
        }
    }

    fn finalize_score(&mut self) {
        self.finalized = true;
        let id = self
            .store
            .submit(&self.player_name, self.state.asteroids_destroyed, self.state.level);
        log::info!(
            "Submitted score {} for {} (record {})",
            self.state.asteroids_destroyed,
            self.player_name,
            id.0
        );
        self.last_record = Some(id);
    }

    fn collect_events(&mut self) {
        self.events.extend(self.state.events.drain(..));
    }

    // === Outputs ===

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, &self.rules)
    }

    /// Drain events recorded since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether the current score would make the board
    pub fn is_high_score(&self) -> bool {
        self.store.is_high_score(self.state.asteroids_destroyed)
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for tools and tests
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn rules(&self) -> &Ruleset {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Record id of this run's submitted score, once GameOver is reached
    pub fn last_record(&self) -> Option<RecordId> {
        self.last_record
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalScoreStore;

    fn session() -> Session<LocalScoreStore> {
        Session::new(Ruleset::default(), 4242, LocalScoreStore::in_memory())
    }

    #[test]
    fn test_update_runs_fixed_ticks() {
        let mut s = session();
        s.start();
        assert_eq!(s.update(1.0 / 60.0 + 1e-4), 1);
        assert_eq!(s.update(0.5 / 60.0), 0);
        assert_eq!(s.update(0.6 / 60.0), 1);
        assert_eq!(s.state().time_ticks, 2);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut s = session();
        s.start();
        // 5 s hitch is clamped to 0.1 s, roughly 6 ticks
        let ran = s.update(5.0);
        assert!((5..=6).contains(&ran));
        assert!(ran <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_non_finite_frame_is_ignored() {
        let mut s = session();
        s.start();
        assert_eq!(s.update(f32::NAN), 0);
        assert_eq!(s.update(f32::INFINITY), 0);
        assert_eq!(s.update(-1.0), 0);
        assert_eq!(s.update(1.0 / 60.0 + 1e-4), 1);
        assert_eq!(s.update(1.0 / 60.0), 1);
        assert_eq!(s.state().time_ticks, 2);
    }

    #[test]
    fn test_one_shot_inputs_consumed_once() {
        let mut s = session();
        s.start();
        s.fire_once();
        s.update(3.0 / 60.0 + 1e-4);
        let fired = s.take_events().iter().filter(|e| matches!(e, GameEvent::ShotFired { .. })).count();
        assert_eq!(fired, 1);
        assert_eq!(s.state().abilities.bullets_remaining, 199);
    }

    #[test]
    fn test_heading_delta_accumulates_until_tick() {
        let mut s = session();
        s.start();
        s.set_heading_delta(0.1);
        s.set_heading_delta(0.2);
        s.step();
        assert!((s.state().ship.heading - 0.3).abs() < 1e-5);
        s.step();
        assert!((s.state().ship.heading - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_thrust_persists() {
        let mut s = session();
        s.start();
        s.set_thrust_active(true);
        s.step();
        let v1 = s.state().ship.vel.length();
        s.step();
        assert!(s.state().ship.vel.length() > v1);
    }

    #[test]
    fn test_ability_inputs() {
        let mut s = session();
        s.start();
        s.activate_shield();
        s.activate_super_fire();
        s.step();
        let hud = s.snapshot().hud;
        assert_eq!(hud.shield_charges, 9);
        assert_eq!(hud.super_fire_charges, 4);
        assert!(s.snapshot().ship.shielded);
        assert!(s.snapshot().ship.spinning);
    }

    #[test]
    fn test_start_events_are_kept() {
        let mut s = session();
        s.start();
        let events = s.take_events();
        assert!(events.contains(&GameEvent::LevelStarted { level: 1, asteroids: 20 }));
        assert!(s.take_events().is_empty());
    }
}
