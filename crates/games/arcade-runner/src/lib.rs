pub mod bot;
pub mod collision;
pub mod config;
pub mod physics;
pub mod scoring;
pub mod spawner;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use arcade_core::arcade_game_boilerplate;
use arcade_core::entity::{EntityId, Shape, World, Zone, ZoneGeometry};
use arcade_core::game_registry::GameKind;
use arcade_core::game_trait::{ArcadeGame, GameEvent, GameMetadata};
use arcade_core::input::MovementIntent;
use arcade_core::rng::SimRng;
use arcade_core::scoring::WinRules;

use config::RunnerConfig;
use physics::RunnerBody;
use spawner::{ObstacleKind, Spawner};

/// Serializable game state for network broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    /// Runner entities plus coins as movables.
    pub world: World,
    pub runners: Vec<RunnerBody>,
    pub spawner: Spawner,
    /// Coins collected per entity.
    pub coins: Vec<u32>,
    /// Simulated seconds since release.
    pub clock: f32,
    /// Current forward speed shared by every runner.
    pub speed: f32,
    pub started: bool,
}

impl RunnerState {
    fn empty(config: &RunnerConfig) -> Self {
        Self {
            world: World::new(),
            runners: Vec::new(),
            spawner: Spawner::new(config),
            coins: Vec::new(),
            clock: 0.0,
            speed: 0.0,
            started: false,
        }
    }
}

/// 1v1 endless runner. Each runner has its own lane with a mirrored course;
/// the last one standing wins.
pub struct RunnerGame {
    state: RunnerState,
    config: RunnerConfig,
}

impl RunnerGame {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::load())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            state: RunnerState::empty(&config),
            config,
        }
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RunnerState {
        &mut self.state
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Place an obstacle centred at course position `x` in `lane`.
    pub fn inject_obstacle(&mut self, lane: usize, kind: ObstacleKind, x: f32) -> u32 {
        self.state.spawner.insert(lane, kind, x, &self.config)
    }

    fn sync_entities(&mut self) {
        for (runner, entity) in self
            .state
            .runners
            .iter()
            .zip(self.state.world.entities.iter_mut())
        {
            entity.position = runner.center(&self.config);
            entity.shape = Shape::Box {
                half_extents: runner.half_extents(&self.config),
            };
            entity.velocity = if entity.alive {
                glam::Vec2::new(self.state.speed, runner.vy)
            } else {
                glam::Vec2::ZERO
            };
        }
    }

    /// Furthest and nearest alive runner positions.
    fn course_window(&self) -> (f32, f32) {
        let alive: Vec<f32> = self
            .state
            .runners
            .iter()
            .enumerate()
            .filter(|(i, _)| self.state.world.is_alive(*i))
            .map(|(_, r)| r.x)
            .collect();
        let lead = alive.iter().copied().fold(f32::MIN, f32::max);
        let trail = alive.iter().copied().fold(f32::MAX, f32::min);
        if alive.is_empty() { (0.0, 0.0) } else { (lead, trail) }
    }
}

impl Default for RunnerGame {
    fn default() -> Self {
        Self::with_config(RunnerConfig::default())
    }
}

impl ArcadeGame for RunnerGame {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Lane Runner".to_string(),
            description: "Jump, duck, grab coins. First to crash loses.".to_string(),
            kind: GameKind::Runner,
            min_entities: 2,
            max_entities: 2,
            estimated_round_duration: Duration::from_secs(60),
        }
    }

    fn init(&mut self, entity_count: usize, local: Option<EntityId>, _rng: &mut SimRng) {
        let mut state = RunnerState::empty(&self.config);
        for lane in 0..entity_count {
            let runner = RunnerBody::new(lane);
            state.world.add_entity(
                runner.center(&self.config),
                Shape::Box {
                    half_extents: runner.half_extents(&self.config),
                },
                Some(lane) == local,
            );
            state.world.zones.push(Zone {
                owner: Some(lane),
                geometry: ZoneGeometry::Lane {
                    y_min: self.config.lane_base(lane),
                    y_max: self.config.lane_base(lane + 1),
                },
            });
            state.runners.push(runner);
        }
        state.coins = vec![0; entity_count];
        self.state = state;
    }

    fn start(&mut self, rng: &mut SimRng) {
        self.state.started = true;
        self.state.speed = physics::scheduled_speed(0.0, &self.config);
        let lanes = self.state.runners.len();
        self.state
            .spawner
            .advance(&mut self.state.world, lanes, 0.0, 0.0, &self.config, rng);
        self.sync_entities();
        tracing::debug!(
            speed = self.state.speed,
            obstacles = self.state.spawner.obstacles.len(),
            "Runners released"
        );
    }

    fn ai_intent(&self, entity: EntityId, rng: &mut SimRng) -> MovementIntent {
        bot::generate_bot_intent(&self.state, entity, &self.config, rng)
    }

    fn integrate(&mut self, dt: f32, intents: &[MovementIntent]) {
        if !self.state.started {
            return;
        }
        let speed = self.state.speed;
        for (i, runner) in self.state.runners.iter_mut().enumerate() {
            if !self.state.world.is_alive(i) {
                continue;
            }
            let intent = intents.get(i).copied().unwrap_or_default();
            physics::apply_intent(runner, &intent, &self.state.spawner.obstacles, &self.config);
            physics::integrate(runner, speed, dt, &self.config);
        }
        self.state.clock += dt;
        self.state.speed = physics::scheduled_speed(self.state.clock, &self.config);
        self.sync_entities();
    }

    fn resolve_collisions(&mut self, _now: Duration, rng: &mut SimRng) -> Vec<GameEvent> {
        let events = collision::resolve(&mut self.state, &self.config);
        self.sync_entities();
        if self.state.started {
            let (lead, trail) = self.course_window();
            let lanes = self.state.runners.len();
            self.state
                .spawner
                .advance(&mut self.state.world, lanes, lead, trail, &self.config, rng);
        }
        events
    }

    fn progress(&self, entity: EntityId) -> f32 {
        self.state.runners.get(entity).map_or(0.0, |r| r.x)
    }

    fn rules(&self) -> WinRules {
        scoring::win_rules(&self.config)
    }

    fn withdraw(&mut self, entity: EntityId) {
        if self.state.world.kill(entity) {
            tracing::debug!(entity, "Runner withdrawn");
        }
    }

    fn details(&self) -> serde_json::Value {
        scoring::result_details(&self.state)
    }

    fn clear(&mut self) {
        self.state.world.clear();
        self.state.runners.clear();
        self.state.spawner.clear();
        self.state.started = false;
    }

    arcade_game_boilerplate!(state_type: RunnerState);
}

#[cfg(test)]
mod tests {
    use arcade_core::rng;
    use arcade_core::test_helpers::{self, TEST_SEED};

    use super::*;

    fn quiet_config() -> RunnerConfig {
        let mut config = RunnerConfig::default();
        config.spawn.enabled = false;
        config.physics.speedup_interval_secs = 0.0;
        config
    }

    // ================================================================
    // Game trait contract tests
    // ================================================================

    #[test]
    fn contract_init_creates_entities() {
        test_helpers::contract_init_creates_entities(&mut RunnerGame::default(), 2);
    }

    #[test]
    fn contract_start_sets_world_in_motion() {
        test_helpers::contract_start_sets_world_in_motion(&mut RunnerGame::default(), 2);
    }

    #[test]
    fn contract_withdrawn_entity_is_frozen() {
        test_helpers::contract_withdrawn_entity_is_frozen(&mut RunnerGame::default(), 2);
    }

    #[test]
    fn contract_ai_intents_are_valid() {
        test_helpers::contract_ai_intents_are_valid(&mut RunnerGame::default(), 2);
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        let mut game = RunnerGame::default();
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, Some(0), &mut rng);
        game.start(&mut rng);
        test_helpers::contract_state_roundtrip_preserves(&mut game);
    }

    #[test]
    fn contract_clear_releases_world() {
        test_helpers::contract_clear_releases_world(&mut RunnerGame::default(), 2);
    }

    // ================================================================
    // Game behaviour
    // ================================================================

    #[test]
    fn runners_hold_still_before_release() {
        let mut game = RunnerGame::with_config(quiet_config());
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, Some(0), &mut rng);
        game.integrate(1.0, &test_helpers::idle_intents(2));
        assert_eq!(game.progress(0), 0.0);
    }

    #[test]
    fn lanes_are_disjoint_zones() {
        let mut game = RunnerGame::default();
        game.init(2, Some(0), &mut rng::seeded(TEST_SEED));
        let zones = &game.state().world.zones;
        assert_eq!(zones.len(), 2);
        assert_eq!(
            zones[1].geometry,
            ZoneGeometry::Lane {
                y_min: 10.0,
                y_max: 20.0
            }
        );
    }

    #[test]
    fn idle_runner_crashes_into_injected_obstacle() {
        let config = quiet_config();
        let x = config.physics.run_speed * 5.0;
        let mut game = RunnerGame::with_config(config);
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, Some(0), &mut rng);
        game.start(&mut rng);
        game.inject_obstacle(0, ObstacleKind::Low, x);

        let mut crash_tick = None;
        let dt = 1.0 / 60.0;
        for tick in 1..=400 {
            game.integrate(dt, &test_helpers::idle_intents(2));
            let events = game.resolve_collisions(Duration::ZERO, &mut rng);
            if events.contains(&GameEvent::Eliminated { entity: 0 }) {
                crash_tick = Some(tick);
                break;
            }
        }
        let secs = crash_tick.map(|t| t as f32 * dt).unwrap_or(f32::MAX);
        assert!((4.7..=5.0).contains(&secs), "crashed at {secs}s");
        assert!(game.entities()[1].alive);
        assert!(game.progress(1) > game.progress(0) - 1e-3);
    }

    #[test]
    fn dead_runner_stops_advancing() {
        let mut game = RunnerGame::with_config(quiet_config());
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, Some(0), &mut rng);
        game.start(&mut rng);
        game.withdraw(0);
        game.integrate(1.0, &test_helpers::idle_intents(2));
        assert_eq!(game.progress(0), 0.0);
        assert!((game.progress(1) - 8.0).abs() < 1e-4);
    }

    #[test]
    fn course_keeps_generating_ahead() {
        let mut game = RunnerGame::default();
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, None, &mut rng);
        game.start(&mut rng);
        let before = game.state().spawner.spawned;
        for _ in 0..300 {
            let intents: Vec<_> = (0..2).map(|e| game.ai_intent(e, &mut rng)).collect();
            game.integrate(1.0 / 60.0, &intents);
            game.resolve_collisions(Duration::ZERO, &mut rng);
        }
        assert!(game.state().spawner.spawned > before);
        let trail = game.progress(0).min(game.progress(1));
        assert!(
            game.state()
                .spawner
                .obstacles
                .iter()
                .all(|o| o.x + o.half_width >= trail - game.config().spawn.despawn_behind)
        );
    }

    #[test]
    fn details_carry_distance_and_coins() {
        let mut game = RunnerGame::with_config(quiet_config());
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, Some(0), &mut rng);
        game.start(&mut rng);
        game.integrate(0.5, &test_helpers::idle_intents(2));
        let d = game.details();
        assert_eq!(d["coins"], serde_json::json!([0, 0]));
        assert!((d["distance"][1].as_f64().unwrap() - 4.0).abs() < 1e-3);
    }
}
