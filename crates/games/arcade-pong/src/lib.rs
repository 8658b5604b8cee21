pub mod arena;
pub mod bot;
pub mod collision;
pub mod config;
pub mod physics;
pub mod scoring;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use arcade_core::arcade_game_boilerplate;
use arcade_core::entity::{EntityId, World};
use arcade_core::game_registry::GameKind;
use arcade_core::game_trait::{ArcadeGame, GameEvent, GameMetadata};
use arcade_core::geometry::{normalize_angle, polar_to_cartesian};
use arcade_core::input::{MovementIntent, PointerMapping};
use arcade_core::rng::SimRng;
use arcade_core::scoring::WinRules;

use config::PongConfig;

/// Angular state of one paddle. The paddle sits at `base_angle + offset`
/// on the paddle ring; `offset` never leaves `[-π/n, π/n]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub base_angle: f32,
    pub offset: f32,
    /// rad/s, derived from the last applied step.
    pub angular_velocity: f32,
}

impl Paddle {
    pub fn angle(&self) -> f32 {
        normalize_angle(self.base_angle + self.offset)
    }
}

/// Serializable game state for network broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongState {
    pub world: World,
    pub paddles: Vec<Paddle>,
    /// Simulated seconds since release; drives the speed schedule.
    pub clock: f32,
    /// Seconds the balls travelled in the most recent integrate step.
    pub last_step: f32,
    pub launched: bool,
    pub bounces: u32,
    pub goals: u32,
    pub peak_speed: f32,
}

impl PongState {
    fn empty() -> Self {
        Self {
            world: World::new(),
            paddles: Vec::new(),
            clock: 0.0,
            last_step: 0.0,
            launched: false,
            bounces: 0,
            goals: 0,
            peak_speed: 0.0,
        }
    }
}

/// Circular multi-paddle Pong: N paddles share one ring, each defending its
/// own sector. Fewest goals against wins.
pub struct CircularPong {
    state: PongState,
    config: PongConfig,
}

impl CircularPong {
    pub fn new() -> Self {
        Self::with_config(PongConfig::load())
    }

    pub fn with_config(config: PongConfig) -> Self {
        Self {
            state: PongState::empty(),
            config,
        }
    }

    pub fn state(&self) -> &PongState {
        &self.state
    }

    /// Mutable state for staging scenarios (ball placement, paddle offsets).
    /// Call [`sync_paddles`](Self::sync_paddles) after moving paddles.
    pub fn state_mut(&mut self) -> &mut PongState {
        &mut self.state
    }

    pub fn config(&self) -> &PongConfig {
        &self.config
    }

    /// Project paddle angles onto the entity table.
    pub fn sync_paddles(&mut self) {
        let n = self.state.paddles.len();
        for (paddle, entity) in self
            .state
            .paddles
            .iter()
            .zip(self.state.world.entities.iter_mut())
        {
            entity.position = polar_to_cartesian(self.config.paddle_ring_radius, paddle.angle());
            entity.velocity = if entity.alive {
                let tangent = Vec2::from_angle(paddle.angle()).perp();
                tangent * paddle.angular_velocity * self.config.paddle_ring_radius
            } else {
                Vec2::ZERO
            };
            entity.shape = physics::paddle_shape(paddle, n, &self.config);
        }
    }
}

impl Default for CircularPong {
    fn default() -> Self {
        Self::with_config(PongConfig::default())
    }
}

impl ArcadeGame for CircularPong {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Circular Pong".to_string(),
            description: "Defend your slice of the ring. Fewest goals against wins.".to_string(),
            kind: GameKind::CircularPong,
            min_entities: 2,
            max_entities: 8,
            estimated_round_duration: Duration::from_secs(90),
        }
    }

    fn init(&mut self, entity_count: usize, local: Option<EntityId>, _rng: &mut SimRng) {
        let mut state = PongState::empty();
        for i in 0..entity_count {
            let paddle = Paddle {
                base_angle: arena::base_angle(i, entity_count),
                offset: 0.0,
                angular_velocity: 0.0,
            };
            state.world.add_entity(
                polar_to_cartesian(self.config.paddle_ring_radius, paddle.angle()),
                physics::paddle_shape(&paddle, entity_count, &self.config),
                Some(i) == local,
            );
            state.paddles.push(paddle);
        }
        state.world.zones = arena::sector_zones(entity_count);
        self.state = state;
    }

    fn start(&mut self, rng: &mut SimRng) {
        for _ in 0..self.config.ball_count {
            let speed = self.config.ball_base_speed;
            physics::spawn_ball(&mut self.state.world, rng, speed, &self.config);
        }
        self.state.launched = true;
        tracing::debug!(balls = self.config.ball_count, "Balls launched");
    }

    fn ai_intent(&self, entity: EntityId, rng: &mut SimRng) -> MovementIntent {
        bot::generate_bot_intent(&self.state, entity, &self.config, rng)
    }

    fn integrate(&mut self, dt: f32, intents: &[MovementIntent]) {
        let n = self.state.paddles.len();
        for (i, paddle) in self.state.paddles.iter_mut().enumerate() {
            if !self.state.world.is_alive(i) {
                paddle.angular_velocity = 0.0;
                continue;
            }
            let intent = intents.get(i).copied().unwrap_or_default();
            physics::steer_paddle(paddle, &intent, n, &self.config, dt);
        }
        self.sync_paddles();

        self.state.last_step = 0.0;
        if self.state.launched {
            self.state.clock += dt;
            self.state.last_step = dt;
            physics::apply_speed_schedule(&mut self.state.world, self.state.clock, &self.config);
            self.state.world.integrate_movables(dt);
            for ball in &self.state.world.movables {
                self.state.peak_speed = self.state.peak_speed.max(ball.speed);
            }
        }
    }

    fn resolve_collisions(&mut self, now: Duration, rng: &mut SimRng) -> Vec<GameEvent> {
        collision::resolve(&mut self.state, &self.config, now, rng)
    }

    fn rules(&self) -> WinRules {
        scoring::win_rules(&self.config)
    }

    fn pointer_mapping(&self) -> PointerMapping {
        PointerMapping::Angular { pivot: Vec2::ZERO }
    }

    fn withdraw(&mut self, entity: EntityId) {
        if self.state.world.kill(entity) {
            if let Some(paddle) = self.state.paddles.get_mut(entity) {
                paddle.angular_velocity = 0.0;
            }
            tracing::debug!(entity, "Paddle withdrawn; sector is now a wall");
        }
    }

    fn details(&self) -> serde_json::Value {
        scoring::result_details(&self.state)
    }

    fn clear(&mut self) {
        self.state.world.clear();
        self.state.paddles.clear();
        self.state.launched = false;
        self.state.last_step = 0.0;
    }

    arcade_game_boilerplate!(state_type: PongState);
}
