use arcade_core::geometry::Aabb;
use arcade_core::input::MovementIntent;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::RunnerConfig;
use crate::spawner::{Obstacle, ObstacleKind};

/// State of a single runner. `x` is distance along the course, `height` is
/// the body's feet above the lane's ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerBody {
    pub lane: usize,
    pub x: f32,
    pub height: f32,
    pub vy: f32,
    pub grounded: bool,
    pub crouching: bool,
}

impl RunnerBody {
    pub fn new(lane: usize) -> Self {
        Self {
            lane,
            x: 0.0,
            height: 0.0,
            vy: 0.0,
            grounded: true,
            crouching: false,
        }
    }

    /// Current collision height.
    pub fn body_height(&self, config: &RunnerConfig) -> f32 {
        if self.crouching {
            config.physics.crouch_height
        } else {
            config.physics.runner_height
        }
    }

    /// Centre of the collision box in world coordinates.
    pub fn center(&self, config: &RunnerConfig) -> Vec2 {
        Vec2::new(
            self.x,
            config.lane_base(self.lane) + self.height + self.body_height(config) / 2.0,
        )
    }

    pub fn half_extents(&self, config: &RunnerConfig) -> Vec2 {
        Vec2::new(config.physics.runner_width / 2.0, self.body_height(config) / 2.0)
    }

    pub fn aabb(&self, config: &RunnerConfig) -> Aabb {
        Aabb::from_center(self.center(config), self.half_extents(config))
    }
}

/// Forward speed dictated by the step schedule at `clock` simulated seconds.
pub fn scheduled_speed(clock: f32, config: &RunnerConfig) -> f32 {
    let p = &config.physics;
    let steps = if p.speedup_interval_secs > 0.0 {
        (clock / p.speedup_interval_secs).floor()
    } else {
        0.0
    };
    p.run_speed * (1.0 + p.speedup_step * steps).min(p.max_speed_multiplier)
}

/// Apply jump/crouch intent for one step.
///
/// Jump and crouch start only while grounded. Releasing crouch stands the
/// runner back up unless an overhead obstacle is still above it.
pub fn apply_intent(
    runner: &mut RunnerBody,
    intent: &MovementIntent,
    obstacles: &[Obstacle],
    config: &RunnerConfig,
) {
    if intent.jump && runner.grounded && !runner.crouching {
        runner.vy = config.physics.jump_velocity;
        runner.grounded = false;
    }

    if intent.crouch {
        if runner.grounded {
            runner.crouching = true;
        }
    } else if runner.crouching {
        let standing = RunnerBody {
            crouching: false,
            ..runner.clone()
        }
        .aabb(config);
        let blocked = obstacles
            .iter()
            .filter(|o| o.lane == runner.lane && o.kind == ObstacleKind::High)
            .any(|o| o.aabb(config).overlaps_x(&standing));
        if !blocked {
            runner.crouching = false;
        }
    }
}

/// Integrate gravity and forward motion.
pub fn integrate(runner: &mut RunnerBody, speed: f32, dt: f32, config: &RunnerConfig) {
    runner.vy += config.physics.gravity * dt;
    runner.height += runner.vy * dt;
    if runner.height <= 0.0 {
        runner.height = 0.0;
        runner.vy = 0.0;
        runner.grounded = true;
    }
    runner.x += speed * dt;
}
