use arcade_core::entity::{MovableId, Shape, World};
use arcade_core::geometry::angle_delta;
use arcade_core::input::{MovementIntent, Steer};
use arcade_core::rng::{self, SimRng};
use glam::Vec2;

use super::Paddle;
use crate::arena;
use crate::config::PongConfig;

/// Move a paddle toward its steering target for one step.
///
/// Deltas are fractions of full paddle speed; targets are approached at no
/// more than full speed. The result is always clamped into the sector.
pub fn steer_paddle(
    paddle: &mut Paddle,
    intent: &MovementIntent,
    n: usize,
    config: &PongConfig,
    dt: f32,
) {
    let max_step = config.paddle_speed * dt;
    let step = match intent.steer {
        Steer::None => 0.0,
        Steer::Delta(d) => d.clamp(-1.0, 1.0) * max_step,
        Steer::TargetAngle(angle) => {
            let target = arena::clamp_offset(angle_delta(paddle.base_angle, angle), n);
            (target - paddle.offset).clamp(-max_step, max_step)
        },
        Steer::TargetOffset(offset) => {
            let target = arena::clamp_offset(offset, n);
            (target - paddle.offset).clamp(-max_step, max_step)
        },
    };

    let before = paddle.offset;
    paddle.offset = arena::clamp_offset(paddle.offset + step, n);
    paddle.angular_velocity = if dt > 0.0 {
        (paddle.offset - before) / dt
    } else {
        0.0
    };
}

/// Sector shape of a paddle, using its effective (sector-clipped) arc.
pub fn paddle_shape(paddle: &Paddle, n: usize, config: &PongConfig) -> Shape {
    let (center, half_width) = arena::paddle_arc(paddle.offset, config.paddle_half_arc, n);
    let half_thickness = config.paddle_thickness / 2.0;
    Shape::Sector {
        inner_radius: config.paddle_ring_radius - half_thickness,
        outer_radius: config.paddle_ring_radius + half_thickness,
        center_angle: paddle.base_angle + center,
        half_width,
    }
}

/// Ball speed dictated by the step schedule at `clock` simulated seconds.
pub fn scheduled_speed(clock: f32, config: &PongConfig) -> f32 {
    let steps = if config.speedup_interval_secs > 0.0 {
        (clock / config.speedup_interval_secs).floor()
    } else {
        0.0
    };
    let multiplier = (1.0 + config.speedup_step * steps).min(config.max_speed_multiplier);
    config.ball_base_speed * multiplier
}

/// Raise every ball to the scheduled speed. Balls already faster (from
/// bounce speed-ups) keep their speed.
pub fn apply_speed_schedule(world: &mut World, clock: f32, config: &PongConfig) {
    let target = scheduled_speed(clock, config);
    for ball in &mut world.movables {
        if ball.speed < target {
            ball.rescale(target);
        }
    }
}

/// Spawn a ball at the centre and launch it in a uniformly random direction.
pub fn spawn_ball(
    world: &mut World,
    rng: &mut SimRng,
    speed: f32,
    config: &PongConfig,
) -> MovableId {
    let id = world.spawn_movable(Vec2::ZERO, config.ball_radius);
    let angle = rng::uniform_angle(rng);
    if let Some(ball) = world.movable_mut(id) {
        ball.speed = speed;
        ball.launch(angle);
    }
    id
}
