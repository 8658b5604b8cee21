use arcade_core::entity::{EntityId, Movable};
use arcade_core::geometry::{cartesian_to_polar, ray_circle_intersection};
use arcade_core::input::{MovementIntent, Steer};
use arcade_core::rng::{self, SimRng};

use crate::PongState;
use crate::arena;
use crate::config::PongConfig;

/// A ball predicted to reach this paddle's sector.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Threat {
    /// Seconds until the ball reaches the paddle ring.
    eta: f32,
    /// Angle at which it arrives.
    angle: f32,
}

/// Generate a paddle intent for an AI-controlled entity.
///
/// The bot picks the soonest ball heading into its sector and steers toward
/// the predicted crossing point. With no threat it drifts back to the
/// sector centre. A reaction gate makes it occasionally miss a tick.
pub fn generate_bot_intent(
    state: &PongState,
    entity: EntityId,
    config: &PongConfig,
    rng: &mut SimRng,
) -> MovementIntent {
    let n = state.paddles.len();
    let Some(paddle) = state.paddles.get(entity) else {
        return MovementIntent::IDLE;
    };
    if !state.world.is_alive(entity) {
        return MovementIntent::IDLE;
    }

    let paddle_pos = state.world.entities[entity].position;
    let threat = state
        .world
        .movables
        .iter()
        .filter(|ball| ball.velocity.dot(paddle_pos - ball.position) > 0.0)
        .filter_map(|ball| predict(ball, entity, n, config))
        .min_by(|a, b| a.eta.total_cmp(&b.eta));

    match threat {
        Some(threat) => {
            if !rng::chance(rng, config.ai_reaction_chance) {
                return MovementIntent::IDLE;
            }
            let target = arena::clamp_angle(threat.angle, entity, n);
            let off_target = arcade_core::geometry::angle_delta(paddle.angle(), target);
            if off_target.abs() <= config.ai_deadzone {
                return MovementIntent::IDLE;
            }
            MovementIntent::steer(Steer::TargetAngle(target))
        },
        None => {
            if paddle.offset.abs() <= config.ai_deadzone {
                MovementIntent::IDLE
            } else {
                MovementIntent::steer(Steer::Delta(-paddle.offset.signum() * config.ai_return_rate))
            }
        },
    }
}

/// Where and when `ball` crosses the paddle ring, if it does so inside
/// `entity`'s sector within the horizon.
fn predict(ball: &Movable, entity: EntityId, n: usize, config: &PongConfig) -> Option<Threat> {
    let eta = ray_circle_intersection(ball.position, ball.velocity, config.paddle_ring_radius)?;
    if eta > config.ai_horizon_secs {
        return None;
    }
    let crossing = ball.position + ball.velocity * eta;
    let (_, angle) = cartesian_to_polar(crossing);
    (arena::sector_for_angle(angle, n) == entity).then_some(Threat { eta, angle })
}
