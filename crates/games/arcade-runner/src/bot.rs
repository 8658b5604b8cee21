use arcade_core::entity::EntityId;
use arcade_core::input::MovementIntent;
use arcade_core::rng::{self, SimRng};

use crate::RunnerState;
use crate::config::RunnerConfig;
use crate::spawner::ObstacleKind;

/// Seconds of clear track required before jumping for a coin.
const COIN_JUMP_CLEARANCE_SECS: f32 = 1.2;

/// Generate a runner intent for an AI-controlled entity.
///
/// Looks at the next obstacle in the runner's own lane: jumps low ones and
/// crouches under overhead ones once they are inside the lead distance.
/// With nothing close it may jump for an airborne coin.
pub fn generate_bot_intent(
    state: &RunnerState,
    entity: EntityId,
    config: &RunnerConfig,
    rng: &mut SimRng,
) -> MovementIntent {
    let Some(runner) = state.runners.get(entity) else {
        return MovementIntent::IDLE;
    };
    if !state.world.is_alive(entity) {
        return MovementIntent::IDLE;
    }

    let ai = &config.ai;
    let half_width = config.physics.runner_width / 2.0;
    let front = runner.x + half_width;
    let speed = state.speed.max(f32::EPSILON);

    let next = state.spawner.next_in_lane(runner.lane, runner.x - half_width);
    let gap = next.map(|o| o.x - o.half_width - front);

    if let (Some(obstacle), Some(gap)) = (next, gap) {
        let lead = match obstacle.kind {
            ObstacleKind::Low => ai.jump_lead_secs,
            ObstacleKind::High => ai.crouch_lead_secs,
        };
        if gap <= speed * lead {
            if !rng::chance(rng, ai.reaction_chance) {
                return MovementIntent::IDLE;
            }
            return match obstacle.kind {
                ObstacleKind::Low => MovementIntent {
                    jump: true,
                    ..MovementIntent::IDLE
                },
                ObstacleKind::High => MovementIntent {
                    crouch: true,
                    ..MovementIntent::IDLE
                },
            };
        }
    }

    let track_clear = gap.is_none_or(|g| g > speed * COIN_JUMP_CLEARANCE_SECS);
    if ai.chase_coins && runner.grounded && track_clear {
        let lane_base = config.lane_base(runner.lane);
        let reach = config.physics.runner_height;
        let coin_ahead = state.world.movables.iter().any(|coin| {
            let above_ground = coin.position.y - lane_base;
            let dx = coin.position.x - front;
            (0.0..config.lane_height).contains(&above_ground)
                && above_ground - coin.radius > reach
                && dx > 0.0
                && dx <= speed * ai.jump_lead_secs
        });
        if coin_ahead && rng::chance(rng, ai.reaction_chance) {
            return MovementIntent {
                jump: true,
                ..MovementIntent::IDLE
            };
        }
    }

    MovementIntent::IDLE
}
