use std::time::Duration;

use glam::Vec2;

use arcade_core::entity::{Entity, EntityId, Movable, MovableId};
use arcade_core::game_trait::GameEvent;
use arcade_core::geometry::{
    cartesian_to_polar, polar_to_cartesian, ray_circle_intersection, reflect, rotate,
};
use arcade_core::rng::{self, SimRng};

use super::{Paddle, PongState};
use crate::arena;
use crate::config::PongConfig;
use crate::physics;

/// Gap left between a bounced ball and the surface it hit.
const SEPARATION: f32 = 0.5;

/// Resolve paddle bounces, dead-sector walls, and arena exits for every
/// ball. Exited balls are replaced by a fresh ball at the centre.
pub fn resolve(
    state: &mut PongState,
    config: &PongConfig,
    now: Duration,
    rng: &mut SimRng,
) -> Vec<GameEvent> {
    let n = state.paddles.len();
    let now_ms = now.as_millis() as u64;
    let inner = config.paddle_ring_radius - config.paddle_thickness / 2.0;
    let outer = config.paddle_ring_radius + config.paddle_thickness / 2.0;
    let mut events = Vec::new();
    let mut exited: Vec<(MovableId, EntityId)> = Vec::new();

    for ball in &mut state.world.movables {
        let (r, theta) = cartesian_to_polar(ball.position);
        if n == 0 || r + ball.radius < inner {
            continue;
        }
        let moving_out = ball.velocity.dot(ball.position / r) > 0.0;

        // A long step can carry a ball clean through the band; test the
        // point where its leading edge first reached it instead.
        let swept = if moving_out && r - ball.radius > outer {
            swept_contact(ball, state.last_step, inner)
        } else {
            None
        };
        let (contact_r, contact_theta) = swept.map_or((r, theta), cartesian_to_polar);

        if moving_out
            && contact_r - ball.radius <= outer
            && let Some(hit) = paddle_under(
                &state.paddles,
                &state.world.entities,
                contact_theta,
                ball.radius / contact_r,
                config,
            )
        {
            if ball.in_cooldown(Some(hit), now_ms, config.hit_cooldown_ms) {
                continue;
            }
            ball.position = polar_to_cartesian(contact_r, contact_theta);
            bounce_off_paddle(ball, rng, config, inner);
            ball.record_hit(Some(hit), now_ms);
            state.bounces += 1;
            events.push(GameEvent::Bounced {
                movable: ball.id,
                collider: Some(hit),
            });
            continue;
        }

        let owner = arena::sector_for_angle(contact_theta, n);
        let wall_closed = state.world.entities.get(owner).is_some_and(|e| !e.alive);
        let reached_wall = swept.is_some()
            || (r + ball.radius >= config.paddle_ring_radius
                && r - ball.radius <= config.arena_radius);
        if moving_out && wall_closed && reached_wall {
            if ball.in_cooldown(None, now_ms, config.hit_cooldown_ms) {
                continue;
            }
            ball.position = polar_to_cartesian(contact_r, contact_theta);
            bounce_off_wall(ball, config.paddle_ring_radius);
            ball.record_hit(None, now_ms);
            events.push(GameEvent::Bounced {
                movable: ball.id,
                collider: None,
            });
            continue;
        }

        if r - ball.radius > config.arena_radius {
            exited.push((ball.id, arena::sector_for_angle(theta, n)));
        }
    }

    for (id, owner) in exited {
        state.world.remove_movable(id);
        if state.world.is_alive(owner) {
            state.goals += 1;
            events.push(GameEvent::GoalConceded { entity: owner });
            tracing::debug!(ball = id, owner, "Goal conceded");
        }
        let speed = physics::scheduled_speed(state.clock, config);
        physics::spawn_ball(&mut state.world, rng, speed, config);
    }

    events
}

/// Where a ball that finished the last `step` seconds beyond the band first
/// touched its inner edge, or `None` if it started the step already past it.
fn swept_contact(ball: &Movable, step: f32, inner: f32) -> Option<Vec2> {
    if step <= 0.0 {
        return None;
    }
    let reach = inner - ball.radius;
    let start = ball.position - ball.velocity * step;
    if start.length() >= reach {
        return None;
    }
    let t = ray_circle_intersection(start, ball.velocity, reach)?;
    (t <= step).then(|| start + ball.velocity * t)
}

/// The live paddle whose effective arc (padded by the ball's angular size)
/// covers `theta`.
fn paddle_under(
    paddles: &[Paddle],
    entities: &[Entity],
    theta: f32,
    angular_pad: f32,
    config: &PongConfig,
) -> Option<EntityId> {
    let n = paddles.len();
    paddles.iter().enumerate().find_map(|(i, paddle)| {
        if !entities.get(i).is_some_and(|e| e.alive) {
            return None;
        }
        let (center, half_width) = arena::paddle_arc(paddle.offset, config.paddle_half_arc, n);
        arena::angle_within(theta, paddle.base_angle + center, half_width + angular_pad)
            .then_some(i)
    })
}

/// Reflect off a paddle about the radial normal, apply bounded jitter and a
/// speed-up, and move the ball back inside the paddle ring.
pub fn bounce_off_paddle(ball: &mut Movable, rng: &mut SimRng, config: &PongConfig, inner: f32) {
    let (_, theta) = cartesian_to_polar(ball.position);
    let outward = ball.position.normalize_or_zero();
    let incoming = ball.velocity.length();

    let reflected = reflect(ball.velocity, outward);
    let jittered = rotate(reflected, rng::jitter(rng, config.bounce_jitter));
    // Jitter may not turn the ball back toward the paddle.
    let direction = if jittered.dot(outward) < 0.0 {
        jittered
    } else {
        reflected
    };

    let factor = rng::between(rng, config.bounce_speedup_min, config.bounce_speedup_max);
    let speed = (incoming * factor).min(config.speed_cap()).max(incoming);
    ball.speed = speed;
    ball.velocity = direction.normalize_or_zero() * speed;
    ball.position = polar_to_cartesian(inner - ball.radius - SEPARATION, theta);
}

/// Reflect off the closed wall of a dead sector. No speed change.
pub fn bounce_off_wall(ball: &mut Movable, wall_radius: f32) {
    let (_, theta) = cartesian_to_polar(ball.position);
    let outward = ball.position.normalize_or_zero();
    ball.velocity = reflect(ball.velocity, outward);
    ball.position = polar_to_cartesian(wall_radius - ball.radius - SEPARATION, theta);
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use arcade_core::game_trait::ArcadeGame;
    use arcade_core::test_helpers::TEST_SEED;

    use super::*;
    use crate::CircularPong;

    fn staged(n: usize) -> (CircularPong, SimRng) {
        let mut game = CircularPong::with_config(PongConfig::default());
        let mut rng = rng::seeded(TEST_SEED);
        game.init(n, Some(0), &mut rng);
        game.start(&mut rng);
        (game, rng)
    }

    fn place_ball(game: &mut CircularPong, r: f32, theta: f32, velocity: Vec2) {
        let ball = &mut game.state_mut().world.movables[0];
        ball.position = polar_to_cartesian(r, theta);
        ball.speed = velocity.length();
        ball.velocity = velocity;
    }

    #[test]
    fn centred_paddle_returns_ball() {
        let (mut game, mut rng) = staged(4);
        place_ball(&mut game, 270.0, 0.0, Vec2::new(200.0, 0.0));
        let config = game.config().clone();
        let events = resolve(game.state_mut(), &config, Duration::from_millis(100), &mut rng);
        assert_eq!(
            events,
            vec![GameEvent::Bounced {
                movable: 0,
                collider: Some(0)
            }]
        );
        let ball = &game.state().world.movables[0];
        assert!(ball.velocity.x < 0.0, "ball must head inward");
        assert!(ball.speed >= 200.0 * 1.05 - 1e-3);
        assert!(ball.position.length() < 274.0 - ball.radius);
    }

    #[test]
    fn long_frame_does_not_tunnel_through_paddle() {
        let (mut game, mut rng) = staged(4);
        place_ball(&mut game, 255.0, 0.0, Vec2::new(450.0, 0.0));
        let step = Duration::from_millis(100);
        let mut now = Duration::ZERO;
        let mut events = Vec::new();
        for _ in 0..3 {
            now += step;
            game.integrate(step.as_secs_f32(), &[]);
            events.extend(game.resolve_collisions(now, &mut rng));
        }
        assert!(!events.contains(&GameEvent::GoalConceded { entity: 0 }));
        assert_eq!(
            events.first(),
            Some(&GameEvent::Bounced {
                movable: 0,
                collider: Some(0)
            })
        );
        let ball = &game.state().world.movables[0];
        assert!(ball.velocity.x < 0.0, "ball must head back inward");
        assert!(ball.position.length() < config_inner(&game));
    }

    #[test]
    fn long_frame_does_not_tunnel_through_dead_wall() {
        let (mut game, mut rng) = staged(4);
        game.withdraw(0);
        place_ball(&mut game, 255.0, 0.0, Vec2::new(450.0, 0.0));
        game.integrate(0.1, &[]);
        let events = game.resolve_collisions(Duration::from_millis(100), &mut rng);
        assert_eq!(
            events,
            vec![GameEvent::Bounced {
                movable: 0,
                collider: None
            }]
        );
        assert!(game.state().world.movables[0].velocity.x < 0.0);
    }

    #[test]
    fn sweep_misses_when_path_clears_paddle() {
        // Paddle 0 pushed to its sector edge; the swept contact at angle 0 is open.
        let (mut game, mut rng) = staged(4);
        game.state_mut().paddles[0].offset = arena::max_offset(4);
        game.sync_paddles();
        place_ball(&mut game, 255.0, 0.0, Vec2::new(450.0, 0.0));
        game.integrate(0.1, &[]);
        let events = game.resolve_collisions(Duration::from_millis(100), &mut rng);
        assert!(events.is_empty());
        assert!(game.state().world.movables[0].velocity.x > 0.0);
    }

    fn config_inner(game: &CircularPong) -> f32 {
        let config = game.config();
        config.paddle_ring_radius - config.paddle_thickness / 2.0
    }

    #[test]
    fn cooldown_suppresses_double_hit() {
        let (mut game, mut rng) = staged(2);
        place_ball(&mut game, 270.0, 0.0, Vec2::new(200.0, 0.0));
        let config = game.config().clone();
        let first = resolve(game.state_mut(), &config, Duration::from_millis(100), &mut rng);
        assert_eq!(first.len(), 1);
        // Force the ball back into the band, still moving outward.
        place_ball(&mut game, 270.0, 0.0, Vec2::new(200.0, 0.0));
        let second = resolve(game.state_mut(), &config, Duration::from_millis(120), &mut rng);
        assert!(second.is_empty());
        let third = resolve(game.state_mut(), &config, Duration::from_millis(200), &mut rng);
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn inward_ball_is_ignored() {
        let (mut game, mut rng) = staged(2);
        place_ball(&mut game, 275.0, 0.0, Vec2::new(-200.0, 0.0));
        let config = game.config().clone();
        let events = resolve(game.state_mut(), &config, Duration::ZERO, &mut rng);
        assert!(events.is_empty());
    }

    #[test]
    fn goal_charged_to_sector_owner_only() {
        // Paddle 2 (base π) pinned at its sector edge; ball leaves at π.
        let (mut game, mut rng) = staged(4);
        game.state_mut().paddles[2].offset = arena::max_offset(4);
        game.sync_paddles();
        place_ball(&mut game, 310.0, PI, Vec2::new(-200.0, 0.0));
        let config = game.config().clone();
        let events = resolve(game.state_mut(), &config, Duration::ZERO, &mut rng);
        assert_eq!(events, vec![GameEvent::GoalConceded { entity: 2 }]);
        assert_eq!(game.state().world.movables.len(), 1, "ball replaced");
    }

    #[test]
    fn dead_owner_concedes_nothing() {
        let (mut game, mut rng) = staged(3);
        game.withdraw(0);
        place_ball(&mut game, 320.0, 0.0, Vec2::new(200.0, 0.0));
        let config = game.config().clone();
        let events = resolve(game.state_mut(), &config, Duration::ZERO, &mut rng);
        assert!(events.is_empty());
        assert_eq!(game.state().goals, 0);
    }

    #[test]
    fn jitter_never_points_outward() {
        let config = PongConfig {
            bounce_jitter: 1.5,
            ..PongConfig::default()
        };
        let mut rng = rng::seeded(TEST_SEED);
        for i in 0..200 {
            let theta = i as f32 * 0.1;
            let tangent = Vec2::from_angle(theta).perp();
            let mut ball = Movable {
                id: 0,
                position: polar_to_cartesian(276.0, theta),
                velocity: Vec2::from_angle(theta) * 20.0 + tangent * 200.0,
                speed: 0.0,
                radius: 8.0,
                last_hit: None,
            };
            bounce_off_paddle(&mut ball, &mut rng, &config, 274.0);
            let outward = ball.position.normalize();
            assert!(ball.velocity.dot(outward) < 0.0, "grazing bounce {i} points outward");
        }
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn bounce_energy_is_bounded(
                theta in -PI..PI,
                heading in -1.4f32..1.4,
                speed in 50.0f32..400.0,
                seed in any::<u64>(),
            ) {
                let config = PongConfig::default();
                let mut rng = rng::seeded(seed);
                let mut ball = Movable {
                    id: 0,
                    position: polar_to_cartesian(276.0, theta),
                    velocity: rotate(Vec2::from_angle(theta), heading) * speed,
                    speed,
                    radius: 8.0,
                    last_hit: None,
                };
                bounce_off_paddle(&mut ball, &mut rng, &config, 274.0);
                let after = ball.velocity.length();
                prop_assert!(after >= speed - 1e-2);
                prop_assert!(after <= (speed * config.bounce_speedup_max).max(speed) + 1e-2);
                prop_assert!(after <= config.speed_cap().max(speed) + 1e-2);
            }
        }
    }
}
