use arcade_core::entity::MovableId;
use arcade_core::game_trait::GameEvent;
use arcade_core::geometry::Aabb;
use glam::Vec2;

use crate::RunnerState;
use crate::config::RunnerConfig;

/// Eliminate runners touching an obstacle and hand out coins.
///
/// A runner that crashes on the same tick it would reach a coin does not
/// collect it.
pub fn resolve(state: &mut RunnerState, config: &RunnerConfig) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let mut collected: Vec<MovableId> = Vec::new();

    for (entity, runner) in state.runners.iter().enumerate() {
        if !state.world.is_alive(entity) {
            continue;
        }
        let body = runner.aabb(config);

        let crashed = state
            .spawner
            .obstacles
            .iter()
            .filter(|o| o.lane == runner.lane)
            .any(|o| o.aabb(config).intersects(&body));
        if crashed {
            events.push(GameEvent::Eliminated { entity });
            tracing::debug!(entity, x = runner.x, "Runner crashed");
            continue;
        }

        for coin in &state.world.movables {
            if collected.contains(&coin.id) {
                continue;
            }
            let coin_box = Aabb::from_center(coin.position, Vec2::splat(coin.radius));
            if coin_box.intersects(&body) {
                collected.push(coin.id);
                events.push(GameEvent::Scored {
                    entity,
                    points: config.spawn.coin_points,
                });
            }
        }
    }

    for event in &events {
        match *event {
            GameEvent::Eliminated { entity } => {
                state.world.kill(entity);
            },
            GameEvent::Scored { entity, .. } => {
                if let Some(count) = state.coins.get_mut(entity) {
                    *count += 1;
                }
            },
            _ => {},
        }
    }
    for id in collected {
        state.world.remove_movable(id);
    }
    events
}

#[cfg(test)]
mod tests {
    use arcade_core::game_trait::ArcadeGame;
    use arcade_core::rng;
    use arcade_core::test_helpers::TEST_SEED;

    use super::*;
    use crate::RunnerGame;
    use crate::spawner::ObstacleKind;

    fn quiet_game() -> RunnerGame {
        let mut config = RunnerConfig::default();
        config.spawn.enabled = false;
        let mut game = RunnerGame::with_config(config);
        let mut rng = rng::seeded(TEST_SEED);
        game.init(2, Some(0), &mut rng);
        game.start(&mut rng);
        game
    }

    #[test]
    fn overlap_eliminates_runner() {
        let mut game = quiet_game();
        game.inject_obstacle(0, ObstacleKind::Low, 0.5);
        let config = game.config().clone();
        let events = resolve(game.state_mut(), &config);
        assert_eq!(events, vec![GameEvent::Eliminated { entity: 0 }]);
        assert!(!game.entities()[0].alive);
        assert!(game.entities()[1].alive);
    }

    #[test]
    fn crouched_runner_passes_under_overhead() {
        let mut game = quiet_game();
        game.inject_obstacle(0, ObstacleKind::High, 0.5);
        game.state_mut().runners[0].crouching = true;
        let config = game.config().clone();
        assert!(resolve(game.state_mut(), &config).is_empty());
        game.state_mut().runners[0].crouching = false;
        assert_eq!(
            resolve(game.state_mut(), &config),
            vec![GameEvent::Eliminated { entity: 0 }]
        );
    }

    #[test]
    fn airborne_runner_clears_low_obstacle() {
        let mut game = quiet_game();
        game.inject_obstacle(1, ObstacleKind::Low, 0.2);
        game.state_mut().runners[1].height = 1.5;
        let config = game.config().clone();
        assert!(resolve(game.state_mut(), &config).is_empty());
    }

    #[test]
    fn coin_scores_once_and_disappears() {
        let mut game = quiet_game();
        let config = game.config().clone();
        let y = config.lane_base(1) + config.spawn.coin_ground_height;
        game.state_mut().world.spawn_movable(Vec2::new(0.1, y), config.spawn.coin_radius);
        let events = resolve(game.state_mut(), &config);
        assert_eq!(events, vec![GameEvent::Scored { entity: 1, points: 1 }]);
        assert!(game.state().world.movables.is_empty());
        assert_eq!(game.state().coins, vec![0, 1]);
        assert!(resolve(game.state_mut(), &config).is_empty());
    }

    #[test]
    fn standing_runner_misses_airborne_coin() {
        let mut game = quiet_game();
        let config = game.config().clone();
        let y = config.lane_base(0) + config.spawn.coin_air_height;
        game.state_mut().world.spawn_movable(Vec2::new(0.0, y), config.spawn.coin_radius);
        assert!(resolve(game.state_mut(), &config).is_empty());
        game.state_mut().runners[0].height = 1.0;
        assert_eq!(
            resolve(game.state_mut(), &config),
            vec![GameEvent::Scored { entity: 0, points: 1 }]
        );
    }
}
