use arcade_core::entity::World;
use arcade_core::geometry::Aabb;
use arcade_core::rng::{self, SimRng};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::RunnerConfig;

/// What a runner must do to get past an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Sits on the ground; jump over it.
    Low,
    /// Hangs overhead; crouch under it.
    High,
}

/// A static obstacle in one lane. `x` is its centre along the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub lane: usize,
    pub kind: ObstacleKind,
    pub x: f32,
    pub half_width: f32,
}

impl Obstacle {
    pub fn aabb(&self, config: &RunnerConfig) -> Aabb {
        let base = config.lane_base(self.lane);
        let (bottom, top) = match self.kind {
            ObstacleKind::Low => (0.0, config.spawn.low_obstacle_height),
            ObstacleKind::High => {
                (config.spawn.high_obstacle_bottom, config.spawn.high_obstacle_top)
            },
        };
        Aabb {
            min: Vec2::new(self.x - self.half_width, base + bottom),
            max: Vec2::new(self.x + self.half_width, base + top),
        }
    }
}

/// Course generator. Every spawn is mirrored into all lanes so both
/// runners face the same course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    pub obstacles: Vec<Obstacle>,
    next_obstacle_id: u32,
    /// Course position of the next spawn.
    next_spawn_x: f32,
    pub spawned: u32,
}

impl Spawner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            obstacles: Vec::new(),
            next_obstacle_id: 0,
            next_spawn_x: config.spawn.start_clearance,
            spawned: 0,
        }
    }

    /// Place an obstacle by hand.
    pub fn insert(
        &mut self,
        lane: usize,
        kind: ObstacleKind,
        x: f32,
        config: &RunnerConfig,
    ) -> u32 {
        let id = self.next_obstacle_id;
        self.next_obstacle_id += 1;
        self.obstacles.push(Obstacle {
            id,
            lane,
            kind,
            x,
            half_width: config.spawn.obstacle_width / 2.0,
        });
        self.spawned += 1;
        id
    }

    /// Generate course up to `lead_x + lookahead` and drop everything behind
    /// `trail_x - despawn_behind`.
    pub fn advance(
        &mut self,
        world: &mut World,
        lanes: usize,
        lead_x: f32,
        trail_x: f32,
        config: &RunnerConfig,
        rng: &mut SimRng,
    ) {
        let spawn = &config.spawn;
        if spawn.enabled {
            while self.next_spawn_x < lead_x + spawn.lookahead {
                let x = self.next_spawn_x;
                let kind = if rng::chance(rng, spawn.high_obstacle_chance) {
                    ObstacleKind::High
                } else {
                    ObstacleKind::Low
                };
                for lane in 0..lanes {
                    self.insert(lane, kind, x, config);
                }

                let gap = rng::between(rng, spawn.min_gap, spawn.max_gap)
                    .max(spawn.obstacle_width * 2.0);
                if rng::chance(rng, spawn.coin_chance) {
                    let height = if rng::chance(rng, spawn.airborne_coin_chance) {
                        spawn.coin_air_height
                    } else {
                        spawn.coin_ground_height
                    };
                    let coin_x = x + gap / 2.0;
                    for lane in 0..lanes {
                        world.spawn_movable(
                            Vec2::new(coin_x, config.lane_base(lane) + height),
                            spawn.coin_radius,
                        );
                    }
                }
                self.next_spawn_x += gap;
                tracing::trace!(x, ?kind, "Obstacle row spawned");
            }
        }

        let cutoff = trail_x - spawn.despawn_behind;
        self.obstacles.retain(|o| o.x + o.half_width >= cutoff);
        world.movables.retain(|c| c.position.x + c.radius >= cutoff);
    }

    /// The nearest obstacle in `lane` whose far edge is still ahead of `x`.
    pub fn next_in_lane(&self, lane: usize, x: f32) -> Option<&Obstacle> {
        self.obstacles
            .iter()
            .filter(|o| o.lane == lane && o.x + o.half_width > x)
            .min_by(|a, b| a.x.total_cmp(&b.x))
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }
}
