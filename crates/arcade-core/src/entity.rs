//! The authoritative entity table owned by a session's game.
//!
//! Entities are the players (paddles, runners). Their ids are dense indices
//! `0..count`, assigned at creation and never reused; dead or withdrawn
//! entities stay in the table with `alive == false`. Movables are the
//! non-player bodies (balls, obstacles, coins) and carry monotonic ids.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;

/// Player entity index, stable for the whole session.
pub type EntityId = usize;

/// Movable body id, unique for the whole session.
pub type MovableId = u32;

/// Collision shape of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle {
        radius: f32,
    },
    Box {
        half_extents: Vec2,
    },
    /// Annular arc centred on the arena origin.
    Sector {
        inner_radius: f32,
        outer_radius: f32,
        center_angle: f32,
        half_width: f32,
    },
}

/// A player-controlled body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub shape: Shape,
    pub alive: bool,
    pub local: bool,
}

impl Entity {
    /// Bounding box for `Box` shapes; circles and sectors use their extents.
    pub fn aabb(&self) -> Aabb {
        let half = match self.shape {
            Shape::Box { half_extents } => half_extents,
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Sector { outer_radius, .. } => Vec2::splat(outer_radius),
        };
        Aabb::from_center(self.position, half)
    }
}

/// The last collider a movable bounced off, for per-pair hit cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastHit {
    /// `None` for walls.
    pub collider: Option<EntityId>,
    pub at_ms: u64,
}

/// A non-player body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movable {
    pub id: MovableId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
    pub radius: f32,
    pub last_hit: Option<LastHit>,
}

impl Movable {
    /// Set the direction of travel, keeping the current speed.
    pub fn launch(&mut self, angle: f32) {
        self.velocity = Vec2::from_angle(angle) * self.speed;
    }

    /// Change speed while keeping direction. A zero velocity stays zero.
    pub fn rescale(&mut self, speed: f32) {
        self.speed = speed;
        self.velocity = self.velocity.normalize_or_zero() * speed;
    }

    /// Whether a collision with `collider` is suppressed by the cooldown.
    pub fn in_cooldown(&self, collider: Option<EntityId>, now_ms: u64, cooldown_ms: u64) -> bool {
        self.last_hit.is_some_and(|hit| {
            hit.collider == collider && now_ms.saturating_sub(hit.at_ms) < cooldown_ms
        })
    }

    pub fn record_hit(&mut self, collider: Option<EntityId>, now_ms: u64) {
        self.last_hit = Some(LastHit { collider, at_ms: now_ms });
    }
}

/// A region of the arena, optionally owned by an entity (goal sectors, lanes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub owner: Option<EntityId>,
    pub geometry: ZoneGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ZoneGeometry {
    /// Angular slice of a circle centred on the origin.
    Sector { center_angle: f32, half_width: f32 },
    /// Horizontal band of a lane-based course.
    Lane { y_min: f32, y_max: f32 },
}

/// Entities, movables, and zones of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub entities: Vec<Entity>,
    pub movables: Vec<Movable>,
    pub zones: Vec<Zone>,
    next_movable_id: MovableId,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity; its id is its index.
    pub fn add_entity(&mut self, position: Vec2, shape: Shape, local: bool) -> EntityId {
        let id = self.entities.len();
        self.entities.push(Entity {
            id,
            position,
            velocity: Vec2::ZERO,
            shape,
            alive: true,
            local,
        });
        id
    }

    /// Spawn a stationary movable and return its id.
    pub fn spawn_movable(&mut self, position: Vec2, radius: f32) -> MovableId {
        let id = self.next_movable_id;
        self.next_movable_id += 1;
        self.movables.push(Movable {
            id,
            position,
            velocity: Vec2::ZERO,
            speed: 0.0,
            radius,
            last_hit: None,
        });
        id
    }

    pub fn remove_movable(&mut self, id: MovableId) -> Option<Movable> {
        let idx = self.movables.iter().position(|m| m.id == id)?;
        Some(self.movables.remove(idx))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn movable_mut(&mut self, id: MovableId) -> Option<&mut Movable> {
        self.movables.iter_mut().find(|m| m.id == id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entity(id).is_some_and(|e| e.alive)
    }

    pub fn alive_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().filter(|e| e.alive).map(|e| e.id)
    }

    /// Mark an entity dead. Returns `false` if it was already dead or unknown.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.entity_mut(id) {
            Some(e) if e.alive => {
                e.alive = false;
                e.velocity = Vec2::ZERO;
                true
            },
            _ => false,
        }
    }

    /// Advance every movable along its velocity.
    pub fn integrate_movables(&mut self, dt: f32) {
        for m in &mut self.movables {
            m.position += m.velocity * dt;
        }
    }

    /// Drop every entity, movable, and zone.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.movables.clear();
        self.zones.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_are_dense_and_stable() {
        let mut world = World::new();
        for i in 0..4 {
            let id = world.add_entity(Vec2::ZERO, Shape::Circle { radius: 1.0 }, i == 0);
            assert_eq!(id, i);
        }
        assert!(world.kill(2));
        assert!(!world.kill(2));
        assert_eq!(world.entities.len(), 4, "dead entities stay in the table");
        assert_eq!(world.alive_ids().collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    #[test]
    fn movable_ids_never_reused() {
        let mut world = World::new();
        let a = world.spawn_movable(Vec2::ZERO, 1.0);
        world.remove_movable(a);
        let b = world.spawn_movable(Vec2::ZERO, 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn cooldown_is_per_collider() {
        let mut m = Movable {
            id: 0,
            position: Vec2::ZERO,
            velocity: Vec2::X,
            speed: 1.0,
            radius: 1.0,
            last_hit: None,
        };
        m.record_hit(Some(1), 1000);
        assert!(m.in_cooldown(Some(1), 1030, 40));
        assert!(!m.in_cooldown(Some(1), 1040, 40));
        assert!(!m.in_cooldown(Some(2), 1010, 40));
        assert!(!m.in_cooldown(None, 1010, 40));
    }

    #[test]
    fn rescale_keeps_direction() {
        let mut m = Movable {
            id: 0,
            position: Vec2::ZERO,
            velocity: Vec2::new(3.0, 4.0),
            speed: 5.0,
            radius: 1.0,
            last_hit: None,
        };
        m.rescale(10.0);
        assert!((m.velocity - Vec2::new(6.0, 8.0)).length() < 1e-4);
    }

    #[test]
    fn clear_releases_everything() {
        let mut world = World::new();
        world.add_entity(Vec2::ZERO, Shape::Circle { radius: 1.0 }, true);
        world.spawn_movable(Vec2::ZERO, 1.0);
        world.clear();
        assert!(world.entities.is_empty());
        assert!(world.movables.is_empty());
    }
}
