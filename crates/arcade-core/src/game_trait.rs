use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, MovableId};
use crate::game_registry::GameKind;
use crate::input::{MovementIntent, PointerMapping};
use crate::rng::SimRng;
use crate::scoring::WinRules;

/// Core trait that all arcade games implement.
///
/// The session owns the lifecycle, clock, scoreboard, input, and event
/// bridge; a game supplies the per-kind strategies (physics, collision
/// rules, AI policy, win rules) behind this one seam. Games never see wall
/// time or the channel; every random draw comes from the session RNG.
pub trait ArcadeGame: Send {
    /// Game metadata for the lobby selection screen.
    fn metadata(&self) -> GameMetadata;

    /// Build the entity table, boundaries, and zones for `entity_count`
    /// entities. `local` is flagged as the human-controlled entity.
    fn init(&mut self, entity_count: usize, local: Option<EntityId>, rng: &mut SimRng);

    /// Countdown reached zero: launch balls, start runners.
    fn start(&mut self, rng: &mut SimRng);

    /// Decide an intent for an AI-controlled entity from read-only state.
    fn ai_intent(&self, entity: EntityId, rng: &mut SimRng) -> MovementIntent;

    /// Apply intents (indexed by entity id) and integrate `dt` seconds.
    fn integrate(&mut self, dt: f32, intents: &[MovementIntent]);

    /// Resolve overlaps produced by this tick's integration.
    fn resolve_collisions(&mut self, now: Duration, rng: &mut SimRng) -> Vec<GameEvent>;

    /// The authoritative entity table.
    fn entities(&self) -> &[Entity];

    /// Distance-like progress used as a tie-break.
    fn progress(&self, _entity: EntityId) -> f32 {
        0.0
    }

    fn rules(&self) -> WinRules;

    /// How the local pointer maps to a steering target.
    fn pointer_mapping(&self) -> PointerMapping {
        PointerMapping::Ignore
    }

    /// Freeze a withdrawn entity. Its score is kept.
    fn withdraw(&mut self, entity: EntityId);

    /// Game-specific extras for the final result.
    fn details(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Release every entity and movable. Called once, after completion.
    fn clear(&mut self);

    /// Serialize the authoritative game state.
    fn serialize_state(&self) -> Vec<u8>;

    /// Apply authoritative state received from the host.
    fn apply_state(&mut self, state: &[u8]);

    /// JSON view of the state for broadcast.
    fn snapshot(&self) -> serde_json::Value;
}

/// Game metadata for the lobby selection screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub kind: GameKind,
    pub min_entities: usize,
    pub max_entities: usize,
    pub estimated_round_duration: Duration,
}

/// Events emitted by collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Points awarded (coin collected, capture).
    Scored { entity: EntityId, points: u32 },
    /// A ball left the arena through this entity's sector.
    GoalConceded { entity: EntityId },
    Eliminated { entity: EntityId },
    /// `collider` is `None` for boundary walls.
    Bounced {
        movable: MovableId,
        collider: Option<EntityId>,
    },
    /// The game reached its own end condition.
    Terminal { winner: Option<EntityId> },
}

/// Generates the boilerplate `ArcadeGame` methods that are identical across
/// all games: `entities`, `serialize_state`, `apply_state`, `snapshot`.
///
/// Requires the implementing struct to have a `state: $StateType` field and
/// `$StateType` to have a `world: World` field.
#[macro_export]
macro_rules! arcade_game_boilerplate {
    (state_type: $StateType:ty) => {
        fn entities(&self) -> &[$crate::entity::Entity] {
            &self.state.world.entities
        }

        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.state).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Game state serialization failed");
                Vec::new()
            })
        }

        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => self.state = s,
                Err(e) => tracing::debug!(error = %e, "Ignoring undecodable game state"),
            }
        }

        fn snapshot(&self) -> serde_json::Value {
            serde_json::to_value(&self.state).unwrap_or(serde_json::Value::Null)
        }
    };
}
