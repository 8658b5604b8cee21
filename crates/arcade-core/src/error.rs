use thiserror::Error;

use crate::entity::EntityId;
use crate::game_registry::GameKind;

/// Invalid session construction parameters. Construction fails and no
/// session, timers, or subscriptions are created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("local entity id is required when the session is not in autopilot")]
    MissingLocalEntity,
    #[error("entity count must be at least 1")]
    NoEntities,
    #[error("local entity {local} is out of range for {count} entities")]
    LocalEntityOutOfRange { local: EntityId, count: usize },
    #[error("unknown game kind: {0}")]
    UnknownGameKind(String),
    #[error("{kind} supports {min}..={max} entities, got {count}")]
    UnsupportedEntityCount {
        kind: GameKind,
        min: usize,
        max: usize,
        count: usize,
    },
    #[error("session configured for {expected} but the game is {actual}")]
    GameKindMismatch { expected: GameKind, actual: GameKind },
    #[error("max duration must be non-zero")]
    ZeroDuration,
    #[error("remote entity {0} is out of range or is the local entity")]
    InvalidRemoteEntity(EntityId),
    #[error("game created {actual} entities, expected {expected}")]
    EntityCountMismatch { expected: usize, actual: usize },
}

/// Malformed or out-of-range per-tick input. Always recovered locally by
/// clamping or ignoring; never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransientInputError {
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
}

/// A simulation invariant that should never break. Debug builds fail fast;
/// release builds log and let the caller clamp to a valid state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);

/// Record an invariant violation.
pub fn report_invariant(violation: InvariantViolation) {
    tracing::error!(%violation, "Simulation invariant violated; clamping to a valid state");
    debug_assert!(false, "{violation}");
}
