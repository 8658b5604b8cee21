use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityId;
use crate::game_registry::GameKind;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TimeExpired,
    Elimination,
    SuddenDeathResolved,
    Withdrawal,
}

/// Final outcome of a session. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub session_id: Uuid,
    pub game_kind: GameKind,
    /// `None` is a draw.
    pub winner: Option<EntityId>,
    /// Entities sharing a drawn result; empty when there is a sole winner.
    pub joint_winners: Vec<EntityId>,
    pub per_entity_score: BTreeMap<EntityId, i64>,
    pub survival_ms: BTreeMap<EntityId, u64>,
    pub reason: EndReason,
    pub duration_ms: u64,
    /// Game-specific extras (distance, coins, speed reached).
    #[serde(default)]
    pub details: serde_json::Value,
}

impl SessionResult {
    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}
