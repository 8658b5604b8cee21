use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityId;
use crate::game_registry::GameKind;
use crate::input::MovementIntent;
use crate::lifecycle::Phase;
use crate::result::SessionResult;

/// Channel event type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    // Session -> peers
    SessionJoin,
    SessionState,
    SessionResult,

    // Peers -> session
    PlayerIntent,
    PlayerWithdraw,
}

impl MessageType {
    pub const fn event_type(self) -> &'static str {
        match self {
            MessageType::SessionJoin => "session.join",
            MessageType::SessionState => "session.state",
            MessageType::SessionResult => "session.result",
            MessageType::PlayerIntent => "player.intent",
            MessageType::PlayerWithdraw => "player.withdraw",
        }
    }

    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "session.join" => Some(MessageType::SessionJoin),
            "session.state" => Some(MessageType::SessionState),
            "session.result" => Some(MessageType::SessionResult),
            "player.intent" => Some(MessageType::PlayerIntent),
            "player.withdraw" => Some(MessageType::PlayerWithdraw),
            _ => None,
        }
    }
}

/// Announced once when a session is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMsg {
    pub protocol_version: u8,
    pub session_id: Uuid,
    pub game_kind: GameKind,
    pub entity_count: usize,
    pub local_entity: Option<EntityId>,
}

/// Periodic authoritative snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMsg {
    pub session_id: Uuid,
    pub tick: u64,
    pub elapsed_ms: u64,
    pub phase: Phase,
    /// Ranking metric per entity id.
    pub scores: Vec<i64>,
    pub state: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMsg {
    pub result: SessionResult,
}

/// A remote peer's intent for an entity it controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMsg {
    pub entity: EntityId,
    pub intent: MovementIntent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawMsg {
    pub entity: EntityId,
}

/// Messages the session emits.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    Join(JoinMsg),
    State(StateMsg),
    Result(ResultMsg),
}

impl SessionMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            SessionMessage::Join(_) => MessageType::SessionJoin,
            SessionMessage::State(_) => MessageType::SessionState,
            SessionMessage::Result(_) => MessageType::SessionResult,
        }
    }
}

/// Messages the session consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    Intent(IntentMsg),
    Withdraw(WithdrawMsg),
}

impl PeerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            PeerMessage::Intent(_) => MessageType::PlayerIntent,
            PeerMessage::Withdraw(_) => MessageType::PlayerWithdraw,
        }
    }
}
