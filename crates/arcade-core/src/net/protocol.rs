use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::messages::{MessageType, PeerMessage, SessionMessage};

/// Current protocol version, carried in `session.join`.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum accepted inbound payload size in bytes (serialized JSON).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("event type {0} is not valid in this direction")]
    WrongDirection(&'static str),
    #[error("payload too large: {0} bytes (max {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge(usize),
    #[error("serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("deserialize error for {event_type}: {source}")]
    Deserialize {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn to_payload<T: Serialize>(msg: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(msg).map_err(ProtocolError::Serialize)
}

fn from_payload<T: DeserializeOwned>(
    msg_type: MessageType,
    payload: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::Deserialize {
        event_type: msg_type.event_type(),
        source,
    })
}

fn parse_type(event_type: &str) -> Result<MessageType, ProtocolError> {
    MessageType::from_event_type(event_type)
        .ok_or_else(|| ProtocolError::UnknownEventType(event_type.to_string()))
}

/// Encode a session message into its channel event type and JSON payload.
pub fn encode_session_message(
    msg: &SessionMessage,
) -> Result<(&'static str, Value), ProtocolError> {
    let payload = match msg {
        SessionMessage::Join(m) => to_payload(m)?,
        SessionMessage::State(m) => to_payload(m)?,
        SessionMessage::Result(m) => to_payload(m)?,
    };
    Ok((msg.message_type().event_type(), payload))
}

/// Decode a session message received by an observer.
pub fn decode_session_message(
    event_type: &str,
    payload: Value,
) -> Result<SessionMessage, ProtocolError> {
    let msg_type = parse_type(event_type)?;
    match msg_type {
        MessageType::SessionJoin => Ok(SessionMessage::Join(from_payload(msg_type, payload)?)),
        MessageType::SessionState => Ok(SessionMessage::State(from_payload(msg_type, payload)?)),
        MessageType::SessionResult => Ok(SessionMessage::Result(from_payload(msg_type, payload)?)),
        MessageType::PlayerIntent | MessageType::PlayerWithdraw => {
            Err(ProtocolError::WrongDirection(msg_type.event_type()))
        },
    }
}

/// Encode a peer message for sending to a session.
pub fn encode_peer_message(msg: &PeerMessage) -> Result<(&'static str, Value), ProtocolError> {
    let payload = match msg {
        PeerMessage::Intent(m) => to_payload(m)?,
        PeerMessage::Withdraw(m) => to_payload(m)?,
    };
    Ok((msg.message_type().event_type(), payload))
}

/// Decode an inbound peer message. Oversized payloads are rejected before
/// deserialization.
pub fn decode_peer_message(
    event_type: &str,
    payload: &Value,
) -> Result<PeerMessage, ProtocolError> {
    let msg_type = parse_type(event_type)?;
    let size = payload.to_string().len();
    if size > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge(size));
    }
    match msg_type {
        MessageType::PlayerIntent => {
            Ok(PeerMessage::Intent(from_payload(msg_type, payload.clone())?))
        },
        MessageType::PlayerWithdraw => {
            Ok(PeerMessage::Withdraw(from_payload(msg_type, payload.clone())?))
        },
        MessageType::SessionJoin | MessageType::SessionState | MessageType::SessionResult => {
            Err(ProtocolError::WrongDirection(msg_type.event_type()))
        },
    }
}
