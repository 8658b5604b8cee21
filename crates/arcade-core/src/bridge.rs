//! Adapter between a session and its optional [`EventChannel`].
//!
//! Inbound handlers only decode and queue into a shared inbox; the session
//! drains the inbox once per tick, so remote input never mutates simulation
//! state outside `advance`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::{EventChannel, Subscription};
use crate::entity::EntityId;
use crate::input::MovementIntent;
use crate::net::messages::{MessageType, PeerMessage, SessionMessage};
use crate::net::protocol::{decode_peer_message, encode_session_message};

/// Connectivity as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Online,
    /// No channel, or the channel reports disconnected. Non-local entities
    /// are AI-driven.
    Offline,
}

/// Remote traffic collected between ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbox {
    /// Latest intent per entity; older ones in the same tick are superseded.
    pub intents: BTreeMap<EntityId, MovementIntent>,
    pub withdrawals: Vec<EntityId>,
}

impl Inbox {
    fn push(&mut self, msg: PeerMessage) {
        match msg {
            PeerMessage::Intent(m) => {
                let entry = self.intents.entry(m.entity).or_default();
                // Keep a jump edge that arrived earlier in the same tick.
                let jump = entry.jump || m.intent.jump;
                *entry = MovementIntent { jump, ..m.intent };
            },
            PeerMessage::Withdraw(m) => {
                if !self.withdrawals.contains(&m.entity) {
                    self.withdrawals.push(m.entity);
                }
            },
        }
    }
}

fn lock(inbox: &Mutex<Inbox>) -> MutexGuard<'_, Inbox> {
    inbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct EventBridge {
    channel: Option<Arc<dyn EventChannel>>,
    inbox: Arc<Mutex<Inbox>>,
    subscriptions: Vec<Subscription>,
    status: ChannelStatus,
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("attached", &self.channel.is_some())
            .field("status", &self.status)
            .finish()
    }
}

impl EventBridge {
    /// Attach to `channel` (if any) and subscribe to peer traffic.
    pub fn new(channel: Option<Arc<dyn EventChannel>>) -> Self {
        let inbox = Arc::new(Mutex::new(Inbox::default()));
        let mut subscriptions = Vec::new();
        if let Some(ch) = &channel {
            for msg_type in [MessageType::PlayerIntent, MessageType::PlayerWithdraw] {
                let event_type = msg_type.event_type();
                let inbox = Arc::clone(&inbox);
                subscriptions.push(ch.on(
                    event_type,
                    Box::new(move |payload: &Value| {
                        match decode_peer_message(event_type, payload) {
                            Ok(msg) => lock(&inbox).push(msg),
                            Err(e) => {
                                tracing::debug!(
                                    event_type,
                                    error = %e,
                                    "Dropping malformed peer message"
                                );
                            },
                        }
                    }),
                ));
            }
        }
        let status = match &channel {
            Some(ch) if ch.is_connected() => ChannelStatus::Online,
            _ => ChannelStatus::Offline,
        };
        Self {
            channel,
            inbox,
            subscriptions,
            status,
        }
    }

    /// Solo mode: no channel at all.
    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn is_attached(&self) -> bool {
        self.channel.is_some()
    }

    /// Re-check channel connectivity. Logs once per transition.
    pub fn refresh_status(&mut self) -> ChannelStatus {
        let now = match &self.channel {
            Some(ch) if ch.is_connected() => ChannelStatus::Online,
            _ => ChannelStatus::Offline,
        };
        if now != self.status {
            match now {
                ChannelStatus::Offline => {
                    tracing::warn!("Event channel unavailable; AI takes over remote entities");
                },
                ChannelStatus::Online => tracing::info!("Event channel reconnected"),
            }
            self.status = now;
        }
        now
    }

    /// Encode and emit. Never blocks; dropped while offline.
    pub fn send(&self, msg: &SessionMessage) {
        let Some(ch) = &self.channel else {
            return;
        };
        if self.status == ChannelStatus::Offline {
            return;
        }
        match encode_session_message(msg) {
            Ok((event_type, payload)) => ch.emit(event_type, payload),
            Err(e) => tracing::debug!(error = %e, "Failed to encode session message"),
        }
    }

    /// Take everything received since the last drain.
    pub fn drain(&self) -> Inbox {
        std::mem::take(&mut *lock(&self.inbox))
    }

    /// Unsubscribe and detach. Further sends are no-ops.
    pub fn close(&mut self) {
        self.subscriptions.clear();
        self.channel = None;
        self.status = ChannelStatus::Offline;
        lock(&self.inbox).intents.clear();
    }
}
