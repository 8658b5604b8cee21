use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;

use arcade_core::channel::{EventChannel, Handler, HandlerRegistry, Subscription};

/// An event emitted by the session, on its way to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub event_type: String,
    pub payload: Value,
}

/// In-process [`EventChannel`] backed by an unbounded tokio mpsc.
///
/// Outbound events go to the receiver returned by [`MpscChannel::new`];
/// inbound events are pushed by the host with [`MpscChannel::deliver`].
/// The channel reports itself disconnected once the receiver is gone.
#[derive(Clone)]
pub struct MpscChannel {
    tx: mpsc::UnboundedSender<OutboundEvent>,
    registry: HandlerRegistry,
    connected: Arc<AtomicBool>,
}

impl MpscChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                registry: HandlerRegistry::new(),
                connected: Arc::new(AtomicBool::new(true)),
            },
            rx,
        )
    }

    /// Dispatch an inbound event to subscribed handlers. Returns the number
    /// of handlers invoked.
    pub fn deliver(&self, event_type: &str, payload: &Value) -> usize {
        if !self.is_connected() {
            tracing::debug!(event_type, "Dropping inbound event on disconnected channel");
            return 0;
        }
        self.registry.dispatch(event_type, payload)
    }

    /// Force the connectivity flag (transport dropped or came back).
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

impl EventChannel for MpscChannel {
    fn emit(&self, event_type: &str, payload: Value) {
        if !self.is_connected() {
            return;
        }
        let event = OutboundEvent {
            event_type: event_type.to_string(),
            payload,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(event_type, "Outbound receiver closed; channel offline");
            self.connected.store(false, Ordering::Release);
        }
    }

    fn on(&self, event_type: &str, handler: Handler) -> Subscription {
        self.registry.register(event_type, handler)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[test]
    fn emit_reaches_receiver_in_order() {
        let (channel, mut rx) = MpscChannel::new();
        channel.emit("a", json!(1));
        channel.emit("b", json!(2));
        assert_eq!(rx.try_recv().unwrap().event_type, "a");
        assert_eq!(rx.try_recv().unwrap().payload, json!(2));
    }

    #[test]
    fn deliver_invokes_handlers_until_unsubscribed() {
        let (channel, _rx) = MpscChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = channel.on(
            "player.intent",
            Box::new(move |v: &Value| sink.lock().unwrap().push(v.clone())),
        );
        assert_eq!(channel.deliver("player.intent", &json!({"x": 1})), 1);
        drop(sub);
        assert_eq!(channel.deliver("player.intent", &json!({"x": 2})), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn dropped_receiver_means_offline() {
        let (channel, rx) = MpscChannel::new();
        assert!(channel.is_connected());
        drop(rx);
        assert!(!channel.is_connected());
        channel.emit("a", json!(null));
    }

    #[test]
    fn forced_disconnect_drops_inbound() {
        let (channel, _rx) = MpscChannel::new();
        let _sub = channel.on("e", Box::new(|_: &Value| {}));
        channel.set_connected(false);
        assert_eq!(channel.deliver("e", &json!(null)), 0);
    }
}
