//! The abstract network channel the session talks to.
//!
//! Transport, wire framing, and reconnection are the host's business; the
//! core only needs `emit`, `on`, and a connectivity check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

/// Callback invoked for each inbound event of a subscribed type.
pub type Handler = Box<dyn Fn(&Value) + Send + Sync>;

/// Narrow interface to the external event channel. `emit` must never block.
pub trait EventChannel: Send + Sync {
    fn emit(&self, event_type: &str, payload: Value);

    /// Register `handler` for `event_type`. Dropping the returned
    /// subscription unregisters it.
    fn on(&self, event_type: &str, handler: Handler) -> Subscription;

    fn is_connected(&self) -> bool {
        true
    }
}

/// Registration handle. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type HandlerMap = HashMap<String, Vec<(u64, Arc<Handler>)>>;

/// Handler table shared by channel implementations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: Arc<AtomicU64>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, event_type: &str, handler: Handler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.handlers)
            .entry(event_type.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        let handlers = Arc::clone(&self.handlers);
        let event_type = event_type.to_string();
        Subscription::new(move || {
            let mut map = lock(&handlers);
            if let Some(list) = map.get_mut(&event_type) {
                list.retain(|(hid, _)| *hid != id);
                if list.is_empty() {
                    map.remove(&event_type);
                }
            }
        })
    }

    /// Invoke every handler registered for `event_type`. Handlers run
    /// outside the table lock. Returns the number invoked.
    pub fn dispatch(&self, event_type: &str, payload: &Value) -> usize {
        let targets: Vec<Arc<Handler>> = lock(&self.handlers)
            .get(event_type)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &targets {
            (**handler)(payload);
        }
        targets.len()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        lock(&self.handlers).get(event_type).map_or(0, Vec::len)
    }
}

/// In-process channel that records everything emitted and lets callers
/// inject inbound events.
#[derive(Clone)]
pub struct LoopbackChannel {
    registry: HandlerRegistry,
    sent: Arc<Mutex<Vec<(String, Value)>>>,
    connected: Arc<AtomicBool>,
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate an inbound event from the network.
    pub fn deliver(&self, event_type: &str, payload: Value) -> usize {
        if !self.is_connected() {
            return 0;
        }
        self.registry.dispatch(event_type, &payload)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Everything emitted so far, in order.
    pub fn sent(&self) -> Vec<(String, Value)> {
        lock(&self.sent).clone()
    }

    /// Emitted payloads of one event type.
    pub fn sent_of(&self, event_type: &str) -> Vec<Value> {
        lock(&self.sent)
            .iter()
            .filter(|(t, _)| t == event_type)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.registry.handler_count(event_type)
    }
}

impl EventChannel for LoopbackChannel {
    fn emit(&self, event_type: &str, payload: Value) {
        if !self.is_connected() {
            return;
        }
        lock(&self.sent).push((event_type.to_string(), payload));
    }

    fn on(&self, event_type: &str, handler: Handler) -> Subscription {
        self.registry.register(event_type, handler)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
