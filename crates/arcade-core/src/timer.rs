//! Session-scoped deferred work.
//!
//! Every delayed action a session schedules (end-of-game presentation delay,
//! completion callback) goes through a [`TimerQueue`] driven by simulation
//! time, and every task is wrapped by the session's [`LifetimeToken`] so that
//! nothing fires after teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Revocable liveness flag shared by a session and its deferred tasks.
#[derive(Debug, Clone)]
pub struct LifetimeToken(Arc<AtomicBool>);

impl Default for LifetimeToken {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Revoke the token. Irreversible.
    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Wrap `task` so it becomes a no-op once the token is revoked.
    pub fn guard<F>(&self, task: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.clone();
        move || {
            if token.is_alive() {
                task();
            }
        }
    }
}

/// Handle for cancelling a scheduled task.
pub type TimerId = u64;

type Task = Box<dyn FnOnce() + Send>;

struct Pending {
    id: TimerId,
    due: Duration,
    task: Task,
}

/// Deferred tasks ordered by due time, then by scheduling order.
#[derive(Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: TimerId,
    pending: Vec<Pending>,
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `delay` has elapsed. A zero delay fires on the next
    /// [`advance`](Self::advance), never synchronously.
    pub fn schedule<F>(&mut self, delay: Duration, task: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due: self.now + delay,
            task: Box::new(task),
        });
        id
    }

    /// Advance the clock and run every task now due. Returns how many ran.
    pub fn advance(&mut self, dt: Duration) -> usize {
        self.now += dt;
        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by_key(|p| (p.due, p.id));
        let fired = due.len();
        for p in due {
            (p.task)();
        }
        fired
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    /// Drop every pending task without running it.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
