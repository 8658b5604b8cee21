use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::SessionResult;
use crate::scoring::SuddenDeathRound;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Coarse lifecycle phase, as broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Countdown,
    Running,
    SuddenDeath,
    Ended,
}

/// Result of feeding a frame delta to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Waiting,
    /// One or more whole seconds elapsed; the new remaining count.
    Tick(u32),
    /// The countdown reached zero; the FSM is now `Running`.
    Released,
}

/// Session lifecycle FSM: Countdown → Running → (SuddenDeath) → Ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    /// Whole seconds left plus the real time accumulated toward the next one.
    Countdown { remaining: u32, carry: Duration },
    Running,
    SuddenDeath(SuddenDeathRound),
    Ended(Box<SessionResult>),
}

impl LifecycleState {
    pub fn countdown(secs: u32) -> Self {
        LifecycleState::Countdown {
            remaining: secs,
            carry: Duration::ZERO,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            LifecycleState::Countdown { .. } => Phase::Countdown,
            LifecycleState::Running => Phase::Running,
            LifecycleState::SuddenDeath(_) => Phase::SuddenDeath,
            LifecycleState::Ended(_) => Phase::Ended,
        }
    }

    /// Running or in sudden death.
    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleState::Running | LifecycleState::SuddenDeath(_))
    }

    pub fn result(&self) -> Option<&SessionResult> {
        match self {
            LifecycleState::Ended(result) => Some(result),
            _ => None,
        }
    }

    /// Accumulate real time toward the countdown. Decrements once per whole
    /// accumulated second, regardless of how many frames that took.
    pub fn advance_countdown(&mut self, dt: Duration) -> CountdownStep {
        let LifecycleState::Countdown { remaining, carry } = self else {
            return CountdownStep::Waiting;
        };
        let before = *remaining;
        *carry += dt;
        while *remaining > 0 && *carry >= ONE_SECOND {
            *carry -= ONE_SECOND;
            *remaining -= 1;
        }
        if *remaining == 0 {
            *self = LifecycleState::Running;
            CountdownStep::Released
        } else if *remaining != before {
            CountdownStep::Tick(*remaining)
        } else {
            CountdownStep::Waiting
        }
    }

    /// Enter `Ended`. Returns `false` (and changes nothing) if already ended.
    pub fn end(&mut self, result: SessionResult) -> bool {
        if matches!(self, LifecycleState::Ended(_)) {
            return false;
        }
        *self = LifecycleState::Ended(Box::new(result));
        true
    }
}
