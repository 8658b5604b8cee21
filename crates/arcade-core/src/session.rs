//! The simulation session: one running mini-game.
//!
//! [`Session::advance`] is the single tick entry point. Within a tick the
//! order is fixed: timers → remote inbox → input collection → AI/remote
//! intents → physics integration → collision resolution → scoring → win
//! check → broadcast. Nothing else mutates simulation state.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::bridge::{ChannelStatus, EventBridge};
use crate::channel::EventChannel;
use crate::entity::EntityId;
use crate::error::{ConfigurationError, InvariantViolation, report_invariant};
use crate::game_registry::GameKind;
use crate::game_trait::{ArcadeGame, GameEvent, GameMetadata};
use crate::input::{InputAdapter, MovementIntent, RawInput};
use crate::lifecycle::{CountdownStep, LifecycleState, Phase};
use crate::net::messages::{JoinMsg, ResultMsg, SessionMessage, StateMsg};
use crate::net::protocol::PROTOCOL_VERSION;
use crate::result::SessionResult;
use crate::rng::{self, SimRng};
use crate::scoring::{
    Scoreboard, Standings, SuddenDeathPolicy, SuddenDeathRound, Verdict, evaluate_running,
    evaluate_sudden_death,
};
use crate::timer::{LifetimeToken, TimerId, TimerQueue};

/// Default wall-clock budget of a session.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(120);
/// Default countdown before release.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;
/// Default delay between `Ended` and the completion callback.
pub const DEFAULT_PRESENTATION_DELAY: Duration = Duration::from_secs(3);

/// Invoked once with the final result, after the presentation delay.
pub type CompletionCallback = Box<dyn FnOnce(SessionResult) + Send>;

/// Session construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub session_id: Uuid,
    pub game_kind: GameKind,
    pub entity_count: usize,
    /// The human-controlled entity. Required unless `autopilot` is set.
    pub local_entity: Option<EntityId>,
    pub max_duration: Duration,
    pub countdown_secs: u32,
    pub presentation_delay: Duration,
    pub seed: u64,
    /// Entities driven by peers over the channel while it is online.
    pub remote_entities: Vec<EntityId>,
    /// AI drives the local entity too (attract mode, headless demo).
    pub autopilot: bool,
    /// Broadcast a state snapshot every this many live ticks. 0 disables.
    pub broadcast_every: u32,
}

impl SessionConfig {
    pub fn new(game_kind: GameKind, entity_count: usize, local_entity: EntityId) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            game_kind,
            entity_count,
            local_entity: Some(local_entity),
            max_duration: DEFAULT_MAX_DURATION,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            presentation_delay: DEFAULT_PRESENTATION_DELAY,
            seed: rand::random(),
            remote_entities: Vec::new(),
            autopilot: false,
            broadcast_every: 6,
        }
    }

    /// Check the parameters against the game's metadata.
    pub fn validate(&self, meta: &GameMetadata) -> Result<(), ConfigurationError> {
        if meta.kind != self.game_kind {
            return Err(ConfigurationError::GameKindMismatch {
                expected: self.game_kind,
                actual: meta.kind,
            });
        }
        if self.entity_count == 0 {
            return Err(ConfigurationError::NoEntities);
        }
        if self.entity_count < meta.min_entities || self.entity_count > meta.max_entities {
            return Err(ConfigurationError::UnsupportedEntityCount {
                kind: meta.kind,
                min: meta.min_entities,
                max: meta.max_entities,
                count: self.entity_count,
            });
        }
        match self.local_entity {
            None if !self.autopilot => return Err(ConfigurationError::MissingLocalEntity),
            Some(local) if local >= self.entity_count => {
                return Err(ConfigurationError::LocalEntityOutOfRange {
                    local,
                    count: self.entity_count,
                });
            },
            _ => {},
        }
        if self.max_duration.is_zero() {
            return Err(ConfigurationError::ZeroDuration);
        }
        if let Some(&bad) = self
            .remote_entities
            .iter()
            .find(|&&e| e >= self.entity_count || Some(e) == self.local_entity)
        {
            return Err(ConfigurationError::InvalidRemoteEntity(bad));
        }
        Ok(())
    }
}

/// Who produces an entity's intent this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Controller {
    Local,
    Remote,
    Ai,
}

pub struct Session<G: ArcadeGame + ?Sized> {
    config: SessionConfig,
    game: Box<G>,
    lifecycle: LifecycleState,
    elapsed: Duration,
    tick: u64,
    live_ticks: u64,
    scoreboard: Scoreboard,
    input: InputAdapter,
    remote_intents: Vec<MovementIntent>,
    rng: SimRng,
    bridge: EventBridge,
    timers: TimerQueue,
    token: LifetimeToken,
    on_complete: Option<CompletionCallback>,
    completion_timer: Option<TimerId>,
    released: bool,
    torn_down: bool,
}

impl<G: ArcadeGame + ?Sized> Session<G> {
    /// Validate `config`, initialise `game`, attach the optional channel,
    /// and announce the session. Fails without side effects on invalid
    /// parameters.
    pub fn new(
        config: SessionConfig,
        mut game: Box<G>,
        on_complete: CompletionCallback,
        channel: Option<Arc<dyn EventChannel>>,
    ) -> Result<Self, ConfigurationError> {
        let meta = game.metadata();
        config.validate(&meta)?;

        let mut rng = rng::seeded(config.seed);
        game.init(config.entity_count, config.local_entity, &mut rng);
        let created = game.entities().len();
        if created != config.entity_count {
            report_invariant(InvariantViolation(format!(
                "{} created {created} entities, expected {}",
                meta.kind, config.entity_count
            )));
            return Err(ConfigurationError::EntityCountMismatch {
                expected: config.entity_count,
                actual: created,
            });
        }

        let bridge = EventBridge::new(channel);
        bridge.send(&SessionMessage::Join(JoinMsg {
            protocol_version: PROTOCOL_VERSION,
            session_id: config.session_id,
            game_kind: config.game_kind,
            entity_count: config.entity_count,
            local_entity: config.local_entity,
        }));

        tracing::info!(
            session_id = %config.session_id,
            game_kind = %config.game_kind,
            entities = config.entity_count,
            seed = config.seed,
            channel = ?bridge.status(),
            "Session created"
        );

        Ok(Self {
            input: InputAdapter::new(game.pointer_mapping()),
            scoreboard: Scoreboard::new(config.entity_count),
            remote_intents: vec![MovementIntent::IDLE; config.entity_count],
            lifecycle: LifecycleState::countdown(config.countdown_secs),
            elapsed: Duration::ZERO,
            tick: 0,
            live_ticks: 0,
            rng,
            bridge,
            timers: TimerQueue::new(),
            token: LifetimeToken::new(),
            on_complete: Some(on_complete),
            completion_timer: None,
            released: false,
            torn_down: false,
            config,
            game,
        })
    }

    /// Advance the session by one real frame delta. Returns this tick's
    /// game events (empty outside `Running`/`SuddenDeath`).
    pub fn advance(&mut self, frame_dt: Duration, raw: &RawInput) -> Vec<GameEvent> {
        if self.torn_down {
            return Vec::new();
        }
        self.tick += 1;
        self.run_timers(frame_dt);

        match self.lifecycle.phase() {
            Phase::Countdown => {
                // Observe keys so a press held across release is not an edge.
                self.input.collect(raw);
                match self.lifecycle.advance_countdown(frame_dt) {
                    CountdownStep::Released => {
                        self.game.start(&mut self.rng);
                        tracing::info!(session_id = %self.config.session_id, "Countdown finished");
                    },
                    CountdownStep::Tick(remaining) => {
                        tracing::debug!(
                            session_id = %self.config.session_id,
                            remaining,
                            "Countdown"
                        );
                    },
                    CountdownStep::Waiting => {},
                }
                Vec::new()
            },
            Phase::Running | Phase::SuddenDeath => self.step(frame_dt, raw),
            Phase::Ended => Vec::new(),
        }
    }

    fn step(&mut self, dt: Duration, raw: &RawInput) -> Vec<GameEvent> {
        self.elapsed += dt;
        self.live_ticks += 1;

        let status = self.bridge.refresh_status();
        let inbox = self.bridge.drain();
        for entity in inbox.withdrawals {
            self.withdraw(entity);
        }
        for (entity, intent) in inbox.intents {
            if self.controller(entity, status) == Controller::Remote
                && let Some(slot) = self.remote_intents.get_mut(entity)
            {
                *slot = intent.sanitize(entity);
            }
        }

        // input
        let local_intent = self.input.collect(raw);

        // AI / remote
        let intents = self.gather_intents(local_intent, status);

        // physics
        self.game.integrate(dt.as_secs_f32(), &intents);

        // collision
        let events = self.game.resolve_collisions(self.elapsed, &mut self.rng);

        // scoring
        self.scoreboard.apply(&events, self.elapsed);
        let alive: Vec<EntityId> = self
            .game
            .entities()
            .iter()
            .filter(|e| e.alive)
            .map(|e| e.id)
            .collect();
        self.scoreboard.accrue_survival(alive, dt);

        // win check
        let verdict = self.evaluate(&events, dt);
        self.apply_verdict(verdict);

        if self.lifecycle.is_live()
            && self.config.broadcast_every > 0
            && self.live_ticks % u64::from(self.config.broadcast_every) == 0
        {
            self.broadcast_state();
        }
        events
    }

    fn controller(&self, entity: EntityId, status: ChannelStatus) -> Controller {
        if Some(entity) == self.config.local_entity && !self.config.autopilot {
            Controller::Local
        } else if status == ChannelStatus::Online && self.config.remote_entities.contains(&entity)
        {
            Controller::Remote
        } else {
            Controller::Ai
        }
    }

    fn gather_intents(
        &mut self,
        local_intent: MovementIntent,
        status: ChannelStatus,
    ) -> Vec<MovementIntent> {
        let alive: Vec<bool> = self.game.entities().iter().map(|e| e.alive).collect();
        let mut intents = Vec::with_capacity(alive.len());
        for (entity, is_alive) in alive.into_iter().enumerate() {
            if !is_alive {
                intents.push(MovementIntent::IDLE);
                continue;
            }
            let intent = match self.controller(entity, status) {
                Controller::Local => local_intent.sanitize(entity),
                Controller::Remote => {
                    let slot = &mut self.remote_intents[entity];
                    let intent = *slot;
                    // Jump is an edge; consume it.
                    slot.jump = false;
                    intent
                },
                Controller::Ai => self.game.ai_intent(entity, &mut self.rng).sanitize(entity),
            };
            intents.push(intent);
        }
        intents
    }

    fn standings(&self) -> Standings {
        let entities = self.game.entities();
        Standings {
            alive: entities.iter().map(|e| e.alive).collect(),
            progress: entities.iter().map(|e| self.game.progress(e.id)).collect(),
        }
    }

    fn evaluate(&mut self, events: &[GameEvent], dt: Duration) -> Verdict {
        let rules = self.game.rules();
        let standings = self.standings();
        match &mut self.lifecycle {
            LifecycleState::Running => evaluate_running(
                &rules,
                &self.scoreboard,
                &standings,
                events,
                self.elapsed,
                self.config.max_duration,
            ),
            LifecycleState::SuddenDeath(round) => {
                evaluate_sudden_death(&rules, round, &self.scoreboard, &standings, events, dt)
            },
            _ => Verdict::Continue,
        }
    }

    fn apply_verdict(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Continue => {},
            Verdict::SuddenDeath(contenders) => {
                let SuddenDeathPolicy::FirstDecisiveEvent { duration, .. } =
                    self.game.rules().sudden_death
                else {
                    report_invariant(InvariantViolation(
                        "sudden death requested without a policy".into(),
                    ));
                    return;
                };
                tracing::info!(
                    session_id = %self.config.session_id,
                    ?contenders,
                    "Tied at time expiry; entering sudden death"
                );
                self.lifecycle =
                    LifecycleState::SuddenDeath(SuddenDeathRound::new(contenders, duration));
            },
            Verdict::Ended(outcome) => {
                let ranking = self.game.rules().ranking;
                let count = self.scoreboard.len();
                let result = SessionResult {
                    session_id: self.config.session_id,
                    game_kind: self.config.game_kind,
                    winner: outcome.winner,
                    joint_winners: outcome.joint_winners,
                    per_entity_score: (0..count)
                        .map(|e| (e, self.scoreboard.metric(ranking, e)))
                        .collect(),
                    survival_ms: (0..count)
                        .map(|e| {
                            let ms = self
                                .scoreboard
                                .entry(e)
                                .map_or(0, |s| s.survival.as_millis() as u64);
                            (e, ms)
                        })
                        .collect(),
                    reason: outcome.reason,
                    duration_ms: self.elapsed.as_millis() as u64,
                    details: self.game.details(),
                };
                self.finish(result);
            },
        }
    }

    fn finish(&mut self, result: SessionResult) {
        if !self.lifecycle.end(result.clone()) {
            return;
        }
        tracing::info!(
            session_id = %self.config.session_id,
            winner = ?result.winner,
            reason = ?result.reason,
            duration_ms = result.duration_ms,
            "Session ended"
        );
        self.bridge.send(&SessionMessage::Result(ResultMsg {
            result: result.clone(),
        }));
        if let Some(callback) = self.on_complete.take() {
            let task = self.token.guard(move || callback(result));
            let delay = self.config.presentation_delay;
            self.completion_timer = Some(self.timers.schedule(delay, task));
        }
    }

    fn run_timers(&mut self, dt: Duration) {
        self.timers.advance(dt);
        if let Some(id) = self.completion_timer
            && !self.timers.is_pending(id)
        {
            self.completion_timer = None;
            self.release();
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.game.clear();
        self.remote_intents.clear();
        self.bridge.close();
        tracing::debug!(session_id = %self.config.session_id, "Session resources released");
    }

    fn broadcast_state(&self) {
        let ranking = self.game.rules().ranking;
        self.bridge.send(&SessionMessage::State(StateMsg {
            session_id: self.config.session_id,
            tick: self.tick,
            elapsed_ms: self.elapsed.as_millis() as u64,
            phase: self.lifecycle.phase(),
            scores: (0..self.scoreboard.len())
                .map(|e| self.scoreboard.metric(ranking, e))
                .collect(),
            state: self.game.snapshot(),
        }));
    }

    /// Withdraw an entity (player left). Its score is kept; it stops moving
    /// and, where the game defines it, its boundary becomes a wall.
    pub fn withdraw(&mut self, entity: EntityId) {
        if self.torn_down || matches!(self.lifecycle, LifecycleState::Ended(_)) {
            return;
        }
        if entity >= self.scoreboard.len() {
            tracing::debug!(entity, "Ignoring withdrawal of unknown entity");
            return;
        }
        if self.scoreboard.record_withdrawal(entity) {
            self.game.withdraw(entity);
            tracing::info!(session_id = %self.config.session_id, entity, "Entity withdrew");
        }
    }

    /// Stop the session: revoke the lifetime token, cancel timers, release
    /// resources. Idempotent; the completion callback never fires afterwards.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.token.revoke();
        self.timers.cancel_all();
        self.completion_timer = None;
        self.on_complete = None;
        self.release();
        tracing::debug!(session_id = %self.config.session_id, "Session torn down");
    }

    pub fn session_id(&self) -> Uuid {
        self.config.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.lifecycle.result()
    }

    /// Simulated time spent in `Running`/`SuddenDeath`.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Direct access for hosts and tests that stage scenarios.
    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.bridge.status()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<G: ArcadeGame + ?Sized> Drop for Session<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}
