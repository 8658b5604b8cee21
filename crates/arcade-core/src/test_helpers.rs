use std::sync::{Arc, Mutex};
use std::time::Duration;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Shape, World};
use crate::game_registry::GameKind;
use crate::game_trait::{ArcadeGame, GameEvent, GameMetadata};
use crate::input::{MovementIntent, Steer};
use crate::result::SessionResult;
use crate::rng::{self, SimRng};
use crate::scoring::WinRules;
use crate::session::CompletionCallback;

/// Seed used by the contract helpers.
pub const TEST_SEED: u64 = 0x5eed;

/// Idle intents for `n` entities.
pub fn idle_intents(n: usize) -> Vec<MovementIntent> {
    vec![MovementIntent::IDLE; n]
}

/// Completion callback that records every result it receives.
pub fn recording_callback() -> (CompletionCallback, Arc<Mutex<Vec<SessionResult>>>) {
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&results);
    (
        Box::new(move |result: SessionResult| sink.lock().unwrap().push(result)),
        results,
    )
}

/// Run N integrate + collide steps with idle intents, returning all events.
pub fn run_game_ticks(
    game: &mut dyn ArcadeGame,
    rng: &mut SimRng,
    n: usize,
    dt: f32,
) -> Vec<GameEvent> {
    let idle = idle_intents(game.entities().len());
    let mut all_events = Vec::new();
    let mut now = Duration::ZERO;
    for _ in 0..n {
        now += Duration::from_secs_f32(dt);
        game.integrate(dt, &idle);
        all_events.extend(game.resolve_collisions(now, rng));
    }
    all_events
}

// ================================================================
// Game Trait Contract Tests
// ================================================================
// Generic checks every ArcadeGame implementation must pass. Game crates
// call them from their own #[cfg(test)] modules with a fresh instance.

/// init() with N entities creates ids 0..N with exactly the local one flagged.
pub fn contract_init_creates_entities(game: &mut dyn ArcadeGame, entity_count: usize) {
    let mut rng = rng::seeded(TEST_SEED);
    game.init(entity_count, Some(0), &mut rng);
    let entities = game.entities();
    assert_eq!(entities.len(), entity_count, "init must create one entity per slot");
    for (i, e) in entities.iter().enumerate() {
        assert_eq!(e.id, i, "entity ids must equal their table index");
        assert!(e.alive, "entities start alive");
    }
    assert_eq!(
        entities.iter().filter(|e| e.local).count(),
        1,
        "exactly one local entity"
    );
    assert!(!game.serialize_state().is_empty());
}

/// After start(), ticking with idle intents must change the state.
pub fn contract_start_sets_world_in_motion(game: &mut dyn ArcadeGame, entity_count: usize) {
    let mut rng = rng::seeded(TEST_SEED);
    game.init(entity_count, Some(0), &mut rng);
    game.start(&mut rng);
    let before = game.serialize_state();
    run_game_ticks(game, &mut rng, 5, 1.0 / 60.0);
    assert_ne!(before, game.serialize_state(), "state must evolve after start");
}

/// A withdrawn entity is dead and frozen in place.
pub fn contract_withdrawn_entity_is_frozen(game: &mut dyn ArcadeGame, entity_count: usize) {
    let mut rng = rng::seeded(TEST_SEED);
    game.init(entity_count, Some(0), &mut rng);
    game.start(&mut rng);
    let target = entity_count - 1;
    game.withdraw(target);
    let pos = game.entities()[target].position;
    let mut intents = idle_intents(entity_count);
    intents[target] = MovementIntent {
        steer: Steer::Delta(1.0),
        jump: true,
        crouch: false,
    };
    for _ in 0..30 {
        game.integrate(1.0 / 60.0, &intents);
    }
    let e = &game.entities()[target];
    assert!(!e.alive, "withdrawn entity must not be alive");
    assert_eq!(e.position, pos, "withdrawn entity must not move");
}

/// AI intents for every alive entity are valid without sanitizing.
pub fn contract_ai_intents_are_valid(game: &mut dyn ArcadeGame, entity_count: usize) {
    let mut rng = rng::seeded(TEST_SEED);
    game.init(entity_count, Some(0), &mut rng);
    game.start(&mut rng);
    for _ in 0..60 {
        let intents: Vec<MovementIntent> = (0..entity_count)
            .map(|e| game.ai_intent(e, &mut rng))
            .collect();
        for (e, intent) in intents.iter().enumerate() {
            assert!(intent.validate().is_ok(), "AI intent for {e} invalid: {intent:?}");
        }
        game.integrate(1.0 / 60.0, &intents);
        game.resolve_collisions(Duration::ZERO, &mut rng);
    }
}

/// serialize_state() -> apply_state() round-trip preserves state.
pub fn contract_state_roundtrip_preserves(game: &mut dyn ArcadeGame) {
    let state1 = game.serialize_state();
    game.apply_state(&state1);
    let state2 = game.serialize_state();
    assert_eq!(state1, state2, "serialize -> apply -> serialize must be identical");
}

/// clear() releases every entity and movable.
pub fn contract_clear_releases_world(game: &mut dyn ArcadeGame, entity_count: usize) {
    let mut rng = rng::seeded(TEST_SEED);
    game.init(entity_count, Some(0), &mut rng);
    game.start(&mut rng);
    game.clear();
    assert!(game.entities().is_empty(), "clear must release all entities");
}

// ================================================================
// Scripted game
// ================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedState {
    pub world: World,
}

/// Minimal game whose events are scripted by simulated time. Used to test
/// the session driver without real physics.
#[derive(Debug, Clone)]
pub struct ScriptedGame {
    pub state: ScriptedState,
    rules: WinRules,
    script: Vec<(Duration, GameEvent)>,
    pub started: bool,
    pub last_intents: Vec<MovementIntent>,
    pub withdrawn: Vec<EntityId>,
    /// One RNG draw per collision pass, for determinism checks.
    pub rng_trace: Vec<u32>,
}

impl ScriptedGame {
    pub const AI_INTENT: MovementIntent = MovementIntent {
        steer: Steer::Delta(0.5),
        jump: false,
        crouch: false,
    };

    pub fn new(rules: WinRules) -> Self {
        Self {
            state: ScriptedState::default(),
            rules,
            script: Vec::new(),
            started: false,
            last_intents: Vec::new(),
            withdrawn: Vec::new(),
            rng_trace: Vec::new(),
        }
    }

    /// Emit `event` on the first tick at or after `at`.
    pub fn with_event(mut self, at: Duration, event: GameEvent) -> Self {
        self.script.push((at, event));
        self.script.sort_by_key(|(t, _)| *t);
        self
    }
}

impl ArcadeGame for ScriptedGame {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Scripted".to_string(),
            description: "Test double".to_string(),
            kind: GameKind::Runner,
            min_entities: 1,
            max_entities: 8,
            estimated_round_duration: Duration::from_secs(10),
        }
    }

    fn init(&mut self, entity_count: usize, local: Option<EntityId>, _rng: &mut SimRng) {
        self.state.world = World::new();
        for i in 0..entity_count {
            self.state.world.add_entity(
                Vec2::new(i as f32, 0.0),
                Shape::Circle { radius: 1.0 },
                Some(i) == local,
            );
        }
    }

    fn start(&mut self, _rng: &mut SimRng) {
        self.started = true;
    }

    fn ai_intent(&self, _entity: EntityId, rng: &mut SimRng) -> MovementIntent {
        let _: u32 = rng.random();
        Self::AI_INTENT
    }

    fn integrate(&mut self, _dt: f32, intents: &[MovementIntent]) {
        self.last_intents = intents.to_vec();
    }

    fn resolve_collisions(&mut self, now: Duration, rng: &mut SimRng) -> Vec<GameEvent> {
        self.rng_trace.push(rng.random());
        let due = self.script.iter().take_while(|(t, _)| *t <= now).count();
        let events: Vec<GameEvent> = self.script.drain(..due).map(|(_, e)| e).collect();
        for event in &events {
            if let GameEvent::Eliminated { entity } = *event {
                self.state.world.kill(entity);
            }
        }
        events
    }

    fn rules(&self) -> WinRules {
        self.rules
    }

    fn withdraw(&mut self, entity: EntityId) {
        self.withdrawn.push(entity);
        self.state.world.kill(entity);
    }

    fn clear(&mut self) {
        self.state.world.clear();
    }

    crate::arcade_game_boilerplate!(state_type: ScriptedState);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Ranking, SuddenDeathPolicy};

    fn scripted() -> ScriptedGame {
        ScriptedGame::new(WinRules {
            ranking: Ranking::Elimination,
            sudden_death: SuddenDeathPolicy::None,
        })
    }

    #[test]
    fn scripted_game_contracts() {
        contract_init_creates_entities(&mut scripted(), 3);
        contract_withdrawn_entity_is_frozen(&mut scripted(), 3);
        contract_ai_intents_are_valid(&mut scripted(), 3);
        contract_clear_releases_world(&mut scripted(), 3);
        let mut game = scripted();
        game.init(2, Some(0), &mut rng::seeded(TEST_SEED));
        contract_state_roundtrip_preserves(&mut game);
    }

    #[test]
    fn scripted_events_fire_once_in_order() {
        let mut game = scripted()
            .with_event(Duration::from_millis(20), GameEvent::Eliminated { entity: 1 })
            .with_event(Duration::from_millis(10), GameEvent::Scored { entity: 0, points: 1 });
        let mut rng = rng::seeded(1);
        game.init(2, Some(0), &mut rng);
        let events = run_game_ticks(&mut game, &mut rng, 3, 0.016);
        assert_eq!(
            events,
            vec![
                GameEvent::Scored { entity: 0, points: 1 },
                GameEvent::Eliminated { entity: 1 }
            ]
        );
        assert!(!game.entities()[1].alive);
    }
}
