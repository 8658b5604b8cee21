//! End-to-end session scenarios: real games driven through `Session` with
//! fixed frame deltas, plus a peer talking over the in-process channel.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use uuid::Uuid;

use arcade_core::channel::EventChannel;
use arcade_core::game_registry::GameKind;
use arcade_core::game_trait::ArcadeGame;
use arcade_core::input::RawInput;
use arcade_core::lifecycle::Phase;
use arcade_core::net::messages::{MessageType, PeerMessage, WithdrawMsg};
use arcade_core::net::protocol::encode_peer_message;
use arcade_core::result::{EndReason, SessionResult};
use arcade_core::session::{Session, SessionConfig};
use arcade_core::test_helpers::recording_callback;

use arcade_host::channel::MpscChannel;
use arcade_pong::CircularPong;
use arcade_pong::config::PongConfig;
use arcade_runner::RunnerGame;
use arcade_runner::config::RunnerConfig;
use arcade_runner::spawner::ObstacleKind;

fn frame() -> Duration {
    Duration::from_secs_f64(1.0 / 60.0)
}

fn config(kind: GameKind, entities: usize, local: Option<usize>, secs: f32) -> SessionConfig {
    let mut config = SessionConfig::new(kind, entities, local.unwrap_or(0));
    config.local_entity = local;
    config.autopilot = local.is_none();
    config.countdown_secs = 0;
    config.presentation_delay = Duration::ZERO;
    config.max_duration = Duration::from_secs_f32(secs);
    config.seed = 0xA11CE;
    config
}

/// Advance with idle input until the completion callback fired or
/// `max_frames` ran out.
fn run_to_completion<G: ArcadeGame + ?Sized>(
    session: &mut Session<G>,
    results: &std::sync::Mutex<Vec<SessionResult>>,
    max_frames: usize,
) -> SessionResult {
    let idle = RawInput::default();
    for _ in 0..max_frames {
        session.advance(frame(), &idle);
        if let Some(result) = results.lock().unwrap().first() {
            return result.clone();
        }
    }
    panic!("session did not complete within {max_frames} frames");
}

fn quiet_runner() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    config.spawn.enabled = false;
    config.physics.speedup_interval_secs = 0.0;
    config
}

#[test]
fn motionless_pong_ends_in_four_way_draw() {
    let game = CircularPong::with_config(PongConfig {
        ball_base_speed: 0.0,
        ..PongConfig::default()
    });
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        config(GameKind::CircularPong, 4, Some(0), 3.0),
        Box::new(game),
        callback,
        None,
    )
    .unwrap();

    let result = run_to_completion(&mut session, &results, 400);
    assert_eq!(result.reason, EndReason::TimeExpired);
    assert_eq!(result.winner, None);
    assert_eq!(result.joint_winners, vec![0, 1, 2, 3]);
    assert!(result.per_entity_score.values().all(|&goals| goals == 0));
    assert!(session.is_released());
}

#[test]
fn idle_runner_crashes_and_ai_wins() {
    let runner = quiet_runner();
    let obstacle_x = runner.physics.run_speed * 5.0;
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        config(GameKind::Runner, 2, Some(0), 60.0),
        Box::new(RunnerGame::with_config(runner)),
        callback,
        None,
    )
    .unwrap();
    session
        .game_mut()
        .inject_obstacle(0, ObstacleKind::Low, obstacle_x);

    let result = run_to_completion(&mut session, &results, 600);
    assert_eq!(result.winner, Some(1));
    assert_eq!(result.reason, EndReason::Elimination);
    assert!(
        (4700..=5000).contains(&result.duration_ms),
        "ended after {}ms",
        result.duration_ms
    );
    assert!(result.survival_ms[&1] >= result.survival_ms[&0]);
    assert_eq!(result.details["coins"], serde_json::json!([0, 0]));
}

#[test]
fn goal_is_charged_to_the_sector_owner() {
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        config(GameKind::CircularPong, 2, Some(1), 1.0),
        Box::new(CircularPong::with_config(PongConfig::default())),
        callback,
        None,
    )
    .unwrap();

    // Release, then aim the ball at entity 1's undefended sector.
    session.advance(frame(), &RawInput::default());
    assert_eq!(session.phase(), Phase::Running);
    {
        let game = session.game_mut();
        game.state_mut().paddles[1].offset = 1.2;
        game.sync_paddles();
        let ball = &mut game.state_mut().world.movables[0];
        ball.position = Vec2::new(-250.0, 0.0);
        ball.velocity = Vec2::new(-300.0, 0.0);
        ball.speed = 300.0;
    }

    let result = run_to_completion(&mut session, &results, 120);
    assert_eq!(result.per_entity_score[&1], 1);
    assert_eq!(result.per_entity_score[&0], 0);
    assert_eq!(result.winner, Some(0));
    assert_eq!(result.reason, EndReason::TimeExpired);
    assert_eq!(result.details["goals"], 1);
}

#[test]
fn runner_tie_goes_to_sudden_death_and_first_coin_wins() {
    let runner = quiet_runner();
    let coin_y = runner.lane_base(1) + runner.spawn.coin_ground_height;
    let coin_radius = runner.spawn.coin_radius;
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        config(GameKind::Runner, 2, Some(0), 2.0),
        Box::new(RunnerGame::with_config(runner)),
        callback,
        None,
    )
    .unwrap();

    let idle = RawInput::default();
    for _ in 0..200 {
        session.advance(frame(), &idle);
        if session.phase() == Phase::SuddenDeath {
            break;
        }
    }
    assert_eq!(session.phase(), Phase::SuddenDeath);
    assert!(results.lock().unwrap().is_empty());

    let x = session.game().progress(1) + 4.0;
    session
        .game_mut()
        .state_mut()
        .world
        .spawn_movable(Vec2::new(x, coin_y), coin_radius);

    let result = run_to_completion(&mut session, &results, 120);
    assert_eq!(result.winner, Some(1));
    assert_eq!(result.reason, EndReason::SuddenDeathResolved);
    assert_eq!(result.per_entity_score[&1], 1);
}

#[test]
fn mirrored_coins_in_sudden_death_are_a_draw() {
    let runner = quiet_runner();
    let coin_height = runner.spawn.coin_ground_height;
    let coin_radius = runner.spawn.coin_radius;
    let lane_bases = [runner.lane_base(0), runner.lane_base(1)];
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        config(GameKind::Runner, 2, Some(0), 2.0),
        Box::new(RunnerGame::with_config(runner)),
        callback,
        None,
    )
    .unwrap();

    let idle = RawInput::default();
    for _ in 0..200 {
        session.advance(frame(), &idle);
        if session.phase() == Phase::SuddenDeath {
            break;
        }
    }
    assert_eq!(session.phase(), Phase::SuddenDeath);

    // Same coin row in both lanes, as the spawner lays them out.
    let x = session.game().progress(0).max(session.game().progress(1)) + 4.0;
    let world = &mut session.game_mut().state_mut().world;
    for base in lane_bases {
        world.spawn_movable(Vec2::new(x, base + coin_height), coin_radius);
    }

    let result = run_to_completion(&mut session, &results, 120);
    assert_eq!(result.per_entity_score[&0], 1);
    assert_eq!(result.per_entity_score[&1], 1);
    assert_eq!(result.winner, None);
    assert_eq!(result.joint_winners, vec![0, 1]);
    assert_eq!(result.reason, EndReason::SuddenDeathResolved);
}

#[test]
fn same_seed_same_session() {
    let run = || {
        let mut cfg = config(GameKind::CircularPong, 3, None, 8.0);
        cfg.session_id = Uuid::nil();
        let (callback, results) = recording_callback();
        let mut session = Session::new(
            cfg,
            Box::new(CircularPong::with_config(PongConfig::default())),
            callback,
            None,
        )
        .unwrap();
        let idle = RawInput::default();
        for _ in 0..240 {
            session.advance(frame(), &idle);
        }
        let mid_state = session.game().serialize_state();
        let result = run_to_completion(&mut session, &results, 1200);
        (mid_state, result)
    };

    let (state_a, result_a) = run();
    let (state_b, result_b) = run();
    assert_eq!(state_a, state_b);
    assert_eq!(result_a, result_b);
}

#[test]
fn teardown_before_presentation_suppresses_callback() {
    let runner = quiet_runner();
    let obstacle_x = runner.physics.run_speed;
    let mut cfg = config(GameKind::Runner, 2, Some(0), 60.0);
    cfg.presentation_delay = Duration::from_secs(3);
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        cfg,
        Box::new(RunnerGame::with_config(runner)),
        callback,
        None,
    )
    .unwrap();
    session
        .game_mut()
        .inject_obstacle(0, ObstacleKind::Low, obstacle_x);

    let idle = RawInput::default();
    for _ in 0..120 {
        session.advance(frame(), &idle);
        if session.phase() == Phase::Ended {
            break;
        }
    }
    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.result().map(|r| r.winner), Some(Some(1)));

    session.teardown();
    for _ in 0..300 {
        session.advance(frame(), &idle);
    }
    assert!(results.lock().unwrap().is_empty());
    assert!(session.is_released());
}

#[test]
fn remote_withdrawal_over_channel_ends_runner() {
    let (channel, mut outbound) = MpscChannel::new();
    let shared: Arc<dyn EventChannel> = Arc::new(channel.clone());
    let mut cfg = config(GameKind::Runner, 2, Some(0), 60.0);
    cfg.remote_entities = vec![1];
    let (callback, results) = recording_callback();
    let mut session = Session::new(
        cfg,
        Box::new(RunnerGame::with_config(quiet_runner())),
        callback,
        Some(shared),
    )
    .unwrap();

    let join = outbound.try_recv().unwrap();
    assert_eq!(join.event_type, MessageType::SessionJoin.event_type());

    session.advance(frame(), &RawInput::default());
    let (event_type, payload) =
        encode_peer_message(&PeerMessage::Withdraw(WithdrawMsg { entity: 1 })).unwrap();
    assert_eq!(channel.deliver(event_type, &payload), 1);

    let result = run_to_completion(&mut session, &results, 10);
    assert_eq!(result.winner, Some(0));
    assert_eq!(result.reason, EndReason::Withdrawal);

    let mut saw_result = false;
    while let Ok(event) = outbound.try_recv() {
        saw_result |= event.event_type == MessageType::SessionResult.event_type();
    }
    assert!(saw_result, "result is announced to peers");
}
