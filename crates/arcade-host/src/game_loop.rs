use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use arcade_core::channel::EventChannel;
use arcade_core::entity::EntityId;
use arcade_core::error::ConfigurationError;
use arcade_core::game_trait::ArcadeGame;
use arcade_core::input::{PointerSample, RawInput};
use arcade_core::result::SessionResult;
use arcade_core::session::{Session, SessionConfig};

use crate::channel::{MpscChannel, OutboundEvent};
use crate::registry::GameRegistry;

/// Commands sent from the embedding host to the session tick loop.
#[derive(Debug)]
pub enum GameCommand {
    /// Latest raw device state for the local entity.
    Input(RawInput),
    /// An event that arrived from the transport for this session.
    RemoteEvent { event_type: String, payload: Value },
    Withdraw(EntityId),
    Stop,
}

/// Everything the tick loop reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionBroadcast {
    /// An outbound channel event (join, state, result).
    Event { event_type: String, payload: Value },
    /// The completion callback fired.
    Completed(SessionResult),
    /// The loop has exited.
    Stopped,
}

/// Handles to a running session task.
pub struct SessionHandle {
    pub session_id: Uuid,
    pub commands: mpsc::UnboundedSender<GameCommand>,
    pub broadcasts: mpsc::UnboundedReceiver<SessionBroadcast>,
    pub task: JoinHandle<()>,
}

/// Create the session synchronously (so configuration errors surface here)
/// and run its tick loop as a tokio task.
pub fn spawn_session(
    registry: &GameRegistry,
    config: SessionConfig,
    tick_interval: Duration,
) -> Result<SessionHandle, ConfigurationError> {
    let game = registry.create(config.game_kind)?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
    let (channel, outbound_rx) = MpscChannel::new();

    let completed_tx = broadcast_tx.clone();
    let on_complete = Box::new(move |result: SessionResult| {
        let _ = completed_tx.send(SessionBroadcast::Completed(result));
    });
    let shared: Arc<dyn EventChannel> = Arc::new(channel.clone());
    let session = Session::new(config, game, on_complete, Some(shared))?;
    let session_id = session.session_id();

    let task = tokio::spawn(async move {
        run_session_loop(
            session,
            channel,
            outbound_rx,
            cmd_rx,
            broadcast_tx,
            tick_interval,
        )
        .await;
    });

    Ok(SessionHandle {
        session_id,
        commands: cmd_tx,
        broadcasts: broadcast_rx,
        task,
    })
}

/// Drive the session from a fixed-rate interval, feeding it the real time
/// elapsed between ticks.
async fn run_session_loop(
    mut session: Session<dyn ArcadeGame>,
    channel: MpscChannel,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundEvent>,
    mut cmd_rx: mpsc::UnboundedReceiver<GameCommand>,
    broadcast_tx: mpsc::UnboundedSender<SessionBroadcast>,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();
    let mut input = RawInput::default();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let frame_dt = now.duration_since(last_tick);
                last_tick = now;

                session.advance(frame_dt, &input);
                // A pointer move is reported once; the adapter keeps the position.
                input.pointer = PointerSample::Unchanged;

                forward_outbound(&mut outbound_rx, &broadcast_tx);
                if session.is_released() {
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(GameCommand::Input(raw)) => input = raw,
                    Some(GameCommand::RemoteEvent { event_type, payload }) => {
                        channel.deliver(&event_type, &payload);
                    },
                    Some(GameCommand::Withdraw(entity)) => session.withdraw(entity),
                    Some(GameCommand::Stop) | None => {
                        tracing::info!(session_id = %session.session_id(), "Session loop stopped");
                        session.teardown();
                        break;
                    },
                }
            }
        }
    }

    forward_outbound(&mut outbound_rx, &broadcast_tx);
    let _ = broadcast_tx.send(SessionBroadcast::Stopped);
    tracing::debug!(
        session_id = %session.session_id(),
        ticks = session.tick(),
        "Session loop exited"
    );
}

fn forward_outbound(
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    broadcast_tx: &mpsc::UnboundedSender<SessionBroadcast>,
) {
    while let Ok(event) = outbound_rx.try_recv() {
        let _ = broadcast_tx.send(SessionBroadcast::Event {
            event_type: event.event_type,
            payload: event.payload,
        });
    }
}
