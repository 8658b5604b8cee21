use tracing_subscriber::EnvFilter;

use arcade_host::config::HostConfig;
use arcade_host::game_loop::{SessionBroadcast, spawn_session};
use arcade_host::registry::GameRegistry;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = HostConfig::load();
    if !config.validate() {
        std::process::exit(1);
    }

    let registry = GameRegistry::new();
    for entry in registry.entries() {
        tracing::info!(
            kind = %entry.kind,
            name = %entry.metadata.name,
            min = entry.metadata.min_entities,
            max = entry.metadata.max_entities,
            "Game available"
        );
    }

    let kind = match config.demo.game.parse() {
        Ok(kind) => kind,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start demo");
            std::process::exit(1);
        },
    };
    let session_config = config.session_config(kind, config.demo.entities, None);
    let mut handle = match spawn_session(&registry, session_config, config.tick_interval()) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start demo");
            std::process::exit(1);
        },
    };
    tracing::info!(session_id = %handle.session_id, game = %kind, "Arcade demo running");

    while let Some(msg) = handle.broadcasts.recv().await {
        match msg {
            SessionBroadcast::Event { event_type, .. } => {
                tracing::trace!(event_type, "Session event");
            },
            SessionBroadcast::Completed(result) => match serde_json::to_string(&result) {
                Ok(json) => tracing::info!(result = %json, "Demo finished"),
                Err(e) => tracing::error!(error = %e, "Failed to encode result"),
            },
            SessionBroadcast::Stopped => break,
        }
    }

    if let Err(e) = handle.task.await {
        tracing::error!(error = %e, "Session task failed");
    }
}
