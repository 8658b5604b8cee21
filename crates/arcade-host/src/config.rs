use std::time::Duration;

use serde::Deserialize;

use arcade_core::entity::EntityId;
use arcade_core::game_registry::GameKind;
use arcade_core::session::{
    DEFAULT_COUNTDOWN_SECS, DEFAULT_MAX_DURATION, DEFAULT_PRESENTATION_DELAY, SessionConfig,
};

/// Top-level host configuration, loaded from `arcade.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Fixed tick rate of the session loop.
    pub tick_rate_hz: f32,
    pub session: SessionDefaults,
    pub demo: DemoConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            session: SessionDefaults::default(),
            demo: DemoConfig::default(),
        }
    }
}

/// Defaults applied to every session the host spawns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub max_duration_secs: f32,
    pub countdown_secs: u32,
    pub presentation_delay_secs: f32,
    /// Fixed RNG seed; random per session when unset.
    pub seed: Option<u64>,
    pub broadcast_every: u32,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_DURATION.as_secs_f32(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            presentation_delay_secs: DEFAULT_PRESENTATION_DELAY.as_secs_f32(),
            seed: None,
            broadcast_every: 6,
        }
    }
}

impl SessionDefaults {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs_f32(self.max_duration_secs.max(0.0))
    }

    pub fn presentation_delay(&self) -> Duration {
        Duration::from_secs_f32(self.presentation_delay_secs.max(0.0))
    }
}

/// Headless demo run by the binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Game kind name (`circular_pong`, `runner`).
    pub game: String,
    pub entities: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            game: "circular_pong".to_string(),
            entities: 4,
        }
    }
}

impl HostConfig {
    /// Validate configuration, logging problems. Returns `false` when the
    /// host cannot run with it.
    pub fn validate(&self) -> bool {
        let mut ok = true;
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            tracing::error!(tick_rate_hz = self.tick_rate_hz, "tick_rate_hz must be > 0");
            ok = false;
        }
        if self.session.max_duration().is_zero() {
            tracing::error!("session.max_duration_secs must be > 0");
            ok = false;
        }
        if self.tick_rate_hz > 240.0 {
            tracing::warn!(tick_rate_hz = self.tick_rate_hz, "Unusually high tick rate");
        }
        ok
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_rate_hz)
    }

    /// Build a session config carrying these defaults. `None` for `local`
    /// runs the session on autopilot.
    pub fn session_config(
        &self,
        kind: GameKind,
        entity_count: usize,
        local: Option<EntityId>,
    ) -> SessionConfig {
        let mut config = SessionConfig::new(kind, entity_count, local.unwrap_or(0));
        config.local_entity = local;
        config.autopilot = local.is_none();
        config.max_duration = self.session.max_duration();
        config.countdown_secs = self.session.countdown_secs;
        config.presentation_delay = self.session.presentation_delay();
        config.broadcast_every = self.session.broadcast_every;
        if let Some(seed) = self.session.seed {
            config.seed = seed;
        }
        config
    }

    /// Load config from `ARCADE_CONFIG` or `arcade.toml` if it exists, then
    /// apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("ARCADE_CONFIG").unwrap_or_else(|_| "arcade.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<HostConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded host configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Invalid host config; using defaults");
                    HostConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "No host config found, using defaults");
                HostConfig::default()
            },
        };

        if let Ok(game) = std::env::var("ARCADE_DEMO_GAME")
            && !game.is_empty()
        {
            config.demo.game = game;
        }
        if let Ok(seed) = std::env::var("ARCADE_SEED")
            && let Ok(seed) = seed.parse()
        {
            config.session.seed = Some(seed);
        }
        config
    }
}
