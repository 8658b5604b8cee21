use serde::de::Error as _;
use serde::{Deserialize, Serialize};

/// Data-driven configuration for the circular arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PongConfig {
    /// Radius beyond which a ball has left the arena.
    pub arena_radius: f32,
    /// Radius of the paddle centreline.
    pub paddle_ring_radius: f32,
    /// Radial thickness of a paddle.
    pub paddle_thickness: f32,
    /// Angular half-width of a paddle (radians), before the sector clamp.
    pub paddle_half_arc: f32,
    /// Maximum paddle angular speed (rad/s).
    pub paddle_speed: f32,
    /// Balls launched at countdown release.
    pub ball_count: u32,
    pub ball_radius: f32,
    /// Launch speed (units/s).
    pub ball_base_speed: f32,
    /// Simulated seconds between speed-schedule steps.
    pub speedup_interval_secs: f32,
    /// Fraction of base speed added per step.
    pub speedup_step: f32,
    /// Global cap as a multiple of base speed.
    pub max_speed_multiplier: f32,
    /// Maximum bounce jitter (radians).
    pub bounce_jitter: f32,
    pub bounce_speedup_min: f32,
    pub bounce_speedup_max: f32,
    /// Per-ball-per-collider cooldown (ms).
    pub hit_cooldown_ms: u64,
    /// Chance per tick that the AI reacts to a threat.
    pub ai_reaction_chance: f32,
    /// AI ignores intercepts further out than this (seconds).
    pub ai_horizon_secs: f32,
    /// Fraction of paddle speed used when drifting home.
    pub ai_return_rate: f32,
    /// AI stops adjusting within this angular distance (radians).
    pub ai_deadzone: f32,
    /// Sudden-death window (seconds); 0 disables sudden death.
    pub sudden_death_secs: f32,
    /// Sudden-death replays before a draw.
    pub sudden_death_replays: u32,
}

impl Default for PongConfig {
    fn default() -> Self {
        Self {
            arena_radius: 300.0,
            paddle_ring_radius: 280.0,
            paddle_thickness: 12.0,
            paddle_half_arc: 0.22,
            paddle_speed: 2.5,
            ball_count: 1,
            ball_radius: 8.0,
            ball_base_speed: 180.0,
            speedup_interval_secs: 15.0,
            speedup_step: 0.10,
            max_speed_multiplier: 2.5,
            bounce_jitter: 0.15,
            bounce_speedup_min: 1.05,
            bounce_speedup_max: 1.10,
            hit_cooldown_ms: 40,
            ai_reaction_chance: 0.8,
            ai_horizon_secs: 3.0,
            ai_return_rate: 0.4,
            ai_deadzone: 0.02,
            sudden_death_secs: 0.0,
            sudden_death_replays: 0,
        }
    }
}

impl PongConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("ARCADE_PONG_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match Self::from_toml(&contents) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Invalid pong config; ignoring");
                },
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/pong.toml") {
            match Self::from_toml(&contents) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(error = %e, "Invalid config/pong.toml; using defaults"),
            }
        }
        Self::default()
    }

    /// Parse a TOML document. Missing keys take their defaults; NaN or
    /// infinite floats are an error.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = contents.parse()?;
        if let Some(key) = non_finite_key(&table) {
            return Err(toml::de::Error::custom(format!("`{key}` must be finite")));
        }
        toml::Value::Table(table).try_into()
    }

    /// Absolute speed cap (units/s).
    pub fn speed_cap(&self) -> f32 {
        self.ball_base_speed * self.max_speed_multiplier
    }
}

/// Dotted path of the first NaN or infinite float in `table`.
fn non_finite_key(table: &toml::Table) -> Option<String> {
    table.iter().find_map(|(key, value)| match value {
        toml::Value::Float(f) if !f.is_finite() => Some(key.clone()),
        toml::Value::Table(inner) => non_finite_key(inner).map(|k| format!("{key}.{k}")),
        _ => None,
    })
}
